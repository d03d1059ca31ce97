//! Weekly coached check-in
//!
//! Each check-in backs out the user's true TDEE from the energy-balance
//! identity (intake - expenditure = stored energy change), compares the
//! observed weekly change with the change the goal requires, and nudges the
//! calorie target by a fixed step:
//!
//! | expected | observed                      | adjustment        |
//! |----------|-------------------------------|-------------------|
//! | lose     | above expected + tolerance    | -directional step |
//! | lose     | below expected - tolerance    | +directional step |
//! | gain     | below expected - tolerance    | +directional step |
//! | gain     | above expected + tolerance    | -directional step |
//! | maintain | above +tolerance              | -maintenance step |
//! | maintain | below -tolerance              | +maintenance step |
//!
//! Anything inside the tolerance band leaves the target unchanged. Macro grams
//! are recomputed from the new target with the caller's existing ratios.
//! Weigh-ins taken more or less than one period apart are rescaled to a
//! per-period change before any comparison.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{ensure_in_range, ensure_positive, InputError, Result};
use crate::goals::GoalCalculator;
use crate::models::{
    AdjustmentReason, CheckInObservation, CheckInResult, Gender, GoalDirection, GoalSpec,
    MacroRatioSet,
};
use crate::policy::{CheckInFloorPolicy, NutritionPolicy};
use crate::units::{days_between, round_half_up, round_tenth};

/// Weekly check-in engine
#[derive(Debug, Clone, Default)]
pub struct CheckInEngine {
    goals: GoalCalculator,
}

impl CheckInEngine {
    /// Create engine with the default policy table
    pub fn new() -> Self {
        CheckInEngine {
            goals: GoalCalculator::new(),
        }
    }

    /// Create engine with a custom policy table
    pub fn with_policy(policy: NutritionPolicy) -> Self {
        CheckInEngine {
            goals: GoalCalculator::with_policy(policy),
        }
    }

    pub fn policy(&self) -> &NutritionPolicy {
        self.goals.policy()
    }

    /// Actual expenditure implied by intake and weight change over `period_days`
    pub fn calculate_true_tdee(
        &self,
        avg_daily_calories: Decimal,
        weight_change_lbs: Decimal,
        period_days: u32,
    ) -> Result<Decimal> {
        ensure_positive("avg_daily_calories", avg_daily_calories)?;
        if period_days == 0 {
            return Err(InputError::non_positive("period_days", Decimal::ZERO).into());
        }

        let stored_per_day = ensure_in_range(
            "stored energy per day",
            weight_change_lbs
                .checked_mul(self.policy().energy.kcal_per_pound)
                .map(|stored| stored / Decimal::from(period_days)),
        )?;
        let true_tdee = ensure_in_range(
            "true TDEE",
            avg_daily_calories.checked_sub(stored_per_day),
        )?;
        Ok(round_half_up(true_tdee))
    }

    /// Run one check-in and produce the adjusted targets
    pub fn perform_weekly_check_in(
        &self,
        observation: &CheckInObservation,
        goal: &GoalSpec,
        current_daily_target: Decimal,
        ratios: &MacroRatioSet,
        gender: Gender,
        now: DateTime<Utc>,
    ) -> Result<CheckInResult> {
        observation.validate()?;
        goal.validate()?;
        ensure_positive("current_daily_target", current_daily_target)?;

        let check_in = &self.policy().check_in;
        let actual = observation.actual_change()?;
        let expected = self.goals.required_weekly_change(
            observation.previous_weight_lbs,
            goal.target_weight_lbs,
            goal.target_date,
            now,
        )?;
        let true_tdee = self.calculate_true_tdee(
            observation.avg_daily_calories,
            actual,
            observation.period_days,
        )?;

        let (reason, adjustment) = self.decide(expected, actual);
        let adjusted = ensure_in_range(
            "adjusted daily calories",
            current_daily_target.checked_add(adjustment),
        )?;

        let floor = self.policy().calorie_floors.floor(gender);
        let floor_applied =
            check_in.floor_policy == CheckInFloorPolicy::Reapply && adjusted < floor;
        let new_daily_calories = if floor_applied {
            warn!(adjusted = %adjusted, floor = %floor, "Check-in target raised to safety floor");
            floor
        } else {
            adjusted
        };

        let grams = self.goals.calculate_macro_grams(new_daily_calories, ratios)?;

        info!(
            expected = %expected,
            actual = %actual,
            true_tdee = %true_tdee,
            previous = %current_daily_target,
            new = %new_daily_calories,
            ?reason,
            "Weekly check-in completed"
        );

        Ok(CheckInResult {
            calculated_true_tdee: true_tdee,
            expected_weekly_change_lbs: expected,
            actual_weekly_change_lbs: actual,
            previous_daily_calories: current_daily_target,
            new_daily_calories,
            reason,
            adjustment_reason: describe(reason, expected, actual, adjustment.abs()),
            new_protein_grams: grams.protein_grams,
            new_carbs_grams: grams.carbs_grams,
            new_fat_grams: grams.fat_grams,
            floor_policy: check_in.floor_policy,
            floor_applied,
        })
    }

    /// Pick the decision-table branch and calorie adjustment
    fn decide(&self, expected: Decimal, actual: Decimal) -> (AdjustmentReason, Decimal) {
        let check_in = &self.policy().check_in;
        let tolerance = check_in.tolerance_lbs;
        let step = check_in.directional_step_kcal;

        match GoalDirection::from_weekly_change(expected) {
            GoalDirection::Lose => {
                if actual > expected + tolerance {
                    (AdjustmentReason::LostLessThanExpected, -step)
                } else if actual < expected - tolerance {
                    (AdjustmentReason::LostMoreThanExpected, step)
                } else {
                    (AdjustmentReason::OnTrackLosing, Decimal::ZERO)
                }
            }
            GoalDirection::Gain => {
                if actual < expected - tolerance {
                    (AdjustmentReason::GainedLessThanExpected, step)
                } else if actual > expected + tolerance {
                    (AdjustmentReason::GainedMoreThanExpected, -step)
                } else {
                    (AdjustmentReason::OnTrackGaining, Decimal::ZERO)
                }
            }
            GoalDirection::Maintain => {
                let step = check_in.maintenance_step_kcal;
                if actual.abs() <= tolerance {
                    (AdjustmentReason::MaintainingWeight, Decimal::ZERO)
                } else if actual > Decimal::ZERO {
                    (AdjustmentReason::WeightIncreasedSlightly, -step)
                } else {
                    (AdjustmentReason::WeightDecreasedSlightly, step)
                }
            }
        }
    }

    /// True when no check-in has happened yet or the interval has elapsed
    pub fn is_check_in_available(
        &self,
        last_check_in: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        match last_check_in {
            None => true,
            Some(last) => days_between(last, now) >= self.policy().check_in.interval_days,
        }
    }

    /// Days until the next check-in opens; zero when one is available now
    pub fn days_until_check_in(
        &self,
        last_check_in: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> i64 {
        match last_check_in {
            Some(last) if !self.is_check_in_available(last_check_in, now) => {
                let interval = self.policy().check_in.interval_days;
                (interval - days_between(last, now)).clamp(0, interval.max(0))
            }
            _ => 0,
        }
    }
}

fn signed(value: Decimal) -> String {
    let value = round_tenth(value);
    if value > Decimal::ZERO {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}

fn describe(
    reason: AdjustmentReason,
    expected: Decimal,
    actual: Decimal,
    step: Decimal,
) -> String {
    let observed = format!("{} lbs vs {} lbs expected", signed(actual), signed(expected));
    match reason {
        AdjustmentReason::LostLessThanExpected => format!(
            "You lost less than expected this week ({}). Daily calories reduced by {}.",
            observed, step
        ),
        AdjustmentReason::LostMoreThanExpected => format!(
            "You lost more than expected this week ({}). Daily calories increased by {} to keep the pace sustainable.",
            observed, step
        ),
        AdjustmentReason::OnTrackLosing => format!(
            "You're on track with your weight loss ({}). Daily calories unchanged.",
            observed
        ),
        AdjustmentReason::GainedLessThanExpected => format!(
            "You gained less than expected this week ({}). Daily calories increased by {}.",
            observed, step
        ),
        AdjustmentReason::GainedMoreThanExpected => format!(
            "You gained more than expected this week ({}). Daily calories reduced by {} to limit fat gain.",
            observed, step
        ),
        AdjustmentReason::OnTrackGaining => format!(
            "You're on track with your weight gain ({}). Daily calories unchanged.",
            observed
        ),
        AdjustmentReason::WeightIncreasedSlightly => format!(
            "Your weight increased slightly ({} lbs). Daily calories reduced by {}.",
            signed(actual),
            step
        ),
        AdjustmentReason::WeightDecreasedSlightly => format!(
            "Your weight decreased slightly ({} lbs). Daily calories increased by {}.",
            signed(actual),
            step
        ),
        AdjustmentReason::MaintainingWeight => {
            "You're maintaining your weight. Daily calories unchanged.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NutritionError;
    use chrono::{Duration, NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
    }

    fn days_from_now(days: i64) -> NaiveDate {
        (now() + Duration::days(days)).date_naive()
    }

    fn balanced() -> MacroRatioSet {
        MacroRatioSet::new(dec!(0.30), dec!(0.35), dec!(0.35))
    }

    /// 200 -> 190 lbs over ten weeks: -1 lb/week
    fn losing_goal() -> GoalSpec {
        GoalSpec {
            current_weight_lbs: dec!(200),
            target_weight_lbs: dec!(190),
            target_date: days_from_now(70),
        }
    }

    /// 150 -> 155 lbs over ten weeks: +0.5 lb/week
    fn gaining_goal() -> GoalSpec {
        GoalSpec {
            current_weight_lbs: dec!(150),
            target_weight_lbs: dec!(155),
            target_date: days_from_now(70),
        }
    }

    fn maintenance_goal() -> GoalSpec {
        GoalSpec {
            current_weight_lbs: dec!(160),
            target_weight_lbs: dec!(160),
            target_date: days_from_now(70),
        }
    }

    fn check_in(
        goal: &GoalSpec,
        previous: Decimal,
        current: Decimal,
        avg_calories: Decimal,
        target: Decimal,
    ) -> CheckInResult {
        CheckInEngine::new()
            .perform_weekly_check_in(
                &CheckInObservation::weekly(previous, current, avg_calories),
                goal,
                target,
                &balanced(),
                Gender::Male,
                now(),
            )
            .unwrap()
    }

    #[test]
    fn test_true_tdee_symmetry() {
        let engine = CheckInEngine::new();
        assert_eq!(
            engine.calculate_true_tdee(dec!(2000), dec!(-1), 7).unwrap(),
            dec!(2500)
        );
        assert_eq!(
            engine.calculate_true_tdee(dec!(3000), dec!(1), 7).unwrap(),
            dec!(2500)
        );
        assert_eq!(
            engine.calculate_true_tdee(dec!(2200), dec!(0), 7).unwrap(),
            dec!(2200)
        );
    }

    #[test]
    fn test_true_tdee_other_periods() {
        let engine = CheckInEngine::new();
        // 2 lbs over 14 days is 500 kcal/day
        assert_eq!(
            engine.calculate_true_tdee(dec!(2000), dec!(-2), 14).unwrap(),
            dec!(2500)
        );
        assert!(matches!(
            engine.calculate_true_tdee(dec!(2000), dec!(-1), 0),
            Err(NutritionError::InvalidInput(_))
        ));
        assert!(engine.calculate_true_tdee(dec!(0), dec!(-1), 7).is_err());
    }

    #[test]
    fn test_lost_less_than_expected() {
        let result = check_in(&losing_goal(), dec!(200), dec!(200), dec!(2000), dec!(2000));
        assert_eq!(result.expected_weekly_change_lbs, dec!(-1));
        assert_eq!(result.actual_weekly_change_lbs, dec!(0));
        assert_eq!(result.calculated_true_tdee, dec!(2000));
        assert_eq!(result.new_daily_calories, dec!(1900));
        assert_eq!(result.reason, AdjustmentReason::LostLessThanExpected);
        assert!(result.adjustment_reason.contains("less than expected"));
        assert_eq!(result.calorie_change(), dec!(-100));
    }

    #[test]
    fn test_lost_more_than_expected() {
        let result = check_in(&losing_goal(), dec!(200), dec!(197), dec!(1800), dec!(2000));
        assert_eq!(result.calculated_true_tdee, dec!(3300));
        assert_eq!(result.new_daily_calories, dec!(2100));
        assert_eq!(result.reason, AdjustmentReason::LostMoreThanExpected);
        assert!(result.adjustment_reason.contains("more than expected"));
    }

    #[test]
    fn test_on_track_loss() {
        let result = check_in(&losing_goal(), dec!(200), dec!(199), dec!(2000), dec!(2000));
        assert_eq!(result.new_daily_calories, dec!(2000));
        assert_eq!(result.reason, AdjustmentReason::OnTrackLosing);
        assert!(result.adjustment_reason.contains("on track"));
    }

    #[test]
    fn test_tolerance_band_is_inclusive() {
        // -0.8 is exactly expected + tolerance
        let result = check_in(&losing_goal(), dec!(200), dec!(199.2), dec!(2000), dec!(2000));
        assert_eq!(result.reason, AdjustmentReason::OnTrackLosing);

        let result = check_in(&losing_goal(), dec!(200), dec!(199.3), dec!(2000), dec!(2000));
        assert_eq!(result.reason, AdjustmentReason::LostLessThanExpected);

        let result = check_in(&losing_goal(), dec!(200), dec!(198.8), dec!(2000), dec!(2000));
        assert_eq!(result.reason, AdjustmentReason::OnTrackLosing);

        let result = check_in(&losing_goal(), dec!(200), dec!(198.7), dec!(2000), dec!(2000));
        assert_eq!(result.reason, AdjustmentReason::LostMoreThanExpected);
    }

    #[test]
    fn test_gain_regime() {
        let goal = gaining_goal();

        let slow = check_in(&goal, dec!(150), dec!(150), dec!(2800), dec!(2800));
        assert_eq!(slow.expected_weekly_change_lbs, dec!(0.5));
        assert_eq!(slow.reason, AdjustmentReason::GainedLessThanExpected);
        assert_eq!(slow.new_daily_calories, dec!(2900));

        let fast = check_in(&goal, dec!(150), dec!(151.5), dec!(2800), dec!(2800));
        assert_eq!(fast.reason, AdjustmentReason::GainedMoreThanExpected);
        assert_eq!(fast.new_daily_calories, dec!(2700));
        assert!(fast.adjustment_reason.contains("gained more than expected"));

        let on_track = check_in(&goal, dec!(150), dec!(150.6), dec!(2800), dec!(2800));
        assert_eq!(on_track.reason, AdjustmentReason::OnTrackGaining);
        assert_eq!(on_track.new_daily_calories, dec!(2800));
    }

    #[test]
    fn test_maintenance_regime() {
        let goal = maintenance_goal();

        let up = check_in(&goal, dec!(160), dec!(160.5), dec!(2300), dec!(2300));
        assert_eq!(up.reason, AdjustmentReason::WeightIncreasedSlightly);
        assert_eq!(up.new_daily_calories, dec!(2250));
        assert!(up.adjustment_reason.contains("+0.5 lbs"));

        let down = check_in(&goal, dec!(160), dec!(159.5), dec!(2300), dec!(2300));
        assert_eq!(down.reason, AdjustmentReason::WeightDecreasedSlightly);
        assert_eq!(down.new_daily_calories, dec!(2350));

        let steady = check_in(&goal, dec!(160), dec!(160.2), dec!(2300), dec!(2300));
        assert_eq!(steady.reason, AdjustmentReason::MaintainingWeight);
        assert_eq!(steady.new_daily_calories, dec!(2300));
    }

    #[test]
    fn test_past_target_date_falls_back_to_maintenance() {
        let goal = GoalSpec {
            target_date: days_from_now(-3),
            ..losing_goal()
        };
        let result = check_in(&goal, dec!(195), dec!(194), dec!(2000), dec!(2000));
        assert_eq!(result.expected_weekly_change_lbs, Decimal::ZERO);
        assert_eq!(result.reason, AdjustmentReason::WeightDecreasedSlightly);
    }

    #[test]
    fn test_macros_recomputed_from_new_target() {
        let result = check_in(&losing_goal(), dec!(200), dec!(200), dec!(2000), dec!(2000));
        assert_eq!(result.new_protein_grams, dec!(143));
        assert_eq!(result.new_carbs_grams, dec!(166));
        assert_eq!(result.new_fat_grams, dec!(74));
        assert_eq!(result.macro_targets().daily_calories, dec!(1900));
    }

    #[test]
    fn test_floor_ignored_by_default() {
        let result = check_in(&losing_goal(), dec!(200), dec!(200), dec!(1550), dec!(1550));
        assert_eq!(result.new_daily_calories, dec!(1450));
        assert_eq!(result.floor_policy, CheckInFloorPolicy::Ignore);
        assert!(!result.floor_applied);
    }

    #[test]
    fn test_floor_reapplied_when_configured() {
        let engine = CheckInEngine::with_policy(NutritionPolicy::default().with_floor_reapplied());
        let result = engine
            .perform_weekly_check_in(
                &CheckInObservation::weekly(dec!(200), dec!(200), dec!(1550)),
                &losing_goal(),
                dec!(1550),
                &balanced(),
                Gender::Male,
                now(),
            )
            .unwrap();
        assert_eq!(result.new_daily_calories, dec!(1500));
        assert_eq!(result.floor_policy, CheckInFloorPolicy::Reapply);
        assert!(result.floor_applied);
    }

    #[test]
    fn test_rejects_invalid_observation() {
        let engine = CheckInEngine::new();
        let observation = CheckInObservation::weekly(dec!(200), dec!(-1), dec!(2000));
        assert!(matches!(
            engine.perform_weekly_check_in(
                &observation,
                &losing_goal(),
                dec!(2000),
                &balanced(),
                Gender::Male,
                now()
            ),
            Err(NutritionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_check_in_availability() {
        let engine = CheckInEngine::new();
        assert!(engine.is_check_in_available(None, now()));
        assert_eq!(engine.days_until_check_in(None, now()), 0);

        let three_days_ago = now() - Duration::days(3);
        assert!(!engine.is_check_in_available(Some(three_days_ago), now()));
        assert_eq!(engine.days_until_check_in(Some(three_days_ago), now()), 4);

        let week_ago = now() - Duration::days(7);
        assert!(engine.is_check_in_available(Some(week_ago), now()));
        assert_eq!(engine.days_until_check_in(Some(week_ago), now()), 0);

        let long_ago = now() - Duration::days(30);
        assert_eq!(engine.days_until_check_in(Some(long_ago), now()), 0);
    }

    #[test]
    fn test_check_in_availability_rounds_partial_days() {
        let engine = CheckInEngine::new();
        let almost_week = now() - Duration::days(6) - Duration::hours(13);
        assert!(engine.is_check_in_available(Some(almost_week), now()));

        let six_days = now() - Duration::days(6) - Duration::hours(11);
        assert!(!engine.is_check_in_available(Some(six_days), now()));
        assert_eq!(engine.days_until_check_in(Some(six_days), now()), 1);
    }

    #[test]
    fn test_future_last_check_in_waits_at_most_one_interval() {
        let engine = CheckInEngine::new();
        let skewed = now() + Duration::days(3);
        assert!(!engine.is_check_in_available(Some(skewed), now()));
        assert_eq!(engine.days_until_check_in(Some(skewed), now()), 7);
    }

    #[test]
    fn test_weigh_ins_four_weeks_apart_are_scaled_to_one_week() {
        let observation = CheckInObservation {
            weigh_in_days: Some(28),
            ..CheckInObservation::weekly(dec!(200), dec!(196), dec!(2000))
        };
        let result = CheckInEngine::new()
            .perform_weekly_check_in(
                &observation,
                &losing_goal(),
                dec!(2000),
                &balanced(),
                Gender::Male,
                now(),
            )
            .unwrap();

        assert_eq!(result.actual_weekly_change_lbs, dec!(-1));
        assert_eq!(result.expected_weekly_change_lbs, dec!(-1));
        assert_eq!(result.calculated_true_tdee, dec!(2500));
        assert_eq!(result.reason, AdjustmentReason::OnTrackLosing);
        assert_eq!(result.new_daily_calories, dec!(2000));
    }

    #[test]
    fn test_out_of_range_values_are_errors() {
        let engine = CheckInEngine::new();
        assert!(matches!(
            engine.calculate_true_tdee(Decimal::MAX, dec!(-1), 7),
            Err(NutritionError::InvalidInput(InputError::OutOfRange { .. }))
        ));
        assert!(matches!(
            engine.calculate_true_tdee(dec!(2000), Decimal::MAX, 7),
            Err(NutritionError::InvalidInput(InputError::OutOfRange { .. }))
        ));

        // Lost more than expected pushes the target up by 100
        let result = engine.perform_weekly_check_in(
            &CheckInObservation::weekly(dec!(200), dec!(197), dec!(1800)),
            &losing_goal(),
            Decimal::MAX,
            &balanced(),
            Gender::Male,
            now(),
        );
        assert!(matches!(
            result,
            Err(NutritionError::InvalidInput(InputError::OutOfRange { .. }))
        ));
    }
}
