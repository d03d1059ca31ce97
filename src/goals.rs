//! Goal-to-target translation
//!
//! Turns a weight goal with a deadline into a weekly rate, grades that rate
//! against the safety thresholds, and derives the daily calorie target and
//! macro grams.
//!
//! Macro grams are rounded independently, so protein x 4 + carbs x 4 + fat x 9
//! can differ from the calorie target by up to 8.5 kcal. That slack is
//! accepted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{ensure_in_range, ensure_positive, InputError, Result};
use crate::models::{
    CalorieTarget, Gender, GoalDirection, GoalSafety, GoalSpec, MacroGrams, MacroPreference,
    MacroRatioSet, MacroTargets, SafetyTier,
};
use crate::policy::NutritionPolicy;
use crate::units::{days_between, round_half_up, round_tenth, start_of_day};

const DAYS_PER_WEEK: i64 = 7;

/// Goal translation engine
#[derive(Debug, Clone, Default)]
pub struct GoalCalculator {
    policy: NutritionPolicy,
}

impl GoalCalculator {
    /// Create calculator with the default policy table
    pub fn new() -> Self {
        GoalCalculator {
            policy: NutritionPolicy::default(),
        }
    }

    /// Create calculator with a custom policy table
    pub fn with_policy(policy: NutritionPolicy) -> Self {
        GoalCalculator { policy }
    }

    pub fn policy(&self) -> &NutritionPolicy {
        &self.policy
    }

    /// Pounds per week needed to reach `target_lbs` by `target_date`.
    ///
    /// Returns zero when the target date is today or already past. Callers
    /// must read that as "no defined rate", not as a maintenance goal.
    pub fn required_weekly_change(
        &self,
        current_lbs: Decimal,
        target_lbs: Decimal,
        target_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        ensure_positive("current_weight_lbs", current_lbs)?;
        ensure_positive("target_weight_lbs", target_lbs)?;

        let days = days_between(now, start_of_day(target_date));
        if days <= 0 {
            debug!(%target_date, days, "Target date not in the future, no weekly rate");
            return Ok(Decimal::ZERO);
        }

        // (target - current) / (days / 7), kept exact by multiplying first
        let weekly_change = ensure_in_range(
            "weekly change",
            (target_lbs - current_lbs)
                .checked_mul(Decimal::from(DAYS_PER_WEEK))
                .map(|total| total / Decimal::from(days)),
        )?;
        debug!(days, weekly_change = %weekly_change, "Required weekly change");
        Ok(weekly_change)
    }

    /// Grade a weekly rate as safe, aggressive or unrealistic
    pub fn validate_goal_safety(&self, weekly_change: Decimal) -> GoalSafety {
        let thresholds = &self.policy.safety;
        let magnitude = weekly_change.abs();
        let shown = round_tenth(magnitude);

        let (tier, message) = match GoalDirection::from_weekly_change(weekly_change) {
            GoalDirection::Maintain => (
                SafetyTier::Safe,
                "Maintaining your current weight is a safe and sustainable goal.".to_string(),
            ),
            GoalDirection::Lose => {
                if magnitude <= thresholds.loss_safe_max {
                    (
                        SafetyTier::Safe,
                        format!("Losing {} lbs per week is a safe, sustainable pace.", shown),
                    )
                } else if magnitude <= thresholds.loss_realistic_max {
                    (
                        SafetyTier::Aggressive,
                        format!(
                            "Losing {} lbs per week is aggressive and may be dangerous to sustain. Consider a later target date.",
                            shown
                        ),
                    )
                } else {
                    (
                        SafetyTier::Unrealistic,
                        format!(
                            "Losing {} lbs per week is unrealistic and potentially dangerous. Choose a later target date or a smaller goal.",
                            shown
                        ),
                    )
                }
            }
            GoalDirection::Gain => {
                if magnitude <= thresholds.gain_safe_max {
                    (
                        SafetyTier::Safe,
                        format!("Gaining {} lbs per week is a safe, sustainable pace.", shown),
                    )
                } else if magnitude <= thresholds.gain_realistic_max {
                    (
                        SafetyTier::Aggressive,
                        format!(
                            "Gaining {} lbs per week is aggressive and likely to add excess fat. Consider a later target date.",
                            shown
                        ),
                    )
                } else {
                    (
                        SafetyTier::Unrealistic,
                        format!(
                            "Gaining {} lbs per week is unrealistic. Choose a later target date or a smaller goal.",
                            shown
                        ),
                    )
                }
            }
        };

        if tier != SafetyTier::Safe {
            warn!(weekly_change = %weekly_change, ?tier, "Goal rate outside safe range");
        }

        GoalSafety {
            is_safe: tier == SafetyTier::Safe,
            is_realistic: tier != SafetyTier::Unrealistic,
            tier,
            message,
        }
    }

    /// Daily calorie target for a weekly rate, clamped up to the gender floor
    pub fn calculate_daily_calorie_target(
        &self,
        tdee: Decimal,
        weekly_change: Decimal,
        gender: Gender,
    ) -> Result<CalorieTarget> {
        ensure_positive("tdee", tdee)?;

        let daily_deficit_surplus = ensure_in_range(
            "daily deficit or surplus",
            weekly_change
                .checked_mul(self.policy.energy.kcal_per_pound)
                .map(|weekly| weekly / Decimal::from(DAYS_PER_WEEK)),
        )?;
        let computed = round_half_up(ensure_in_range(
            "daily calories",
            tdee.checked_add(daily_deficit_surplus),
        )?);
        let floor = self.policy.calorie_floors.floor(gender);

        let floor_applied = computed < floor;
        let daily_calories = if floor_applied {
            warn!(
                computed = %computed,
                floor = %floor,
                %gender,
                "Calorie target raised to safety floor"
            );
            floor
        } else {
            computed
        };

        Ok(CalorieTarget {
            daily_calories,
            weekly_change,
            daily_deficit_surplus,
            floor_applied,
        })
    }

    /// Required rate plus calorie target for a goal in one step
    pub fn translate_goal(
        &self,
        tdee: Decimal,
        goal: &GoalSpec,
        gender: Gender,
        now: DateTime<Utc>,
    ) -> Result<CalorieTarget> {
        goal.validate()?;
        let weekly_change = self.required_weekly_change(
            goal.current_weight_lbs,
            goal.target_weight_lbs,
            goal.target_date,
            now,
        )?;
        self.calculate_daily_calorie_target(tdee, weekly_change, gender)
    }

    /// Convert a calorie target to grams using normalized ratios
    pub fn calculate_macro_grams(
        &self,
        daily_calories: Decimal,
        ratios: &MacroRatioSet,
    ) -> Result<MacroGrams> {
        ensure_positive("daily_calories", daily_calories)?;
        let ratios = ratios.normalized()?;
        let energy = &self.policy.energy;

        let grams = |ratio: Decimal, kcal_per_gram: Decimal| {
            let kcal = ensure_in_range("macro calories", daily_calories.checked_mul(ratio))?;
            ensure_in_range("macro grams", kcal.checked_div(kcal_per_gram)).map(round_half_up)
        };

        Ok(MacroGrams {
            protein_grams: grams(ratios.protein, energy.protein_kcal_per_gram)?,
            carbs_grams: grams(ratios.carbs, energy.carbs_kcal_per_gram)?,
            fat_grams: grams(ratios.fat, energy.fat_kcal_per_gram)?,
        })
    }

    /// Ratios for a preference; manual preferences use `custom_ratios`
    pub fn resolve_ratios(
        &self,
        preference: MacroPreference,
        custom_ratios: Option<&MacroRatioSet>,
    ) -> Result<MacroRatioSet> {
        match self.policy.macro_presets.ratios(preference) {
            Some(ratios) => Ok(ratios),
            None => custom_ratios
                .copied()
                .ok_or_else(|| InputError::MissingCustomRatios.into()),
        }
    }

    /// Calorie and gram targets for a named preference
    pub fn get_macro_targets(
        &self,
        daily_calories: Decimal,
        preference: MacroPreference,
        custom_ratios: Option<&MacroRatioSet>,
    ) -> Result<MacroTargets> {
        let ratios = self.resolve_ratios(preference, custom_ratios)?;
        let grams = self.calculate_macro_grams(daily_calories, &ratios)?;
        Ok(MacroTargets::from_grams(daily_calories, grams))
    }
}
