//! Onboarding plans and check-ins driven by a stored goal record
//!
//! The persistence layer hands over a `UserGoalRecord` plus recent diary
//! totals and weigh-ins as plain values. The planner returns new targets,
//! an updated record and an audit entry; storing them is the caller's job.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::checkin::CheckInEngine;
use crate::energy::EnergyCalculator;
use crate::error::{ensure_positive, InputError, NutritionError, Result};
use crate::goals::GoalCalculator;
use crate::models::{
    ActivityLevel, BodyProfile, CalorieTarget, CheckInResult, Gender, GoalSafety, GoalSpec,
    MacroPreference, MacroRatioSet, MacroTargets,
};
use crate::policy::NutritionPolicy;
use crate::progress::{DailyCalorieTotal, ProgressWindow, WeightEntry};
use crate::units::{age_in_years, days_between, pounds_to_kg, start_of_day};

/// Goal and target state stored per user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGoalRecord {
    pub gender: Gender,
    pub height_cm: Decimal,
    pub birth_date: NaiveDate,
    pub activity_level: ActivityLevel,
    pub starting_weight_lbs: Decimal,
    pub current_weight_lbs: Decimal,
    pub target_weight_lbs: Decimal,
    pub target_date: NaiveDate,
    pub macro_preference: MacroPreference,

    /// Ratio triple in use; required for manual preference, set by `apply_plan`
    #[serde(default)]
    pub macro_ratios: Option<MacroRatioSet>,

    #[serde(default)]
    pub current_targets: Option<MacroTargets>,

    #[serde(default)]
    pub last_check_in: Option<DateTime<Utc>>,
}

impl UserGoalRecord {
    pub fn goal(&self) -> GoalSpec {
        GoalSpec {
            current_weight_lbs: self.current_weight_lbs,
            target_weight_lbs: self.target_weight_lbs,
            target_date: self.target_date,
        }
    }

    /// Store the targets and ratios of a freshly computed plan
    pub fn apply_plan(&mut self, plan: &GoalPlan) {
        self.macro_ratios = Some(plan.macro_ratios);
        self.current_targets = Some(plan.macro_targets);
    }

    pub fn validate(&self) -> std::result::Result<(), InputError> {
        ensure_positive("height_cm", self.height_cm)?;
        ensure_positive("starting_weight_lbs", self.starting_weight_lbs)?;
        self.goal().validate()
    }
}

/// Targets computed when a goal is created or edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalPlan {
    pub age_years: u32,
    pub bmr: Decimal,
    pub tdee: Decimal,
    pub weekly_change_lbs: Decimal,
    pub safety: GoalSafety,
    pub calorie_target: CalorieTarget,
    pub macro_ratios: MacroRatioSet,
    pub macro_targets: MacroTargets,
}

/// Audit entry for one check-in, stored verbatim by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub id: Uuid,
    pub checked_in_at: DateTime<Utc>,
    pub previous_daily_calories: Decimal,
    pub new_daily_calories: Decimal,
    pub calculated_tdee: Decimal,
    pub expected_weekly_change_lbs: Decimal,
    pub actual_weekly_change_lbs: Decimal,
    pub reason: String,
    pub floor_applied: bool,
}

impl CheckInRecord {
    pub fn from_result(result: &CheckInResult, checked_in_at: DateTime<Utc>) -> Self {
        CheckInRecord {
            id: Uuid::new_v4(),
            checked_in_at,
            previous_daily_calories: result.previous_daily_calories,
            new_daily_calories: result.new_daily_calories,
            calculated_tdee: result.calculated_true_tdee,
            expected_weekly_change_lbs: result.expected_weekly_change_lbs,
            actual_weekly_change_lbs: result.actual_weekly_change_lbs,
            reason: result.adjustment_reason.clone(),
            floor_applied: result.floor_applied,
        }
    }
}

/// Everything produced by one check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInOutcome {
    pub result: CheckInResult,
    pub record: CheckInRecord,
    pub updated: UserGoalRecord,
}

/// Coordinates the energy, goal and check-in engines over a stored record
#[derive(Debug, Clone, Default)]
pub struct GoalPlanner {
    energy: EnergyCalculator,
    goals: GoalCalculator,
    check_ins: CheckInEngine,
}

impl GoalPlanner {
    /// Create planner with the default policy table
    pub fn new() -> Self {
        Self::with_policy(NutritionPolicy::default())
    }

    /// Create planner with a custom policy table
    pub fn with_policy(policy: NutritionPolicy) -> Self {
        GoalPlanner {
            energy: EnergyCalculator::with_policy(policy.clone()),
            goals: GoalCalculator::with_policy(policy.clone()),
            check_ins: CheckInEngine::with_policy(policy),
        }
    }

    pub fn check_ins(&self) -> &CheckInEngine {
        &self.check_ins
    }

    /// Onboarding plan for a goal that ends in the future
    pub fn plan(&self, record: &UserGoalRecord, now: DateTime<Utc>) -> Result<GoalPlan> {
        record.validate()?;

        if days_between(now, start_of_day(record.target_date)) <= 0 {
            return Err(InputError::InvalidDateRange {
                reason: format!("target date {} is not in the future", record.target_date),
            }
            .into());
        }

        let age_years = age_in_years(record.birth_date, now.date_naive())?;
        let profile = BodyProfile::new(
            record.gender,
            pounds_to_kg(record.current_weight_lbs),
            record.height_cm,
            age_years,
        )?;

        let bmr = self.energy.calculate_bmr(&profile)?;
        let tdee = self.energy.calculate_tdee(&profile, record.activity_level)?;
        let weekly_change_lbs = self.goals.required_weekly_change(
            record.current_weight_lbs,
            record.target_weight_lbs,
            record.target_date,
            now,
        )?;
        let safety = self.goals.validate_goal_safety(weekly_change_lbs);
        let calorie_target =
            self.goals
                .calculate_daily_calorie_target(tdee, weekly_change_lbs, record.gender)?;

        let macro_ratios = self
            .goals
            .resolve_ratios(record.macro_preference, record.macro_ratios.as_ref())?;
        let grams = self
            .goals
            .calculate_macro_grams(calorie_target.daily_calories, &macro_ratios)?;
        let macro_targets = MacroTargets::from_grams(calorie_target.daily_calories, grams);

        info!(
            tdee = %tdee,
            weekly_change = %weekly_change_lbs,
            daily_calories = %macro_targets.daily_calories,
            floor_applied = calorie_target.floor_applied,
            "Created goal plan"
        );

        Ok(GoalPlan {
            age_years,
            bmr,
            tdee,
            weekly_change_lbs,
            safety,
            calorie_target,
            macro_ratios,
            macro_targets,
        })
    }

    /// Run the weekly check-in for a stored record and the latest logs
    pub fn check_in(
        &self,
        record: &UserGoalRecord,
        calories: &[DailyCalorieTotal],
        weights: &[WeightEntry],
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome> {
        if !self.check_ins.is_check_in_available(record.last_check_in, now) {
            return Err(NutritionError::CheckInNotAvailable {
                days_remaining: self.check_ins.days_until_check_in(record.last_check_in, now),
            });
        }

        let targets = record
            .current_targets
            .ok_or_else(|| NutritionError::InsufficientData {
                calculation: "weekly check-in".to_string(),
                reason: "no daily targets set, create a goal plan first".to_string(),
            })?;

        // Ratios persist from the plan even if the preset table changed since
        let ratios = match record.macro_ratios {
            Some(ratios) => ratios,
            None => self.goals.resolve_ratios(record.macro_preference, None)?,
        };

        let interval = self.check_ins.policy().check_in.interval_days;
        let period_days = u32::try_from(interval).map_err(|_| {
            NutritionError::Configuration(format!("invalid check-in interval: {}", interval))
        })?;
        let observation =
            ProgressWindow::new(now.date_naive(), period_days).observation(calories, weights)?;

        let result = self.check_ins.perform_weekly_check_in(
            &observation,
            &record.goal(),
            targets.daily_calories,
            &ratios,
            record.gender,
            now,
        )?;

        let mut updated = record.clone();
        updated.current_weight_lbs = observation.current_weight_lbs;
        updated.macro_ratios = Some(ratios);
        updated.current_targets = Some(result.macro_targets());
        updated.last_check_in = Some(now);

        Ok(CheckInOutcome {
            record: CheckInRecord::from_result(&result, now),
            result,
            updated,
        })
    }
}
