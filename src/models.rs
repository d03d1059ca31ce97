use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ensure_in_range, ensure_non_negative, ensure_positive, InputError};
use crate::policy::CheckInFloorPolicy;

/// Default length of a check-in observation period in days
pub const DEFAULT_PERIOD_DAYS: u32 = 7;

/// Gender used for BMR offsets and calorie floors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(InputError::unknown("gender", s)),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Habitual activity level, each mapped to a TDEE multiplier by the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Active,
        ActivityLevel::VeryActive,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Little or no exercise",
            ActivityLevel::Light => "Light exercise 1-3 days/week",
            ActivityLevel::Moderate => "Moderate exercise 3-5 days/week",
            ActivityLevel::Active => "Hard exercise 6-7 days/week",
            ActivityLevel::VeryActive => "Very hard exercise or a physical job",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "active" => Ok(ActivityLevel::Active),
            "very_active" => Ok(ActivityLevel::VeryActive),
            _ => Err(InputError::unknown("activity level", s)),
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        };
        write!(f, "{}", name)
    }
}

/// Named macro split, or a manual split supplied by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroPreference {
    Balanced,
    HighProtein,
    LowCarb,
    Keto,
    Manual,
}

impl MacroPreference {
    pub const PRESETS: [MacroPreference; 4] = [
        MacroPreference::Balanced,
        MacroPreference::HighProtein,
        MacroPreference::LowCarb,
        MacroPreference::Keto,
    ];
}

impl FromStr for MacroPreference {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "balanced" => Ok(MacroPreference::Balanced),
            "high_protein" => Ok(MacroPreference::HighProtein),
            "low_carb" => Ok(MacroPreference::LowCarb),
            "keto" => Ok(MacroPreference::Keto),
            "manual" => Ok(MacroPreference::Manual),
            _ => Err(InputError::unknown("macro preference", s)),
        }
    }
}

impl fmt::Display for MacroPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MacroPreference::Balanced => "balanced",
            MacroPreference::HighProtein => "high_protein",
            MacroPreference::LowCarb => "low_carb",
            MacroPreference::Keto => "keto",
            MacroPreference::Manual => "manual",
        };
        write!(f, "{}", name)
    }
}

/// Body statistics used as BMR input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyProfile {
    pub gender: Gender,

    /// Body weight in kilograms
    pub weight_kg: Decimal,

    /// Height in centimeters
    pub height_cm: Decimal,

    /// Age in whole years
    pub age_years: u32,
}

impl BodyProfile {
    /// Build a validated profile
    pub fn new(
        gender: Gender,
        weight_kg: Decimal,
        height_cm: Decimal,
        age_years: u32,
    ) -> Result<Self, InputError> {
        let profile = BodyProfile {
            gender,
            weight_kg,
            height_cm,
            age_years,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        ensure_positive("weight_kg", self.weight_kg)?;
        ensure_positive("height_cm", self.height_cm)?;
        Ok(())
    }
}

/// Protein / carbs / fat fractions of daily calories.
///
/// Components need not sum to one; they are normalized before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroRatioSet {
    pub protein: Decimal,
    pub carbs: Decimal,
    pub fat: Decimal,
}

impl MacroRatioSet {
    pub fn new(protein: Decimal, carbs: Decimal, fat: Decimal) -> Self {
        MacroRatioSet {
            protein,
            carbs,
            fat,
        }
    }

    /// Component sum; `None` when it exceeds the `Decimal` range
    pub fn checked_sum(&self) -> Option<Decimal> {
        self.protein
            .checked_add(self.carbs)
            .and_then(|sum| sum.checked_add(self.fat))
    }

    /// Scale the components so they sum to one
    pub fn normalized(&self) -> Result<MacroRatioSet, InputError> {
        ensure_non_negative("protein ratio", self.protein)?;
        ensure_non_negative("carbs ratio", self.carbs)?;
        ensure_non_negative("fat ratio", self.fat)?;

        let sum = ensure_in_range("macro ratio sum", self.checked_sum())?;
        if sum.is_zero() {
            return Err(InputError::ZeroRatioSum);
        }

        Ok(MacroRatioSet {
            protein: self.protein / sum,
            carbs: self.carbs / sum,
            fat: self.fat / sum,
        })
    }
}

/// A weight goal with a deadline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSpec {
    pub current_weight_lbs: Decimal,
    pub target_weight_lbs: Decimal,
    pub target_date: NaiveDate,
}

impl GoalSpec {
    pub fn validate(&self) -> Result<(), InputError> {
        ensure_positive("current_weight_lbs", self.current_weight_lbs)?;
        ensure_positive("target_weight_lbs", self.target_weight_lbs)?;
        Ok(())
    }
}

/// Direction of a weekly weight change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalDirection {
    Lose,
    Gain,
    Maintain,
}

impl GoalDirection {
    pub fn from_weekly_change(weekly_change: Decimal) -> Self {
        if weekly_change < Decimal::ZERO {
            GoalDirection::Lose
        } else if weekly_change > Decimal::ZERO {
            GoalDirection::Gain
        } else {
            GoalDirection::Maintain
        }
    }
}

/// Severity tier of a requested weekly rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyTier {
    Safe,
    /// Achievable but faster than recommended
    Aggressive,
    Unrealistic,
}

/// Outcome of validating a weekly rate against the safety thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSafety {
    pub is_safe: bool,
    pub is_realistic: bool,
    pub tier: SafetyTier,
    pub message: String,
}

/// Daily calorie target derived from TDEE and a weekly rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieTarget {
    pub daily_calories: Decimal,

    /// Weekly change in pounds the target was derived from
    pub weekly_change: Decimal,

    /// Daily deficit (negative) or surplus (positive) in kcal
    pub daily_deficit_surplus: Decimal,

    /// True when the gender floor raised the target above the computed value
    pub floor_applied: bool,
}

/// Gram amounts for the three macronutrients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroGrams {
    pub protein_grams: Decimal,
    pub carbs_grams: Decimal,
    pub fat_grams: Decimal,
}

/// Daily calorie and macro targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub daily_calories: Decimal,
    pub protein_grams: Decimal,
    pub carbs_grams: Decimal,
    pub fat_grams: Decimal,
}

impl MacroTargets {
    pub fn from_grams(daily_calories: Decimal, grams: MacroGrams) -> Self {
        MacroTargets {
            daily_calories,
            protein_grams: grams.protein_grams,
            carbs_grams: grams.carbs_grams,
            fat_grams: grams.fat_grams,
        }
    }
}

/// Observed progress over the last check-in period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInObservation {
    pub previous_weight_lbs: Decimal,
    pub current_weight_lbs: Decimal,
    pub avg_daily_calories: Decimal,

    #[serde(default = "default_period_days")]
    pub period_days: u32,

    /// Days between the two weigh-ins when they are not exactly one period apart
    #[serde(default)]
    pub weigh_in_days: Option<u32>,
}

fn default_period_days() -> u32 {
    DEFAULT_PERIOD_DAYS
}

impl CheckInObservation {
    /// Observation over the default seven-day period
    pub fn weekly(
        previous_weight_lbs: Decimal,
        current_weight_lbs: Decimal,
        avg_daily_calories: Decimal,
    ) -> Self {
        CheckInObservation {
            previous_weight_lbs,
            current_weight_lbs,
            avg_daily_calories,
            period_days: DEFAULT_PERIOD_DAYS,
            weigh_in_days: None,
        }
    }

    /// Weight change over one period.
    ///
    /// The raw change between the two weigh-ins is rescaled to `period_days`
    /// when the weigh-ins were taken further apart or closer together.
    pub fn actual_change(&self) -> Result<Decimal, InputError> {
        let raw = self.current_weight_lbs - self.previous_weight_lbs;
        match self.weigh_in_days {
            Some(span) if span != self.period_days => {
                let scaled = raw
                    .checked_mul(Decimal::from(self.period_days))
                    .map(|total| total / Decimal::from(span));
                ensure_in_range("weekly weight change", scaled)
            }
            _ => Ok(raw),
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        ensure_positive("previous_weight_lbs", self.previous_weight_lbs)?;
        ensure_positive("current_weight_lbs", self.current_weight_lbs)?;
        ensure_positive("avg_daily_calories", self.avg_daily_calories)?;
        if self.period_days == 0 {
            return Err(InputError::non_positive("period_days", Decimal::ZERO));
        }
        if self.weigh_in_days == Some(0) {
            return Err(InputError::non_positive("weigh_in_days", Decimal::ZERO));
        }
        Ok(())
    }
}

/// Which branch of the weekly decision table fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    LostLessThanExpected,
    LostMoreThanExpected,
    OnTrackLosing,
    GainedLessThanExpected,
    GainedMoreThanExpected,
    OnTrackGaining,
    WeightIncreasedSlightly,
    WeightDecreasedSlightly,
    MaintainingWeight,
}

/// Result of one weekly check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInResult {
    pub calculated_true_tdee: Decimal,
    pub expected_weekly_change_lbs: Decimal,
    pub actual_weekly_change_lbs: Decimal,
    pub previous_daily_calories: Decimal,
    pub new_daily_calories: Decimal,
    pub reason: AdjustmentReason,

    /// Display text for the adjustment
    pub adjustment_reason: String,

    pub new_protein_grams: Decimal,
    pub new_carbs_grams: Decimal,
    pub new_fat_grams: Decimal,

    /// Floor policy in force for this check-in
    pub floor_policy: CheckInFloorPolicy,

    /// True when the reapplied floor raised the adjusted target
    pub floor_applied: bool,
}

impl CheckInResult {
    pub fn calorie_change(&self) -> Decimal {
        self.new_daily_calories - self.previous_daily_calories
    }

    pub fn macro_targets(&self) -> MacroTargets {
        MacroTargets {
            daily_calories: self.new_daily_calories,
            protein_grams: self.new_protein_grams,
            carbs_grams: self.new_carbs_grams,
            fat_grams: self.new_fat_grams,
        }
    }
}
