//! Immutable constants table driving every calculation
//!
//! Activity multipliers, macro presets, calorie floors, safety thresholds and
//! check-in adjustment steps all live here so the engines can be exercised
//! against alternate safety policies. `NutritionPolicy::default()` carries the
//! standard values.

use crate::error::{NutritionError, Result};
use crate::models::{ActivityLevel, Gender, MacroPreference, MacroRatioSet};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Allowed deviation of a preset's ratio sum from 1.0
pub const PRESET_SUM_TOLERANCE: Decimal = dec!(0.01);

/// Complete policy table injected into the engines
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionPolicy {
    #[serde(default)]
    pub energy: EnergyConstants,

    #[serde(default)]
    pub activity_multipliers: ActivityMultipliers,

    #[serde(default)]
    pub macro_presets: MacroPresets,

    #[serde(default)]
    pub calorie_floors: CalorieFloors,

    #[serde(default)]
    pub safety: SafetyThresholds,

    #[serde(default)]
    pub check_in: CheckInPolicy,
}

/// Mifflin-St Jeor coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmrCoefficients {
    pub weight_coef: Decimal,
    pub height_coef: Decimal,
    pub age_coef: Decimal,
    pub male_offset: Decimal,
    pub female_offset: Decimal,

    /// Mean of the male and female offsets
    pub other_offset: Decimal,
}

impl Default for BmrCoefficients {
    fn default() -> Self {
        BmrCoefficients {
            weight_coef: dec!(10),
            height_coef: dec!(6.25),
            age_coef: dec!(5),
            male_offset: dec!(5),
            female_offset: dec!(-161),
            other_offset: dec!(-78),
        }
    }
}

impl BmrCoefficients {
    pub fn offset(&self, gender: Gender) -> Decimal {
        match gender {
            Gender::Male => self.male_offset,
            Gender::Female => self.female_offset,
            Gender::Other => self.other_offset,
        }
    }
}

/// Energy conversion constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyConstants {
    /// Stored energy in one pound of body weight
    pub kcal_per_pound: Decimal,
    pub protein_kcal_per_gram: Decimal,
    pub carbs_kcal_per_gram: Decimal,
    pub fat_kcal_per_gram: Decimal,
    #[serde(default)]
    pub bmr: BmrCoefficients,
}

impl Default for EnergyConstants {
    fn default() -> Self {
        EnergyConstants {
            kcal_per_pound: dec!(3500),
            protein_kcal_per_gram: dec!(4),
            carbs_kcal_per_gram: dec!(4),
            fat_kcal_per_gram: dec!(9),
            bmr: BmrCoefficients::default(),
        }
    }
}

/// TDEE multipliers per activity level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMultipliers {
    pub sedentary: Decimal,
    pub light: Decimal,
    pub moderate: Decimal,
    pub active: Decimal,
    pub very_active: Decimal,
}

impl Default for ActivityMultipliers {
    fn default() -> Self {
        ActivityMultipliers {
            sedentary: dec!(1.2),
            light: dec!(1.375),
            moderate: dec!(1.55),
            active: dec!(1.725),
            very_active: dec!(1.9),
        }
    }
}

impl ActivityMultipliers {
    pub fn multiplier(&self, level: ActivityLevel) -> Decimal {
        match level {
            ActivityLevel::Sedentary => self.sedentary,
            ActivityLevel::Light => self.light,
            ActivityLevel::Moderate => self.moderate,
            ActivityLevel::Active => self.active,
            ActivityLevel::VeryActive => self.very_active,
        }
    }
}

/// Fixed macro splits by preference name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroPresets {
    pub balanced: MacroRatioSet,
    pub high_protein: MacroRatioSet,
    pub low_carb: MacroRatioSet,
    pub keto: MacroRatioSet,
}

impl Default for MacroPresets {
    fn default() -> Self {
        MacroPresets {
            balanced: MacroRatioSet::new(dec!(0.30), dec!(0.35), dec!(0.35)),
            high_protein: MacroRatioSet::new(dec!(0.40), dec!(0.30), dec!(0.30)),
            low_carb: MacroRatioSet::new(dec!(0.35), dec!(0.20), dec!(0.45)),
            keto: MacroRatioSet::new(dec!(0.30), dec!(0.05), dec!(0.65)),
        }
    }
}

impl MacroPresets {
    /// Ratios for a named preset; `None` for `Manual`
    pub fn ratios(&self, preference: MacroPreference) -> Option<MacroRatioSet> {
        match preference {
            MacroPreference::Balanced => Some(self.balanced),
            MacroPreference::HighProtein => Some(self.high_protein),
            MacroPreference::LowCarb => Some(self.low_carb),
            MacroPreference::Keto => Some(self.keto),
            MacroPreference::Manual => None,
        }
    }
}

/// Minimum daily calories by gender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieFloors {
    pub male: Decimal,
    pub female: Decimal,
    pub other: Decimal,
}

impl Default for CalorieFloors {
    fn default() -> Self {
        CalorieFloors {
            male: dec!(1500),
            female: dec!(1200),
            other: dec!(1200),
        }
    }
}

impl CalorieFloors {
    pub fn floor(&self, gender: Gender) -> Decimal {
        match gender {
            Gender::Male => self.male,
            Gender::Female => self.female,
            Gender::Other => self.other,
        }
    }
}

/// Weekly rate thresholds in lbs/week, compared against the magnitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyThresholds {
    pub loss_safe_max: Decimal,
    pub loss_realistic_max: Decimal,
    pub gain_safe_max: Decimal,
    pub gain_realistic_max: Decimal,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        SafetyThresholds {
            loss_safe_max: dec!(2),
            loss_realistic_max: dec!(3),
            gain_safe_max: dec!(1),
            gain_realistic_max: dec!(1.5),
        }
    }
}

/// Whether a weekly adjustment re-clamps to the gender floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInFloorPolicy {
    /// Trust the floor applied at onboarding; adjustments may go below it
    #[default]
    Ignore,
    /// Clamp every adjusted target up to the gender floor
    Reapply,
}

/// Weekly check-in parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInPolicy {
    pub interval_days: i64,

    /// Deviation from the expected change (lbs) still counted as on track
    pub tolerance_lbs: Decimal,

    /// Adjustment when losing or gaining off pace
    pub directional_step_kcal: Decimal,

    /// Adjustment when drifting during maintenance
    pub maintenance_step_kcal: Decimal,

    #[serde(default)]
    pub floor_policy: CheckInFloorPolicy,
}

impl Default for CheckInPolicy {
    fn default() -> Self {
        CheckInPolicy {
            interval_days: 7,
            tolerance_lbs: dec!(0.2),
            directional_step_kcal: dec!(100),
            maintenance_step_kcal: dec!(50),
            floor_policy: CheckInFloorPolicy::Ignore,
        }
    }
}

impl NutritionPolicy {
    /// Policy with the check-in floor reapplied on every adjustment
    pub fn with_floor_reapplied(mut self) -> Self {
        self.check_in.floor_policy = CheckInFloorPolicy::Reapply;
        self
    }

    /// Reject tables that would produce meaningless targets
    pub fn validate(&self) -> Result<()> {
        for level in ActivityLevel::ALL {
            if self.activity_multipliers.multiplier(level) <= Decimal::ZERO {
                return Err(NutritionError::Configuration(format!(
                    "activity multiplier for {} must be positive",
                    level
                )));
            }
        }

        for preference in MacroPreference::PRESETS {
            if let Some(ratios) = self.macro_presets.ratios(preference) {
                let within_tolerance = ratios
                    .checked_sum()
                    .and_then(|sum| sum.checked_sub(Decimal::ONE))
                    .is_some_and(|deviation| deviation.abs() <= PRESET_SUM_TOLERANCE);
                if !within_tolerance || ratios.normalized().is_err() {
                    return Err(NutritionError::Configuration(format!(
                        "macro preset {} must hold non-negative ratios summing to 1.0",
                        preference
                    )));
                }
            }
        }

        let energy = &self.energy;
        if energy.kcal_per_pound <= Decimal::ZERO
            || energy.protein_kcal_per_gram <= Decimal::ZERO
            || energy.carbs_kcal_per_gram <= Decimal::ZERO
            || energy.fat_kcal_per_gram <= Decimal::ZERO
        {
            return Err(NutritionError::Configuration(
                "energy constants must be positive".to_string(),
            ));
        }

        let safety = &self.safety;
        if safety.loss_safe_max < Decimal::ZERO
            || safety.loss_safe_max > safety.loss_realistic_max
            || safety.gain_safe_max < Decimal::ZERO
            || safety.gain_safe_max > safety.gain_realistic_max
        {
            return Err(NutritionError::Configuration(
                "safe thresholds must be non-negative and not exceed realistic thresholds"
                    .to_string(),
            ));
        }

        if self.check_in.interval_days <= 0 || self.check_in.tolerance_lbs < Decimal::ZERO {
            return Err(NutritionError::Configuration(
                "check-in interval must be positive and tolerance non-negative".to_string(),
            ));
        }

        Ok(())
    }
}
