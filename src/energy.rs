//! Energy expenditure estimation
//!
//! BMR uses the Mifflin-St Jeor equation:
//!
//! BMR = 10 x weight_kg + 6.25 x height_cm - 5 x age + offset
//!
//! with offset +5 for men and -161 for women. For `Gender::Other` the offset
//! is the mean of the two (-78). That value is a product heuristic, not a
//! clinical formula, and is kept as such.
//!
//! TDEE is BMR scaled by the activity multiplier and rounded half-up.
//! Profiles that drive either value to zero or below, or past the `Decimal`
//! range, are rejected as invalid input.

use crate::error::{ensure_in_range, ensure_positive, Result};
use crate::models::{ActivityLevel, BodyProfile};
use crate::policy::NutritionPolicy;
use crate::units::round_half_up;
use rust_decimal::Decimal;
use tracing::debug;

/// BMR / TDEE calculation engine
#[derive(Debug, Clone, Default)]
pub struct EnergyCalculator {
    policy: NutritionPolicy,
}

impl EnergyCalculator {
    /// Create calculator with the default policy table
    pub fn new() -> Self {
        EnergyCalculator {
            policy: NutritionPolicy::default(),
        }
    }

    /// Create calculator with a custom policy table
    pub fn with_policy(policy: NutritionPolicy) -> Self {
        EnergyCalculator { policy }
    }

    pub fn policy(&self) -> &NutritionPolicy {
        &self.policy
    }

    /// Basal metabolic rate in kcal/day (unrounded)
    pub fn calculate_bmr(&self, profile: &BodyProfile) -> Result<Decimal> {
        profile.validate()?;

        let coefficients = &self.policy.energy.bmr;
        let weight_term = coefficients.weight_coef.checked_mul(profile.weight_kg);
        let height_term = coefficients.height_coef.checked_mul(profile.height_cm);
        let age_term = coefficients
            .age_coef
            .checked_mul(Decimal::from(profile.age_years));
        let bmr = weight_term
            .zip(height_term)
            .and_then(|(weight, height)| weight.checked_add(height))
            .zip(age_term)
            .and_then(|(base, age)| base.checked_sub(age))
            .and_then(|base| base.checked_add(coefficients.offset(profile.gender)));
        let bmr = ensure_positive("bmr", ensure_in_range("BMR", bmr)?)?;

        debug!(gender = %profile.gender, bmr = %bmr, "Calculated BMR");
        Ok(bmr)
    }

    /// Total daily energy expenditure in kcal/day, rounded to a whole number
    pub fn calculate_tdee(&self, profile: &BodyProfile, level: ActivityLevel) -> Result<Decimal> {
        let bmr = self.calculate_bmr(profile)?;
        let multiplier = self.policy.activity_multipliers.multiplier(level);
        let tdee = round_half_up(ensure_in_range("TDEE", bmr.checked_mul(multiplier))?);
        ensure_positive("tdee", tdee)?;

        debug!(activity = %level, multiplier = %multiplier, tdee = %tdee, "Calculated TDEE");
        Ok(tdee)
    }
}
