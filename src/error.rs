//! Unified error hierarchy for NutriCoach
//!
//! Every calculation either returns a complete, internally consistent result
//! or fails with one of these errors. Calorie floor clamps are not errors;
//! they are recorded on the result types instead.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level error type for all NutriCoach operations
#[derive(Debug, Error)]
pub enum NutritionError {
    /// Caller supplied a value outside the domain of the calculation
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// Not enough logged data to build an observation
    #[error("Insufficient data for {calculation}: {reason}")]
    InsufficientData { calculation: String, reason: String },

    /// Weekly check-in requested before the interval elapsed
    #[error("Check-in not available yet: {days_remaining} day(s) remaining")]
    CheckInNotAvailable { days_remaining: i64 },

    /// Invalid policy table or configuration file contents
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Input validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    /// A quantity that must be strictly positive was zero or negative
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: String, value: Decimal },

    /// A quantity that must not be negative was negative
    #[error("{field} must not be negative, got {value}")]
    Negative { field: String, value: Decimal },

    /// Date range runs backwards or is empty where a forward duration is required
    #[error("Invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    /// Birth date falls after the date the age is measured at
    #[error("Birth date {birth_date} is after {reference_date}")]
    BirthDateInFuture {
        birth_date: NaiveDate,
        reference_date: NaiveDate,
    },

    /// Intermediate result exceeds the representable range
    #[error("{calculation} is out of range for the supplied values")]
    OutOfRange { calculation: String },

    /// Macro ratio components sum to zero
    #[error("Macro ratios must not sum to zero")]
    ZeroRatioSum,

    /// Unknown enum value for gender, activity level or macro preference
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: String, value: String },

    /// Manual macro preference selected without a ratio set
    #[error("Manual macro preference requires custom ratios")]
    MissingCustomRatios,
}

/// Result type alias for NutriCoach operations
pub type Result<T> = std::result::Result<T, NutritionError>;

impl InputError {
    pub fn non_positive(field: impl Into<String>, value: Decimal) -> Self {
        InputError::NonPositive {
            field: field.into(),
            value,
        }
    }

    pub fn negative(field: impl Into<String>, value: Decimal) -> Self {
        InputError::Negative {
            field: field.into(),
            value,
        }
    }

    pub fn unknown(kind: impl Into<String>, value: impl Into<String>) -> Self {
        InputError::UnknownVariant {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Turn a `checked_*` arithmetic result into an input error on overflow
pub fn ensure_in_range(
    calculation: &str,
    value: Option<Decimal>,
) -> std::result::Result<Decimal, InputError> {
    value.ok_or_else(|| InputError::OutOfRange {
        calculation: calculation.to_string(),
    })
}

/// Reject zero or negative values for quantities such as weight and height
pub fn ensure_positive(field: &str, value: Decimal) -> std::result::Result<Decimal, InputError> {
    if value > Decimal::ZERO {
        Ok(value)
    } else {
        Err(InputError::non_positive(field, value))
    }
}

/// Reject negative values for quantities such as grams or ratio components
pub fn ensure_non_negative(
    field: &str,
    value: Decimal,
) -> std::result::Result<Decimal, InputError> {
    if value >= Decimal::ZERO {
        Ok(value)
    } else {
        Err(InputError::negative(field, value))
    }
}

impl NutritionError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            NutritionError::InvalidInput(_) => ErrorSeverity::Warning,
            NutritionError::CheckInNotAvailable { .. } => ErrorSeverity::Info,
            NutritionError::InsufficientData { .. } => ErrorSeverity::Warning,
            NutritionError::Configuration(_) => ErrorSeverity::Error,
            NutritionError::Io(_) => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            NutritionError::InvalidInput(InputError::InvalidDateRange { .. }) => {
                "Please choose a target date in the future.".to_string()
            }
            NutritionError::InvalidInput(InputError::BirthDateInFuture { .. }) => {
                "Birth date must be on or before today.".to_string()
            }
            NutritionError::InvalidInput(InputError::OutOfRange { .. }) => {
                "One of the values entered is far outside a plausible range.".to_string()
            }
            NutritionError::InvalidInput(InputError::MissingCustomRatios) => {
                "Enter protein, carb and fat percentages to use a manual macro split.".to_string()
            }
            NutritionError::InsufficientData { calculation, .. } => {
                format!(
                    "Not enough logged data to run the {}. Log your food and weight for the week first.",
                    calculation
                )
            }
            NutritionError::CheckInNotAvailable { days_remaining } => {
                format!("Your next check-in is available in {} day(s).", days_remaining)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents the operation
    Error,
    /// Caller input problem, recoverable by correcting input
    Warning,
    /// Informational, expected during normal use
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
