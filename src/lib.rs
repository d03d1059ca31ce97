// Library interface for NutriCoach modules
// The binary and integration tests both go through these exports

pub mod checkin;
pub mod config;
pub mod energy;
pub mod error;
pub mod goals;
pub mod logging;
pub mod models;
pub mod planner;
pub mod policy;
pub mod progress;
pub mod units;

// Re-export commonly used types for convenience
pub use models::*;
pub use checkin::CheckInEngine;
pub use energy::EnergyCalculator;
pub use goals::GoalCalculator;
pub use planner::{CheckInOutcome, CheckInRecord, GoalPlan, GoalPlanner, UserGoalRecord};
pub use policy::{CheckInFloorPolicy, NutritionPolicy};
pub use progress::{DailyCalorieTotal, ProgressLog, ProgressWindow, WeightEntry};
pub use config::AppConfig;
pub use error::{InputError, NutritionError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
