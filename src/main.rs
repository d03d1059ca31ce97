use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use nutricoach::error::ErrorSeverity;
use nutricoach::logging::init_logging;
use nutricoach::units::pounds_to_kg;
use nutricoach::{
    ActivityLevel, AppConfig, BodyProfile, CheckInOutcome, EnergyCalculator, Gender,
    GoalCalculator, GoalPlan, GoalPlanner, LogLevel, MacroPreference, MacroRatioSet,
    NutritionError, ProgressLog, SafetyTier, UserGoalRecord,
};

/// NutriCoach - Calorie and Macro Coaching CLI
///
/// Turns body statistics and a weight goal into daily calorie and macro
/// targets, then adjusts them from observed weekly progress.
#[derive(Parser)]
#[command(name = "nutricoach")]
#[command(author = "NutriCoach Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Calorie and Macro Coaching CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate BMR and TDEE
    Tdee {
        #[arg(short, long)]
        gender: Gender,

        /// Body weight in pounds
        #[arg(short, long)]
        weight_lbs: Decimal,

        #[arg(long)]
        height_cm: Decimal,

        #[arg(short, long)]
        age: u32,

        /// Activity level (sedentary, light, moderate, active, very_active)
        #[arg(short = 'l', long, default_value = "moderate")]
        activity: ActivityLevel,
    },

    /// Classify a weekly weight change rate
    Safety {
        /// Weekly change in pounds (negative for loss)
        #[arg(allow_hyphen_values = true)]
        weekly_change: Decimal,
    },

    /// Create calorie and macro targets for a goal
    Plan {
        #[arg(short, long)]
        gender: Gender,

        #[arg(long)]
        height_cm: Decimal,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: NaiveDate,

        /// Current weight in pounds
        #[arg(short, long)]
        weight_lbs: Decimal,

        /// Target weight in pounds
        #[arg(short, long)]
        target_lbs: Decimal,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: NaiveDate,

        #[arg(short = 'l', long, default_value = "moderate")]
        activity: ActivityLevel,

        /// Macro split (balanced, high_protein, low_carb, keto, manual)
        #[arg(short, long, default_value = "balanced")]
        macros: MacroPreference,

        /// Protein share for a manual split
        #[arg(long, requires_all = ["carbs", "fat"])]
        protein: Option<Decimal>,

        /// Carbs share for a manual split
        #[arg(long)]
        carbs: Option<Decimal>,

        /// Fat share for a manual split
        #[arg(long)]
        fat: Option<Decimal>,

        /// Store the goal and targets in the config file
        #[arg(short, long)]
        save: bool,
    },

    /// Run the weekly check-in against the stored goal
    CheckIn {
        /// JSON file with `calories` and `weights` arrays
        #[arg(short, long)]
        logs: PathBuf,

        /// Compute the adjustment without saving it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show or initialize the configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,

        /// Print the config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(metric: &str, value: impl ToString) -> Row {
    Row {
        metric: metric.to_string(),
        value: value.to_string(),
    }
}

fn print_table(rows: Vec<Row>) {
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn tier_label(tier: SafetyTier) -> ColoredString {
    match tier {
        SafetyTier::Safe => "safe".green(),
        SafetyTier::Aggressive => "aggressive".yellow(),
        SafetyTier::Unrealistic => "unrealistic".red(),
    }
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);

    let mut config = if config_path.exists() {
        match AppConfig::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{} {:#}", "Error:".red().bold(), err);
                std::process::exit(1);
            }
        }
    } else {
        AppConfig::default()
    };

    let mut log_config = config.logging.clone();
    if cli.verbose > 0 {
        log_config.level = LogLevel::from_verbosity(cli.verbose);
    }
    if let Err(err) = init_logging(&log_config) {
        eprintln!("{} {:#}", "Warning: logging disabled:".yellow(), err);
    }

    if let Err(err) = run(cli, &mut config, &config_path) {
        match err.downcast_ref::<NutritionError>() {
            Some(nutrition_err) => {
                match nutrition_err.severity() {
                    ErrorSeverity::Info => tracing::info!(error = %nutrition_err, "Command rejected"),
                    ErrorSeverity::Warning => tracing::warn!(error = %nutrition_err, "Command rejected"),
                    ErrorSeverity::Error => tracing::error!(error = %nutrition_err, "Command failed"),
                }
                eprintln!("{} {}", "Error:".red().bold(), nutrition_err.user_message());
            }
            None => eprintln!("{} {:#}", "Error:".red().bold(), err),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: &mut AppConfig, config_path: &Path) -> Result<()> {
    match cli.command {
        Commands::Tdee {
            gender,
            weight_lbs,
            height_cm,
            age,
            activity,
        } => {
            let calculator = EnergyCalculator::with_policy(config.policy.clone());
            let profile = BodyProfile::new(gender, pounds_to_kg(weight_lbs), height_cm, age)
                .map_err(NutritionError::from)?;
            let bmr = calculator.calculate_bmr(&profile)?;
            let tdee = calculator.calculate_tdee(&profile, activity)?;

            if cli.json {
                print_json(&serde_json::json!({
                    "bmr": bmr,
                    "tdee": tdee,
                    "activity_level": activity,
                }))?;
            } else {
                println!("{}", "Energy expenditure".blue().bold());
                print_table(vec![
                    row("BMR", format!("{} kcal", bmr.round_dp(1))),
                    row("Activity", activity.description()),
                    row("TDEE", format!("{} kcal", tdee)),
                ]);
            }
        }

        Commands::Safety { weekly_change } => {
            let safety = GoalCalculator::with_policy(config.policy.clone())
                .validate_goal_safety(weekly_change);

            if cli.json {
                print_json(&safety)?;
            } else {
                println!("{} {}", "Rate is".bold(), tier_label(safety.tier));
                println!("{}", safety.message);
            }
        }

        Commands::Plan {
            gender,
            height_cm,
            birth_date,
            weight_lbs,
            target_lbs,
            target_date,
            activity,
            macros,
            protein,
            carbs,
            fat,
            save,
        } => {
            let macro_ratios = match (protein, carbs, fat) {
                (Some(p), Some(c), Some(f)) => Some(MacroRatioSet::new(p, c, f)),
                _ => None,
            };
            let mut record = UserGoalRecord {
                gender,
                height_cm,
                birth_date,
                activity_level: activity,
                starting_weight_lbs: weight_lbs,
                current_weight_lbs: weight_lbs,
                target_weight_lbs: target_lbs,
                target_date,
                macro_preference: macros,
                macro_ratios,
                current_targets: None,
                last_check_in: None,
            };

            let planner = GoalPlanner::with_policy(config.policy.clone());
            let plan = planner.plan(&record, Utc::now())?;

            if cli.json {
                print_json(&plan)?;
            } else {
                show_plan(&plan);
            }

            if save {
                record.apply_plan(&plan);
                config.profile = Some(record);
                config.history.clear();
                config.save_to_file(config_path)?;
                println!("{} {}", "✓ Goal saved to".green(), config_path.display());
            }
        }

        Commands::CheckIn { logs, dry_run } => {
            let Some(record) = config.profile.clone() else {
                bail!("No goal stored yet. Run `nutricoach plan --save` first.");
            };

            let content = fs::read_to_string(&logs)
                .with_context(|| format!("Failed to read logs file: {}", logs.display()))?;
            let progress: ProgressLog = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse logs file: {}", logs.display()))?;

            let planner = GoalPlanner::with_policy(config.policy.clone());
            let outcome =
                planner.check_in(&record, &progress.calories, &progress.weights, Utc::now())?;

            if cli.json {
                print_json(&outcome)?;
            } else {
                show_check_in(&outcome);
            }

            if !dry_run {
                config.record_check_in(outcome.updated, outcome.record);
                config.save_to_file(config_path)?;
            }
        }

        Commands::Config { init, path } => {
            if path {
                println!("{}", config_path.display());
            } else if init {
                if config_path.exists() {
                    println!("{} {}", "Config already exists:".yellow(), config_path.display());
                } else {
                    AppConfig::default().save_to_file(config_path)?;
                    println!("{} {}", "✓ Created".green(), config_path.display());
                }
            } else {
                print!("{}", toml::to_string_pretty(&*config)?);
            }
        }
    }

    Ok(())
}

fn show_plan(plan: &GoalPlan) {
    let target = &plan.calorie_target;
    let macros = &plan.macro_targets;

    println!("{}", "Goal plan".green().bold());
    print_table(vec![
        row("Age", plan.age_years),
        row("BMR", format!("{} kcal", plan.bmr.round_dp(1))),
        row("TDEE", format!("{} kcal", plan.tdee)),
        row("Weekly change", format!("{} lbs", plan.weekly_change_lbs.round_dp(2))),
        row(
            "Daily deficit/surplus",
            format!("{} kcal", target.daily_deficit_surplus.round_dp(0)),
        ),
        row("Daily calories", format!("{} kcal", macros.daily_calories)),
        row("Protein", format!("{} g", macros.protein_grams)),
        row("Carbs", format!("{} g", macros.carbs_grams)),
        row("Fat", format!("{} g", macros.fat_grams)),
    ]);

    println!("{} {}", "Rate:".bold(), tier_label(plan.safety.tier));
    println!("{}", plan.safety.message);
    if target.floor_applied {
        println!(
            "{}",
            "Daily calories were raised to the minimum safe intake.".yellow()
        );
    }
}

fn show_check_in(outcome: &CheckInOutcome) {
    let result = &outcome.result;
    let change = result.calorie_change();
    let change_label = if change > Decimal::ZERO {
        format!("+{}", change).green()
    } else if change < Decimal::ZERO {
        change.to_string().yellow()
    } else {
        "no change".normal()
    };

    println!("{}", "Weekly check-in".cyan().bold());
    print_table(vec![
        row("Estimated TDEE", format!("{} kcal", result.calculated_true_tdee)),
        row(
            "Expected change",
            format!("{} lbs", result.expected_weekly_change_lbs.round_dp(2)),
        ),
        row(
            "Actual change",
            format!("{} lbs", result.actual_weekly_change_lbs.round_dp(2)),
        ),
        row("Previous calories", format!("{} kcal", result.previous_daily_calories)),
        row("New calories", format!("{} kcal", result.new_daily_calories)),
        row("Protein", format!("{} g", result.new_protein_grams)),
        row("Carbs", format!("{} g", result.new_carbs_grams)),
        row("Fat", format!("{} g", result.new_fat_grams)),
    ]);
    println!("{} {}", "Adjustment:".bold(), change_label);
    println!("{}", result.adjustment_reason);
}
