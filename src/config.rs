use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;
use crate::planner::{CheckInRecord, UserGoalRecord};
use crate::policy::NutritionPolicy;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Calculation constants and safety policy
    #[serde(default)]
    pub policy: NutritionPolicy,

    /// Logging settings
    #[serde(default)]
    pub logging: LogConfig,

    /// Stored goal record for the local user
    #[serde(default)]
    pub profile: Option<UserGoalRecord>,

    /// Check-in audit entries, oldest first
    #[serde(default)]
    pub history: Vec<CheckInRecord>,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            policy: NutritionPolicy::default(),
            logging: LogConfig::default(),
            profile: None,
            history: Vec::new(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file and validate the policy table
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .policy
            .validate()
            .with_context(|| format!("Invalid policy in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nutricoach")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    error = %err,
                    "Using default configuration"
                );
                Self::default()
            }
        }
    }

    /// Record a completed check-in and replace the stored profile
    pub fn record_check_in(&mut self, updated: UserGoalRecord, record: CheckInRecord) {
        self.profile = Some(updated);
        self.history.push(record);
    }

    /// Most recent check-in audit entry
    pub fn last_check_in(&self) -> Option<&CheckInRecord> {
        self.history.last()
    }
}
