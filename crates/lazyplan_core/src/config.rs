//! Planner configuration loaded from TOML.
//!
//! # Invariants
//! - Every key is optional; missing sections fall back to defaults.
//! - A config that loads is valid: log level is known, export start hour
//!   lies in `0..=23`, and every per-cadence block ceiling is positive.

use crate::error::ErrorKind;
use crate::logging::{default_log_level, normalize_level};
use crate::model::plan::Cadence;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } => ErrorKind::Internal,
            Self::Parse(_) | Self::Invalid(_) => ErrorKind::InvalidConstraint,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub logging: LoggingSection,
    pub store: StoreSection,
    pub limits: LimitsSection,
    pub export: ExportSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    /// Absolute log directory. File logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Plan database file; callers pick their own default when unset.
    pub db_path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Per-cadence ceilings for blocks per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub max_blocks_daily: u32,
    pub max_blocks_weekly: u32,
    pub max_blocks_monthly: u32,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_blocks_daily: 24,
            max_blocks_weekly: 7,
            max_blocks_monthly: 5,
        }
    }
}

impl LimitsSection {
    pub fn max_blocks(&self, cadence: Cadence) -> u32 {
        match cadence {
            Cadence::Daily => self.max_blocks_daily,
            Cadence::Weekly => self.max_blocks_weekly,
            Cadence::Monthly => self.max_blocks_monthly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub default_start_hour: u32,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            default_start_hour: 9,
        }
    }
}

impl PlannerConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.logging.level).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        if self.export.default_start_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "export.default_start_hour {} is outside 0..=23",
                self.export.default_start_hour
            )));
        }
        for cadence in [Cadence::Daily, Cadence::Weekly, Cadence::Monthly] {
            if self.limits.max_blocks(cadence) == 0 {
                return Err(ConfigError::Invalid(format!(
                    "limits.max_blocks_{} must be positive",
                    cadence.as_str()
                )));
            }
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.store.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PlannerConfig};
    use crate::model::plan::Cadence;
    use std::time::Duration;

    #[test]
    fn empty_document_yields_defaults() {
        let config = PlannerConfig::from_toml_str("").unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.limits.max_blocks(Cadence::Daily), 24);
        assert_eq!(config.limits.max_blocks(Cadence::Weekly), 7);
        assert_eq!(config.limits.max_blocks(Cadence::Monthly), 5);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = PlannerConfig::from_toml_str(
            r#"
            [limits]
            max_blocks_daily = 16

            [export]
            default_start_hour = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.limits.max_blocks_daily, 16);
        assert_eq!(config.limits.max_blocks_weekly, 7);
        assert_eq!(config.export.default_start_hour, 7);
        assert_eq!(config.store.busy_timeout_ms, 5_000);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = PlannerConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_start_hour_past_midnight() {
        let err =
            PlannerConfig::from_toml_str("[export]\ndefault_start_hour = 24\n").unwrap_err();
        assert!(err.to_string().contains("0..=23"));
    }

    #[test]
    fn rejects_zero_block_ceiling() {
        let err = PlannerConfig::from_toml_str("[limits]\nmax_blocks_monthly = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_blocks_monthly"));
    }

    #[test]
    fn rejects_relative_log_dir() {
        let err = PlannerConfig::from_toml_str("[logging]\ndir = \"logs\"\n").unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlannerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
