//! Process-wide configuration.

use std::time::Duration;

use rollcall_rotation::RotationConfig;
use rollcall_session::SessionConfig;
use rollcall_store::CommitConfig;
use serde::{Deserialize, Serialize};

/// Environment variable for [`RollcallConfig::rotation_interval_secs`].
pub const ENV_ROTATION_INTERVAL: &str = "ROLLCALL_ROTATION_INTERVAL";
/// Environment variable for [`RollcallConfig::code_length`].
pub const ENV_CODE_LENGTH: &str = "ROLLCALL_CODE_LENGTH";
/// Environment variable for [`RollcallConfig::database_url`].
pub const ENV_DATABASE_URL: &str = "ROLLCALL_DATABASE_URL";
/// Environment variable for [`RollcallConfig::commit_attempts`].
pub const ENV_COMMIT_ATTEMPTS: &str = "ROLLCALL_COMMIT_ATTEMPTS";

/// Invalid or incomplete configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment value didn't parse.
    #[error("{key}: cannot parse {value:?}")]
    Invalid { key: &'static str, value: String },

    /// A numeric setting is below its minimum.
    #[error("{key} must be at least {min}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
    },

    /// A numeric setting is above its maximum.
    #[error("{key} must be at most {max}, got {value}")]
    TooLarge {
        key: &'static str,
        value: u64,
        max: u64,
    },

    /// A builder was finished without a required part.
    #[error("missing {0}")]
    Missing(&'static str),
}

/// Settings read once at startup.
///
/// ```ignore
/// let config = RollcallConfig::from_env()?;
/// config.validate()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollcallConfig {
    /// Seconds each code stays valid. At least 1, 5 or more recommended.
    pub rotation_interval_secs: u64,
    /// Symbols per code. At least 1, 4 or more recommended.
    pub code_length: usize,
    /// sqlx SQLite URL of the attendance database.
    pub database_url: String,
    /// Tries per record when committing a closed session.
    pub commit_attempts: u32,
}

impl Default for RollcallConfig {
    fn default() -> Self {
        Self {
            rotation_interval_secs: 15,
            code_length: 4,
            database_url: "sqlite:data/attendance.db".to_string(),
            commit_attempts: 3,
        }
    }
}

impl RollcallConfig {
    pub const RECOMMENDED_MIN_INTERVAL_SECS: u64 = 5;
    pub const RECOMMENDED_MIN_CODE_LENGTH: usize = 4;
    /// One day.
    pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

    /// Defaults overridden by the `ROLLCALL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `ROLLCALL_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_ROTATION_INTERVAL) {
            config.rotation_interval_secs = parse(ENV_ROTATION_INTERVAL, &value)?;
        }
        if let Some(value) = lookup(ENV_CODE_LENGTH) {
            config.code_length = parse(ENV_CODE_LENGTH, &value)?;
        }
        if let Some(value) = lookup(ENV_DATABASE_URL) {
            if !value.trim().is_empty() {
                config.database_url = value.trim().to_string();
            }
        }
        if let Some(value) = lookup(ENV_COMMIT_ATTEMPTS) {
            config.commit_attempts = parse(ENV_COMMIT_ATTEMPTS, &value)?;
        }

        Ok(config)
    }

    /// Rejects unusable values; warns about legal but poor ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_min(ENV_ROTATION_INTERVAL, self.rotation_interval_secs, 1)?;
        check_max(
            ENV_ROTATION_INTERVAL,
            self.rotation_interval_secs,
            Self::MAX_INTERVAL_SECS,
        )?;
        check_min(ENV_CODE_LENGTH, self.code_length as u64, 1)?;
        check_min(ENV_COMMIT_ATTEMPTS, u64::from(self.commit_attempts), 1)?;

        if self.rotation_interval_secs < Self::RECOMMENDED_MIN_INTERVAL_SECS {
            tracing::warn!(
                rotation_interval_secs = self.rotation_interval_secs,
                "rotation interval below the recommended 5s"
            );
        }
        if self.code_length < Self::RECOMMENDED_MIN_CODE_LENGTH {
            tracing::warn!(
                code_length = self.code_length,
                "code length below the recommended 4"
            );
        }
        Ok(())
    }

    pub fn rotation(&self) -> RotationConfig {
        RotationConfig {
            interval: Duration::from_secs(self.rotation_interval_secs),
        }
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            code_length: self.code_length,
        }
    }

    pub fn commit(&self) -> CommitConfig {
        CommitConfig {
            max_attempts: self.commit_attempts,
            ..CommitConfig::default()
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn check_min(key: &'static str, value: u64, min: u64) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::OutOfRange { key, value, min });
    }
    Ok(())
}

fn check_max(key: &'static str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::TooLarge { key, value, max });
    }
    Ok(())
}
