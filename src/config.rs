//! Run configuration — directories, SMTP account, delivery tuning.
//!
//! Loaded once from a TOML file at startup and read-only for the rest of
//! the run. The body template uses literal `<br>` markers for line
//! breaks; they are replaced with real newlines at load time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ConfigError;

/// Default send budget per rolling minute.
const DEFAULT_MAX_SENDS_PER_MINUTE: u32 = 20;
/// Default maximum delivery attempts per recipient group.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default base delay for exponential backoff, in seconds.
const DEFAULT_RETRY_BASE_SECS: u64 = 1;

/// Top-level run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub directories: Directories,
    pub email: EmailSettings,
    #[serde(default)]
    pub delivery: DeliverySettings,
}

/// Filesystem layout for a run.
#[derive(Debug, Clone, Deserialize)]
pub struct Directories {
    /// CSV export of the donor register (identifier → email).
    pub roster_file: PathBuf,
    /// Directory scanned for source PDFs.
    pub source: PathBuf,
    /// Identifier-keyed holding area for classified documents.
    pub staging: PathBuf,
    /// Identifier-keyed archive for successfully sent documents.
    pub processed: PathBuf,
}

/// SMTP account and message template.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub sender_address: String,
    pub sender_password: SecretString,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub subject: String,
    /// Plain-text body; `<br>` markers become newlines at load.
    pub body: String,
}

/// Rate-limit and retry tuning. All fields optional in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub max_sends_per_minute: u32,
    pub max_attempts: u32,
    pub retry_base_secs: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_sends_per_minute: DEFAULT_MAX_SENDS_PER_MINUTE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_secs: DEFAULT_RETRY_BASE_SECS,
        }
    }
}

impl DeliverySettings {
    /// Base delay for the backoff schedule.
    pub fn retry_base(&self) -> Duration {
        Duration::from_secs(self.retry_base_secs)
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.email.body = config.email.body.replace("<br>", "\n");
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require(
            &self.email.sender_address,
            "email.sender_address",
            "Set the address receipts are sent from.",
        )?;
        require(
            self.email.sender_password.expose_secret(),
            "email.sender_password",
            "Set the SMTP password or app password for the sender account.",
        )?;
        require(
            &self.email.smtp_host,
            "email.smtp_host",
            "Set the SMTP relay to deliver through.",
        )?;
        if self.email.smtp_port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "email.smtp_port".into(),
                message: "port must be non-zero".into(),
            });
        }
        if self.delivery.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "delivery.max_attempts".into(),
                message: "at least one delivery attempt is required".into(),
            });
        }
        if self.delivery.max_sends_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                key: "delivery.max_sends_per_minute".into(),
                message: "the send budget must admit at least one attempt".into(),
            });
        }
        Ok(())
    }
}

fn require(value: &str, key: &str, hint: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingRequired {
            key: key.to_string(),
            hint: hint.to_string(),
        });
    }
    Ok(())
}
