//! Configuration loading and representation.

use thiserror::Error;

use reqflow_observability::{LogConfig, LogFormat};

pub const DEFAULT_ALLOWED_EMAIL_DOMAIN: &str = "sprintug.com";
pub const DEFAULT_EMAIL_FROM: &str = "noreply@requisition.sprintug.com";
pub const DEFAULT_ID_WIDTH: usize = 3;

const MAX_ID_WIDTH: usize = 12;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Process configuration, read from `REQFLOW_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Domain accepted by the sign-in gate and by user administration.
    pub allowed_email_domain: String,
    /// Sender address stamped on every outbound email.
    pub email_from: String,
    /// When false, email batches are skipped; in-app notifications still go out.
    pub emails_enabled: bool,
    /// Zero-pad width of `REQ-###` identifiers.
    pub id_width: usize,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            allowed_email_domain: DEFAULT_ALLOWED_EMAIL_DOMAIN.to_string(),
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            emails_enabled: true,
            id_width: DEFAULT_ID_WIDTH,
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let allowed_email_domain = var("REQFLOW_ALLOWED_EMAIL_DOMAIN")
            .map(|d| d.trim_start_matches('@').to_lowercase())
            .unwrap_or(defaults.allowed_email_domain);

        let email_from = match var("REQFLOW_EMAIL_FROM") {
            Some(from) if !from.contains('@') => {
                return Err(ConfigError::invalid(
                    "REQFLOW_EMAIL_FROM",
                    &from,
                    "not an email address",
                ));
            }
            Some(from) => from,
            None => defaults.email_from,
        };

        let emails_enabled = match var("REQFLOW_EMAIL_ENABLED") {
            Some(raw) => parse_bool("REQFLOW_EMAIL_ENABLED", &raw)?,
            None => defaults.emails_enabled,
        };

        let id_width = match var("REQFLOW_ID_WIDTH") {
            Some(raw) => {
                let width: usize = raw
                    .parse()
                    .map_err(|_| ConfigError::invalid("REQFLOW_ID_WIDTH", &raw, "not a number"))?;
                if !(1..=MAX_ID_WIDTH).contains(&width) {
                    return Err(ConfigError::invalid(
                        "REQFLOW_ID_WIDTH",
                        &raw,
                        format!("must be between 1 and {MAX_ID_WIDTH}"),
                    ));
                }
                width
            }
            None => defaults.id_width,
        };

        let format = match var("REQFLOW_LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid("REQFLOW_LOG_FORMAT", &raw, e.to_string()))?,
            None => defaults.log.format,
        };
        let level = var("REQFLOW_LOG_LEVEL").unwrap_or(defaults.log.level);

        Ok(Self {
            allowed_email_domain,
            email_from,
            emails_enabled,
            id_width,
            log: LogConfig { level, format },
        })
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected true or false")),
    }
}
