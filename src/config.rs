//! Process configuration from environment variables

use crate::broadcast::DailySchedule;
use crate::chunker::DEFAULT_MAX_MESSAGE_LEN;
use crate::gateway::DEFAULT_AI_TIMEOUT;
use crate::llm::{GroqModels, DEFAULT_GROQ_BASE_URL};
use crate::registry::UserId;
use crate::router::AdminDeniedPolicy;
use crate::state_machine::AutoDetectPolicy;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    /// Without a key the bot still runs and apologizes instead of answering
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub models: GroqModels,
    pub admin: Option<UserId>,
    pub users_file: PathBuf,
    pub ai_timeout: Duration,
    pub max_message_len: NonZeroUsize,
    pub auto_detect: AutoDetectPolicy,
    pub admin_denied: AdminDeniedPolicy,
    pub prompts_dir: Option<PathBuf>,
    pub keep_alive_port: Option<u16>,
    /// `None` when daily alerts are disabled
    pub daily_alerts: Option<DailySchedule>,
}

/// Directory for rotated log files, resolved before `Config` so that
/// configuration errors are logged too
pub fn log_dir_from_env() -> PathBuf {
    log_dir_from_lookup(|var| std::env::var(var).ok())
}

pub fn log_dir_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    non_empty(&lookup, "LOG_DIR").map_or_else(|| PathBuf::from("logs"), PathBuf::from)
}

fn non_empty(lookup: impl Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| non_empty(&lookup, var);

        let telegram_token = get("TELEGRAM_BOT_TOKEN")
            .or_else(|| get("TELEGRAM_TOKEN"))
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let admin = get("ADMIN_ID").and_then(|raw| match raw.parse::<i64>() {
            Ok(id) => Some(UserId(id)),
            Err(e) => {
                tracing::warn!(value = %raw, error = %e, "Ignoring unparsable ADMIN_ID");
                None
            }
        });

        let defaults = GroqModels::default();
        let models = GroqModels {
            chat: get("GROQ_CHAT_MODEL").unwrap_or(defaults.chat),
            vision: get("GROQ_VISION_MODEL").unwrap_or(defaults.vision),
            transcription: get("GROQ_TRANSCRIPTION_MODEL").unwrap_or(defaults.transcription),
        };

        let ai_timeout = match get("AI_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => return Err(invalid("AI_TIMEOUT_SECS", raw, "must be positive")),
                Err(e) => return Err(invalid("AI_TIMEOUT_SECS", raw, e)),
            },
            None => DEFAULT_AI_TIMEOUT,
        };

        let alerts_enabled = parse_or("DAILY_ALERTS_ENABLED", get("DAILY_ALERTS_ENABLED"), true)?;
        let daily_alerts = if alerts_enabled {
            let schedule = match get("DAILY_ALERTS") {
                Some(raw) => {
                    DailySchedule::parse(&raw).map_err(|e| invalid("DAILY_ALERTS", raw, e))?
                }
                None => DailySchedule::default(),
            };
            Some(schedule)
        } else {
            None
        };

        let keep_alive_port = get("KEEP_ALIVE_PORT")
            .map(|raw| {
                raw.parse::<u16>()
                    .map_err(|e| invalid("KEEP_ALIVE_PORT", raw, e))
            })
            .transpose()?;

        Ok(Self {
            telegram_token,
            groq_api_key: get("GROQ_API_KEY"),
            groq_base_url: get("GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            models,
            admin,
            users_file: get("USERS_FILE").map_or_else(|| PathBuf::from("users.json"), PathBuf::from),
            ai_timeout,
            max_message_len: parse_or(
                "MAX_MESSAGE_LEN",
                get("MAX_MESSAGE_LEN"),
                DEFAULT_MAX_MESSAGE_LEN,
            )?,
            auto_detect: parse_or("AUTO_DETECT", get("AUTO_DETECT"), AutoDetectPolicy::default())?,
            admin_denied: parse_or(
                "ADMIN_DENIED",
                get("ADMIN_DENIED"),
                AdminDeniedPolicy::default(),
            )?,
            prompts_dir: get("PROMPTS_DIR").map(PathBuf::from),
            keep_alive_port,
            daily_alerts,
        })
    }
}

fn invalid(var: &'static str, value: String, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value,
        reason: reason.to_string(),
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match raw {
        Some(raw) => raw.parse::<T>().map_err(|e| invalid(var, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_token_is_required() {
        assert_eq!(
            config(&[]).unwrap_err(),
            ConfigError::Missing("TELEGRAM_BOT_TOKEN")
        );
        assert_eq!(
            config(&[("TELEGRAM_BOT_TOKEN", "   ")]).unwrap_err(),
            ConfigError::Missing("TELEGRAM_BOT_TOKEN")
        );
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();

        assert_eq!(config.telegram_token, "123:abc");
        assert_eq!(config.groq_api_key, None);
        assert_eq!(config.groq_base_url, DEFAULT_GROQ_BASE_URL);
        assert_eq!(config.models, GroqModels::default());
        assert_eq!(config.admin, None);
        assert_eq!(config.users_file, PathBuf::from("users.json"));
        assert_eq!(config.ai_timeout, Duration::from_secs(60));
        assert_eq!(config.max_message_len.get(), 4000);
        assert_eq!(config.auto_detect, AutoDetectPolicy::LockIn);
        assert_eq!(config.admin_denied, AdminDeniedPolicy::Silent);
        assert_eq!(config.keep_alive_port, None);
        assert_eq!(config.daily_alerts, Some(DailySchedule::default()));
    }

    #[test]
    fn test_log_dir_lookup() {
        assert_eq!(log_dir_from_lookup(|_| None), PathBuf::from("logs"));
        assert_eq!(
            log_dir_from_lookup(|_| Some("  ".to_string())),
            PathBuf::from("logs")
        );
        assert_eq!(
            log_dir_from_lookup(|var| (var == "LOG_DIR").then(|| "/var/log/tutor".to_string())),
            PathBuf::from("/var/log/tutor")
        );
    }

    #[test]
    fn test_legacy_token_name() {
        let config = config(&[("TELEGRAM_TOKEN", "42:xyz")]).unwrap();
        assert_eq!(config.telegram_token, "42:xyz");
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("GROQ_API_KEY", "gsk_test"),
            ("ADMIN_ID", "987654321"),
            ("AI_TIMEOUT_SECS", "15"),
            ("MAX_MESSAGE_LEN", "4096"),
            ("AUTO_DETECT", "every-message"),
            ("ADMIN_DENIED", "notice"),
            ("KEEP_ALIVE_PORT", "8080"),
            ("DAILY_ALERTS", "08:00|Study time!"),
            ("GROQ_CHAT_MODEL", "llama-3.1-8b-instant"),
        ])
        .unwrap();

        assert_eq!(config.groq_api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.admin, Some(UserId(987_654_321)));
        assert_eq!(config.ai_timeout, Duration::from_secs(15));
        assert_eq!(config.max_message_len.get(), 4096);
        assert_eq!(config.auto_detect, AutoDetectPolicy::EveryMessage);
        assert_eq!(config.admin_denied, AdminDeniedPolicy::Notice);
        assert_eq!(config.keep_alive_port, Some(8080));
        assert_eq!(config.daily_alerts.unwrap().alerts()[0].message, "Study time!");
        assert_eq!(config.models.chat, "llama-3.1-8b-instant");
        assert_eq!(config.models.vision, GroqModels::default().vision);
    }

    #[test]
    fn test_unparsable_admin_is_ignored() {
        let config = config(&[("TELEGRAM_BOT_TOKEN", "t"), ("ADMIN_ID", "@someone")]).unwrap();
        assert_eq!(config.admin, None);
    }

    #[test]
    fn test_alerts_can_be_disabled() {
        let config = config(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("DAILY_ALERTS_ENABLED", "false"),
        ])
        .unwrap();
        assert_eq!(config.daily_alerts, None);
    }

    #[test]
    fn test_invalid_tunables() {
        for (var, value) in [
            ("MAX_MESSAGE_LEN", "0"),
            ("AI_TIMEOUT_SECS", "0"),
            ("AI_TIMEOUT_SECS", "soon"),
            ("AUTO_DETECT", "sometimes"),
            ("ADMIN_DENIED", "loud"),
            ("KEEP_ALIVE_PORT", "99999"),
            ("DAILY_ALERTS", "noon|lunch"),
            ("DAILY_ALERTS_ENABLED", "maybe"),
        ] {
            let err = config(&[("TELEGRAM_BOT_TOKEN", "t"), (var, value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { var: v, .. } if v == var),
                "{var}={value} gave {err:?}"
            );
        }
    }
}
