//! Process configuration.
//!
//! Everything comes from environment variables (a `.env` file is loaded first by
//! the binary). Empty values count as unset.

pub mod subscriptions;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::categorize::{LlmSettings, Provider};
use crate::github::DEFAULT_API_URL;
use crate::notify::DEFAULT_TELEGRAM_API_URL;
use crate::types::{DisplayZone, InvalidRepoId};

pub use subscriptions::{load_subscriptions, parse_subscriptions};

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 900;
const DEFAULT_TARGET_LANG: &str = "English";
const DEFAULT_STATE_PATH: &str = "data/state.json";
const DEFAULT_SUBSCRIPTIONS_PATH: &str = "subscribe.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot read subscriptions from {path}: {source}")]
    ReadSubscriptions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed subscriptions file {path}: {source}")]
    ParseSubscriptions {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid subscription {entry:?}: {source}")]
    InvalidRepo {
        entry: String,
        #[source]
        source: InvalidRepoId,
    },
}

/// Telegram destination.
#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
}

/// Everything the relay needs to run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` means unauthenticated GitHub access (60 requests per hour).
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub telegram: TelegramSettings,
    pub llm: LlmSettings,
    /// Zone used to render item timestamps.
    pub timezone: DisplayZone,
    /// Pause between runs in daemon mode.
    pub check_interval: Duration,
    pub state_path: PathBuf,
    pub subscriptions_path: PathBuf,
    /// Deliver the single baseline item recorded on a subscription's first poll.
    pub notify_on_first_run: bool,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let provider = match get("AI_PROVIDER") {
            Some(raw) => raw.parse::<Provider>().map_err(|e| ConfigError::Invalid {
                var: "AI_PROVIDER",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => Provider::default(),
        };

        let timezone = match get("TIMEZONE") {
            Some(raw) => DisplayZone::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "TIMEZONE",
                value: raw.clone(),
                reason: "expected an IANA zone such as Asia/Shanghai or an offset such as +08:00"
                    .into(),
            })?,
            None => DisplayZone::default(),
        };

        let check_interval = match get("CHECK_INTERVAL") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "CHECK_INTERVAL",
                        value: raw,
                        reason: "expected a positive number of seconds".into(),
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
        };

        let notify_on_first_run = match get("NOTIFY_ON_FIRST_RUN") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "NOTIFY_ON_FIRST_RUN",
                value: raw.clone(),
                reason: "expected true or false".into(),
            })?,
            None => true,
        };

        Ok(AppConfig {
            github_token: get("GITHUB_TOKEN"),
            github_api_url: get("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            telegram: TelegramSettings {
                api_url: get("TELEGRAM_API_URL")
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
                bot_token: required("TELEGRAM_BOT_TOKEN")?,
                chat_id: required("TELEGRAM_CHAT_ID")?,
            },
            llm: LlmSettings {
                provider,
                base_url: get("AI_BASE_URL"),
                api_key: required("AI_API_KEY")?,
                model: required("AI_MODEL")?,
                target_lang: get("TARGET_LANG").unwrap_or_else(|| DEFAULT_TARGET_LANG.to_string()),
            },
            timezone,
            check_interval,
            state_path: get("STATE_PATH")
                .unwrap_or_else(|| DEFAULT_STATE_PATH.to_string())
                .into(),
            subscriptions_path: get("SUBSCRIPTIONS_PATH")
                .unwrap_or_else(|| DEFAULT_SUBSCRIPTIONS_PATH.to_string())
                .into(),
            notify_on_first_run,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn minimal() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-1001"),
            ("AI_API_KEY", "sk-test"),
            ("AI_MODEL", "gpt-4o-mini"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply() {
        let config = load(&minimal()).unwrap();

        assert_eq!(config.github_token, None);
        assert_eq!(config.github_api_url, DEFAULT_API_URL);
        assert_eq!(config.telegram.api_url, DEFAULT_TELEGRAM_API_URL);
        assert_eq!(config.llm.provider, Provider::OpenAi);
        assert_eq!(config.llm.target_lang, "English");
        assert_eq!(config.timezone, DisplayZone::default());
        assert_eq!(config.check_interval, Duration::from_secs(900));
        assert_eq!(config.state_path, PathBuf::from("data/state.json"));
        assert_eq!(config.subscriptions_path, PathBuf::from("subscribe.json"));
        assert!(config.notify_on_first_run);
    }

    #[test]
    fn missing_required_variable_is_named() {
        let mut vars = minimal();
        vars.remove("AI_MODEL");
        assert!(matches!(load(&vars), Err(ConfigError::Missing("AI_MODEL"))));
    }

    #[test]
    fn empty_value_counts_as_unset() {
        let mut vars = minimal();
        vars.insert("TELEGRAM_CHAT_ID", "  ");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Missing("TELEGRAM_CHAT_ID"))
        ));
    }

    #[test]
    fn overrides_are_read() {
        let mut vars = minimal();
        vars.extend([
            ("GITHUB_TOKEN", "ghp_x"),
            ("AI_PROVIDER", "anthropic"),
            ("TIMEZONE", "Asia/Shanghai"),
            ("CHECK_INTERVAL", "60"),
            ("NOTIFY_ON_FIRST_RUN", "false"),
            ("TARGET_LANG", "Chinese"),
        ]);

        let config = load(&vars).unwrap();

        assert_eq!(config.github_token.as_deref(), Some("ghp_x"));
        assert_eq!(config.llm.provider, Provider::Anthropic);
        assert_eq!(config.timezone, DisplayZone::Named(chrono_tz::Asia::Shanghai));
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert!(!config.notify_on_first_run);
        assert_eq!(config.llm.target_lang, "Chinese");
    }

    #[test]
    fn bad_values_are_rejected() {
        for (var, value) in [
            ("AI_PROVIDER", "bard"),
            ("TIMEZONE", "Asia/Atlantis"),
            ("CHECK_INTERVAL", "0"),
            ("CHECK_INTERVAL", "soon"),
            ("NOTIFY_ON_FIRST_RUN", "maybe"),
        ] {
            let mut vars = minimal();
            vars.insert(var, value);
            assert!(
                matches!(load(&vars), Err(ConfigError::Invalid { var: v, .. }) if v == var),
                "{var}={value}"
            );
        }
    }

    #[test]
    fn fixed_offset_timezone_is_accepted() {
        let mut vars = minimal();
        vars.insert("TIMEZONE", "+08:00");

        let config = load(&vars).unwrap();

        assert_eq!(
            config.timezone,
            DisplayZone::Fixed(chrono::FixedOffset::east_opt(8 * 3600).unwrap())
        );
    }
}
