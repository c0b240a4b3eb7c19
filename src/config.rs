use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::Duration;
use chrono_tz::Tz;
use thiserror::Error;

use crate::service::vocabulary::{self, ConfirmationVocabulary};

/// The only fatal, non-recoverable error class: configuration problems
/// are detected at startup, never at request time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file: {0}")]
    Read(String),
    #[error("invalid config line {0}: {1}")]
    Line(usize, String),
    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Raw KEY=value configuration file, merged with process env by the
/// caller. Lines may carry an `export ` prefix and quoted values.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::Line(idx + 1, line.to_string()));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Typed scheduler settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Single fixed deployment timezone; all wall-clock construction and
    /// rendering goes through it.
    pub timezone: Tz,
    /// How long a proposed plan waits for a confirmation reply.
    pub confirm_timeout: Duration,
    pub max_slot_results: usize,
    /// Daily search window for alternative-slot suggestions.
    pub day_start_hour: u32,
    pub day_end_hour: u32,
    /// JSON backing file for the in-memory calendar client.
    pub calendar_file: Option<PathBuf>,
    confirm_phrases: Option<Vec<String>>,
    cancel_phrases: Option<Vec<String>>,
}

const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";
const DEFAULT_CONFIRM_TIMEOUT_SECS: i64 = 300;
const DEFAULT_MAX_SLOT_RESULTS: usize = 5;
const DEFAULT_DAY_START_HOUR: u32 = 8;
const DEFAULT_DAY_END_HOUR: u32 = 20;

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::resolve(|_| None).expect("defaults are valid")
    }
}

impl SchedulerConfig {
    /// Resolve settings through a property lookup (config file merged
    /// with env, as assembled in main).
    pub fn resolve(get_prop: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timezone_name = get_prop("TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(timezone_name))?;

        let confirm_timeout = Duration::seconds(parse_or(
            &get_prop,
            "CONFIRM_TIMEOUT_SECS",
            DEFAULT_CONFIRM_TIMEOUT_SECS,
        )?);
        let max_slot_results = parse_or(&get_prop, "MAX_SLOT_RESULTS", DEFAULT_MAX_SLOT_RESULTS)?;
        let day_start_hour = parse_or(&get_prop, "DAY_START_HOUR", DEFAULT_DAY_START_HOUR)?;
        let day_end_hour = parse_or(&get_prop, "DAY_END_HOUR", DEFAULT_DAY_END_HOUR)?;
        if day_start_hour >= day_end_hour || day_end_hour > 24 {
            return Err(ConfigError::InvalidValue {
                key: "DAY_END_HOUR".to_string(),
                value: day_end_hour.to_string(),
            });
        }

        Ok(Self {
            timezone,
            confirm_timeout,
            max_slot_results,
            day_start_hour,
            day_end_hour,
            calendar_file: get_prop("CALENDAR_FILE").map(PathBuf::from),
            confirm_phrases: get_prop("CONFIRM_PHRASES").map(split_phrases),
            cancel_phrases: get_prop("CANCEL_PHRASES").map(split_phrases),
        })
    }

    /// Vocabulary built from configured overrides; either side falls
    /// back to its default phrase set when the key is absent.
    pub fn vocabulary(&self) -> ConfirmationVocabulary {
        ConfirmationVocabulary::with_phrases(
            self.confirm_phrases
                .clone()
                .unwrap_or_else(vocabulary::default_confirm_phrases),
            self.cancel_phrases
                .clone()
                .unwrap_or_else(vocabulary::default_cancel_phrases),
        )
    }
}

fn split_phrases(value: String) -> Vec<String> {
    value
        .split(',')
        .map(|phrase| phrase.trim().to_string())
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

fn parse_or<T: std::str::FromStr>(
    get_prop: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match get_prop(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::vocabulary::ReplyKind;

    #[test]
    fn defaults_use_kolkata_timezone() {
        let config = SchedulerConfig::default();
        assert_eq!(config.timezone, chrono_tz::Asia::Kolkata);
        assert_eq!(config.confirm_timeout, Duration::seconds(300));
        assert_eq!(config.max_slot_results, 5);
    }

    #[test]
    fn unknown_timezone_is_a_config_error() {
        let result = SchedulerConfig::resolve(|key| {
            (key == "TIMEZONE").then(|| "Mars/Olympus_Mons".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidTimezone(_))));
    }

    #[test]
    fn phrase_overrides_reach_the_vocabulary() {
        let config = SchedulerConfig::resolve(|key| {
            (key == "CONFIRM_PHRASES").then(|| "haan, theek hai".to_string())
        })
        .unwrap();
        let vocab = config.vocabulary();
        assert_eq!(vocab.classify("theek hai"), ReplyKind::Confirm);
        assert_eq!(vocab.classify("yes"), ReplyKind::Unrecognized);
        // cancel side keeps its defaults
        assert_eq!(vocab.classify("cancel"), ReplyKind::Cancel);
    }

    #[test]
    fn inverted_day_window_is_rejected() {
        let result = SchedulerConfig::resolve(|key| match key {
            "DAY_START_HOUR" => Some("20".to_string()),
            "DAY_END_HOUR" => Some("8".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
