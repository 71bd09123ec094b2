//! Client configuration
//!
//! Phase timings and the tick budget are read from JSON and validated with
//! `garde` before a session is built from them. Every field has a default,
//! so an empty object is a valid configuration.

use std::time::Duration;

use enum_map::{Enum, EnumMap, enum_map};
use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{answers, connection, results, tick, votes};

/// The timed phases the Controller arms a clock for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimedPhase {
    /// Contestants writing answers
    Answers,
    /// Contestants voting
    Votes,
    /// Results on screen before moving on
    Results,
}

type ValidationResult = garde::Result;

/// Validates that a duration falls within `[MIN_SECONDS, MAX_SECONDS]`
///
/// # Errors
///
/// Returns a `garde::Error` if the duration is outside the bounds.
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Validates that the server address is a websocket url
#[allow(clippy::ptr_arg)]
fn validate_websocket_url(val: &String, _ctx: &()) -> ValidationResult {
    if val.starts_with("ws://") || val.starts_with("wss://") {
        Ok(())
    } else {
        Err(garde::Error::new("must start with ws:// or wss://"))
    }
}

/// How long each timed phase lasts
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Durations {
    /// Answer collection time
    #[garde(custom(validate_duration::<{ answers::MIN_DURATION }, { answers::MAX_DURATION }>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub answers: Duration,
    /// Vote collection time
    #[garde(custom(validate_duration::<{ votes::MIN_DURATION }, { votes::MAX_DURATION }>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub votes: Duration,
    /// Results display time
    #[garde(custom(validate_duration::<{ results::MIN_DURATION }, { results::MAX_DURATION }>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub results: Duration,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            answers: Duration::from_secs(answers::DEFAULT_DURATION),
            votes: Duration::from_secs(votes::DEFAULT_DURATION),
            results: Duration::from_secs(results::DEFAULT_DURATION),
        }
    }
}

/// Settings shared by the Participant and Controller clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Websocket endpoint of the game server
    #[garde(custom(validate_websocket_url))]
    pub url: String,
    /// Phase timings
    #[garde(dive)]
    pub durations: Durations,
    /// Upper bound on inbound messages applied in one tick
    #[garde(range(min = 1, max = tick::MAX_MESSAGES))]
    pub max_messages_per_tick: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: connection::DEFAULT_URL.to_string(),
            durations: Durations::default(),
            max_messages_per_tick: tick::DEFAULT_MAX_MESSAGES,
        }
    }
}

/// Reasons a configuration is rejected
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The text is not a configuration object
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of bounds
    #[error("invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}

impl Config {
    /// Parses and validates a JSON configuration
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out of bounds values.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Phase timings keyed by phase
    pub fn durations(&self) -> EnumMap<TimedPhase, Duration> {
        enum_map! {
            TimedPhase::Answers => self.durations.answers,
            TimedPhase::Votes => self.durations.votes,
            TimedPhase::Results => self.durations.results,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.max_messages_per_tick, 64);
        assert_eq!(config.durations()[TimedPhase::Answers], Duration::from_secs(30));
        assert_eq!(config.durations()[TimedPhase::Votes], Duration::from_secs(30));
        assert_eq!(config.durations()[TimedPhase::Results], Duration::from_secs(5));
    }

    #[test]
    fn test_from_json_empty_object() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_json_durations_in_seconds() {
        let config = Config::from_json(
            r#"{"url":"wss://trivia.example/ws","durations":{"answers":45,"results":10},"maxMessagesPerTick":8}"#,
        )
        .unwrap();

        assert_eq!(config.url, "wss://trivia.example/ws");
        assert_eq!(config.durations.answers, Duration::from_secs(45));
        assert_eq!(config.durations.votes, Duration::from_secs(30));
        assert_eq!(config.durations.results, Duration::from_secs(10));
        assert_eq!(config.max_messages_per_tick, 8);
    }

    #[test]
    fn test_duration_bounds() {
        assert!(Config::from_json(r#"{"durations":{"answers":4}}"#).is_err());
        assert!(Config::from_json(r#"{"durations":{"answers":5}}"#).is_ok());
        assert!(Config::from_json(r#"{"durations":{"votes":240}}"#).is_ok());
        assert!(Config::from_json(r#"{"durations":{"votes":241}}"#).is_err());
        assert!(Config::from_json(r#"{"durations":{"results":0}}"#).is_err());
        assert!(Config::from_json(r#"{"durations":{"results":61}}"#).is_err());
    }

    #[test]
    fn test_tick_budget_bounds() {
        assert!(matches!(
            Config::from_json(r#"{"maxMessagesPerTick":0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(Config::from_json(r#"{"maxMessagesPerTick":1024}"#).is_ok());
        assert!(Config::from_json(r#"{"maxMessagesPerTick":1025}"#).is_err());
    }

    #[test]
    fn test_rejects_non_websocket_url() {
        assert!(matches!(
            Config::from_json(r#"{"url":"http://localhost:8080"}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Config::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_durations_serialize_as_seconds() {
        let json = serde_json::to_value(Durations::default()).unwrap();
        assert_eq!(json, serde_json::json!({"answers": 30, "votes": 30, "results": 5}));
    }
}
