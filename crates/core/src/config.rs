// crates/core/src/config.rs
//! Polling and transport configuration.

use db_assistant_types::JobKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-kind polling policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Fixed delay between status checks.
    #[serde(with = "duration_ms")]
    pub interval: Duration,
    /// Consecutive transient failures tolerated before the poller gives up
    /// and reports the job as failed.
    pub max_consecutive_errors: u32,
}

impl PollConfig {
    /// Default cadence for a job kind: 2s for AutoML training jobs, 4s for
    /// the slower pipeline kinds (GDM, forecast generation).
    pub fn for_kind(kind: JobKind) -> Self {
        let interval = match kind {
            JobKind::AutoMl => Duration::from_millis(2000),
            JobKind::Gdm | JobKind::Forecast => Duration::from_millis(4000),
        };
        Self {
            interval,
            max_consecutive_errors: 5,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_consecutive_errors: 5,
        }
    }
}

/// Transport configuration for the HTTP job client.
///
/// Timeouts are per call class: status checks stay short so a hung backend
/// cannot wedge the poller, while result fetches for AI-generation endpoints
/// are allowed several minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(with = "duration_ms")]
    pub status_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub start_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub result_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub cancel_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            status_timeout: Duration::from_secs(10),
            start_timeout: Duration::from_secs(30),
            result_timeout: Duration::from_secs(300),
            cancel_timeout: Duration::from_secs(10),
        }
    }
}

/// Serialize durations as integer milliseconds so embedder config files
/// stay flat (`"interval": 2000`).
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_poll_cadence_per_kind() {
        assert_eq!(
            PollConfig::for_kind(JobKind::AutoMl).interval,
            Duration::from_millis(2000)
        );
        assert_eq!(
            PollConfig::for_kind(JobKind::Gdm).interval,
            Duration::from_millis(4000)
        );
        assert_eq!(
            PollConfig::for_kind(JobKind::Forecast).interval,
            Duration::from_millis(4000)
        );
    }

    #[test]
    fn test_config_round_trips_as_millis() {
        let config = PollConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"interval\":2000"));
        let back: PollConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new("https://assistant.example.com");
        assert_eq!(config.base_url, "https://assistant.example.com");
        assert_eq!(config.status_timeout, Duration::from_secs(10));
        assert_eq!(config.result_timeout, Duration::from_secs(300));
    }
}
