use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Limits for one orchestration. Durations are written as `"500ms"`,
/// `"2s"`, `"1m"` or bare seconds in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on calls to the external service.
    pub max_attempts: usize,
    /// Wall-clock budget for the whole orchestration, all attempts included.
    #[serde(with = "duration_str")]
    pub deadline: Duration,
    /// Budget for a single service call. Clamped to what is left of
    /// `deadline`.
    #[serde(with = "duration_str")]
    pub attempt_timeout: Duration,
    /// Failed attempts after which the fallback generator takes over.
    pub failure_limit: usize,
    /// Same, but while the side to move is in check.
    pub check_failure_limit: usize
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            deadline: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(2),
            failure_limit: 2,
            check_failure_limit: 1
        }
    }
}

#[derive(Debug, Error, Clone, Copy)]
#[error("invalid duration")]
pub struct InvalidDuration;

pub fn parse_duration(s: &str) -> Result<Duration, InvalidDuration> {
    // Decimal seconds, exact to the nanosecond.
    fn secs(s: &str) -> Option<Duration> {
        let s = s.trim();
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if (whole.is_empty() && frac.is_empty()) || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let secs: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let nanos: u32 = if frac.is_empty() { 0 } else { format!("{:0<9}", frac).parse().ok()? };
        Some(Duration::new(secs, nanos))
    }

    let s = s.trim();
    let duration = if let Some(s) = s.strip_suffix("ms") {
        secs(s).map(|d| d / 1000)
    } else if let Some(s) = s.strip_suffix('s') {
        secs(s)
    } else if let Some(s) = s.strip_suffix('m') {
        secs(s).and_then(|d| d.checked_mul(60))
    } else if let Some(s) = s.strip_suffix('h') {
        secs(s).and_then(|d| d.checked_mul(60 * 60))
    } else {
        secs(s)
    };
    duration.ok_or(InvalidDuration)
}

pub fn format_duration(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else if duration.subsec_nanos() % 1_000_000 == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}.{:09}s", duration.as_secs(), duration.subsec_nanos())
    }
}

/// Serde adapter for durations written as strings.
pub mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1.5").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn overflowing_durations_are_rejected() {
        assert!(parse_duration("6000000000000000h").is_err());
        assert!(parse_duration("400000000000000000m").is_err());
        assert!(parse_duration("99999999999999999999").is_err());
        assert!(parse_duration("1e16h").is_err());
        assert!(serde_json::from_str::<OrchestratorConfig>(r#"{ "deadline": "6000000000000000h" }"#).is_err());
    }

    #[test]
    fn formatted_durations_parse_back() {
        for duration in [
            Duration::from_secs(3),
            Duration::from_millis(250),
            Duration::from_micros(1500),
            Duration::new(2, 1)
        ] {
            assert_eq!(parse_duration(&format_duration(duration)).unwrap(), duration);
        }
        assert_eq!(format_duration(Duration::from_micros(1500)), "0.001500000s");
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let config: OrchestratorConfig = serde_json::from_str(r#"{ "deadline": "800ms", "max_attempts": 5 }"#).unwrap();
        assert_eq!(config.deadline, Duration::from_millis(800));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.attempt_timeout, OrchestratorConfig::default().attempt_timeout);
        assert_eq!(config.check_failure_limit, 1);

        let json = serde_json::to_string(&config).unwrap();
        let back: OrchestratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn rejects_bad_durations_in_config() {
        assert!(serde_json::from_str::<OrchestratorConfig>(r#"{ "deadline": "fast" }"#).is_err());
    }
}
