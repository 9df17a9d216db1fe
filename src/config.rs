//! Pipeline configuration.

use serde::Deserialize;
use std::time::Duration;

/// Tunables for one pipeline instance.
///
/// Hosts can deserialize this from their own settings; every field has a
/// default matching the reference deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Base URL of the platform's internal JSON API.
    pub api_base: String,

    /// Cross-realm RPC timeout in milliseconds.
    pub rpc_timeout_ms: u64,

    /// Interval between DOM polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Maximum number of DOM poll attempts.
    pub poll_max_attempts: u32,

    /// Minimum joined-transcript length (chars) considered sufficient.
    pub min_transcript_chars: usize,

    /// Preferred caption language tag.
    pub preferred_language: String,

    /// Delivery attempts before giving up on an acknowledgment.
    pub max_delivery_attempts: u32,

    /// Interval between delivery attempts in milliseconds.
    pub delivery_retry_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.youtube.com/youtubei/v1".to_string(),
            rpc_timeout_ms: 10_000,
            poll_interval_ms: 250,
            poll_max_attempts: 20,
            min_transcript_chars: 50,
            preferred_language: "en".to_string(),
            max_delivery_attempts: 3,
            delivery_retry_ms: 1_000,
        }
    }
}

impl PipelineConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn delivery_retry(&self) -> Duration {
        Duration::from_millis(self.delivery_retry_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err("API base must start with http:// or https://".to_string());
        }
        if self.rpc_timeout_ms == 0 {
            return Err("RPC timeout must be non-zero".to_string());
        }
        if self.poll_max_attempts == 0 {
            return Err("poll attempts must be non-zero".to_string());
        }
        if self.preferred_language.is_empty() {
            return Err("preferred language must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rpc_timeout(), Duration::from_secs(10));
        assert_eq!(config.min_transcript_chars, 50);
    }

    #[test]
    fn test_validate_rejects_bad_api_base() {
        let config = PipelineConfig {
            api_base: "ftp://nope".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"preferredLanguage":"de"}"#).unwrap();
        assert_eq!(config.preferred_language, "de");
        assert_eq!(config.poll_max_attempts, 20);
    }
}
