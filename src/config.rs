use crate::error::Result;
use crate::utils::retry::{CallPolicy, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine settings, read from an optional JSON file. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    pub request_timeout_ms: u64,
    /// Re-read price and stock from the catalog before taking payment.
    pub revalidate_at_checkout: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout_ms: 10_000,
            revalidate_at_checkout: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            retry: self.retry.clone(),
            timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"retry":{"max_attempts":5}}"#).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay_ms, 500);
        assert_eq!(config.request_timeout_ms, 10_000);
        assert!(config.revalidate_at_checkout);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"request_timeout_ms": 250, "revalidate_at_checkout": false}}"#
        )
        .unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.call_policy().timeout, Duration::from_millis(250));
        assert!(!config.revalidate_at_checkout);
    }
}
