use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Register registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Call policy for the register services of one remote node.
///
/// Typically deserialized from the `[registry]` table of an application
/// config file.  Every field has a default, so an empty table is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Per-attempt response timeout.
    #[serde(default = "d_500")]
    pub response_timeout_ms: u64,

    /// Attempts per call before the call is considered failed.
    #[serde(default = "d_3")]
    pub request_attempts: u32,

    /// Exclusive upper bound of the list index walked during discovery.
    #[serde(default = "d_65536")]
    pub max_list_index: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: d_500(),
            request_attempts: d_3(),
            max_list_index: d_65536(),
        }
    }
}

impl RegistryConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Attempts per call, never less than one.
    pub fn attempts(&self) -> u32 {
        self.request_attempts.max(1)
    }

    /// List index bound, clamped to the 16-bit index space.
    pub fn list_index_limit(&self) -> u32 {
        self.max_list_index.min(d_65536())
    }
}

fn d_500() -> u64 {
    500
}

fn d_3() -> u32 {
    3
}

fn d_65536() -> u32 {
    1 << 16
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_register_protocol_policy() {
        let cfg = RegistryConfig::default();
        assert_eq!(cfg.response_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.attempts(), 3);
        assert_eq!(cfg.list_index_limit(), 65536);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: RegistryConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, RegistryConfig::default());
    }

    #[test]
    fn deserialize_partial_toml() {
        let cfg: RegistryConfig = toml::from_str("response_timeout_ms = 250").unwrap();
        assert_eq!(cfg.response_timeout_ms, 250);
        assert_eq!(cfg.request_attempts, 3);
    }

    #[test]
    fn deserialize_json() {
        let cfg: RegistryConfig =
            serde_json::from_str(r#"{ "request_attempts": 5, "max_list_index": 10 }"#).unwrap();
        assert_eq!(cfg.attempts(), 5);
        assert_eq!(cfg.list_index_limit(), 10);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let cfg = RegistryConfig {
            request_attempts: 0,
            ..Default::default()
        };
        assert_eq!(cfg.attempts(), 1);
    }

    #[test]
    fn list_index_is_clamped_to_u16_space() {
        let cfg = RegistryConfig {
            max_list_index: 1 << 20,
            ..Default::default()
        };
        assert_eq!(cfg.list_index_limit(), 1 << 16);
    }
}
