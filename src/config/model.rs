//! Configuration model for subrun
//!
//! Defines the structure for XDG-compliant layered configuration.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Default settings applied to every CLI run
    #[serde(default)]
    pub defaults: Defaults,
}

/// Default settings applied to every CLI run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Default timeout in seconds (0 disables the timeout)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accumulate output without forwarding it live
    #[serde(default)]
    pub catch_output: bool,
}

fn default_timeout() -> u64 {
    0
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            catch_output: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.defaults.timeout, 0);
        assert!(!config.defaults.catch_output);
    }

    #[test]
    fn test_config_deserialization() {
        let config: Config = toml::from_str(
            r#"
            [defaults]
            timeout = 120
            catch_output = true
            "#,
        )
        .unwrap();

        assert_eq!(config.defaults.timeout, 120);
        assert!(config.defaults.catch_output);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [defaults]
            timeout = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.defaults.timeout, 60);
        assert!(!config.defaults.catch_output);
    }
}
