//! Configuration of a [`crate::VisaPlug`].
//!
//! The configuration is a plain struct that the host of a test run fills in, either in code via
//! the builder methods or by deserializing it with [`serde`] from whatever format the host uses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_TIMEOUT, OpenOptions};

/// The standard IEEE-488.2 identification query.
pub const DEFAULT_IDN_QUERY: &str = "*IDN?";

/// Name, default, and description of a configuration key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigKey {
    /// Name of the key in serialized form.
    pub name: &'static str,
    /// The default value, or `None` if the key is required.
    pub default: Option<&'static str>,
    /// Human-readable description.
    pub description: &'static str,
}

/// Configuration for discovering and connecting to an instrument.
///
/// When deserialized, only `ident_code` is required:
///
/// ```
/// use std::time::Duration;
/// use visaplug::PlugConfig;
///
/// let json = r#"{"ident_code": "MY4401", "timeout": 500}"#;
/// let config: PlugConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.timeout, Duration::from_millis(500));
/// assert_eq!(config.idn_query, "*IDN?");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlugConfig {
    /// Fragment of the identification (vendor, device name, serial number, or firmware version)
    /// or the exact resource address of the device to connect to. An empty string matches any
    /// device.
    pub ident_code: String,
    /// Timeout for opening and talking to the device. Serialized in milliseconds.
    #[serde(default = "default_timeout", with = "millis")]
    pub timeout: Duration,
    /// The query that the device answers with its identification.
    #[serde(default = "default_idn_query")]
    pub idn_query: String,
    /// Terminator for commands and responses. `None` or an empty string keeps the transport's
    /// default.
    #[serde(default)]
    pub termination: Option<String>,
}

impl PlugConfig {
    /// All configuration keys with their defaults and descriptions.
    pub const KEYS: [ConfigKey; 4] = [
        ConfigKey {
            name: "ident_code",
            default: None,
            description: "Part of the identification or the resource address of the device.",
        },
        ConfigKey {
            name: "timeout",
            default: Some("3000"),
            description: "Timeout in milliseconds for opening and talking to the device.",
        },
        ConfigKey {
            name: "idn_query",
            default: Some(DEFAULT_IDN_QUERY),
            description: "Query that the device answers with its identification.",
        },
        ConfigKey {
            name: "termination",
            default: Some("none"),
            description: "Terminator for commands and responses, none uses the transport default.",
        },
    ];

    /// Create a new configuration with default values for the given identification code.
    pub fn new(ident_code: &str) -> Self {
        Self {
            ident_code: ident_code.to_string(),
            ..Default::default()
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the identification query.
    pub fn with_idn_query(mut self, idn_query: &str) -> Self {
        self.idn_query = idn_query.to_string();
        self
    }

    /// Set the terminator for commands and responses.
    pub fn with_termination(mut self, termination: &str) -> Self {
        self.termination = Some(termination.to_string());
        self
    }

    /// Options to open resources with.
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            timeout: self.timeout,
            termination: self.termination.clone(),
        }
    }
}

impl Default for PlugConfig {
    fn default() -> Self {
        Self {
            ident_code: String::new(),
            timeout: default_timeout(),
            idn_query: default_idn_query(),
            termination: None,
        }
    }
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_idn_query() -> String {
    DEFAULT_IDN_QUERY.to_string()
}

/// (De)serialize a [`Duration`] as whole milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlugConfig::new("SN01");
        assert_eq!(config.ident_code, "SN01");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.idn_query, "*IDN?");
        assert_eq!(config.termination, None);
    }

    #[test]
    fn test_keys_match_defaults() {
        let config = PlugConfig::default();
        assert_eq!(
            PlugConfig::KEYS[1].default,
            Some(config.timeout.as_millis().to_string().as_str())
        );
        assert_eq!(PlugConfig::KEYS[2].default, Some(config.idn_query.as_str()));
    }

    #[test]
    fn test_open_options() {
        let config = PlugConfig::new("")
            .with_timeout(Duration::from_millis(250))
            .with_termination("\r\n");
        let options = config.open_options();
        assert_eq!(options.timeout, Duration::from_millis(250));
        assert_eq!(options.termination.as_deref(), Some("\r\n"));
    }
}
