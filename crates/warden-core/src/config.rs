//! Configuration for Warden
//!
//! Example config:
//! ```toml
//! [logging]
//! level = "info"
//! format = "pretty"
//!
//! [ldap]
//! host = "ldap.example.org"
//! port = "389"
//! base = "dc=example,dc=org"
//! bindDN = "cn=admin,dc=example,dc=org"
//! userFilter = "(uid=%s)"
//! groupFilter = "(memberUid=%s)"
//! ttl = "3600"
//! ```
//!
//! The `[ldap]` table is kept as raw strings; typing happens in the provider.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Prefix for environment variables that set a raw LDAP profile key
pub const LDAP_ENV_PREFIX: &str = "WARDEN_LDAP_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Raw directory profile, keyed by profile key name
    #[serde(default)]
    pub ldap: HashMap<String, String>,
}

impl WardenConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::ConfigRead {
            path: path.to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self::default();
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Overlay `WARDEN_*` variables on top of this configuration
    pub fn apply_env<I>(&mut self, vars: I) -> crate::Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if let Some(key) = name.strip_prefix(LDAP_ENV_PREFIX) {
                if !key.is_empty() {
                    self.ldap.insert(key.to_string(), value);
                }
                continue;
            }

            match name.as_str() {
                "WARDEN_LOG_LEVEL" => self.logging.level = value,
                "WARDEN_LOG_FORMAT" => self.logging.format = value.parse()?,
                _ => {}
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(crate::Error::InvalidArgument(format!(
                "unknown log format: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = WardenConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.ldap.is_empty());
    }

    #[test]
    fn test_ldap_table_keeps_raw_strings() {
        let config = WardenConfig::from_toml(
            r#"
            [logging]
            format = "json"

            [ldap]
            host = "ldap.example.org"
            port = "389"
            useSSL = "false"
            bindDN = "cn=admin,dc=example,dc=org"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.ldap["port"], "389");
        assert_eq!(config.ldap["bindDN"], "cn=admin,dc=example,dc=org");
    }

    #[test]
    fn test_non_string_ldap_value_is_rejected() {
        let err = WardenConfig::from_toml("[ldap]\nport = 389\n").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = WardenConfig::default();
        config.ldap.insert("host".to_string(), "old.example.org".to_string());

        config
            .apply_env(vars(&[
                ("WARDEN_LOG_LEVEL", "debug"),
                ("WARDEN_LDAP_host", "ldap.example.org"),
                ("WARDEN_LDAP_bindPassword", "s3cret"),
                ("WARDEN_LDAP_", "ignored"),
                ("HOME", "/root"),
            ]))
            .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.ldap["host"], "ldap.example.org");
        assert_eq!(config.ldap["bindPassword"], "s3cret");
        assert_eq!(config.ldap.len(), 2);
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = WardenConfig::default();
        let err = config
            .apply_env(vars(&[("WARDEN_LOG_FORMAT", "xml")]))
            .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidArgument(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ldap]\nttl = \"600\"").unwrap();

        let config = WardenConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.ldap["ttl"], "600");

        let missing = WardenConfig::from_file("/nonexistent/warden.toml").unwrap_err();
        assert!(matches!(missing, crate::Error::ConfigRead { .. }));
    }
}
