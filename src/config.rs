// src/config.rs
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::errors::{Result, VerifyError};
use crate::expression::DEFAULT_MAX_SOURCE_LEN;
use crate::models::{AuthConfig, VerificationRequest};

/// Server and client settings loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub max_expression_len: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
            max_expression_len: DEFAULT_MAX_SOURCE_LEN,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("TASKCHECK_HOST")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or(defaults.host);
        let port = parse_var(&lookup, "TASKCHECK_PORT")?.unwrap_or(defaults.port);
        let request_timeout = parse_var::<u64, _>(&lookup, "TASKCHECK_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let max_expression_len =
            parse_var(&lookup, "TASKCHECK_MAX_EXPRESSION_LEN")?.unwrap_or(defaults.max_expression_len);

        if request_timeout.is_zero() {
            return Err(VerifyError::Config(
                "TASKCHECK_REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if max_expression_len == 0 {
            return Err(VerifyError::Config(
                "TASKCHECK_MAX_EXPRESSION_LEN must be greater than zero".to_string(),
            ));
        }

        Ok(AppConfig {
            host,
            port,
            request_timeout,
            max_expression_len,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| VerifyError::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
    }
}

/// A saved verification task, as used by the command-line tester.
///
/// ```toml
/// api_url = "https://example.test/claim"
/// expression = "return response.status === true && response.data === 1 ? 1 : 0;"
///
/// [auth]
/// type = "bearer"
/// token = "..."
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TaskFile {
    pub api_url: String,
    pub expression: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Used when no wallet address is given on the command line.
    #[serde(default)]
    pub wallet_address: Option<String>,
}

impl TaskFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn request_for(&self, wallet_address: &str) -> VerificationRequest {
        VerificationRequest {
            api_url: self.api_url.clone(),
            wallet_address: wallet_address.to_string(),
            verification_expression: self.expression.clone(),
            auth: self.auth.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("TASKCHECK_HOST", "127.0.0.1"),
            ("TASKCHECK_PORT", "9000"),
            ("TASKCHECK_REQUEST_TIMEOUT_SECS", " 5 "),
            ("TASKCHECK_MAX_EXPRESSION_LEN", "1024"),
        ]))
        .unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_expression_len, 1024);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = AppConfig::from_lookup(lookup_from(&[("TASKCHECK_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, VerifyError::Config(msg) if msg.starts_with("TASKCHECK_PORT has invalid value 'eighty'")));

        let err = AppConfig::from_lookup(lookup_from(&[("TASKCHECK_REQUEST_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, VerifyError::Config(_)));
    }

    #[test]
    fn test_task_file_parse() {
        let task = TaskFile::parse(
            r#"
            api_url = "https://example.test/claim"
            expression = "return response.ok ? 1 : 0;"

            [auth]
            type = "apiKey"
            api_key = "secret"
            header_key = "key"
            in_header = false
            "#,
        )
        .unwrap();

        assert_eq!(
            task.auth,
            AuthConfig::ApiKey {
                api_key: "secret".to_string(),
                header_key: "key".to_string(),
                in_header: false,
            }
        );
        let request = task.request_for("0xABC");
        assert_eq!(request.wallet_address, "0xABC");
        assert_eq!(request.verification_expression, "return response.ok ? 1 : 0;");
    }

    #[test]
    fn test_task_file_without_auth() {
        let task = TaskFile::parse("api_url = \"https://x.test\"\nexpression = \"return 1\"\nwallet_address = \"0x1\"\n").unwrap();
        assert_eq!(task.auth, AuthConfig::None);
        assert_eq!(task.wallet_address.as_deref(), Some("0x1"));
        assert!(matches!(TaskFile::parse("api_url = 1"), Err(VerifyError::TomlParse(_))));
    }
}
