//! Configuration loading and representation.
//!
//! Settings come from `config/<profile>.toml` (or an explicit file), with the
//! secret-bearing values overridable from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jobs::RetryPolicy;

/// Environment variable holding the JSON secret document.
pub const ENV_SECRETS: &str = "UFBATCH_SECRETS";
/// Environment variable overriding the common API domain directly.
pub const ENV_COMMON_DOMAIN: &str = "UFBATCH_COMMON_DOMAIN";
/// Environment variable overriding the export directory.
pub const ENV_EXPORT_PATH: &str = "UFBATCH_EXPORT_PATH";

pub const DEFAULT_PROFILE: &str = "local";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid secret document in {ENV_SECRETS}: {0}")]
    Secrets(#[source] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub batch: BatchSettings,
    pub api: ApiSettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Directory intermediate result files are written to.
    pub export_path: PathBuf,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            export_path: PathBuf::from("./export"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub protocol: String,
    pub port: String,
    pub common_domain: String,
    pub connection_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub output_tasks_path: String,
    /// Contains a `{taskId}` placeholder.
    pub put_output_tasks_path: String,
    pub sid_attribute_path: String,
    pub s3_path: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            port: "8080".to_string(),
            common_domain: "localhost".to_string(),
            connection_timeout_secs: 5,
            read_timeout_secs: 5,
            output_tasks_path: "/api/v1/outputtasks".to_string(),
            put_output_tasks_path: "/api/v1/outputtasks/{taskId}".to_string(),
            sid_attribute_path: "/api/v1/sidattribute".to_string(),
            s3_path: "/api/v1/s3".to_string(),
        }
    }
}

impl ApiSettings {
    /// `protocol://domain:port` of the common API.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.common_domain, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff_millis: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_millis: 60_000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_millis(self.backoff_millis))
    }
}

/// Secret document as stored by the secret manager.
#[derive(Debug, Deserialize)]
struct SecretsValue {
    #[serde(rename = "ECS-COMMON-DOMAIN")]
    common_domain: Option<String>,
}

impl Settings {
    /// Load settings for a profile.
    ///
    /// An explicit `path` must exist. Without one, `config/<profile>.toml` is
    /// used when present and built-in defaults otherwise. Environment
    /// overrides are applied last, then the result is validated.
    pub fn load(profile: &str, path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::profile_path(profile);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    tracing::debug!(
                        profile,
                        path = %default_path.display(),
                        "no config file for profile, using defaults"
                    );
                    Self::default()
                }
            }
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn profile_path(profile: &str) -> PathBuf {
        PathBuf::from("config").join(format!("{profile}.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// `UFBATCH_COMMON_DOMAIN` wins over the domain found in `UFBATCH_SECRETS`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_SECRETS) {
            let secrets: SecretsValue =
                serde_json::from_str(&raw).map_err(ConfigError::Secrets)?;
            if let Some(domain) = secrets.common_domain {
                self.api.common_domain = domain;
            }
        }

        if let Some(domain) = lookup(ENV_COMMON_DOMAIN) {
            self.api.common_domain = domain;
        }

        if let Some(export_path) = lookup(ENV_EXPORT_PATH) {
            self.batch.export_path = PathBuf::from(export_path);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !matches!(self.api.protocol.as_str(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "api.protocol must be http or https, got {:?}",
                self.api.protocol
            )));
        }
        if self.api.common_domain.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "api.common_domain must not be empty".to_string(),
            ));
        }
        if !self.api.put_output_tasks_path.contains("{taskId}") {
            return Err(ConfigError::Invalid(
                "api.put_output_tasks_path must contain {taskId}".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.api.base_url(), "http://localhost:8080");
        assert_eq!(settings.retry.policy(), RetryPolicy::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[batch]
export_path = "/var/tmp/ufbatch"

[api]
protocol = "https"
port = "443"

[retry]
backoff_millis = 10
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.batch.export_path, PathBuf::from("/var/tmp/ufbatch"));
        assert_eq!(settings.api.base_url(), "https://localhost:443");
        assert_eq!(settings.api.sid_attribute_path, "/api/v1/sidattribute");
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.backoff_millis, 10);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Settings::load("local", Some(Path::new("/nonexistent/ufbatch.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retry]\nmax_attempts = \"three\"").unwrap();
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn secret_document_sets_common_domain() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[(ENV_SECRETS, r#"{"ECS-COMMON-DOMAIN":"api.internal"}"#)]))
            .unwrap();
        assert_eq!(settings.api.common_domain, "api.internal");
    }

    #[test]
    fn direct_domain_override_wins_over_secrets() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                (ENV_SECRETS, r#"{"ECS-COMMON-DOMAIN":"from-secrets"}"#),
                (ENV_COMMON_DOMAIN, "from-env"),
                (ENV_EXPORT_PATH, "/data/out"),
            ]))
            .unwrap();
        assert_eq!(settings.api.common_domain, "from-env");
        assert_eq!(settings.batch.export_path, PathBuf::from("/data/out"));
    }

    #[test]
    fn malformed_secret_document_is_rejected() {
        let mut settings = Settings::default();
        let err = settings.apply_env(env(&[(ENV_SECRETS, "not json")])).unwrap_err();
        assert!(matches!(err, ConfigError::Secrets(_)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.retry.max_attempts = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.api.protocol = "ftp".into();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.api.common_domain = " ".into();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.api.put_output_tasks_path = "/api/v1/outputtasks".into();
        assert!(settings.validate().is_err());
    }
}
