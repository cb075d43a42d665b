//! Appwrite connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENDPOINT_VAR: &str = "APPWRITE_ENDPOINT";
pub const PROJECT_ID_VAR: &str = "APPWRITE_PROJECT_ID";
pub const PLATFORM_VAR: &str = "APPWRITE_PLATFORM";
pub const REDIRECT_URI_VAR: &str = "APPWRITE_REDIRECT_URI";
pub const REQUEST_TIMEOUT_VAR: &str = "APPWRITE_REQUEST_TIMEOUT_SECS";

/// Bundle identifier reported when none is configured.
pub const DEFAULT_PLATFORM: &str = "com.issath.realestate";

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// OAuth2 identity providers offered at sign-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    #[default]
    Google,
    Apple,
    Github,
    Microsoft,
}

impl OAuthProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Apple => "apple",
            Self::Github => "github",
            Self::Microsoft => "microsoft",
        }
    }
}

/// Appwrite project settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppwriteConfig {
    /// API endpoint, including the version path (e.g. `https://cloud.appwrite.io/v1`).
    pub endpoint: String,
    pub project_id: String,
    /// App bundle identifier.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Deep link the OAuth flow returns to. Defaults to the project's
    /// `appwrite-callback-<project>://` scheme.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub oauth_provider: OAuthProvider,
    /// Per-request timeout in seconds; unset means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_owned()
}

impl AppwriteConfig {
    /// Create a config with defaults for everything but endpoint and project.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            project_id: project_id.into(),
            platform: default_platform(),
            redirect_uri: None,
            oauth_provider: OAuthProvider::default(),
            request_timeout_secs: None,
        }
    }

    /// Load from `APPWRITE_ENDPOINT`, `APPWRITE_PROJECT_ID`, and the optional
    /// `APPWRITE_PLATFORM`, `APPWRITE_REDIRECT_URI`, `APPWRITE_REQUEST_TIMEOUT_SECS`.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or a value is malformed.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let mut config = Self::new(required(ENDPOINT_VAR)?, required(PROJECT_ID_VAR)?);
        if let Some(platform) = lookup(PLATFORM_VAR) {
            config.platform = platform;
        }
        config.redirect_uri = lookup(REDIRECT_URI_VAR);
        config.request_timeout_secs = lookup(REQUEST_TIMEOUT_VAR)
            .map(|value| {
                value.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: REQUEST_TIMEOUT_VAR,
                    value,
                })
            })
            .transpose()?;

        Ok(config)
    }

    /// Deep link the OAuth flow redirects to.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| format!("appwrite-callback-{}://", self.project_id))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_vars_applies_defaults() {
        let config = AppwriteConfig::from_vars(vars(&[
            (ENDPOINT_VAR, "https://cloud.appwrite.io/v1"),
            (PROJECT_ID_VAR, "estate"),
        ]))
        .unwrap();

        assert_eq!(config.platform, DEFAULT_PLATFORM);
        assert_eq!(config.redirect_uri(), "appwrite-callback-estate://");
        assert_eq!(config.oauth_provider, OAuthProvider::Google);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_from_vars_reports_first_missing() {
        let err = AppwriteConfig::from_vars(vars(&[(PROJECT_ID_VAR, "estate")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENDPOINT_VAR)));

        let err = AppwriteConfig::from_vars(vars(&[
            (ENDPOINT_VAR, "https://cloud.appwrite.io/v1"),
            (PROJECT_ID_VAR, " "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(PROJECT_ID_VAR)));
    }

    #[test]
    fn test_from_vars_rejects_bad_timeout() {
        let err = AppwriteConfig::from_vars(vars(&[
            (ENDPOINT_VAR, "https://cloud.appwrite.io/v1"),
            (PROJECT_ID_VAR, "estate"),
            (REQUEST_TIMEOUT_VAR, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: AppwriteConfig = serde_json::from_str(
            r#"{"endpoint":"https://cloud.appwrite.io/v1","project_id":"estate","oauth_provider":"github"}"#,
        )
        .unwrap();
        assert_eq!(config.platform, DEFAULT_PLATFORM);
        assert_eq!(config.oauth_provider, OAuthProvider::Github);
    }
}
