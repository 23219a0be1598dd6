//! Runtime configuration for the backend client. Values come from
//! environment variables so deployments can change endpoints without a
//! rebuild. The API key is public (row access is enforced server-side),
//! but it is still held as a secret to keep it out of logs.

use crate::error::ClientError;
use secrecy::SecretString;
use std::env;
use url::Url;

const ENV_BACKEND_URL: &str = "ACCESO_BACKEND_URL";
const ENV_API_KEY: &str = "ACCESO_API_KEY";
const ENV_SITE_URL: &str = "ACCESO_SITE_URL";

/// Connection settings for the hosted backend.
#[derive(Clone, Debug)]
pub struct Config {
    base_url: String,
    api_key: SecretString,
    site_url: String,
}

impl Config {
    /// Builds a config from explicit values, validating both URLs.
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        site_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let base_url = validated_url(&base_url.into(), "backend URL")?;
        let site_url = validated_url(&site_url.into(), "site URL")?;

        Ok(Self {
            base_url,
            api_key,
            site_url,
        })
    }

    /// Loads the config from `ACCESO_BACKEND_URL`, `ACCESO_API_KEY` and
    /// `ACCESO_SITE_URL`.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = required_env(ENV_BACKEND_URL)?;
        let api_key = SecretString::from(required_env(ENV_API_KEY)?);
        let site_url = required_env(ENV_SITE_URL)?;

        Self::new(base_url, api_key, site_url)
    }

    /// Base URL of the hosted backend, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public API key sent with every request.
    #[must_use]
    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// Origin of the application, used for redirect targets.
    #[must_use]
    pub fn site_url(&self) -> &str {
        &self.site_url
    }
}

/// Reads a required environment variable, rejecting empty values.
fn required_env(name: &str) -> Result<String, ClientError> {
    let value = env::var(name)
        .map_err(|_| ClientError::Config(format!("{name} is not set")))?
        .trim()
        .to_string();

    if value.is_empty() {
        return Err(ClientError::Config(format!("{name} is empty")));
    }

    Ok(value)
}

/// Parses a URL and normalizes it to have no trailing slash.
fn validated_url(value: &str, what: &str) -> Result<String, ClientError> {
    let trimmed = value.trim();
    Url::parse(trimmed).map_err(|err| ClientError::Config(format!("invalid {what}: {err}")))?;

    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn from_env_reads_all_values() {
        temp_env::with_vars(
            [
                (ENV_BACKEND_URL, Some("https://backend.acceso.app/")),
                (ENV_API_KEY, Some("public-key")),
                (ENV_SITE_URL, Some("https://acceso.app")),
            ],
            || {
                let config = Config::from_env().expect("config should load");
                assert_eq!(config.base_url(), "https://backend.acceso.app");
                assert_eq!(config.api_key().expose_secret(), "public-key");
                assert_eq!(config.site_url(), "https://acceso.app");
            },
        );
    }

    #[test]
    fn from_env_rejects_missing_backend_url() {
        temp_env::with_vars(
            [
                (ENV_BACKEND_URL, None),
                (ENV_API_KEY, Some("public-key")),
                (ENV_SITE_URL, Some("https://acceso.app")),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }

    #[test]
    fn from_env_rejects_blank_api_key() {
        temp_env::with_vars(
            [
                (ENV_BACKEND_URL, Some("https://backend.acceso.app")),
                (ENV_API_KEY, Some("   ")),
                (ENV_SITE_URL, Some("https://acceso.app")),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }

    #[test]
    fn new_rejects_invalid_urls() {
        let result = Config::new(
            "not a url",
            SecretString::from("key".to_string()),
            "https://acceso.app",
        );
        assert!(result.is_err());
    }

    #[test]
    fn new_trims_trailing_slash() {
        let config = Config::new(
            "https://backend.acceso.app/",
            SecretString::from("key".to_string()),
            "https://acceso.app/",
        )
        .expect("config should build");
        assert_eq!(config.base_url(), "https://backend.acceso.app");
        assert_eq!(config.site_url(), "https://acceso.app");
    }
}
