use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_API_BASE_URL: &str = "https://api.powerbi.com/v1.0/myorg";
pub const DEFAULT_AUTHORITY_BASE_URL: &str = "https://login.microsoftonline.com";

/// Environment variables holding the Azure AD client credentials. They are
/// read at token-acquisition time, not at startup, so a missing secret
/// surfaces as a credential failure on the first request rather than a boot
/// failure.
pub const ENV_CLIENT_ID: &str = "PBI_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "PBI_CLIENT_SECRET";
pub const ENV_TENANT_ID: &str = "PBI_TENANT_ID";

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to resolve a directory for exported files; set PBI_EXPORT_DIR")]
    FailedToFindExportDirectory,
    #[error("invalid base URL {url:?}: {cause}")]
    InvalidBaseUrl {
        url: String,
        cause: url::ParseError,
    },
}

fn validate_base_url(url: &str) -> Result<(), ConfigurationError> {
    url::Url::parse(url).map_err(|cause| ConfigurationError::InvalidBaseUrl {
        url: url.to_string(),
        cause,
    })?;
    Ok(())
}

/// Process-level settings for the gateway. Base URLs are overridable through
/// the environment so tests can point the service at a local double.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    api_base_url: String,
    authority_base_url: String,
    export_directory: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Settings, ConfigurationError> {
        let api_base_url = std::env::var("PBI_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let authority_base_url = std::env::var("PBI_AUTHORITY_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_AUTHORITY_BASE_URL.to_string());

        validate_base_url(&api_base_url)?;
        validate_base_url(&authority_base_url)?;

        let export_directory = match std::env::var("PBI_EXPORT_DIR") {
            Ok(dir) => PathBuf::from(dir),
            // The original automation dropped exports into the user's
            // documents folder; keep that as the default.
            Err(_) => dirs::document_dir()
                .or_else(dirs::home_dir)
                .ok_or(ConfigurationError::FailedToFindExportDirectory)?,
        };

        debug!(
            "Settings: api base {}, authority {}, export directory {}",
            api_base_url,
            authority_base_url,
            export_directory.display()
        );

        Ok(Settings {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            authority_base_url: authority_base_url.trim_end_matches('/').to_string(),
            export_directory,
        })
    }

    pub fn new(
        api_base_url: impl Into<String>,
        authority_base_url: impl Into<String>,
        export_directory: PathBuf,
    ) -> Settings {
        Settings {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            authority_base_url: authority_base_url.into().trim_end_matches('/').to_string(),
            export_directory,
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn authority_base_url(&self) -> &str {
        &self.authority_base_url
    }

    pub fn export_directory(&self) -> &PathBuf {
        &self.export_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed_from_base_urls() {
        let settings = Settings::new(
            "https://api.powerbi.example/v1.0/myorg/",
            "https://login.example/",
            PathBuf::from("/tmp"),
        );
        assert_eq!(
            settings.api_base_url(),
            "https://api.powerbi.example/v1.0/myorg"
        );
        assert_eq!(settings.authority_base_url(), "https://login.example");
    }

    #[test]
    fn unparseable_base_urls_are_rejected() {
        assert!(validate_base_url("not a url").is_err());
        assert!(validate_base_url("https://api.powerbi.com/v1.0/myorg").is_ok());
    }
}
