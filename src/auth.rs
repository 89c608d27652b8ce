use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

use crate::configuration::{ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_TENANT_ID};

/// Scope requested for every token; the Power BI REST API default resource.
pub const POWER_BI_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("environment variable {0} is not set")]
    MissingSecret(&'static str),
    #[error("HTTP error during token exchange: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("identity provider rejected the client-credential exchange: HTTP {status} {body}")]
    Rejected { status: u16, body: String },
    #[error("token response does not contain 'access_token'")]
    MissingAccessToken,
}

/// An opaque bearer token. Held in memory for the lifetime of one operation
/// only; never persisted.
#[derive(Debug, Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> AccessToken {
        AccessToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Narrow capability handed to every operation: produce one valid bearer
/// token. Implementations must not cache; each call is a fresh exchange.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire(&self) -> Result<AccessToken, CredentialError>;
}

/// Client-credentials flow against Azure AD. Secrets are read from the
/// process environment on every acquisition, matching the deployment model
/// where credentials can be rotated without a restart.
pub struct AzureTokenProvider {
    authority_base_url: String,
}

impl AzureTokenProvider {
    pub fn new(authority_base_url: impl Into<String>) -> AzureTokenProvider {
        AzureTokenProvider {
            authority_base_url: authority_base_url.into(),
        }
    }

    fn secret(name: &'static str) -> Result<String, CredentialError> {
        std::env::var(name)
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or(CredentialError::MissingSecret(name))
    }
}

#[async_trait]
impl TokenProvider for AzureTokenProvider {
    async fn acquire(&self) -> Result<AccessToken, CredentialError> {
        let client_id = Self::secret(ENV_CLIENT_ID)?;
        let client_secret = Self::secret(ENV_CLIENT_SECRET)?;
        let tenant_id = Self::secret(ENV_TENANT_ID)?;

        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_base_url, tenant_id
        );
        debug!("Requesting new token from {} for client {}", token_url, client_id);

        let params = [
            ("grant_type", "client_credentials"),
            ("scope", POWER_BI_SCOPE),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];

        let client = reqwest::Client::builder().user_agent("pbigate").build()?;
        let response = client.post(&token_url).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Token exchange failed with status {}: {}",
                status, &body
            );
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        match body.get("access_token").and_then(|v| v.as_str()) {
            Some(token) => {
                debug!("Token exchange successful");
                Ok(AccessToken::new(token))
            }
            None => Err(CredentialError::MissingAccessToken),
        }
    }
}
