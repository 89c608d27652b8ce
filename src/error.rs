use thiserror::Error;

use crate::auth::CredentialError;
use crate::gateway::TransportError;
use crate::sink::SinkError;

/// Error taxonomy shared by every operation. All variants are terminal for
/// the current inbound request; nothing here is retried.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The identity exchange failed or returned no token.
    #[error("{0}")]
    Credential(#[from] CredentialError),

    /// Network-level failure reaching the upstream API.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Upstream reachable but rejected the call; the body is the raw
    /// upstream response, preserved verbatim for diagnostics.
    #[error("upstream API returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Mid-sequence failure of the delete-all workflow; names the model
    /// whose deletion failed. Earlier deletions are not undone.
    #[error("failed to delete semantic model {model_id} (status {status}): {body}")]
    ModelDeletion {
        model_id: String,
        status: u16,
        body: String,
    },

    /// A 2xx upstream response lacked an expected field; an upstream
    /// contract violation, not a caller error.
    #[error("upstream response does not contain '{field}'")]
    Schema { field: &'static str },

    /// Caller-supplied required input is missing or empty. Raised before
    /// any outbound call is made.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Sink(#[from] SinkError),
}

impl OperationError {
    pub fn validation(message: impl Into<String>) -> OperationError {
        OperationError::Validation(message.into())
    }

    /// Default HTTP status for the outbound response. Handlers that
    /// preserve specific upstream statuses (delete-report, update-parameter)
    /// override this at the route layer.
    pub fn status_code(&self) -> u16 {
        match self {
            OperationError::Validation(_) => 400,
            _ => 500,
        }
    }
}

/// Require a non-empty caller-supplied value; identifiers are opaque and get
/// no validation beyond this.
pub fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, OperationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OperationError::validation(format!("{} is required", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400_everything_else_to_500() {
        assert_eq!(OperationError::validation("name is required").status_code(), 400);
        assert_eq!(
            OperationError::Upstream {
                status: 404,
                body: "not found".to_string()
            }
            .status_code(),
            500
        );
        assert_eq!(OperationError::Schema { field: "id" }.status_code(), 500);
    }

    #[test]
    fn require_rejects_missing_and_blank_values() {
        assert!(require(None, "workspaceId").is_err());
        assert!(require(Some("  "), "workspaceId").is_err());
        assert_eq!(require(Some(" w1 "), "workspaceId").unwrap(), "w1");
    }
}
