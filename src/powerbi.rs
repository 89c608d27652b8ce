//! Operations against the Power BI REST API. One method per capability;
//! every method resolves a credential first and only then talks to the
//! gateway, so no upstream call ever goes out without a bearer token.
//! Required caller inputs are validated before the credential step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{AccessToken, TokenProvider};
use crate::error::{require, OperationError};
use crate::gateway::{Gateway, UpstreamOutcome, UpstreamRequest};
use crate::model::{CloneBody, CloneSpec, ModelList};
use crate::sink::BlobSink;

/// Result of the delete-all workflow. An empty workspace is an observably
/// distinct no-op so callers can tell it apart from an aggregate success.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteAll {
    /// The workspace held no semantic models; zero deletions were issued.
    Empty,
    /// All models were deleted, in upstream list order.
    Deleted(usize),
}

pub struct PowerBi {
    tokens: Arc<dyn TokenProvider>,
    gateway: Arc<dyn Gateway>,
    sink: Arc<dyn BlobSink>,
    base_url: String,
}

impl PowerBi {
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        gateway: Arc<dyn Gateway>,
        sink: Arc<dyn BlobSink>,
        base_url: impl Into<String>,
    ) -> PowerBi {
        PowerBi {
            tokens,
            gateway,
            sink,
            base_url: base_url.into(),
        }
    }

    async fn bearer(&self) -> Result<AccessToken, OperationError> {
        Ok(self.tokens.acquire().await?)
    }

    /// Raw token passthrough, mirroring the original GetAccessKey trigger.
    pub async fn access_token(&self) -> Result<String, OperationError> {
        let token = self.bearer().await?;
        Ok(token.as_str().to_string())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Collapses an outcome into the raw upstream body, surfacing non-2xx
    /// responses as `Upstream` errors with the body preserved verbatim.
    fn passthrough(outcome: UpstreamOutcome) -> Result<String, OperationError> {
        match outcome {
            UpstreamOutcome::Success { body, .. } => {
                Ok(String::from_utf8_lossy(&body).into_owned())
            }
            UpstreamOutcome::Failure { status, body } => {
                Err(OperationError::Upstream { status, body })
            }
        }
    }

    /// Extracts a required top-level string field from a 2xx JSON body.
    /// Absence is a schema violation, distinct from an HTTP failure.
    fn expect_field(body: &[u8], field: &'static str) -> Result<String, OperationError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|_| OperationError::Schema { field })?;
        value
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(OperationError::Schema { field })
    }

    pub async fn create_workspace(&self, name: Option<&str>) -> Result<String, OperationError> {
        let name = require(name, "workspace name")?;
        info!("Creating workspace {:?}...", name);

        let token = self.bearer().await?;
        let body = serde_json::json!({ "name": name, "type": "Workspace" });
        let request = UpstreamRequest::post_json(self.url("/groups"), body);
        Self::passthrough(self.gateway.call(&token, request).await?)
    }

    pub async fn list_workspaces(&self) -> Result<String, OperationError> {
        info!("Retrieving all workspaces...");
        let token = self.bearer().await?;
        let request = UpstreamRequest::get(self.url("/groups"));
        Self::passthrough(self.gateway.call(&token, request).await?)
    }

    pub async fn add_user(
        &self,
        workspace_id: &str,
        user_email: Option<&str>,
        access_right: Option<&str>,
    ) -> Result<String, OperationError> {
        let workspace_id = require(Some(workspace_id), "workspaceId")?;
        let user_email = require(user_email, "user email")?;
        let access_right = require(access_right, "access right")?;
        info!("Adding user to workspace {}...", workspace_id);

        let token = self.bearer().await?;
        let body = serde_json::json!({
            "identifier": user_email,
            "groupUserAccessRight": access_right,
            "principalType": "User"
        });
        let request =
            UpstreamRequest::post_json(self.url(&format!("/groups/{}/users", workspace_id)), body);
        Self::passthrough(self.gateway.call(&token, request).await?)
    }

    pub async fn list_reports(&self, workspace_id: &str) -> Result<String, OperationError> {
        let workspace_id = require(Some(workspace_id), "workspaceId")?;
        info!("Listing reports in workspace {}...", workspace_id);

        let token = self.bearer().await?;
        let request = UpstreamRequest::get(self.url(&format!("/groups/{}/reports", workspace_id)));
        Self::passthrough(self.gateway.call(&token, request).await?)
    }

    pub async fn list_models(&self, workspace_id: &str) -> Result<String, OperationError> {
        let workspace_id = require(Some(workspace_id), "workspaceId")?;
        info!("Listing semantic models in workspace {}...", workspace_id);

        let token = self.bearer().await?;
        let request = UpstreamRequest::get(self.url(&format!("/groups/{}/datasets", workspace_id)));
        Self::passthrough(self.gateway.call(&token, request).await?)
    }

    pub async fn clone_report(
        &self,
        workspace_id: &str,
        report_id: &str,
        spec: CloneSpec,
    ) -> Result<String, OperationError> {
        info!(
            "Cloning report {} in workspace {}...",
            report_id, workspace_id
        );
        self.clone_with_lookup(workspace_id, report_id, spec).await
    }

    pub async fn clone_model(
        &self,
        workspace_id: &str,
        report_id: &str,
        spec: CloneSpec,
    ) -> Result<String, OperationError> {
        info!(
            "Cloning semantic model via report {} in workspace {}...",
            report_id, workspace_id
        );
        self.clone_with_lookup(workspace_id, report_id, spec).await
    }

    /// Clone workflow shared by both clone operations: when the caller did
    /// not supply a name, the source report is fetched first and its name
    /// reused. Not idempotent; every successful call creates a new resource.
    async fn clone_with_lookup(
        &self,
        workspace_id: &str,
        report_id: &str,
        spec: CloneSpec,
    ) -> Result<String, OperationError> {
        let workspace_id = require(Some(workspace_id), "workspaceId")?;
        let report_id = require(Some(report_id), "reportId")?;

        let token = self.bearer().await?;

        let name = match spec.effective_name() {
            Some(name) => name.to_string(),
            None => {
                debug!("No clone name provided; fetching the source report name");
                self.original_report_name(&token, workspace_id, report_id)
                    .await?
            }
        };

        let body = CloneBody {
            name,
            target_workspace_id: spec.target_workspace_id,
            target_model_id: spec.target_model_id,
        };
        let request = UpstreamRequest::post_json(
            self.url(&format!(
                "/groups/{}/reports/{}/Clone",
                workspace_id, report_id
            )),
            serde_json::to_value(&body)?,
        );

        match self.gateway.call(&token, request).await? {
            UpstreamOutcome::Success { body, .. } => {
                let id = Self::expect_field(&body, "id")?;
                info!("Clone successful; new resource id {}", id);
                Ok(id)
            }
            UpstreamOutcome::Failure { status, body } => {
                Err(OperationError::Upstream { status, body })
            }
        }
    }

    async fn original_report_name(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<String, OperationError> {
        let request = UpstreamRequest::get(self.url(&format!(
            "/groups/{}/reports/{}",
            workspace_id, report_id
        )));
        match self.gateway.call(token, request).await? {
            UpstreamOutcome::Success { body, .. } => Self::expect_field(&body, "name"),
            UpstreamOutcome::Failure { status, body } => {
                Err(OperationError::Upstream { status, body })
            }
        }
    }

    pub async fn delete_report(
        &self,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<(), OperationError> {
        let workspace_id = require(Some(workspace_id), "workspaceId")?;
        let report_id = require(Some(report_id), "reportId")?;
        info!(
            "Deleting report {} in workspace {}...",
            report_id, workspace_id
        );

        let token = self.bearer().await?;
        let request = UpstreamRequest::delete(self.url(&format!(
            "/groups/{}/reports/{}",
            workspace_id, report_id
        )));
        match self.gateway.call(&token, request).await? {
            UpstreamOutcome::Success { .. } => Ok(()),
            UpstreamOutcome::Failure { status, body } => {
                Err(OperationError::Upstream { status, body })
            }
        }
    }

    pub async fn delete_model(
        &self,
        workspace_id: &str,
        model_id: &str,
    ) -> Result<(), OperationError> {
        let workspace_id = require(Some(workspace_id), "workspaceId")?;
        let model_id = require(Some(model_id), "modelId")?;
        info!(
            "Deleting semantic model {} in workspace {}...",
            model_id, workspace_id
        );

        let token = self.bearer().await?;
        let request = UpstreamRequest::delete(self.url(&format!(
            "/groups/{}/datasets/{}",
            workspace_id, model_id
        )));
        match self.gateway.call(&token, request).await? {
            UpstreamOutcome::Success { .. } => Ok(()),
            UpstreamOutcome::Failure { status, body } => {
                Err(OperationError::Upstream { status, body })
            }
        }
    }

    /// Delete-all workflow: list the workspace's models, then delete each in
    /// upstream list order. Fails fast on the first failed deletion, naming
    /// the model and preserving the upstream body; earlier deletions are not
    /// undone.
    pub async fn delete_all_models(&self, workspace_id: &str) -> Result<DeleteAll, OperationError> {
        let workspace_id = require(Some(workspace_id), "workspaceId")?;
        info!(
            "Deleting all semantic models in workspace {}...",
            workspace_id
        );

        let token = self.bearer().await?;
        let list_request =
            UpstreamRequest::get(self.url(&format!("/groups/{}/datasets", workspace_id)));
        let models = match self.gateway.call(&token, list_request).await? {
            UpstreamOutcome::Success { body, .. } => {
                let list: ModelList = serde_json::from_slice(&body)
                    .map_err(|_| OperationError::Schema { field: "value" })?;
                list.value
            }
            UpstreamOutcome::Failure { status, body } => {
                return Err(OperationError::Upstream { status, body });
            }
        };

        if models.is_empty() {
            warn!("No semantic models found in workspace {}", workspace_id);
            return Ok(DeleteAll::Empty);
        }

        let total = models.len();
        for model in models {
            debug!("Deleting semantic model {}...", model.id);
            let request = UpstreamRequest::delete(self.url(&format!(
                "/groups/{}/datasets/{}",
                workspace_id, model.id
            )));
            if let UpstreamOutcome::Failure { status, body } =
                self.gateway.call(&token, request).await?
            {
                return Err(OperationError::ModelDeletion {
                    model_id: model.id,
                    status,
                    body,
                });
            }
        }

        info!("Deleted {} semantic models", total);
        Ok(DeleteAll::Deleted(total))
    }

    /// Downloads the report with its model as a `.pbix` binary and hands the
    /// bytes to the blob sink under a fresh unique name.
    pub async fn export_model(
        &self,
        workspace_id: Option<&str>,
        report_id: Option<&str>,
    ) -> Result<PathBuf, OperationError> {
        let workspace_id = require(workspace_id, "workspaceId")?;
        let report_id = require(report_id, "modelReportId")?;
        info!(
            "Exporting report {} from workspace {}...",
            report_id, workspace_id
        );

        let token = self.bearer().await?;
        let request = UpstreamRequest::get(self.url(&format!(
            "/groups/{}/reports/{}/Export?downloadType=IncludeModel",
            workspace_id, report_id
        )));
        match self.gateway.call(&token, request).await? {
            UpstreamOutcome::Success { body, .. } => {
                let file_name = format!("{}.pbix", Uuid::new_v4());
                Ok(self.sink.store(&file_name, &body).await?)
            }
            UpstreamOutcome::Failure { status, body } => {
                Err(OperationError::Upstream { status, body })
            }
        }
    }

    /// Streams a local `.pbix` file to the imports endpoint as multipart
    /// form content. Returns the upstream status, which distinguishes an
    /// immediate import (200) from a queued one (202).
    pub async fn upload_model(
        &self,
        workspace_id: Option<&str>,
        model_name: Option<&str>,
        model_path: Option<&str>,
    ) -> Result<u16, OperationError> {
        let workspace_id = require(workspace_id, "targetWorkspaceId")?;
        let model_name = require(model_name, "semanticModelName")?;
        let model_path = require(model_path, "semanticModelPath")?;
        info!(
            "Uploading semantic model {:?} to workspace {}...",
            model_name, workspace_id
        );

        let bytes = tokio::fs::read(model_path).await?;
        let file_name = Path::new(model_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model.pbix".to_string());

        let token = self.bearer().await?;
        let request = UpstreamRequest::post_file(
            self.url(&format!(
                "/groups/{}/imports?datasetDisplayName={}",
                workspace_id, model_name
            )),
            file_name,
            bytes,
        );
        match self.gateway.call(&token, request).await? {
            UpstreamOutcome::Success { status, .. } => {
                info!(
                    "{}",
                    if status == 200 {
                        "Upload successful"
                    } else {
                        "Upload in queue"
                    }
                );
                Ok(status)
            }
            UpstreamOutcome::Failure { status, body } => {
                Err(OperationError::Upstream { status, body })
            }
        }
    }

    pub async fn get_parameters(
        &self,
        workspace_id: &str,
        model_id: &str,
    ) -> Result<String, OperationError> {
        let workspace_id = require(Some(workspace_id), "workspaceId")?;
        let model_id = require(Some(model_id), "modelId")?;
        info!(
            "Retrieving parameters for semantic model {} in workspace {}...",
            model_id, workspace_id
        );

        let token = self.bearer().await?;
        let request = UpstreamRequest::get(self.url(&format!(
            "/groups/{}/datasets/{}/parameters",
            workspace_id, model_id
        )));
        Self::passthrough(self.gateway.call(&token, request).await?)
    }

    pub async fn update_parameter(
        &self,
        workspace_id: &str,
        model_id: &str,
        parameter_name: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<(), OperationError> {
        let workspace_id = require(Some(workspace_id), "workspaceId")?;
        let model_id = require(Some(model_id), "modelId")?;
        let parameter_name = require(parameter_name, "parameter name")?;
        let new_value = require(new_value, "new value")?;
        info!(
            "Updating parameter {:?} for semantic model {} in workspace {}...",
            parameter_name, model_id, workspace_id
        );

        let token = self.bearer().await?;
        let body = serde_json::json!({
            "updateDetails": [
                { "name": parameter_name, "newValue": new_value }
            ]
        });
        let request = UpstreamRequest::post_json(
            self.url(&format!(
                "/groups/{}/datasets/{}/UpdateParameters",
                workspace_id, model_id
            )),
            body,
        );
        match self.gateway.call(&token, request).await? {
            UpstreamOutcome::Success { .. } => Ok(()),
            UpstreamOutcome::Failure { status, body } => {
                Err(OperationError::Upstream { status, body })
            }
        }
    }
}
