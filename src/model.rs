//! Wire shapes for inbound requests and upstream Power BI payloads.
//!
//! Inbound JSON is matched case-insensitively (the serde aliases cover the
//! PascalCase spellings the original callers used). Identifier fields are
//! opaque strings; the only validation anywhere is non-emptiness.

use serde::{Deserialize, Serialize};

/// Optional clone targets supplied by the caller. All three fields are
/// independently nullable; an absent request body is an empty spec.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CloneSpec {
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
    #[serde(default, rename = "targetWorkspaceId", alias = "TargetWorkspaceId")]
    pub target_workspace_id: Option<String>,
    #[serde(default, rename = "targetModelId", alias = "TargetModelId")]
    pub target_model_id: Option<String>,
}

impl CloneSpec {
    /// Whitespace-only names count as absent and trigger the name lookup.
    pub fn effective_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Body of the upstream `/Clone` POST. Unset targets must serialize as
/// explicit `null` fields, not omitted keys, so there is no
/// `skip_serializing_if` here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloneBody {
    pub name: String,
    #[serde(rename = "targetWorkspaceId")]
    pub target_workspace_id: Option<String>,
    #[serde(rename = "targetModelId")]
    pub target_model_id: Option<String>,
}

/// Dataset listing returned by `GET /groups/{id}/datasets`; used only
/// transiently by the delete-all workflow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelList {
    #[serde(default, alias = "Value")]
    pub value: Vec<ModelRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelRef {
    #[serde(alias = "Id")]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateWorkspaceRequest {
    #[serde(alias = "WorkspaceName", alias = "workspaceName", default)]
    pub workspace_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddUserRequest {
    #[serde(alias = "UserEmail", alias = "userEmail", default)]
    pub user_email: Option<String>,
    #[serde(alias = "AccessRight", alias = "accessRight", default)]
    pub access_right: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadRequest {
    #[serde(alias = "SemanticModelPath", alias = "semanticModelPath", default)]
    pub semantic_model_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateParameterRequest {
    #[serde(alias = "ParameterName", alias = "parameterName", default)]
    pub parameter_name: Option<String>,
    #[serde(alias = "NewValue", alias = "newValue", default)]
    pub new_value: Option<String>,
}
