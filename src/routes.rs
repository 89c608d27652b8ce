//! Inbound HTTP surface. Routes mirror the original automation triggers;
//! handlers translate path/query/body inputs into operation calls and map
//! the error taxonomy onto status codes (validation failures to 400,
//! everything else to 500 unless a handler preserves the upstream status).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::OperationError;
use crate::model::{
    AddUserRequest, CloneSpec, CreateWorkspaceRequest, UpdateParameterRequest, UploadRequest,
};
use crate::powerbi::{DeleteAll, PowerBi};

pub fn router(api: Arc<PowerBi>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/token", get(access_token))
        .route("/workspace/create", post(create_workspace))
        .route("/workspaces/all", get(list_workspaces))
        .route("/workspace/:workspace_id/addUser", post(add_user))
        .route("/workspaces/:workspace_id/reports", get(list_reports))
        .route("/workspaces/:workspace_id/semanticmodels", get(list_models))
        .route(
            "/workspaces/:workspace_id/reports/:report_id/clone-report",
            post(clone_report),
        )
        .route(
            "/workspaces/:workspace_id/reports/:report_id/clone-semantic-model",
            post(clone_model),
        )
        .route(
            "/workspaces/:workspace_id/reports/:report_id",
            delete(delete_report),
        )
        .route(
            "/workspace/:workspace_id/semanticmodel/:model_id",
            delete(delete_model),
        )
        .route(
            "/workspace/:workspace_id/semanticmodels/delete",
            delete(delete_all_models),
        )
        .route("/export", get(export_model))
        .route("/upload", post(upload_model))
        .route(
            "/workspace/:workspace_id/semanticmodel/:model_id/parameters",
            get(get_parameters),
        )
        .route(
            "/workspace/:workspace_id/semanticmodel/:model_id/updateparameter",
            post(update_parameter),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(api)
}

impl IntoResponse for OperationError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, self.to_string()).into_response()
    }
}

/// Passthrough responses relay the upstream JSON body unchanged.
fn json_body(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        body,
    )
        .into_response()
}

/// An absent or blank request body deserializes to the type's default; a
/// malformed one is a caller error, rejected before any outbound call.
fn parse_body<T>(body: &str) -> Result<T, OperationError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(body)
        .map_err(|_| OperationError::validation("unable to parse JSON body"))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "pbigate",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn access_token(State(api): State<Arc<PowerBi>>) -> Result<String, OperationError> {
    api.access_token().await
}

async fn create_workspace(State(api): State<Arc<PowerBi>>, body: String) -> Response {
    let request: CreateWorkspaceRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match api.create_workspace(request.workspace_name.as_deref()).await {
        Ok(body) => json_body(body),
        Err(err) => err.into_response(),
    }
}

async fn list_workspaces(State(api): State<Arc<PowerBi>>) -> Response {
    match api.list_workspaces().await {
        Ok(body) => json_body(body),
        Err(err) => err.into_response(),
    }
}

async fn add_user(
    State(api): State<Arc<PowerBi>>,
    Path(workspace_id): Path<String>,
    body: String,
) -> Response {
    let request: AddUserRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match api
        .add_user(
            &workspace_id,
            request.user_email.as_deref(),
            request.access_right.as_deref(),
        )
        .await
    {
        Ok(body) => json_body(body),
        Err(err) => err.into_response(),
    }
}

async fn list_reports(
    State(api): State<Arc<PowerBi>>,
    Path(workspace_id): Path<String>,
) -> Response {
    match api.list_reports(&workspace_id).await {
        Ok(body) => json_body(body),
        Err(err) => err.into_response(),
    }
}

async fn list_models(
    State(api): State<Arc<PowerBi>>,
    Path(workspace_id): Path<String>,
) -> Response {
    match api.list_models(&workspace_id).await {
        Ok(body) => json_body(body),
        Err(err) => err.into_response(),
    }
}

async fn clone_report(
    State(api): State<Arc<PowerBi>>,
    Path((workspace_id, report_id)): Path<(String, String)>,
    body: String,
) -> Response {
    let spec: CloneSpec = match parse_body(&body) {
        Ok(spec) => spec,
        Err(err) => return err.into_response(),
    };
    match api.clone_report(&workspace_id, &report_id, spec).await {
        Ok(id) => Json(serde_json::json!({ "clonedReportId": id })).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn clone_model(
    State(api): State<Arc<PowerBi>>,
    Path((workspace_id, report_id)): Path<(String, String)>,
    body: String,
) -> Response {
    let spec: CloneSpec = match parse_body(&body) {
        Ok(spec) => spec,
        Err(err) => return err.into_response(),
    };
    match api.clone_model(&workspace_id, &report_id, spec).await {
        Ok(id) => Json(serde_json::json!({ "clonedReportId": id })).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_report(
    State(api): State<Arc<PowerBi>>,
    Path((workspace_id, report_id)): Path<(String, String)>,
) -> Response {
    match api.delete_report(&workspace_id, &report_id).await {
        Ok(()) => (
            StatusCode::OK,
            format!("Successfully deleted report: {}", report_id),
        )
            .into_response(),
        // This handler preserves the upstream status for the statuses a
        // caller can act on; everything else collapses to the default map.
        Err(OperationError::Upstream { status: 404, .. }) => (
            StatusCode::NOT_FOUND,
            format!(
                "Report '{}' not found in workspace '{}'.",
                report_id, workspace_id
            ),
        )
            .into_response(),
        Err(OperationError::Upstream { status: 401, .. }) => (
            StatusCode::UNAUTHORIZED,
            "Unauthorized access. Please check your credentials.".to_string(),
        )
            .into_response(),
        Err(OperationError::Upstream { status: 403, .. }) => (
            StatusCode::FORBIDDEN,
            "Forbidden - Insufficient permissions.".to_string(),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_model(
    State(api): State<Arc<PowerBi>>,
    Path((workspace_id, model_id)): Path<(String, String)>,
) -> Response {
    match api.delete_model(&workspace_id, &model_id).await {
        Ok(()) => (
            StatusCode::OK,
            format!("Successfully deleted semantic model: {}", model_id),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_all_models(
    State(api): State<Arc<PowerBi>>,
    Path(workspace_id): Path<String>,
) -> Response {
    match api.delete_all_models(&workspace_id).await {
        Ok(DeleteAll::Empty) => {
            (StatusCode::OK, "No semantic models found.".to_string()).into_response()
        }
        Ok(DeleteAll::Deleted(_)) => (
            StatusCode::OK,
            "All semantic models deleted successfully.".to_string(),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(rename = "workspaceId", default)]
    workspace_id: Option<String>,
    #[serde(rename = "modelReportId", default)]
    model_report_id: Option<String>,
}

async fn export_model(
    State(api): State<Arc<PowerBi>>,
    Query(query): Query<ExportQuery>,
) -> Response {
    match api
        .export_model(
            query.workspace_id.as_deref(),
            query.model_report_id.as_deref(),
        )
        .await
    {
        Ok(path) => (StatusCode::OK, path.display().to_string()).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    #[serde(rename = "targetWorkspaceId", default)]
    target_workspace_id: Option<String>,
    #[serde(rename = "semanticModelName", default)]
    semantic_model_name: Option<String>,
}

async fn upload_model(
    State(api): State<Arc<PowerBi>>,
    Query(query): Query<UploadQuery>,
    body: String,
) -> Response {
    let request: UploadRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match api
        .upload_model(
            query.target_workspace_id.as_deref(),
            query.semantic_model_name.as_deref(),
            request.semantic_model_path.as_deref(),
        )
        .await
    {
        Ok(status) => (
            StatusCode::OK,
            format!("Successfully uploaded semantic model, status code: {}", status),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_parameters(
    State(api): State<Arc<PowerBi>>,
    Path((workspace_id, model_id)): Path<(String, String)>,
) -> Response {
    match api.get_parameters(&workspace_id, &model_id).await {
        Ok(body) => json_body(body),
        Err(err) => err.into_response(),
    }
}

async fn update_parameter(
    State(api): State<Arc<PowerBi>>,
    Path((workspace_id, model_id)): Path<(String, String)>,
    body: String,
) -> Response {
    let request: UpdateParameterRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match api
        .update_parameter(
            &workspace_id,
            &model_id,
            request.parameter_name.as_deref(),
            request.new_value.as_deref(),
        )
        .await
    {
        Ok(()) => (StatusCode::OK, "Parameter updated successfully.".to_string()).into_response(),
        // The upstream status and body are relayed unchanged for this
        // operation, matching the original trigger's behavior.
        Err(OperationError::Upstream { status, body }) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
