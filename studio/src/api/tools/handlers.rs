//! Request handlers for the tool instance endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::instrument;

use crate::host::StudioHostState;
use crate::instances::{CreateToolInstance, InstanceError, UpdateToolInstance};

use super::types::{
    CreateToolInstanceRequest, CreateToolInstanceResponse, ListToolInstancesQuery,
    RemoveToolInstanceQuery, ToolInstanceResponse, UpdateToolInstanceRequest,
};

/// Transport-layer wrapper translating domain errors into HTTP responses.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] InstanceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InstanceError::WorkflowNotFound(_)
            | InstanceError::TemplateNotFound(_)
            | InstanceError::InstanceNotFound(_)
            | InstanceError::TempFileNotFound(_) => StatusCode::NOT_FOUND,
            InstanceError::Validation(_) => StatusCode::BAD_REQUEST,
            InstanceError::Bundle(_) | InstanceError::Database(_) | InstanceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// `POST /api/v1/tool-instances`
#[instrument(skip(state))]
pub async fn create_tool_instance(
    State(state): State<Arc<StudioHostState>>,
    Json(req): Json<CreateToolInstanceRequest>,
) -> Result<(StatusCode, Json<CreateToolInstanceResponse>), ApiError> {
    let outcome = state
        .manager()
        .create(CreateToolInstance {
            workflow_id: req.workflow_id,
            template_id: req.template_id,
            name: req.name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// `GET /api/v1/tool-instances`
#[instrument(skip(state))]
pub async fn list_tool_instances(
    State(state): State<Arc<StudioHostState>>,
    Query(query): Query<ListToolInstancesQuery>,
) -> Result<Json<Vec<ToolInstanceResponse>>, ApiError> {
    let views = state.manager().list(query.workflow_id.as_deref()).await?;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

/// `GET /api/v1/tool-instances/{id}`
#[instrument(skip(state))]
pub async fn get_tool_instance(
    State(state): State<Arc<StudioHostState>>,
    Path(id): Path<String>,
) -> Result<Json<ToolInstanceResponse>, ApiError> {
    let view = state.manager().get(&id).await?;
    Ok(Json(view.into()))
}

/// `PATCH /api/v1/tool-instances/{id}`
#[instrument(skip(state))]
pub async fn update_tool_instance(
    State(state): State<Arc<StudioHostState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateToolInstanceRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .manager()
        .update(UpdateToolInstance {
            instance_id: id,
            name: req.name,
            tmp_icon_path: req.tmp_icon_path,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/v1/tool-instances/{id}`
#[instrument(skip(state))]
pub async fn remove_tool_instance(
    State(state): State<Arc<StudioHostState>>,
    Path(id): Path<String>,
    Query(query): Query<RemoveToolInstanceQuery>,
) -> Result<StatusCode, ApiError> {
    state.manager().remove(&id, query.delete_directory).await?;
    Ok(StatusCode::NO_CONTENT)
}
