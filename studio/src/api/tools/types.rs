//! Wire types for the tool instance endpoints.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::instances::{CreateOutcome, ToolInstanceView};
use crate::params::UserParameter;

/// Body of `POST /api/v1/tool-instances`.
#[derive(Debug, Deserialize)]
pub struct CreateToolInstanceRequest {
    /// Owning workflow id.
    pub workflow_id: String,
    /// Template to copy from; the default bundle when absent.
    pub template_id: Option<String>,
    /// Display name override.
    pub name: Option<String>,
}

/// Response to a successful create.
#[derive(Debug, Serialize)]
pub struct CreateToolInstanceResponse {
    /// The new instance id.
    pub id: String,
    /// The resolved display name.
    pub name: String,
}

impl From<CreateOutcome> for CreateToolInstanceResponse {
    fn from(outcome: CreateOutcome) -> Self {
        Self {
            id: outcome.id.as_str().to_string(),
            name: outcome.name,
        }
    }
}

/// Body of `PATCH /api/v1/tool-instances/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateToolInstanceRequest {
    /// New display name, if any.
    pub name: Option<String>,
    /// Server-local temporary file holding a replacement icon, if any.
    pub tmp_icon_path: Option<PathBuf>,
}

/// Query of `GET /api/v1/tool-instances`.
#[derive(Debug, Deserialize)]
pub struct ListToolInstancesQuery {
    /// Restrict the listing to one workflow.
    pub workflow_id: Option<String>,
}

/// Query of `DELETE /api/v1/tool-instances/{id}`.
#[derive(Debug, Deserialize)]
pub struct RemoveToolInstanceQuery {
    /// Whether to also delete the bundle directory. Defaults to true.
    #[serde(default = "default_delete_directory")]
    pub delete_directory: bool,
}

fn default_delete_directory() -> bool {
    true
}

/// A declared user parameter, as serialized on the wire.
#[derive(Debug, Serialize)]
pub struct UserParameterResponse {
    /// Field name.
    pub name: String,
    /// Declared type annotation, if any.
    pub type_hint: Option<String>,
}

impl From<UserParameter> for UserParameterResponse {
    fn from(param: UserParameter) -> Self {
        Self {
            name: param.name,
            type_hint: param.type_hint,
        }
    }
}

/// Full tool instance representation returned by get and list.
#[derive(Debug, Serialize)]
pub struct ToolInstanceResponse {
    /// Instance id.
    pub id: String,
    /// Owning workflow id.
    pub workflow_id: String,
    /// Display name.
    pub name: String,
    /// Absolute bundle directory on the server.
    pub source_folder_path: String,
    /// Live contents of the code file.
    pub code: String,
    /// Live contents of the dependency manifest.
    pub requirements: String,
    /// Parameters declared by the code.
    pub user_params: Vec<UserParameterResponse>,
    /// Whether the bundle read and parameter scan succeeded.
    pub is_valid: bool,
    /// Icon location relative to the assets root; empty when unset.
    pub icon_uri: String,
    /// Whether the instance runs in its own isolated environment.
    pub is_venv_tool: bool,
}

impl From<ToolInstanceView> for ToolInstanceResponse {
    fn from(view: ToolInstanceView) -> Self {
        Self {
            id: view.id,
            workflow_id: view.workflow_id,
            name: view.name,
            source_folder_path: view.source_folder_path,
            code: view.code,
            requirements: view.requirements,
            user_params: view.user_params.into_iter().map(Into::into).collect(),
            is_valid: view.is_valid,
            icon_uri: view.icon_uri,
            is_venv_tool: view.is_venv_tool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RemoveToolInstanceQuery;

    #[test]
    fn test_delete_directory_defaults_to_true() {
        let query: RemoveToolInstanceQuery =
            serde_json::from_str("{}").expect("empty query parses");
        assert!(query.delete_directory);

        let query: RemoveToolInstanceQuery =
            serde_json::from_str(r#"{"delete_directory": false}"#).expect("query parses");
        assert!(!query.delete_directory);
    }
}
