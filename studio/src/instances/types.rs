//! Domain types for tool instance management.

use std::path::PathBuf;

use uuid::Uuid;

use crate::bundle::BundleError;
use crate::params::UserParameter;
use crate::store::ToolInstanceRecord;

/// Tool instance identifier. Generated at creation, never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolInstanceId(String);

impl ToolInstanceId {
    /// Generate a fresh, globally unique id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing id string.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty.
    pub fn new(id: String) -> Result<Self, InstanceError> {
        if id.is_empty() {
            return Err(InstanceError::Validation("empty instance id".to_string()));
        }
        Ok(Self(id))
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ToolInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ToolInstanceId {
    type Error = InstanceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Errors from tool instance operations.
///
/// Background job failures never appear here: by the time a job runs, the
/// triggering operation has already returned.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    /// Referenced workflow does not exist.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),
    /// Referenced tool template does not exist.
    #[error("tool template not found: {0}")]
    TemplateNotFound(String),
    /// Referenced tool instance does not exist.
    #[error("tool instance not found: {0}")]
    InstanceNotFound(String),
    /// Referenced temporary file does not exist.
    #[error("temporary file not found: {0}")]
    TempFileNotFound(String),
    /// The request is malformed (for example an unsupported icon type).
    #[error("validation error: {0}")]
    Validation(String),
    /// Materializing the file bundle failed; no row was committed.
    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),
    /// Record store failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Anything else on the synchronous path.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Request to create a tool instance.
#[derive(Debug, Clone)]
pub struct CreateToolInstance {
    /// Owning workflow id.
    pub workflow_id: String,
    /// Template to materialize from; the default bundle when absent.
    pub template_id: Option<String>,
    /// Display name; falls back to the template name, then a default.
    pub name: Option<String>,
}

/// Request to update a tool instance (name and icon only).
#[derive(Debug, Clone)]
pub struct UpdateToolInstance {
    /// Instance to update.
    pub instance_id: String,
    /// New display name, if any.
    pub name: Option<String>,
    /// Temporary file holding a replacement icon, if any.
    pub tmp_icon_path: Option<PathBuf>,
}

/// Result of a successful create.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    /// The new instance id.
    pub id: ToolInstanceId,
    /// The resolved display name.
    pub name: String,
}

/// Full view of a tool instance, including live file contents.
#[derive(Debug, Clone)]
pub struct ToolInstanceView {
    /// Instance id.
    pub id: String,
    /// Owning workflow id.
    pub workflow_id: String,
    /// Display name.
    pub name: String,
    /// Absolute bundle directory.
    pub source_folder_path: String,
    /// Live contents of the code file.
    pub code: String,
    /// Live contents of the dependency manifest.
    pub requirements: String,
    /// Parameters extracted from the code, empty on a degraded read.
    pub user_params: Vec<UserParameter>,
    /// Whether the best-effort read and parameter extraction succeeded.
    pub is_valid: bool,
    /// Icon location relative to the assets root; empty when unset.
    pub icon_uri: String,
    /// Whether the instance runs in its own isolated environment.
    pub is_venv_tool: bool,
}

impl ToolInstanceView {
    /// A degraded view carrying only row data, used when the bundle on
    /// disk cannot be read during a listing.
    #[must_use]
    pub(crate) fn degraded(record: &ToolInstanceRecord, icon_uri: String) -> Self {
        Self {
            id: record.id.clone(),
            workflow_id: record.workflow_id.clone(),
            name: record.name.clone(),
            source_folder_path: record.source_folder_path.clone(),
            code: String::new(),
            requirements: String::new(),
            user_params: Vec::new(),
            is_valid: false,
            icon_uri,
            is_venv_tool: record.is_venv_tool,
        }
    }
}
