//! Row types for the record store.

/// A workflow row. Owned externally; this core only reads its directory.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkflowRecord {
    /// Workflow id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Root directory of the workflow on disk.
    pub directory: String,
}

/// A tool template row. Read-only input to instance creation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ToolTemplateRecord {
    /// Template id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Directory holding the template's file bundle.
    pub source_folder_path: String,
    /// Icon file path; empty when the template has no icon.
    pub icon_path: String,
    /// Code entry-point filename within the bundle.
    pub code_file_name: String,
    /// Dependency manifest filename within the bundle.
    pub requirements_file_name: String,
    /// Whether instances run in their own isolated environment.
    pub is_venv_tool: bool,
}

/// A tool instance row. The lifecycle manager is the sole writer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ToolInstanceRecord {
    /// Instance id; never changes after creation.
    pub id: String,
    /// Owning workflow id.
    pub workflow_id: String,
    /// Display name.
    pub name: String,
    /// Absolute directory holding the instance's file bundle.
    pub source_folder_path: String,
    /// Code entry-point filename within the bundle.
    pub code_file_name: String,
    /// Dependency manifest filename within the bundle.
    pub requirements_file_name: String,
    /// Icon file path under the assets root; empty when unset.
    pub icon_path: String,
    /// Whether the instance runs in its own isolated environment.
    pub is_venv_tool: bool,
}
