//! Row operations over an open connection.
//!
//! Every function takes `&mut SqliteConnection` so callers decide the
//! transaction boundary: a transaction checked out from
//! [`RecordStore::begin`](super::RecordStore::begin) derefs to a connection,
//! as does a plain pooled connection.

use sqlx::SqliteConnection;

use super::records::{ToolInstanceRecord, ToolTemplateRecord, WorkflowRecord};

/// Fetch a workflow by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn get_workflow(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<WorkflowRecord>, sqlx::Error> {
    sqlx::query_as::<_, WorkflowRecord>("SELECT id, name, directory FROM workflows WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Insert a workflow row (seeding and tests; workflows are owned externally).
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn insert_workflow(
    conn: &mut SqliteConnection,
    workflow: &WorkflowRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO workflows (id, name, directory) VALUES (?, ?, ?)")
        .bind(&workflow.id)
        .bind(&workflow.name)
        .bind(&workflow.directory)
        .execute(conn)
        .await?;
    Ok(())
}

/// Fetch a tool template by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn get_template(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<ToolTemplateRecord>, sqlx::Error> {
    sqlx::query_as::<_, ToolTemplateRecord>(
        "SELECT id, name, source_folder_path, icon_path, code_file_name, \
         requirements_file_name, is_venv_tool FROM tool_templates WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Insert a tool template row (seeding and tests; templates are owned
/// externally).
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn insert_template(
    conn: &mut SqliteConnection,
    template: &ToolTemplateRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO tool_templates (id, name, source_folder_path, icon_path, \
         code_file_name, requirements_file_name, is_venv_tool) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&template.id)
    .bind(&template.name)
    .bind(&template.source_folder_path)
    .bind(&template.icon_path)
    .bind(&template.code_file_name)
    .bind(&template.requirements_file_name)
    .bind(template.is_venv_tool)
    .execute(conn)
    .await?;
    Ok(())
}

/// Insert a tool instance row.
///
/// # Errors
///
/// Returns an error if the insert fails (including a duplicate id).
pub async fn insert_instance(
    conn: &mut SqliteConnection,
    instance: &ToolInstanceRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO tool_instances (id, workflow_id, name, source_folder_path, \
         code_file_name, requirements_file_name, icon_path, is_venv_tool) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&instance.id)
    .bind(&instance.workflow_id)
    .bind(&instance.name)
    .bind(&instance.source_folder_path)
    .bind(&instance.code_file_name)
    .bind(&instance.requirements_file_name)
    .bind(&instance.icon_path)
    .bind(instance.is_venv_tool)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetch a tool instance by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn get_instance(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<ToolInstanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, ToolInstanceRecord>(
        "SELECT id, workflow_id, name, source_folder_path, code_file_name, \
         requirements_file_name, icon_path, is_venv_tool FROM tool_instances WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// List tool instances, optionally filtered by owning workflow.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_instances(
    conn: &mut SqliteConnection,
    workflow_id: Option<&str>,
) -> Result<Vec<ToolInstanceRecord>, sqlx::Error> {
    match workflow_id {
        Some(workflow_id) => {
            sqlx::query_as::<_, ToolInstanceRecord>(
                "SELECT id, workflow_id, name, source_folder_path, code_file_name, \
                 requirements_file_name, icon_path, is_venv_tool FROM tool_instances \
                 WHERE workflow_id = ?",
            )
            .bind(workflow_id)
            .fetch_all(conn)
            .await
        }
        None => {
            sqlx::query_as::<_, ToolInstanceRecord>(
                "SELECT id, workflow_id, name, source_folder_path, code_file_name, \
                 requirements_file_name, icon_path, is_venv_tool FROM tool_instances",
            )
            .fetch_all(conn)
            .await
        }
    }
}

/// Update the mutable fields (name, icon path) of a tool instance row.
///
/// # Errors
///
/// Returns an error if the update fails.
pub async fn update_instance(
    conn: &mut SqliteConnection,
    instance: &ToolInstanceRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE tool_instances SET name = ?, icon_path = ? WHERE id = ?")
        .bind(&instance.name)
        .bind(&instance.icon_path)
        .bind(&instance.id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete a tool instance row. Returns whether a row was removed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn delete_instance(conn: &mut SqliteConnection, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tool_instances WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
