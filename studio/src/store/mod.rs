//! SQLite record store and unit-of-work boundary.
//!
//! [`RecordStore`] owns the connection pool and hands out transactions; the
//! row operations in [`queries`] run against any open connection, so they
//! compose equally inside a store-owned transaction or one supplied by an
//! enclosing unit of work.

pub mod queries;
mod records;

#[cfg(test)]
mod tests;

pub use records::{ToolInstanceRecord, ToolTemplateRecord, WorkflowRecord};

use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::instrument;

/// SQLite-backed store for workflow, template, and tool instance rows.
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    /// Connect to the database at the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        Ok(Self { pool })
    }

    /// Open an in-memory store, useful for tests.
    ///
    /// The pool is capped at a single connection: every pooled connection
    /// to `sqlite::memory:` would otherwise see its own empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    /// Create the schema if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    #[instrument(skip(self))]
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                directory TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS tool_templates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                source_folder_path TEXT NOT NULL,
                icon_path TEXT NOT NULL DEFAULT '',
                code_file_name TEXT NOT NULL,
                requirements_file_name TEXT NOT NULL,
                is_venv_tool INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS tool_instances (
                id TEXT PRIMARY KEY,
                workflow_id TEXT NOT NULL,
                name TEXT NOT NULL,
                source_folder_path TEXT NOT NULL,
                code_file_name TEXT NOT NULL,
                requirements_file_name TEXT NOT NULL,
                icon_path TEXT NOT NULL DEFAULT '',
                is_venv_tool INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Begin a transaction owned by the caller.
    ///
    /// Committing is the caller's responsibility; a dropped transaction
    /// rolls back.
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be checked out.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Check out a plain (non-transactional) connection.
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be checked out.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    /// Access the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}
