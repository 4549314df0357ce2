//! HTTP API surface.

pub mod tools;

use std::sync::Arc;

use axum::Router;

use crate::host::StudioHostState;

pub use tools::handlers::ApiError;

/// All tool instance routes.
#[must_use]
pub fn tool_routes() -> Router<Arc<StudioHostState>> {
    tools::routes::router()
}
