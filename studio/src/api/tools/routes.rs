//! Route table for the tool instance endpoints.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::host::StudioHostState;

use super::handlers;

/// Build the tool instance router.
#[must_use]
pub fn router() -> Router<Arc<StudioHostState>> {
    Router::new()
        .route(
            "/api/v1/tool-instances",
            get(handlers::list_tool_instances).post(handlers::create_tool_instance),
        )
        .route(
            "/api/v1/tool-instances/{id}",
            get(handlers::get_tool_instance)
                .patch(handlers::update_tool_instance)
                .delete(handlers::remove_tool_instance),
        )
}
