//! Tool instance endpoints.

pub mod handlers;
pub mod routes;
pub mod types;
