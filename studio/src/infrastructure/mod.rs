//! Infrastructure components for the studio core.
//!
//! Configuration loading, telemetry initialization, and the HTTP server
//! entry point live here, separate from the domain modules.

pub mod config;
pub mod server;
pub mod telemetry;
