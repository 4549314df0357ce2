//! Studio Core - tool instance lifecycle management.
//!
//! This crate provides the core functionality for managing workflow-scoped
//! tool instances: their metadata records, their on-disk code bundles, and
//! the asynchronous provisioning of their execution environments.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// REST API for tool instance operations.
pub mod api;
/// Directory naming policy and file bundle materialization.
pub mod bundle;
/// Host state wiring the store, manager, and dispatcher together.
pub mod host;
/// Infrastructure components (config, server, telemetry).
pub mod infrastructure;
/// Tool instance lifecycle manager and domain types.
pub mod instances;
/// Best-effort extraction of user parameters from tool code.
pub mod params;
/// Background provisioning dispatcher and environment builders.
pub mod provisioner;
/// SQLite record store and unit-of-work boundary.
pub mod store;
