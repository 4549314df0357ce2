//! Tool instance lifecycle management.
//!
//! A tool instance is an editable copy of a tool template (or of the
//! built-in default bundle) living inside a workflow's `tools` directory,
//! tracked by a row in the record store. This module owns the full
//! lifecycle: create, update, get, list, and remove, plus the handoff to
//! background environment provisioning.

mod core;
mod types;

#[cfg(test)]
mod tests;

pub use core::ToolInstanceManager;
pub use types::{
    CreateOutcome, CreateToolInstance, InstanceError, ToolInstanceId, ToolInstanceView,
    UpdateToolInstance,
};
