//! Background provisioning for tool instance environments.
//!
//! Environment builds and directory deletions run off the request path on
//! a shared worker pool. Submission never blocks, and job outcomes are
//! never reported back to the operation that triggered them.

pub mod builder;
pub mod dispatcher;

pub use builder::{EnvironmentBuilder, VenvBuilder};
pub use dispatcher::{Dispatcher, ProvisionJob};
