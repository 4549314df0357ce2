//! Shared state wiring the store, the dispatcher, and the lifecycle
//! manager together for the lifetime of the process.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::bundle::Layout;
use crate::instances::ToolInstanceManager;
use crate::params::ConfigClassScanner;
use crate::provisioner::{Dispatcher, EnvironmentBuilder};
use crate::store::RecordStore;

/// Host state shared by every request handler.
///
/// Built once at startup and handed around as `Arc<StudioHostState>`.
pub struct StudioHostState {
    store: RecordStore,
    dispatcher: Arc<Dispatcher>,
    manager: ToolInstanceManager,
}

impl StudioHostState {
    /// Connect to the record store, ensure the schema, and start the
    /// provisioning workers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached or initialized.
    pub async fn new(
        database_url: &str,
        builder: Arc<dyn EnvironmentBuilder>,
        layout: Layout,
        workers: usize,
    ) -> Result<Self> {
        let store = RecordStore::connect(database_url)
            .await
            .context("failed to connect to the record store")?;
        store
            .init_schema()
            .await
            .context("failed to initialize the record store schema")?;

        let dispatcher = Arc::new(Dispatcher::start(builder, workers));
        let manager = ToolInstanceManager::new(
            store.clone(),
            Arc::clone(&dispatcher),
            layout,
            Arc::new(ConfigClassScanner),
        );

        Ok(Self {
            store,
            dispatcher,
            manager,
        })
    }

    /// The tool instance lifecycle manager.
    #[must_use]
    pub fn manager(&self) -> &ToolInstanceManager {
        &self.manager
    }

    /// The record store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Drain outstanding background jobs. Called once at shutdown.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}

impl std::fmt::Debug for StudioHostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioHostState").finish_non_exhaustive()
    }
}
