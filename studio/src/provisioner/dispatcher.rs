//! Shared worker pool for fire-and-forget provisioning jobs.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::bundle::materializer;

use super::builder::EnvironmentBuilder;

/// A background provisioning job.
#[derive(Debug, Clone)]
pub enum ProvisionJob {
    /// Build an isolated environment for a tool instance directory.
    BuildEnv {
        /// Instance directory to build in.
        tool_dir: PathBuf,
        /// Dependency manifest filename within the directory.
        requirements_file: String,
    },
    /// Best-effort recursive deletion of a directory.
    DeleteDir {
        /// Directory to delete.
        path: PathBuf,
    },
}

/// Shared dispatcher for background provisioning jobs.
///
/// Constructed once at process init and injected into the lifecycle
/// manager; [`Dispatcher::shutdown`] drains outstanding jobs at process
/// shutdown. [`Dispatcher::submit`] never blocks and callers never
/// observe a job's outcome.
pub struct Dispatcher {
    tx: parking_lot::Mutex<Option<UnboundedSender<ProvisionJob>>>,
    handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Start the worker pool with the given build capability.
    ///
    /// At least one worker is always spawned.
    #[must_use]
    pub fn start(builder: Arc<dyn EnvironmentBuilder>, workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = workers.max(1);
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let rx = Arc::clone(&rx);
            let builder = Arc::clone(&builder);
            handles.push(tokio::spawn(worker_loop(worker, rx, builder)));
        }

        Self {
            tx: parking_lot::Mutex::new(Some(tx)),
            handles: tokio::sync::Mutex::new(handles),
        }
    }

    /// Enqueue a job without blocking.
    ///
    /// A dispatcher that has already shut down logs and drops the job;
    /// submission is infallible from the caller's point of view.
    pub fn submit(&self, job: ProvisionJob) {
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(job).is_err() {
                    warn!("provisioning workers stopped, dropping job");
                }
            }
            None => warn!("dispatcher already shut down, dropping job"),
        }
    }

    /// Close the queue and wait for all outstanding jobs to finish.
    pub async fn shutdown(&self) {
        self.tx.lock().take();
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                error!("provisioning worker panicked: {e}");
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

async fn worker_loop(
    worker: usize,
    rx: Arc<tokio::sync::Mutex<UnboundedReceiver<ProvisionJob>>>,
    builder: Arc<dyn EnvironmentBuilder>,
) {
    loop {
        // Hold the lock only while waiting for the next job, not while
        // running it.
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else { break };
        run_job(worker, builder.as_ref(), job).await;
    }
    debug!(worker, "provisioning worker stopped");
}

async fn run_job(worker: usize, builder: &dyn EnvironmentBuilder, job: ProvisionJob) {
    match job {
        ProvisionJob::BuildEnv {
            tool_dir,
            requirements_file,
        } => {
            debug!(worker, "building environment for {}", tool_dir.display());
            if let Err(e) = builder.build(&tool_dir, &requirements_file).await {
                // Never surfaced: the triggering operation has already
                // returned by the time the job runs.
                error!(
                    worker,
                    "environment build failed for {}: {e:#}",
                    tool_dir.display()
                );
            }
        }
        ProvisionJob::DeleteDir { path } => {
            debug!(worker, "deleting directory {}", path.display());
            materializer::delete_tree(&path);
        }
    }
}
