//! Environment build capability.

use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// The external capability that builds an isolated environment for a tool
/// directory. Invoked only from inside background jobs.
#[async_trait]
pub trait EnvironmentBuilder: Send + Sync {
    /// Install the dependency manifest at `tool_dir/requirements_file`
    /// into an isolated environment rooted at `tool_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot be built; the dispatcher
    /// logs it and never propagates it further.
    async fn build(&self, tool_dir: &Path, requirements_file: &str) -> Result<()>;
}

/// Builds a Python virtual environment under `<tool_dir>/.venv` and
/// installs the manifest into it.
#[derive(Debug, Clone)]
pub struct VenvBuilder {
    python_bin: String,
}

impl VenvBuilder {
    /// Create a builder using the given Python interpreter.
    pub fn new(python_bin: impl Into<String>) -> Self {
        Self {
            python_bin: python_bin.into(),
        }
    }
}

#[async_trait]
impl EnvironmentBuilder for VenvBuilder {
    async fn build(&self, tool_dir: &Path, requirements_file: &str) -> Result<()> {
        let venv_dir = tool_dir.join(".venv");

        let status = Command::new(&self.python_bin)
            .arg("-m")
            .arg("venv")
            .arg(&venv_dir)
            .current_dir(tool_dir)
            .status()
            .await
            .with_context(|| format!("failed to spawn {}", self.python_bin))?;
        if !status.success() {
            bail!("venv creation for {} exited with {status}", tool_dir.display());
        }

        let requirements = tool_dir.join(requirements_file);
        if !requirements.is_file() {
            bail!("requirements file not found: {}", requirements.display());
        }

        let pip_dir = if cfg!(windows) { "Scripts" } else { "bin" };
        let pip = venv_dir.join(pip_dir).join("pip");
        let status = Command::new(&pip)
            .arg("install")
            .arg("-r")
            .arg(&requirements)
            .current_dir(tool_dir)
            .status()
            .await
            .with_context(|| format!("failed to spawn {}", pip.display()))?;
        if !status.success() {
            bail!(
                "dependency install for {} exited with {status}",
                tool_dir.display()
            );
        }

        debug!("environment ready at {}", venv_dir.display());
        Ok(())
    }
}
