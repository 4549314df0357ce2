//! File bundle materialization for tool instances.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::naming;

/// Icon extensions accepted for tool instances.
pub const ALLOWED_ICON_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Attempts at finding a free instance directory name before giving up.
const MAX_NAME_ATTEMPTS: usize = 4;

/// Errors that can occur while materializing a file bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The template source directory does not exist or is not a directory.
    #[error("source directory not found: {0}")]
    SourceMissing(PathBuf),
    /// The recursive copy itself failed.
    #[error("failed to copy bundle from {src} to {dest}: {source}")]
    CopyFailed {
        /// Copy source.
        src: PathBuf,
        /// Copy destination.
        dest: PathBuf,
        /// Underlying error.
        #[source]
        source: fs_extra::error::Error,
    },
    /// The icon extension is not in the accepted set.
    #[error("unsupported image type '{0}': must be .png, .jpg, or .jpeg")]
    UnsupportedImageType(String),
    /// A filesystem operation failed.
    #[error("filesystem operation failed at {path}: {source}")]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Create a fresh, uniquely named instance directory under
/// `<workflow_dir>/tools`.
///
/// A name collision with an existing directory is retried with a new
/// random suffix a bounded number of times; the suffix entropy makes
/// running out of attempts practically unreachable.
///
/// # Errors
///
/// Returns an error if the tools directory cannot be created or if no
/// free name is found.
pub fn create_instance_dir(workflow_dir: &Path, display_name: &str) -> Result<PathBuf, BundleError> {
    let tools_dir = workflow_dir.join(naming::TOOLS_SUBDIR);
    fs::create_dir_all(&tools_dir).map_err(|e| BundleError::Io {
        path: tools_dir.clone(),
        source: e,
    })?;

    for _ in 0..MAX_NAME_ATTEMPTS {
        let candidate = tools_dir.join(naming::instance_dir_name(display_name));
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!("instance directory {} already exists, retrying", candidate.display());
            }
            Err(e) => {
                return Err(BundleError::Io {
                    path: candidate,
                    source: e,
                })
            }
        }
    }

    Err(BundleError::Io {
        path: tools_dir,
        source: io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no free instance directory name after retries",
        ),
    })
}

/// Recursively copy a template bundle into an instance directory.
///
/// The destination is created if absent; files already present there are
/// overwritten (merge semantics, not atomic replace).
///
/// # Errors
///
/// Returns an error if the source does not exist, is not a directory, or
/// cannot be read.
pub fn copy_template(source: &Path, dest: &Path) -> Result<(), BundleError> {
    if !source.is_dir() {
        return Err(BundleError::SourceMissing(source.to_path_buf()));
    }
    fs::create_dir_all(dest).map_err(|e| BundleError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let mut options = fs_extra::dir::CopyOptions::new();
    options.overwrite = true;
    options.content_only = true;
    fs_extra::dir::copy(source, dest, &options).map_err(|e| BundleError::CopyFailed {
        src: source.to_path_buf(),
        dest: dest.to_path_buf(),
        source: e,
    })?;

    debug!("copied bundle {} -> {}", source.display(), dest.display());
    Ok(())
}

/// Copy an icon into the icons root, keyed by instance id.
///
/// Returns the destination path, always
/// `<icons_root>/<instance_id>_icon.<ext>` with a lowercased extension.
///
/// # Errors
///
/// Returns [`BundleError::UnsupportedImageType`] for extensions outside
/// the accepted set, before touching the filesystem.
pub fn copy_icon(
    source_icon: &Path,
    instance_id: &str,
    icons_root: &Path,
) -> Result<PathBuf, BundleError> {
    let ext = source_icon
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ALLOWED_ICON_EXTENSIONS.contains(&ext.as_str()) {
        return Err(BundleError::UnsupportedImageType(ext));
    }

    fs::create_dir_all(icons_root).map_err(|e| BundleError::Io {
        path: icons_root.to_path_buf(),
        source: e,
    })?;

    let dest = icons_root.join(format!("{instance_id}_icon.{ext}"));
    fs::copy(source_icon, &dest).map_err(|e| BundleError::Io {
        path: dest.clone(),
        source: e,
    })?;
    Ok(dest)
}

/// Best-effort recursive deletion of a directory tree.
///
/// Always runs off the critical path, so failures are logged and never
/// returned.
pub fn delete_tree(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_dir_all(path) {
        Ok(()) => debug!("deleted directory {}", path.display()),
        Err(e) => warn!("failed to delete directory {}: {e}", path.display()),
    }
}

/// Best-effort deletion of a single file.
///
/// Used for icon cleanup, which is not allowed to fail the enclosing
/// operation.
pub fn delete_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("failed to delete file {}: {e}", path.display());
    }
}
