//! Directory naming policy and file bundle materialization.
//!
//! This module owns everything about where tool instances live on disk:
//! how their directories are named, how template bundles are copied into
//! them, and where icons land under the shared assets root.

pub mod materializer;
pub mod naming;


pub use materializer::BundleError;

use std::path::{Path, PathBuf};

use crate::infrastructure::config::LayoutSettings;

/// Subdirectory of the assets root that holds instance icons.
pub const ICONS_SUBDIR: &str = "tool_icons";

/// Shared filesystem layout for tool assets.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Root directory for dynamic assets.
    pub assets_root: PathBuf,
    /// Source directory of the built-in default tool bundle.
    pub default_bundle_dir: PathBuf,
}

impl Layout {
    /// Create a layout from explicit paths.
    pub fn new(assets_root: impl Into<PathBuf>, default_bundle_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
            default_bundle_dir: default_bundle_dir.into(),
        }
    }

    /// Build a layout from configuration.
    #[must_use]
    pub fn from_settings(settings: &LayoutSettings) -> Self {
        Self::new(&settings.assets_dir, &settings.default_tool_dir)
    }

    /// Directory under the assets root where instance icons are stored.
    #[must_use]
    pub fn icons_root(&self) -> PathBuf {
        self.assets_root.join(ICONS_SUBDIR)
    }

    /// Best-effort relative URI of an icon path under the assets root.
    ///
    /// Falls back to the full path when the icon does not live under the
    /// assets root.
    #[must_use]
    pub fn icon_uri(&self, icon_path: &Path) -> String {
        icon_path
            .strip_prefix(&self.assets_root)
            .unwrap_or(icon_path)
            .display()
            .to_string()
    }
}
