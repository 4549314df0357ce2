//! Naming policy for tool instance directories.

use uuid::Uuid;

/// Subdirectory of a workflow directory that holds its tool instances.
pub const TOOLS_SUBDIR: &str = "tools";

/// Length of the random directory-name suffix.
const SUFFIX_LEN: usize = 8;

/// Slugify a display name into a filesystem-safe fragment.
///
/// Lowercases ASCII alphanumerics and collapses every other run of
/// characters into a single `-`, with no leading or trailing separator.
/// An all-symbol name degrades to `"tool"` rather than an empty slug.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("tool");
    }
    slug
}

/// A short random alphanumeric suffix, fresh per call.
#[must_use]
pub fn random_suffix() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..SUFFIX_LEN].to_string()
}

/// Directory name for a new instance: `<slug>_<suffix>`.
#[must_use]
pub fn instance_dir_name(display_name: &str) -> String {
    format!("{}_{}", slugify(display_name), random_suffix())
}
