//! Path utilities.
//!
//! - `normalize_path`: absolute, canonical form with a cwd fallback
//! - `relative_display`: short path for log lines
//! - `has_ignored_segment`: directory ignore-set check shared by both watchers

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Path relative to `root` for display, or the path itself if outside it.
pub fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Check whether any directory segment of `path` below `root` is in `ignored`.
///
/// Matches whole segments only: `node_modules_backup/app.js` is not
/// ignored by `node_modules`. The file name itself is not considered.
pub fn has_ignored_segment(path: &Path, root: &Path, ignored: &[String]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let Some(parent) = relative.parent() else {
        return false;
    };

    parent.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| ignored.iter().any(|ignore| ignore == name)),
        _ => false,
    })
}
