//! Which paths are worth a restart.

use std::path::{Path, PathBuf};

use crate::utils::path::has_ignored_segment;

/// Extension allow-list plus directory ignore-set.
///
/// Both strategies share this filter, so the poller and the event watcher
/// always agree on what counts as a watched file.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    extensions: Vec<String>,
    ignore: Vec<String>,
}

impl WatchFilter {
    /// `root` should be absolute; event paths are reported under it.
    pub fn new(root: PathBuf, extensions: Vec<String>, ignore: Vec<String>) -> Self {
        Self {
            root,
            extensions,
            ignore,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name is in the ignore-set (used to prune the walk).
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore.iter().any(|ignored| ignored == name)
    }

    /// File has an allowed extension and no ignored directory above it.
    pub fn accepts(&self, path: &Path) -> bool {
        self.has_allowed_extension(path) && !has_ignored_segment(path, &self.root, &self.ignore)
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> WatchFilter {
        WatchFilter::new(
            PathBuf::from("/srv/game"),
            vec!["html".into(), "js".into(), "css".into(), "json".into()],
            vec![".git".into(), "node_modules".into(), ".beads".into(), "__pycache__".into()],
        )
    }

    #[test]
    fn test_accepts_allowed_extensions() {
        let filter = filter();
        assert!(filter.accepts(Path::new("/srv/game/index.html")));
        assert!(filter.accepts(Path::new("/srv/game/js/game.js")));
        assert!(filter.accepts(Path::new("/srv/game/manifest.json")));
    }

    #[test]
    fn test_rejects_other_extensions() {
        let filter = filter();
        assert!(!filter.accepts(Path::new("/srv/game/README.md")));
        assert!(!filter.accepts(Path::new("/srv/game/sounds/jump.wav")));
        assert!(!filter.accepts(Path::new("/srv/game/index.html.swp")));
        assert!(!filter.accepts(Path::new("/srv/game/index.html~")));
        assert!(!filter.accepts(Path::new("/srv/game/Makefile")));
    }

    #[test]
    fn test_rejects_ignored_directories() {
        let filter = filter();
        assert!(!filter.accepts(Path::new("/srv/game/node_modules/lib/index.js")));
        assert!(!filter.accepts(Path::new("/srv/game/.beads/state.json")));
        assert!(!filter.accepts(Path::new("/srv/game/a/b/__pycache__/x.json")));
    }

    #[test]
    fn test_substring_of_ignored_name_is_watched() {
        let filter = filter();
        assert!(filter.accepts(Path::new("/srv/game/my_node_modules/app.js")));
        assert!(filter.accepts(Path::new("/srv/game/.github/config.json")));
    }

    #[test]
    fn test_is_ignored_dir() {
        let filter = filter();
        assert!(filter.is_ignored_dir(".git"));
        assert!(!filter.is_ignored_dir("git"));
    }
}
