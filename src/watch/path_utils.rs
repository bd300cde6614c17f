// src/watch/path_utils.rs

//! Path helpers shared by the source watcher and the live-reload watcher.

use std::path::Path;

/// `path` relative to `root`, with forward slashes.
///
/// Falls back to comparing canonical forms, since watchers may report a
/// different absolute prefix for the same directory (symlinks,
/// `/private/var` on macOS). Returns `None` for paths outside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let to_slashes = |rel: &Path| rel.to_string_lossy().replace('\\', "/");

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slashes(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok()?;
    path_canon.strip_prefix(&root_canon).ok().map(to_slashes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_the_root() {
        let rel = relative_str(Path::new("/p"), Path::new("/p/src/app/app.module.js"));
        assert_eq!(rel.as_deref(), Some("src/app/app.module.js"));
    }

    #[test]
    fn outside_paths_are_rejected() {
        assert_eq!(relative_str(Path::new("/p/does-not-exist"), Path::new("/q/x.js")), None);
    }
}
