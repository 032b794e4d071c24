//! Set of paths under observation

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{RelayError, RelayResult};

/// Absolute paths registered with the native watcher.
///
/// The root is always a member.
#[derive(Debug, Clone)]
pub struct WatchSet {
    root: PathBuf,
    paths: BTreeSet<PathBuf>,
}

impl WatchSet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut paths = BTreeSet::new();
        paths.insert(root.clone());
        Self { root, paths }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Add a path; returns whether it was new.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    /// Drop `path` and everything below it. The root itself stays.
    pub fn remove_tree(&mut self, path: &Path) -> Vec<PathBuf> {
        let doomed: Vec<PathBuf> = self
            .paths
            .range(path.to_path_buf()..)
            .take_while(|p| p.starts_with(path))
            .filter(|p| **p != self.root)
            .cloned()
            .collect();
        for p in &doomed {
            self.paths.remove(p);
        }
        doomed
    }
}

/// Every regular file and directory at or below `path`, skipping symlinks.
pub fn discover(path: &Path) -> RelayResult<Vec<PathBuf>> {
    let walker = WalkBuilder::new(path)
        .standard_filters(false)
        .follow_links(false)
        .build();

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| RelayError::Walk {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        match entry.file_type() {
            Some(ft) if ft.is_dir() || ft.is_file() => found.push(entry.into_path()),
            _ => {}
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn root_is_always_present() {
        let mut set = WatchSet::new("/w");
        set.insert(PathBuf::from("/w/a"));

        let removed = set.remove_tree(Path::new("/w"));

        assert_eq!(removed, vec![PathBuf::from("/w/a")]);
        assert!(set.contains(Path::new("/w")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_tree_drops_descendants_only() {
        let mut set = WatchSet::new("/w");
        for p in ["/w/a", "/w/a/b", "/w/a/b/c.go", "/w/ab", "/w/z"] {
            set.insert(PathBuf::from(p));
        }

        let removed = set.remove_tree(Path::new("/w/a"));

        assert_eq!(removed.len(), 3);
        assert!(set.contains(Path::new("/w/ab")));
        assert!(set.contains(Path::new("/w/z")));
        assert!(!set.contains(Path::new("/w/a/b/c.go")));
    }

    #[test]
    fn discover_finds_files_and_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg/inner")).unwrap();
        fs::write(dir.path().join("pkg/inner/x.go"), "x").unwrap();
        fs::write(dir.path().join(".hidden"), "h").unwrap();

        let mut found = discover(dir.path()).unwrap();
        found.sort();

        assert_eq!(
            found,
            vec![
                dir.path().to_path_buf(),
                dir.path().join(".hidden"),
                dir.path().join("pkg"),
                dir.path().join("pkg/inner"),
                dir.path().join("pkg/inner/x.go"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn discover_skips_symlinks() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("secret"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let found = discover(dir.path()).unwrap();

        assert_eq!(found, vec![dir.path().to_path_buf()]);
    }
}
