//! FileTree - one scanned directory tree

use super::FileRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File tree keyed by relative path.
///
/// Ordered maps keep joins and plans reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct FileTree {
    /// Map: relative_path → FileRecord
    pub entries: BTreeMap<PathBuf, FileRecord>,

    /// Relative paths of every directory below the root
    pub dirs: BTreeSet<PathBuf>,

    /// Paths the walker could not read, with the reason.
    /// Nothing at or below these paths is known to be absent.
    pub unreadable: BTreeMap<PathBuf, String>,

    /// Aggregate statistics
    pub total_size: u64,
    pub total_files: usize,

    /// Scan metadata
    pub scan_duration: Duration,
    pub root_path: PathBuf,
}

impl FileTree {
    /// Create a new empty FileTree
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            entries: BTreeMap::new(),
            dirs: BTreeSet::new(),
            unreadable: BTreeMap::new(),
            total_size: 0,
            total_files: 0,
            scan_duration: Duration::from_secs(0),
            root_path,
        }
    }

    /// Insert a record into the tree
    ///
    /// If the path already exists, the old record is replaced and statistics are adjusted.
    pub fn insert(&mut self, record: FileRecord) {
        let path = record.relative_path.clone();
        if let Some(old) = self.entries.get(&path) {
            self.total_size = self.total_size.saturating_sub(old.size);
            self.total_files = self.total_files.saturating_sub(1);
        }

        self.total_size += record.size;
        self.total_files += 1;
        self.entries.insert(path, record);
    }

    /// Record a directory seen during the walk
    pub fn insert_dir(&mut self, path: PathBuf) {
        if !path.as_os_str().is_empty() {
            self.dirs.insert(path);
        }
    }

    /// Record a path whose contents could not be listed or stat'ed
    pub fn mark_unreadable(&mut self, path: PathBuf, reason: String) {
        self.unreadable.insert(path, reason);
    }

    /// Reason `path` is unknown, if it is or lies below a path the walker could not read
    pub fn shadowed_by(&self, path: &Path) -> Option<&str> {
        self.unreadable
            .iter()
            .find(|(blocked, _)| path.starts_with(blocked))
            .map(|(_, reason)| reason.as_str())
    }

    pub fn is_shadowed(&self, path: &Path) -> bool {
        self.shadowed_by(path).is_some()
    }

    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn contains_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterator over all records in path order
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &FileRecord)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }

    pub fn set_scan_duration(&mut self, duration: Duration) {
        self.scan_duration = duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn record(name: &str, size: u64) -> FileRecord {
        FileRecord::new(
            PathBuf::from(name),
            size,
            UNIX_EPOCH + Duration::from_secs(1000),
        )
    }

    #[test]
    fn test_new_tree() {
        let root = PathBuf::from("/test/root");
        let tree = FileTree::new(root.clone());

        assert_eq!(tree.root_path, root);
        assert_eq!(tree.total_size, 0);
        assert_eq!(tree.total_files, 0);
        assert!(tree.dirs.is_empty());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_insert_multiple_entries() {
        let mut tree = FileTree::new(PathBuf::from("/root"));
        tree.insert(record("file1.txt", 100));
        tree.insert(record("file2.txt", 200));
        tree.insert(record("dir/file3.txt", 300));

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.total_files, 3);
        assert_eq!(tree.total_size, 600);
        assert!(tree.contains(Path::new("dir/file3.txt")));
    }

    #[test]
    fn test_duplicate_insertion_adjusts_statistics() {
        let mut tree = FileTree::new(PathBuf::from("/root"));
        tree.insert(record("file.txt", 1000));
        tree.insert(record("file.txt", 2000));

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.total_files, 1);
        assert_eq!(tree.total_size, 2000);
    }

    #[test]
    fn test_iteration_is_path_ordered() {
        let mut tree = FileTree::new(PathBuf::from("/root"));
        tree.insert(record("c.txt", 1));
        tree.insert(record("a.txt", 1));
        tree.insert(record("b/z.txt", 1));

        let paths: Vec<_> = tree.paths().cloned().collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("b/z.txt"),
                PathBuf::from("c.txt")
            ]
        );
    }

    #[test]
    fn test_unreadable_shadows_subtree() {
        let mut tree = FileTree::new(PathBuf::from("/root"));
        tree.mark_unreadable(PathBuf::from("locked"), "permission denied".to_string());

        assert!(tree.is_shadowed(Path::new("locked")));
        assert!(tree.is_shadowed(Path::new("locked/inner/file.txt")));
        assert!(!tree.is_shadowed(Path::new("lockedx/file.txt")));
    }

    #[test]
    fn test_insert_dir_ignores_root() {
        let mut tree = FileTree::new(PathBuf::from("/root"));
        tree.insert_dir(PathBuf::new());
        tree.insert_dir(PathBuf::from("docs"));

        assert_eq!(tree.dirs.len(), 1);
        assert!(tree.contains_dir(Path::new("docs")));
    }
}
