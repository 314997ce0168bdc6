//! In-memory virtual file map

use std::collections::BTreeMap;

/// An in-memory file map scoped to one compile cycle.
///
/// Paths are unique keys; iteration order is the sorted path order, which
/// doubles as the deterministic traversal order for the compiler adapter.
///
/// # Example
/// ```
/// use tsxpile_vfs::VirtualFileMap;
///
/// let mut files = VirtualFileMap::new();
/// files.insert("/index.js", "export default 1;");
/// assert!(files.contains("/index.js"));
/// assert_eq!(files.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualFileMap {
    files: BTreeMap<String, String>,
}

impl VirtualFileMap {
    /// Create a new empty file map.
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
        }
    }

    /// Create a file map pre-populated with files.
    ///
    /// # Arguments
    /// * `files` - Iterator of (path, content) tuples
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let mut map = Self::new();
        for (path, content) in files {
            map.insert(path, content);
        }
        map
    }

    /// Insert or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Read a file's content.
    pub fn read(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Check if a path exists.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Remove a file, returning its content.
    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(path)
    }

    /// Iterate over (path, content) pairs in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Iterate over paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of files in the map.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<'a> IntoIterator for &'a VirtualFileMap {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

impl FromIterator<(String, String)> for VirtualFileMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::with_files(iter)
    }
}
