use std::path::{Path, PathBuf};

/// Ordered list of paths. Duplicates are kept; order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileList {
    paths: Vec<PathBuf>,
}

impl FileList {
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Byte-exact membership test: `a//b` and `a/b` are different names here.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p.as_os_str() == path.as_os_str())
    }

    /// Entries of `self` that do not appear in `other`, in order.
    pub fn missing_from(&self, other: &FileList) -> Vec<PathBuf> {
        self.paths
            .iter()
            .filter(|p| !other.contains(p))
            .cloned()
            .collect()
    }

    pub fn is_subset_of(&self, other: &FileList) -> bool {
        self.paths.iter().all(|p| other.contains(p))
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for FileList {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<P: Into<PathBuf>> Extend<P> for FileList {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        self.paths.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

impl IntoIterator for FileList {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_duplicates() {
        let mut list = FileList::new();
        list.push("b.txt");
        list.push("a.txt");
        list.push("b.txt");
        let names: Vec<_> = list.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(names, ["b.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn subset_check() {
        let archive: FileList = ["a.txt", "b.txt", "c.txt"].into_iter().collect();
        let wanted: FileList = ["c.txt", "a.txt", "a.txt"].into_iter().collect();
        assert!(wanted.is_subset_of(&archive));

        let wanted: FileList = ["a.txt", "d.txt"].into_iter().collect();
        assert!(!wanted.is_subset_of(&archive));
        assert_eq!(wanted.missing_from(&archive), vec![PathBuf::from("d.txt")]);
    }

    #[test]
    fn empty_list_is_subset_of_anything() {
        assert!(FileList::new().is_subset_of(&FileList::new()));
    }

    #[test]
    fn membership_is_byte_exact() {
        let list: FileList = ["dir/a.txt"].into_iter().collect();
        assert!(list.contains(Path::new("dir/a.txt")));
        assert!(!list.contains(Path::new("dir//a.txt")));
    }
}
