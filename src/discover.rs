//! Recursive discovery of matching files under a directory tree.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::glob::GlobSet;

/// Walks `root` and returns every regular file whose basename matches the
/// glob set.
///
/// Directories that cannot be read (permissions, removed mid-walk) are
/// skipped; the walk continues with their siblings. Symlinks are not
/// followed, and entries that are neither files nor directories are
/// ignored. The returned set is lexicographically ordered, so membership
/// is deterministic regardless of traversal order.
pub fn discover_files(root: &Path, globs: &GlobSet) -> BTreeSet<PathBuf> {
    let mut found = BTreeSet::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if globs.matches(&name) {
            found.insert(entry.into_path());
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn logs_only() -> GlobSet {
        GlobSet::new(["*.log"])
    }

    #[test]
    fn finds_matching_files_recursively() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.log"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.log"), "").unwrap();

        let found = discover_files(dir.path(), &logs_only());

        assert_eq!(found.len(), 2);
        assert!(found.contains(&dir.path().join("a.log")));
        assert!(found.contains(&dir.path().join("nested/b.log")));
    }

    #[test]
    fn basename_match_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("UPPER.LOG"), "").unwrap();

        let found = discover_files(dir.path(), &logs_only());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn directories_are_never_returned() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("dir.log")).unwrap();
        fs::write(dir.path().join("dir.log/inner.log"), "").unwrap();

        let found = discover_files(dir.path(), &logs_only());
        assert_eq!(found.len(), 1);
        assert!(found.contains(&dir.path().join("dir.log/inner.log")));
    }

    #[test]
    fn picks_up_files_created_between_calls() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("first.log"), "").unwrap();

        let globs = logs_only();
        assert_eq!(discover_files(dir.path(), &globs).len(), 1);

        fs::write(dir.path().join("second.log"), "").unwrap();
        assert_eq!(discover_files(dir.path(), &globs).len(), 2);
    }

    #[test]
    fn missing_root_yields_empty_set() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");

        let found = discover_files(&gone, &logs_only());
        assert!(found.is_empty());
    }
}
