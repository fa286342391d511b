//! Input enumeration for the packer: walks directories depth-first in a
//! deterministic order and loads regular files only.

use crate::archive::format::{is_path_traversal, MAX_FILENAME, MAX_FILE_SIZE};
use crate::archive::PackEntry;
use crate::error::{Result, SlmError};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Collect pack entries from files and directories.
///
/// Directories are traversed depth-first with siblings in lexicographic
/// order, so the same inputs always produce the same archive layout.
/// Exclusion globs are matched against the forward-slash relative name.
pub fn enumerate(inputs: &[PathBuf], exclusions: &[String]) -> Result<Vec<PackEntry>> {
    let mut entries = Vec::new();

    for input in inputs {
        let meta = input.symlink_metadata()?;
        if meta.is_dir() {
            for item in WalkDir::new(input).sort_by_file_name() {
                let item = item.map_err(|e| SlmError::Io(e.into()))?;
                if item.file_type().is_file() {
                    push_file(&mut entries, item.path(), exclusions)?;
                }
            }
        } else if meta.is_file() {
            push_file(&mut entries, input, exclusions)?;
        } else {
            debug!(path = %input.display(), "skipping non-regular file");
        }
    }

    Ok(entries)
}

fn push_file(entries: &mut Vec<PackEntry>, path: &Path, exclusions: &[String]) -> Result<()> {
    let name = logical_name(path)?;

    if exclusions.iter().any(|pattern| {
        fast_glob::glob_match(pattern, &name)
            || name
                .split('/')
                .any(|component| fast_glob::glob_match(pattern, component))
    }) {
        debug!(file = %name, "excluded");
        return Ok(());
    }

    if name.len() >= MAX_FILENAME {
        return Err(SlmError::InvalidMetadata(format!(
            "path {} is longer than {} bytes",
            name,
            MAX_FILENAME - 1
        )));
    }

    let meta = path.metadata()?;
    if meta.len() > MAX_FILE_SIZE {
        return Err(SlmError::ResourceLimit(format!(
            "{} is {} bytes, limit is {MAX_FILE_SIZE}",
            name,
            meta.len()
        )));
    }

    let data = std::fs::read(path)?;
    entries.push(PackEntry {
        name,
        mode: file_mode(&meta),
        data,
    });
    Ok(())
}

/// Canonical archive name for an input path: forward slashes, relative form
fn logical_name(path: &Path) -> Result<String> {
    let raw = path
        .to_str()
        .ok_or_else(|| SlmError::InvalidMetadata(format!("{} is not UTF-8", path.display())))?;

    let mut name = raw.replace('\\', "/");
    while let Some(stripped) = name.strip_prefix("./") {
        name = stripped.to_string();
    }
    while let Some(stripped) = name.strip_prefix('/') {
        name = stripped.to_string();
    }

    if name.is_empty() {
        return Err(SlmError::InvalidMetadata(format!(
            "{} has no usable archive name",
            path.display()
        )));
    }
    if is_path_traversal(&name) {
        return Err(SlmError::PathTraversal(name));
    }
    Ok(name)
}

#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_meta: &std::fs::Metadata) -> u32 {
    0o644
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_enumeration_order_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("b.txt"), b"b").unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join("sub/c.txt"), b"c").unwrap();

        let entries = enumerate(&[root.to_path_buf()], &[]).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.name.rsplit('/').next().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_exclusion_glob() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("keep.txt"), b"k").unwrap();
        fs::write(root.join("skip.log"), b"s").unwrap();

        let entries = enumerate(&[root.to_path_buf()], &["**/*.log".to_string()]).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].name.ends_with("keep.txt"));
    }

    #[test]
    fn test_missing_input_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            enumerate(&[missing], &[]),
            Err(SlmError::Io(_))
        ));
    }

    #[test]
    fn test_single_file_input() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("hello.txt");
        fs::write(&file, b"hi\n").unwrap();

        let entries = enumerate(&[file], &[]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data, b"hi\n");
        assert!(entries[0].name.ends_with("hello.txt"));
        assert!(!entries[0].name.starts_with('/'));
    }
}
