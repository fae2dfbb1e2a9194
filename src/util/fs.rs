//! Filesystem helpers that attach path context to IO errors.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))
}

pub fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .map_err(|e| Error::io(format!("failed to write {}", path.display()), e))
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| Error::io(format!("failed to create directory {}", path.display()), e))
}

/// Copy a file or an entire directory tree. Parent directories of the
/// destination are created as needed.
pub fn copy_recursive(source: &Path, destination: &Path) -> Result<()> {
    let metadata = fs::metadata(source)
        .map_err(|e| Error::io(format!("failed to stat {}", source.display()), e))?;

    if metadata.is_dir() {
        for entry in walkdir::WalkDir::new(source) {
            let entry = entry.map_err(|e| {
                Error::io(
                    format!("failed to walk {}", source.display()),
                    e.into(),
                )
            })?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .unwrap_or(entry.path());
            let target = destination.join(relative);
            if entry.file_type().is_dir() {
                ensure_dir(&target)?;
            } else {
                copy_file(entry.path(), &target)?;
            }
        }
        Ok(())
    } else {
        copy_file(source, destination)
    }
}

fn copy_file(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(source, destination).map_err(|e| {
        Error::io(
            format!(
                "failed to copy {} to {}",
                source.display(),
                destination.display()
            ),
            e,
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_recursive_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();
        fs::write(source.join("nested/b.txt"), "b").unwrap();

        let destination = dir.path().join("out/copied");
        copy_recursive(&source, &destination).unwrap();

        assert_eq!(fs::read_to_string(destination.join("a.txt")).unwrap(), "a");
        assert_eq!(
            fs::read_to_string(destination.join("nested/b.txt")).unwrap(),
            "b"
        );
    }

    #[test]
    fn test_read_error_names_the_path() {
        let err = read_to_string(Path::new("/no/such/file")).unwrap_err();
        assert!(err.to_string().contains("/no/such/file"));
    }
}
