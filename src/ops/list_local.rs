//! Enumerate the packages a repository holds.

use anyhow::Result;

use crate::sources::Repository;

/// `name/version` lines, sorted. The directory scan itself is
/// parallelized by the transport.
pub fn list_local(repository: &Repository) -> Result<Vec<String>> {
    let pairs = repository.list_packages()?;
    Ok(pairs
        .into_iter()
        .map(|(name, version)| format!("{}/{}", name, version))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::DirectorySource;

    #[test]
    fn test_lists_published_packages() {
        let dir = tempfile::TempDir::new().unwrap();
        for (name, version) in [("b", "2.0"), ("a", "1.0")] {
            let package_dir = dir.path().join(name).join(version);
            std::fs::create_dir_all(&package_dir).unwrap();
            std::fs::write(package_dir.join("package.moor"), "config default\nend\n")
                .unwrap();
        }

        let repository =
            Repository::new(Box::new(DirectorySource::new(dir.path())), None);
        assert_eq!(list_local(&repository).unwrap(), vec!["a/1.0", "b/2.0"]);
    }
}
