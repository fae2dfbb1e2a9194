//! Path-list and URL helpers.

use std::path::Path;

/// Separator used when appending to path-list environment variables.
pub fn path_list_separator() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}

/// Whether a location is a URL rather than a local path. Requires an
/// explicit scheme; bare words like `foo:bar` stay local paths.
pub fn is_url(location: &str) -> bool {
    location.contains("://") && url::Url::parse(location).is_ok()
}

/// Whether a retrieve target looks absolute (leading slash or a
/// Windows drive prefix) and therefore escapes the working directory.
pub fn looks_absolute(pattern: &str) -> bool {
    if pattern.starts_with('/') || pattern.starts_with('\\') {
        return true;
    }
    let mut chars = pattern.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic()
    )
}

/// Basename of a path or URL, as used for asset naming.
pub fn basename(location: &str) -> &str {
    location.rsplit('/').next().unwrap_or(location)
}

/// Canonicalize a path, but don't fail if it doesn't exist yet.
/// Returns the path as-is if canonicalization fails.
pub fn normalize_path(path: &Path) -> std::path::PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("http://example/x.tgz"));
        assert!(is_url("ftp://example/x.tgz"));
        assert!(!is_url("lib/thing.tgz"));
        assert!(!is_url("foo:bar"));
    }

    #[test]
    fn test_looks_absolute() {
        assert!(looks_absolute("/etc/passwd"));
        assert!(looks_absolute("C:stuff"));
        assert!(!looks_absolute("dest/[package]"));
    }
}
