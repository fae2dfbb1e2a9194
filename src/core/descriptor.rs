//! Package descriptors - WHAT package (name + version + config).
//!
//! A descriptor renders as `name/version:config` with omitted parts
//! elided; `Descriptor::parse` is the canonical inverse.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::UserInputError;

pub const DEFAULT_CONFIG: &str = "default";

static COMPONENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[^/:\s]+\z").expect("hard-coded regex"));

/// Immutable identifier for a package or package+config pair.
///
/// Any of the three parts may be absent: a config-only descriptor
/// (`:config`) refers to the containing package, and file-based
/// packages carry neither name nor version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub name: Option<String>,
    pub version: Option<String>,
    pub config: Option<String>,

    /// Where a file-based (include-file) package lives.
    pub file_path: Option<PathBuf>,

    /// Free-text origin used in diagnostics for synthetic packages.
    pub description: Option<String>,
}

impl Descriptor {
    pub fn new(name: Option<String>, version: Option<String>, config: Option<String>) -> Self {
        Descriptor {
            name,
            version,
            config,
            file_path: None,
            description: None,
        }
    }

    /// Descriptor for a standalone definition file.
    pub fn for_file(file_path: PathBuf, config: Option<String>) -> Self {
        Descriptor {
            name: None,
            version: None,
            config,
            file_path: Some(file_path),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse `name[/version][:config]`.
    pub fn parse(text: &str) -> Result<Self, UserInputError> {
        let (rest, config) = match text.split_once(':') {
            Some((rest, config)) => (rest, Some(config)),
            None => (text, None),
        };
        let (name, version) = match rest.split_once('/') {
            Some((name, version)) => (name, Some(version)),
            None => (rest, None),
        };

        let validate = |part: &str, what: &str| -> Result<String, UserInputError> {
            if !COMPONENT_REGEX.is_match(part) {
                return Err(UserInputError(format!(
                    "invalid {} \"{}\" in package descriptor \"{}\"",
                    what, part, text
                )));
            }
            Ok(part.to_string())
        };

        let name = match name {
            "" => None,
            name => Some(validate(name, "package name")?),
        };
        let version = match version {
            Some("") | None => {
                if version.is_some() {
                    return Err(UserInputError(format!(
                        "empty version in package descriptor \"{}\"",
                        text
                    )));
                }
                None
            }
            Some(version) => Some(validate(version, "version")?),
        };
        let config = match config {
            Some("") | None => {
                if config.is_some() {
                    return Err(UserInputError(format!(
                        "empty config name in package descriptor \"{}\"",
                        text
                    )));
                }
                None
            }
            Some(config) => Some(validate(config, "config name")?),
        };

        if name.is_none() && version.is_none() && config.is_none() {
            return Err(UserInputError(format!(
                "empty package descriptor \"{}\"",
                text
            )));
        }

        Ok(Descriptor::new(name, version, config))
    }

    /// Canonical rendering of the parts, eliding omitted ones.
    pub fn format(name: Option<&str>, version: Option<&str>, config: Option<&str>) -> String {
        let mut out = String::new();
        if let Some(name) = name {
            out.push_str(name);
        }
        if let Some(version) = version {
            out.push('/');
            out.push_str(version);
        }
        if let Some(config) = config {
            out.push(':');
            out.push_str(config);
        }
        out
    }

    /// Rendering that shows `:default` explicitly when no config is set.
    pub fn to_string_with_default_config(&self) -> String {
        Self::format(
            self.name.as_deref(),
            self.version.as_deref(),
            Some(self.config.as_deref().unwrap_or(DEFAULT_CONFIG)),
        )
    }

    /// Rendering for backtrace dumps: default config shown, file path or
    /// description standing in for a missing name.
    pub fn to_descriptive_string(&self) -> String {
        let config = Some(self.config.as_deref().unwrap_or(DEFAULT_CONFIG));

        if self.name.is_none() && self.version.is_none() {
            if let Some(path) = &self.file_path {
                return Self::format(Some(&format!("[{}]", path.display())), None, config);
            }
            if let Some(description) = &self.description {
                return Self::format(Some(&format!("<{}>", description)), None, config);
            }
        }

        let mut out = Self::format(self.name.as_deref(), self.version.as_deref(), config);
        if let Some(description) = &self.description {
            out.push_str(&format!(" ({})", description));
        }
        out
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            Self::format(
                self.name.as_deref(),
                self.version.as_deref(),
                self.config.as_deref()
            )
        )
    }
}

/// Compares two optional components with `None` sorting after any
/// concrete value ("conflicting version present but unspecified"
/// sorts last).
pub(crate) fn compare_optional<T: Ord>(mine: &Option<T>, theirs: &Option<T>) -> Ordering {
    match (mine, theirs) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

impl PartialOrd for Descriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Descriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_optional(&self.name, &other.name)
            .then_with(|| compare_optional(&self.version, &other.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_round_trips_through_parse() {
        let text = Descriptor::format(Some("foo"), Some("1.2.3"), Some("default"));
        assert_eq!(text, "foo/1.2.3:default");

        let descriptor = Descriptor::parse(&text).unwrap();
        assert_eq!(descriptor.name.as_deref(), Some("foo"));
        assert_eq!(descriptor.version.as_deref(), Some("1.2.3"));
        assert_eq!(descriptor.config.as_deref(), Some("default"));
    }

    #[test]
    fn test_parse_elided_parts() {
        let descriptor = Descriptor::parse("foo").unwrap();
        assert_eq!(descriptor.name.as_deref(), Some("foo"));
        assert_eq!(descriptor.version, None);
        assert_eq!(descriptor.config, None);

        let descriptor = Descriptor::parse("foo:debug").unwrap();
        assert_eq!(descriptor.name.as_deref(), Some("foo"));
        assert_eq!(descriptor.config.as_deref(), Some("debug"));

        let descriptor = Descriptor::parse(":debug").unwrap();
        assert_eq!(descriptor.name, None);
        assert_eq!(descriptor.config.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(Descriptor::parse("foo/").is_err());
        assert!(Descriptor::parse("foo/1.0:").is_err());
        assert!(Descriptor::parse("").is_err());
        assert!(Descriptor::parse("fo o/1.0").is_err());
    }

    #[test]
    fn test_ordering_none_sorts_last() {
        let concrete = Descriptor::new(Some("a".into()), Some("1.0".into()), None);
        let unversioned = Descriptor::new(Some("a".into()), None, None);
        assert!(concrete < unversioned);
    }

    #[test]
    fn test_default_config_rendering() {
        let descriptor = Descriptor::new(Some("foo".into()), Some("1.0".into()), None);
        assert_eq!(descriptor.to_string_with_default_config(), "foo/1.0:default");
        assert_eq!(descriptor.to_string(), "foo/1.0");
    }
}
