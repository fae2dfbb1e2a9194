//! Error taxonomy for moor.
//!
//! Parse-time and resolution-time structural errors abort the whole
//! invocation; warnings are routed through `tracing` and never abort.

use thiserror::Error;

use crate::core::Descriptor;

/// Syntax-level failure while parsing a package definition.
///
/// Always carries the source description so users can tell which
/// definition text was at fault, plus the position when known.
#[derive(Debug, Clone, Error)]
#[error("{message} ({location})", location = self.location())]
pub struct PackageParseError {
    pub message: String,
    pub source_description: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl PackageParseError {
    pub fn new(
        message: impl Into<String>,
        source_description: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        PackageParseError {
            message: message.into(),
            source_description: source_description.into(),
            line: Some(line),
            column: Some(column),
        }
    }

    fn location(&self) -> String {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                format!("{}:{}:{}", self.source_description, line, column)
            }
            (Some(line), None) => format!("{}:{}", self.source_description, line),
            _ => self.source_description.clone(),
        }
    }
}

/// Semantic misuse caught during parsing or option handling: a bad
/// descriptor shape, a disallowed statement combination, and so on.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct UserInputError(pub String);

/// A package definition referenced URLs outside of the configured
/// whitelist. Collects every offending URL across the whole parse so
/// the user sees all problems at once.
#[derive(Debug, Clone, Error)]
#[error("access to {urls:?} in {descriptor} is not allowed")]
pub struct UrlAccessDisallowedError {
    pub urls: Vec<String>,
    pub descriptor: Descriptor,
}

/// Structural resolution failure: override conflicts, cycles,
/// malformed repository state. Unrecoverable.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RepositoryError(pub String);

/// Two different package objects claimed the same name within one
/// environment. Carries the include backtrace of the already
/// registered package when one is known.
#[derive(Debug, Clone, Error)]
#[error("{description}", description = self.description())]
pub struct VersionConflictError {
    pub package: String,
    pub existing: String,
    pub requested: String,
    /// Rendered include chain of the existing package, root first.
    pub backtrace: Option<String>,
}

impl VersionConflictError {
    fn description(&self) -> String {
        let mut message = format!(
            "version mismatch for package {} ({} vs {})",
            self.package, self.existing, self.requested
        );
        if let Some(backtrace) = &self.backtrace {
            if !backtrace.is_empty() {
                message.push('\n');
                message.push_str(backtrace.trim_end());
            }
        }
        message
    }
}

/// A package (or one of its versions) is not in the backing store.
#[derive(Debug, Clone, Error)]
#[error("package {identity} not found in {store}", identity = self.identity())]
pub struct PackageNotFoundError {
    pub name: String,
    pub version: Option<String>,
    pub store: String,
}

impl PackageNotFoundError {
    fn identity(&self) -> String {
        match &self.version {
            Some(version) => format!("{}/{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

/// The named config does not exist in the package.
///
/// Carries the offending descriptor plus the package's valid config
/// names so callers can render "did you mean" suggestions.
#[derive(Debug, Clone, Error)]
#[error("there is no \"{config_description}\" config", config_description = self.config_description())]
pub struct NoSuchConfigError {
    pub descriptor: Descriptor,
    pub valid_configs: Vec<String>,
}

impl NoSuchConfigError {
    fn config_description(&self) -> String {
        if self.descriptor.name.is_none() && self.descriptor.version.is_none() {
            self.descriptor.config.clone().unwrap_or_default()
        } else {
            self.descriptor.to_string_with_default_config()
        }
    }

    /// Render a hint listing the configs that do exist.
    pub fn suggestion(&self) -> String {
        match self.valid_configs.len() {
            0 => "Actually, there are no configs.".to_string(),
            1 => format!("The only config is \"{}\".", self.valid_configs[0]),
            _ => format!("The valid configs are \"{}\".", self.valid_configs.join("\", \"")),
        }
    }
}

/// Umbrella error for the core library.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] PackageParseError),

    #[error(transparent)]
    UserInput(#[from] UserInputError),

    #[error(transparent)]
    UrlAccessDisallowed(#[from] UrlAccessDisallowedError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    VersionConflict(#[from] VersionConflictError),

    #[error(transparent)]
    PackageNotFound(#[from] PackageNotFoundError),

    #[error(transparent)]
    NoSuchConfig(#[from] NoSuchConfigError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
