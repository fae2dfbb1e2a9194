//! User-friendly diagnostic messages.
//!
//! Every fatal error should name the root cause and, where possible, a
//! concrete next step.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no package definition file is found.
    pub const NO_PACKAGE_FILE: &str =
        "help: Create a package.moor in the current directory or pass --file";

    /// Suggestion when a descriptor names a config the package lacks.
    pub const UNKNOWN_CONFIG: &str =
        "help: Pick one of the package's configs with `--config`";

    /// Suggestion when a package is not in the repository.
    pub const PACKAGE_NOT_FOUND: &str =
        "help: Run `moor list` to see the packages the repository holds";

    /// Suggestion when two versions of one package collide.
    pub const VERSION_CONFLICT: &str =
        "help: Pin one version with an `override` statement before the includes";

    /// Suggestion when a definition fails to parse.
    pub const PARSE_FAILED: &str =
        "help: Run `moor check <definition>` for the exact location";
}

/// A fatal-error message with optional context lines and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Build the diagnostic a fatal CLI error prints: the top-level
    /// message, one context line per cause, and a suggestion picked by
    /// the library error buried in the chain, if any.
    pub fn from_fatal(error: &anyhow::Error) -> Self {
        let mut diagnostic = Diagnostic::error(error.to_string());
        for cause in error.chain().skip(1) {
            diagnostic = diagnostic.with_context(cause.to_string());
        }

        use crate::error::Error;
        match error.downcast_ref::<Error>() {
            Some(Error::Parse(_)) => diagnostic.with_suggestion(suggestions::PARSE_FAILED),
            Some(Error::VersionConflict(_)) => {
                diagnostic.with_suggestion(suggestions::VERSION_CONFLICT)
            }
            Some(Error::PackageNotFound(_)) => {
                diagnostic.with_suggestion(suggestions::PACKAGE_NOT_FOUND)
            }
            Some(Error::NoSuchConfig(e)) => diagnostic
                .with_context(e.suggestion())
                .with_suggestion(suggestions::UNKNOWN_CONFIG),
            _ => diagnostic,
        }
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            "\x1b[1;31merror\x1b[0m"
        } else {
            "error"
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  - {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Definition syntax error with the offending span, for `moor check`.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("{message}")]
#[diagnostic(code(moor::parse::syntax))]
pub struct ParseDiagnostic {
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub span: Option<SourceSpan>,
    #[help]
    pub help: Option<String>,
}

impl ParseDiagnostic {
    /// Build from a parse error plus the definition text it came from.
    pub fn from_parse_error(
        error: &crate::error::PackageParseError,
        text: &str,
    ) -> Self {
        let span = match (error.line, error.column) {
            (Some(line), Some(column)) => offset_of(text, line, column)
                .map(|offset| SourceSpan::new(offset.into(), 1)),
            _ => None,
        };

        ParseDiagnostic {
            message: error.message.clone(),
            src: NamedSource::new(error.source_description.clone(), text.to_string()),
            span,
            help: Some(suggestions::PARSE_FAILED.to_string()),
        }
    }
}

/// Byte offset of a 1-based line/column pair in `text`.
fn offset_of(text: &str, line: usize, column: usize) -> Option<usize> {
    if line == 1 {
        return Some(column.saturating_sub(1).min(text.len()));
    }
    let mut current_line = 1;
    for (index, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            current_line += 1;
            if current_line == line {
                return Some((index + column).min(text.len()));
            }
        }
    }
    None
}
