//! The statement model: the declarative body of a package definition.
//!
//! Statements form a closed sum type so every consumer (the parser
//! builders, the environment walker, the unparser dispatch) matches
//! exhaustively and the compiler keeps the set honest.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::core::descriptor::Descriptor;

/// Grammar dialect tag selecting quoting/escaping rules for the
/// package definition text format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrammarVersion {
    #[default]
    V0,
    V1,
    V2,
    V3,
}

impl GrammarVersion {
    pub fn number(self) -> u32 {
        match self {
            GrammarVersion::V0 => 0,
            GrammarVersion::V1 => 1,
            GrammarVersion::V2 => 2,
            GrammarVersion::V3 => 3,
        }
    }

    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            0 => Some(GrammarVersion::V0),
            1 => Some(GrammarVersion::V1),
            2 => Some(GrammarVersion::V2),
            3 => Some(GrammarVersion::V3),
            _ => None,
        }
    }
}

impl fmt::Display for GrammarVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// 1-based line/column of a token in the definition text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// How a value was written in the source text. Single-quoted values
/// are literal and never globbed; bare and double-quoted ones are
/// glob-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueForm {
    Bare,
    SingleQuoted,
    DoubleQuoted,
}

impl ValueForm {
    pub fn glob_eligible(self) -> bool {
        !matches!(self, ValueForm::SingleQuoted)
    }
}

/// Mutable bookkeeping flags shared between a statement and the
/// resolution pass that consumes it. One package owns its statements
/// and one resolution pass flips the flags; the handle is shared so
/// the include backtrace can mark overrides referenced without holding
/// a borrow of the owning package.
#[derive(Debug, Clone, Default)]
pub struct UsageFlags(Rc<UsageFlagsInner>);

#[derive(Debug, Default)]
struct UsageFlagsInner {
    added_to_environment: Cell<bool>,
    referenced: Cell<bool>,
}

impl UsageFlags {
    pub fn mark_added_to_environment(&self) {
        self.0.added_to_environment.set(true);
    }

    pub fn added_to_environment(&self) -> bool {
        self.0.added_to_environment.get()
    }

    pub fn mark_referenced(&self) {
        self.0.referenced.set(true);
    }

    pub fn referenced(&self) -> bool {
        self.0.referenced.get()
    }
}

/// One statement in a package definition.
///
/// Equality compares the statement kind only; position metadata and
/// usage flags are ignored, which is what the parse/unparse round-trip
/// property requires.
#[derive(Debug, Clone)]
pub struct Statement {
    pub position: Option<Position>,
    pub source_description: String,
    pub usage: UsageFlags,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// A named `config ... end` block.
    Configuration { name: String, body: Vec<Statement> },

    /// Pull another package's config into this one. A descriptor with
    /// no name refers to another config of the containing package.
    Include {
        descriptor: Descriptor,
        containing_package_name: Option<String>,
    },

    /// Pull a standalone definition file into this config.
    IncludeFile {
        path: String,
        config_name: Option<String>,
    },

    /// Force a version for a named package across the rest of this
    /// include scope.
    Override { package_name: String, version: String },

    /// Replace an environment variable.
    Set { name: String, value: String },

    /// Append a component to a path-list environment variable
    /// (`add`/`append`/`path` in the text format).
    Path { name: String, value: String },

    /// An archive file belonging to the package; extracted on retrieval.
    Archive { location: String, form: ValueForm },

    /// A file belonging to the package; copied verbatim.
    Resource { location: String, form: ValueForm },

    /// Copy the resolved paths of a variable into the working directory.
    Retrieve { variable: String, pattern: String },

    /// Command to run when the package is invoked directly.
    Command { command: String },

    /// Leading `grammar vN` dialect marker.
    GrammarVersion { version: GrammarVersion },

    /// Raw text carried through untouched; only ever synthesized.
    SyntheticRawText { text: String },
}

impl Statement {
    pub fn new(
        kind: StatementKind,
        position: Position,
        source_description: impl Into<String>,
    ) -> Self {
        Statement {
            position: Some(position),
            source_description: source_description.into(),
            usage: UsageFlags::default(),
            kind,
        }
    }

    /// A statement constructed programmatically rather than parsed.
    pub fn synthetic(kind: StatementKind, description: impl Into<String>) -> Self {
        Statement {
            position: None,
            source_description: description.into(),
            usage: UsageFlags::default(),
            kind,
        }
    }

    /// ` (line L, column C [source])` suffix for diagnostics, empty for
    /// synthetic statements without a position.
    pub fn position_string(&self) -> String {
        match self.position {
            Some(position) => format!(" ({} [{}])", position, self.source_description),
            None => {
                if self.source_description.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", self.source_description)
                }
            }
        }
    }

    /// Visit this statement's descendants (not itself), depth-first in
    /// statement order.
    pub fn walk(&self, visit: &mut dyn FnMut(&Statement)) {
        if let StatementKind::Configuration { body, .. } = &self.kind {
            for statement in body {
                visit(statement);
                statement.walk(visit);
            }
        }
    }

    pub fn is_asset(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::Archive { .. } | StatementKind::Resource { .. }
        )
    }

    pub fn asset_location(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Archive { location, .. }
            | StatementKind::Resource { location, .. } => Some(location),
            _ => None,
        }
    }

    /// The basename an asset will be published/copied under, or `None`
    /// when the location is a glob whose matches aren't known yet.
    pub fn asset_name(&self) -> Option<String> {
        let (location, form) = match &self.kind {
            StatementKind::Archive { location, form }
            | StatementKind::Resource { location, form } => (location, *form),
            _ => return None,
        };

        let basename = location.rsplit('/').next().unwrap_or(location);
        if form.glob_eligible() && !crate::util::paths::is_url(location) {
            if basename.contains(['*', '?', '[', ']', '{', '}']) {
                return None;
            }
        }
        Some(basename.to_string())
    }

    /// Statement keyword as written in the text format.
    pub fn keyword(&self) -> &'static str {
        match &self.kind {
            StatementKind::Configuration { .. } => "config",
            StatementKind::Include { .. } => "include",
            StatementKind::IncludeFile { .. } => "include-file",
            StatementKind::Override { .. } => "override",
            StatementKind::Set { .. } => "set",
            StatementKind::Path { .. } => "append",
            StatementKind::Archive { .. } => "archive",
            StatementKind::Resource { .. } => "resource",
            StatementKind::Retrieve { .. } => "retrieve",
            StatementKind::Command { .. } => "command",
            StatementKind::GrammarVersion { .. } => "grammar",
            StatementKind::SyntheticRawText { .. } => "",
        }
    }
}

impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize, column: usize) -> Position {
        Position { line, column }
    }

    #[test]
    fn test_equality_ignores_position_metadata() {
        let a = Statement::new(
            StatementKind::Set {
                name: "FOO".into(),
                value: "bar".into(),
            },
            at(1, 1),
            "one source",
        );
        let b = Statement::new(
            StatementKind::Set {
                name: "FOO".into(),
                value: "bar".into(),
            },
            at(7, 3),
            "another source",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_walk_visits_config_body_in_order() {
        let body = vec![
            Statement::synthetic(
                StatementKind::Override {
                    package_name: "dep".into(),
                    version: "2.0".into(),
                },
                "test",
            ),
            Statement::synthetic(
                StatementKind::Include {
                    descriptor: Descriptor::parse("dep").unwrap(),
                    containing_package_name: None,
                },
                "test",
            ),
        ];
        let config = Statement::synthetic(
            StatementKind::Configuration {
                name: "default".into(),
                body,
            },
            "test",
        );

        let mut keywords = Vec::new();
        config.walk(&mut |statement| keywords.push(statement.keyword()));
        assert_eq!(keywords, vec!["override", "include"]);
    }

    #[test]
    fn test_asset_name_from_url_and_glob() {
        let archive = Statement::synthetic(
            StatementKind::Archive {
                location: "http://example/dir/thing.tgz".into(),
                form: ValueForm::Bare,
            },
            "test",
        );
        assert_eq!(archive.asset_name().as_deref(), Some("thing.tgz"));

        let globbed = Statement::synthetic(
            StatementKind::Resource {
                location: "lib/*.so".into(),
                form: ValueForm::Bare,
            },
            "test",
        );
        assert_eq!(globbed.asset_name(), None);

        let literal = Statement::synthetic(
            StatementKind::Resource {
                location: "lib/*.so".into(),
                form: ValueForm::SingleQuoted,
            },
            "test",
        );
        assert_eq!(literal.asset_name().as_deref(), Some("*.so"));
    }

    #[test]
    fn test_usage_flags_shared_across_clones() {
        let statement = Statement::synthetic(
            StatementKind::Override {
                package_name: "dep".into(),
                version: "1.0".into(),
            },
            "test",
        );
        let clone = statement.clone();
        statement.usage.mark_referenced();
        assert!(clone.usage.referenced());
    }
}
