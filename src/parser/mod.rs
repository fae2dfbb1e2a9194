//! Grammar parser: package definition text -> Package.
//!
//! Parsing is two-phase: the optional leading `grammar vN` marker is
//! recognized first (default v0), then the version-specific lexer and
//! statement rules run over the whole text. Grammar versions differ in
//! quoting/escaping and in which statements are legal:
//!
//! - v0: bareword values only; `append` values are checked against a
//!   character blacklist; `command "..."`.
//! - v1: single-/double-quoted values for env vars and asset
//!   locations, wider bareword charset, `command "..." end`.
//! - v2: retrieve patterns may be quoted.
//! - v3: `include-file` statements.

pub mod lexer;

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::descriptor::Descriptor;
use crate::core::package::Package;
use crate::core::statement::{GrammarVersion, Statement, StatementKind, ValueForm};
use crate::error::{Error, PackageParseError, UrlAccessDisallowedError, UserInputError};
use crate::util::paths;

use lexer::{detect_grammar_version, Lexer, Token};

static VARIABLE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A\w+\z").expect("hard-coded regex"));

// Single quotes are blocked in v0 values to leave room for quoting.
pub(crate) static V0_PATH_VALUE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\A[^;:'"<>|\s]+\z"#).expect("hard-coded regex"));

pub(crate) static V0_ASSET_DISALLOWED: &[char] = &['@', '<', '>', '|', '\'', '"'];

/// A package definition that has been located but not yet parsed.
#[derive(Debug, Clone, Default)]
pub struct UnparsedPackage {
    pub descriptor: Descriptor,
    pub runtime_directory: PathBuf,
    pub include_file_base_directory: PathBuf,
    pub source_description: String,
    pub text: String,
}

/// The parser itself; cheap to construct, reusable across packages.
pub struct Parser {
    /// Allowed URL prefixes for archive/resource statements; `None`
    /// means no restriction.
    url_whitelist: Option<Vec<String>>,

    /// Reject includes without an explicit version (publish preflight).
    check_include_versions: bool,
}

impl Parser {
    pub fn new(url_whitelist: Option<Vec<String>>, check_include_versions: bool) -> Self {
        Parser {
            url_whitelist,
            check_include_versions,
        }
    }

    pub fn parse_package(&self, unparsed: &UnparsedPackage) -> Result<Package, Error> {
        let grammar =
            detect_grammar_version(&unparsed.text, &unparsed.source_description)?;
        let tokens = Lexer::new(&unparsed.text, grammar, &unparsed.source_description)
            .tokenize()?;

        let mut build = Build {
            parser: self,
            unparsed,
            grammar,
            tokens: &tokens,
            index: 0,
            disallowed_urls: Vec::new(),
            versionless_includes: Vec::new(),
        };

        let statements = build.parse_statements()?;

        if !build.disallowed_urls.is_empty() {
            return Err(UrlAccessDisallowedError {
                urls: build.disallowed_urls,
                descriptor: unparsed.descriptor.clone(),
            }
            .into());
        }

        if self.check_include_versions && !build.versionless_includes.is_empty() {
            return Err(UserInputError(format!(
                "includes in published packages must specify a version: {}",
                build.versionless_includes.join(", ")
            ))
            .into());
        }

        Ok(Package::new(
            unparsed.descriptor.name.clone(),
            unparsed.descriptor.version.clone(),
            unparsed.descriptor.file_path.clone(),
            unparsed.descriptor.description.clone(),
            unparsed.runtime_directory.clone(),
            unparsed.include_file_base_directory.clone(),
            statements,
            false,
        ))
    }
}

/// Per-parse state threaded through the statement rules.
struct Build<'a> {
    parser: &'a Parser,
    unparsed: &'a UnparsedPackage,
    grammar: GrammarVersion,
    tokens: &'a [Token],
    index: usize,
    disallowed_urls: Vec<String>,
    versionless_includes: Vec<String>,
}

impl<'a> Build<'a> {
    fn source(&self) -> &str {
        &self.unparsed.source_description
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> Error {
        PackageParseError::new(
            message,
            self.source(),
            token.position.line,
            token.position.column,
        )
        .into()
    }

    fn error_at_end(&self, message: impl Into<String>) -> Error {
        PackageParseError {
            message: message.into(),
            source_description: self.source().to_string(),
            line: None,
            column: None,
        }
        .into()
    }

    fn user_error(&self, token: &Token, message: impl Into<String>) -> Error {
        let message = message.into();
        UserInputError(format!(
            "{} (line {}, column {} [{}])",
            message,
            token.position.line,
            token.position.column,
            self.source()
        ))
        .into()
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.index);
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn expect_value(&mut self, what: &str, keyword: &Token) -> Result<&'a Token, Error> {
        self.next()
            .ok_or_else(|| self.error_at(keyword, format!("expected {} after \"{}\"", what, keyword.text)))
    }

    fn statement(&self, kind: StatementKind, token: &Token) -> Statement {
        Statement::new(kind, token.position, self.source())
    }

    fn parse_statements(&mut self) -> Result<Vec<Statement>, Error> {
        let mut statements = Vec::new();

        while let Some(keyword) = self.next() {
            if keyword.form != ValueForm::Bare {
                return Err(self.error_at(keyword, "expected a statement keyword"));
            }

            match keyword.text.as_str() {
                "grammar" => {
                    if !statements.is_empty() {
                        return Err(self.error_at(
                            keyword,
                            "a \"grammar\" statement must come before everything else",
                        ));
                    }
                    // Version token already validated by phase one.
                    self.next();
                    statements.push(self.statement(
                        StatementKind::GrammarVersion {
                            version: self.grammar,
                        },
                        keyword,
                    ));
                }
                "config" => statements.push(self.parse_config(keyword)?),
                "archive" | "resource" => statements.push(self.parse_asset(keyword)?),
                "retrieve" => statements.push(self.parse_retrieve(keyword)?),
                "include" | "include-file" | "override" | "set" | "add" | "append" | "path"
                | "command" => {
                    return Err(self.error_at(
                        keyword,
                        format!(
                            "a \"{}\" statement is only allowed inside a \"config\" block",
                            keyword.text
                        ),
                    ));
                }
                "end" => {
                    return Err(self.error_at(keyword, "\"end\" without an open \"config\" block"));
                }
                other => {
                    return Err(
                        self.error_at(keyword, format!("unknown statement \"{}\"", other))
                    );
                }
            }
        }

        Ok(statements)
    }

    fn parse_config(&mut self, keyword: &Token) -> Result<Statement, Error> {
        let name = self.expect_value("a config name", keyword)?;
        if name.form != ValueForm::Bare || name.text.contains([':', '/']) {
            return Err(self.error_at(name, "invalid config name"));
        }

        let mut body = Vec::new();
        let mut saw_command = false;

        loop {
            let Some(token) = self.next() else {
                return Err(self.error_at_end(format!(
                    "unexpected end of input; \"config {}\" has no matching \"end\"",
                    name.text
                )));
            };
            if token.form != ValueForm::Bare {
                return Err(self.error_at(token, "expected a statement keyword"));
            }

            match token.text.as_str() {
                "end" => break,
                "include" => body.push(self.parse_include(token)?),
                "include-file" => body.push(self.parse_include_file(token)?),
                "override" => body.push(self.parse_override(token)?),
                "set" => body.push(self.parse_environment_variable(token, false)?),
                "add" | "append" | "path" => {
                    body.push(self.parse_environment_variable(token, true)?)
                }
                "command" => {
                    if saw_command {
                        return Err(self.user_error(
                            token,
                            "found a second \"command\" statement within a \"config\" block",
                        ));
                    }
                    saw_command = true;
                    body.push(self.parse_command(token)?);
                }
                "config" => {
                    return Err(
                        self.error_at(token, "\"config\" blocks cannot be nested")
                    );
                }
                other => {
                    return Err(self.error_at(
                        token,
                        format!("unknown statement \"{}\" within a \"config\" block", other),
                    ));
                }
            }
        }

        Ok(self.statement(
            StatementKind::Configuration {
                name: name.text.clone(),
                body,
            },
            keyword,
        ))
    }

    fn parse_include(&mut self, keyword: &Token) -> Result<Statement, Error> {
        let target = self.expect_value("a package descriptor", keyword)?;
        let descriptor = Descriptor::parse(&target.text)
            .map_err(|e| self.user_error(target, e.0))?;

        if self.parser.check_include_versions
            && descriptor.name.is_some()
            && descriptor.version.is_none()
        {
            self.versionless_includes.push(target.text.clone());
        }

        Ok(self.statement(
            StatementKind::Include {
                descriptor,
                containing_package_name: self.unparsed.descriptor.name.clone(),
            },
            keyword,
        ))
    }

    fn parse_include_file(&mut self, keyword: &Token) -> Result<Statement, Error> {
        if self.grammar < GrammarVersion::V3 {
            return Err(self.error_at(
                keyword,
                format!(
                    "\"include-file\" statements require the v3 grammar (this file is {})",
                    self.grammar
                ),
            ));
        }

        let path = self.expect_value("a file path", keyword)?;

        // Optional `:config` token after the path.
        let config_name = match self.tokens.get(self.index) {
            Some(token) if token.form == ValueForm::Bare && token.text.starts_with(':') => {
                self.index += 1;
                let name = token.text[1..].to_string();
                if name.is_empty() || name.contains([':', '/']) {
                    return Err(self.error_at(token, "invalid config name on \"include-file\""));
                }
                Some(name)
            }
            _ => None,
        };

        Ok(self.statement(
            StatementKind::IncludeFile {
                path: path.text.clone(),
                config_name,
            },
            keyword,
        ))
    }

    fn parse_override(&mut self, keyword: &Token) -> Result<Statement, Error> {
        let target = self.expect_value("a package/version", keyword)?;
        let descriptor = Descriptor::parse(&target.text)
            .map_err(|e| self.user_error(target, e.0))?;

        let (Some(name), Some(version), None) =
            (descriptor.name, descriptor.version, descriptor.config)
        else {
            return Err(self.user_error(
                target,
                "an \"override\" must look like \"override package/version\"",
            ));
        };

        Ok(self.statement(
            StatementKind::Override {
                package_name: name,
                version,
            },
            keyword,
        ))
    }

    fn parse_environment_variable(
        &mut self,
        keyword: &Token,
        is_path: bool,
    ) -> Result<Statement, Error> {
        let assignment = self.expect_value("NAME=VALUE", keyword)?;
        let (name, value) = match assignment.text.split_once('=') {
            Some((name, value)) => (name, value),
            None => (assignment.text.as_str(), ""),
        };

        let describe = || {
            format!(
                "invalid {} statement \"{}\"",
                keyword.text, assignment.text
            )
        };

        if !VARIABLE_NAME_REGEX.is_match(name) {
            return Err(self.user_error(
                assignment,
                format!("{}: bad environment variable name \"{}\"", describe(), name),
            ));
        }

        if self.grammar == GrammarVersion::V0 {
            if is_path && !V0_PATH_VALUE_REGEX.is_match(value) {
                return Err(self.user_error(
                    assignment,
                    format!(
                        "{}: the value cannot contain any of \";:<>|\", quotes, or whitespace \
                         in the v0 grammar",
                        describe()
                    ),
                ));
            }
            if !is_path && value.contains(['\'', '"']) {
                return Err(self.user_error(
                    assignment,
                    format!("{}: quotes in values require the v1 grammar", describe()),
                ));
            }
        }

        let kind = if is_path {
            StatementKind::Path {
                name: name.to_string(),
                value: value.to_string(),
            }
        } else {
            StatementKind::Set {
                name: name.to_string(),
                value: value.to_string(),
            }
        };

        Ok(self.statement(kind, keyword))
    }

    fn parse_command(&mut self, keyword: &Token) -> Result<Statement, Error> {
        let command = self.expect_value("a quoted command", keyword)?;
        if command.form != ValueForm::DoubleQuoted {
            return Err(self.error_at(
                command,
                "the command text must be double-quoted",
            ));
        }

        if self.grammar >= GrammarVersion::V1 {
            match self.next() {
                Some(token) if token.text == "end" && token.form == ValueForm::Bare => {}
                Some(token) => {
                    return Err(self.error_at(
                        token,
                        "a \"command\" statement must be terminated by \"end\"",
                    ));
                }
                None => {
                    return Err(
                        self.error_at_end("a \"command\" statement must be terminated by \"end\"")
                    );
                }
            }
        }

        Ok(self.statement(
            StatementKind::Command {
                command: command.text.clone(),
            },
            keyword,
        ))
    }

    fn parse_retrieve(&mut self, keyword: &Token) -> Result<Statement, Error> {
        let target = self.expect_value("VARIABLE->pattern", keyword)?;

        if self.grammar < GrammarVersion::V2 && target.form != ValueForm::Bare {
            return Err(self.error_at(
                target,
                format!(
                    "quoted retrieve patterns require the v2 grammar (this file is {})",
                    self.grammar
                ),
            ));
        }

        let Some((variable, pattern)) = target.text.split_once("->") else {
            return Err(self.user_error(
                target,
                "a \"retrieve\" must look like \"retrieve VARIABLE->pattern\"",
            ));
        };

        if !VARIABLE_NAME_REGEX.is_match(variable) {
            return Err(self.user_error(
                target,
                format!(
                    "invalid retrieve statement: bad environment variable name \"{}\"",
                    variable
                ),
            ));
        }
        if pattern.is_empty() {
            return Err(
                self.user_error(target, "a \"retrieve\" must have a destination pattern")
            );
        }

        if paths::looks_absolute(pattern) {
            tracing::warn!(
                "retrieve pattern \"{}\" looks like an absolute path (line {}, column {} [{}])",
                pattern,
                target.position.line,
                target.position.column,
                self.source(),
            );
        }

        Ok(self.statement(
            StatementKind::Retrieve {
                variable: variable.to_string(),
                pattern: pattern.to_string(),
            },
            keyword,
        ))
    }

    fn parse_asset(&mut self, keyword: &Token) -> Result<Statement, Error> {
        let location = self.expect_value("a location", keyword)?;

        if self.grammar == GrammarVersion::V0
            && location.text.contains(V0_ASSET_DISALLOWED)
        {
            return Err(self.error_at(
                location,
                format!(
                    "invalid character in {} location \"{}\" for the v0 grammar",
                    keyword.text, location.text
                ),
            ));
        }

        if paths::is_url(&location.text) {
            if let Some(whitelist) = &self.parser.url_whitelist {
                if !whitelist
                    .iter()
                    .any(|prefix| location.text.starts_with(prefix))
                {
                    // Keep going: collect every bad URL so the user sees
                    // all of them at once.
                    self.disallowed_urls.push(location.text.clone());
                }
            }
        }

        let kind = match keyword.text.as_str() {
            "archive" => StatementKind::Archive {
                location: location.text.clone(),
                form: location.form,
            },
            _ => StatementKind::Resource {
                location: location.text.clone(),
                form: location.form,
            },
        };

        Ok(self.statement(kind, keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::statement::Position;

    fn unparsed(text: &str) -> UnparsedPackage {
        UnparsedPackage {
            descriptor: Descriptor::new(
                Some("package_name".into()),
                Some("0.1.1".into()),
                None,
            ),
            runtime_directory: PathBuf::from("foo_directory"),
            include_file_base_directory: PathBuf::from("foo_directory"),
            source_description: "source description".into(),
            text: text.to_string(),
        }
    }

    fn parse(text: &str) -> Result<Package, Error> {
        Parser::new(None, false).parse_package(&unparsed(text))
    }

    fn parse_ok(text: &str) -> Package {
        parse(text).expect("expected successful parse")
    }

    #[test]
    fn test_syntax_error_names_the_source() {
        let err = parse("this is invalid syntax\n").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("source description"));
    }

    #[test]
    fn test_statement_positions() {
        let text = "\n\
            # Blank line above to ensure that we can handle starting whitespace.\n\
            \x20\x20resource http://example/is/awesome.tgz\n\
            \n\
            \x20\x20\x20\x20\x20\x20archive http://svpsvn/my/repo/is/cool.jar\n\
            \n\
            config default\n\
            \x20\x20include package/some-version\n\
            \x20\x20set VARIABLE=VALUE\n\
            end\n";
        let package = parse_ok(text);

        let mut positions = Vec::new();
        package.walk_statements(&mut |statement| {
            positions.push((statement.keyword(), statement.position.unwrap()));
        });

        assert_eq!(
            positions,
            vec![
                ("resource", Position { line: 3, column: 3 }),
                ("archive", Position { line: 5, column: 7 }),
                ("config", Position { line: 7, column: 1 }),
                ("include", Position { line: 8, column: 3 }),
                ("set", Position { line: 9, column: 3 }),
            ]
        );
    }

    #[test]
    fn test_url_whitelist_collects_every_violation() {
        let parser = Parser::new(Some(vec!["http://good/".into()]), false);
        let err = parser
            .parse_package(&unparsed(
                "resource http://good/x.tgz\narchive http://bad/y.jar\nresource http://worse/z.tgz\n",
            ))
            .unwrap_err();

        let Error::UrlAccessDisallowed(err) = err else {
            panic!("expected UrlAccessDisallowedError, got {err:?}");
        };
        assert_eq!(err.urls, vec!["http://bad/y.jar", "http://worse/z.tgz"]);
        assert_eq!(err.descriptor.name.as_deref(), Some("package_name"));
    }

    #[test]
    fn test_whitelist_ignores_local_paths() {
        let parser = Parser::new(Some(vec!["http://good/".into()]), false);
        assert!(parser
            .parse_package(&unparsed("resource lib/thing.tgz\n"))
            .is_ok());
    }

    #[test]
    fn test_second_command_in_one_config_is_rejected() {
        for (grammar, terminator) in [("v0", ""), ("v1", " end")] {
            let text = format!(
                "grammar {grammar}\nconfig default\n  command \"echo foo\"{terminator}\n  command \"echo bar\"{terminator}\nend\n"
            );
            let err = parse(&text).unwrap_err();
            assert!(matches!(err, Error::UserInput(_)), "{grammar}: {err:?}");
            assert!(err
                .to_string()
                .contains("second \"command\" statement within a \"config\" block"));
        }
    }

    #[test]
    fn test_one_command_per_config_is_fine() {
        for (grammar, terminator) in [("v0", ""), ("v1", " end")] {
            let text = format!(
                "grammar {grammar}\n\
                 config default\n  command \"echo foo\"{terminator}\nend\n\
                 config another\n  command \"echo bar\"{terminator}\nend\n"
            );
            parse(&text).unwrap_or_else(|e| panic!("{grammar}: {e}"));
        }
    }

    #[test]
    fn test_v0_path_value_character_blacklist() {
        for bad in [";", ":", "<", ">", "|"] {
            let text = format!("config default\n  append PATH_VARIABLE=x{bad}y\nend\n");
            let err = parse(&text).unwrap_err();
            assert!(matches!(err, Error::UserInput(_)), "{bad}: {err:?}");
            assert!(err.to_string().contains("PATH_VARIABLE"), "{bad}");
        }

        // Mid-token quotes do not even lex in v0.
        for bad in ["'", "\""] {
            let text = format!("config default\n  append PATH_VARIABLE=x{bad}y{bad}\nend\n");
            assert!(matches!(parse(&text).unwrap_err(), Error::Parse(_)), "{bad}");
        }
    }

    #[test]
    fn test_v1_allows_blacklisted_path_characters_with_quoting() {
        for bad in [";", ":", "<", ">", "|", " "] {
            let text = format!(
                "grammar v1\nconfig default\n  append PATH_VARIABLE='x{bad}y'\nend\n"
            );
            parse_ok(&text);
        }
    }

    #[test]
    fn test_asset_character_rules_by_grammar() {
        for character in ["@", "<", ">", "|"] {
            let v0 = format!("archive foo{character}bar\n");
            assert!(parse(&v0).is_err(), "{character} should be rejected in v0");

            let v1 = format!("grammar v1\narchive foo{character}bar\nconfig default\nend\n");
            let package = parse_ok(&v1);
            assert_eq!(package.archive_locations(), vec![format!("foo{character}bar")]);
        }
    }

    #[test]
    fn test_octothorpes_in_quoted_v1_asset() {
        let package = parse_ok("grammar v1\nresource 'foo#bar'\nconfig default\nend\n");
        assert_eq!(package.resource_locations(), vec!["foo#bar"]);
    }

    #[test]
    fn test_plus_signs_in_asset_paths() {
        for grammar in ["v0", "v1"] {
            let text = format!(
                "grammar {grammar}\narchive testlib++.whatever\n\
                 config default\n  append LIBPATH=@/testlib++\nend\n"
            );
            parse_ok(&text);
        }
    }

    #[test]
    fn test_include_file_requires_v3() {
        let rejected = "grammar v2\nconfig default\n  include-file 'extra.moor'\nend\n";
        let err = parse(rejected).unwrap_err();
        assert!(err.to_string().contains("v3 grammar"));

        let accepted = "grammar v3\nconfig default\n  include-file 'extra.moor' :tools\nend\n";
        let package = parse_ok(accepted);
        let config = package.config("default").unwrap();
        let mut found = false;
        config.walk(&mut |statement| {
            if let StatementKind::IncludeFile { path, config_name } = &statement.kind {
                assert_eq!(path, "extra.moor");
                assert_eq!(config_name.as_deref(), Some("tools"));
                found = true;
            }
        });
        assert!(found);
    }

    #[test]
    fn test_quoted_retrieve_pattern_requires_v2() {
        let err = parse("grammar v1\nretrieve FOO->'dest dir/[package]'\n").unwrap_err();
        assert!(err.to_string().contains("v2 grammar"));

        parse_ok("grammar v2\nretrieve FOO->'dest dir/[package]'\n");
    }

    #[test]
    fn test_retrieve_shape_errors() {
        assert!(parse("retrieve FOO\n").is_err());
        assert!(parse("retrieve FOO->\n").is_err());
        assert!(parse("retrieve FO O->dest\n").is_err());
    }

    #[test]
    fn test_check_include_versions() {
        let parser = Parser::new(None, true);
        let err = parser
            .parse_package(&unparsed("config default\n  include dep\nend\n"))
            .unwrap_err();
        assert!(err.to_string().contains("must specify a version"));
        assert!(err.to_string().contains("dep"));

        let parser = Parser::new(None, true);
        assert!(parser
            .parse_package(&unparsed("config default\n  include dep/1.0\nend\n"))
            .is_ok());
    }

    #[test]
    fn test_grammar_statement_must_come_first() {
        let err = parse("config default\nend\ngrammar v1\n").unwrap_err();
        assert!(err.to_string().contains("before everything else"));
    }

    #[test]
    fn test_config_without_end() {
        let err = parse("config default\n  set FOO=bar\n").unwrap_err();
        assert!(err.to_string().contains("no matching \"end\""));
    }
}
