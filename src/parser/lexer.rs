//! Tokenizer for package definition text.
//!
//! Produces whitespace-delimited tokens with 1-based line/column
//! positions. `#` starts a comment running to end of line. Quoting and
//! escaping rules depend on the grammar version, which is why the
//! lexer is constructed only after the leading `grammar` marker (if
//! any) has been recognized.

use crate::core::statement::{GrammarVersion, Position, ValueForm};
use crate::error::PackageParseError;

/// One whitespace-delimited token, with escapes already processed.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub position: Position,
    pub form: ValueForm,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    offset: usize,
    line: usize,
    column: usize,
    grammar: GrammarVersion,
    source_description: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(
        text: &'a str,
        grammar: GrammarVersion,
        source_description: &'a str,
    ) -> Self {
        Lexer {
            input: text.as_bytes(),
            offset: 0,
            line: 1,
            column: 1,
            grammar,
            source_description,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, PackageParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn error(&self, message: impl Into<String>, position: Position) -> PackageParseError {
        PackageParseError::new(
            message,
            self.source_description,
            position.line,
            position.column,
        )
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.offset += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() {
                self.bump();
            } else if byte == b'#' {
                while let Some(byte) = self.peek() {
                    if byte == b'\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, PackageParseError> {
        self.skip_whitespace_and_comments();
        let Some(_) = self.peek() else {
            return Ok(None);
        };

        let position = self.position();
        let mut buffer = Vec::new();
        let mut form = ValueForm::Bare;

        loop {
            match self.peek() {
                None => break,
                Some(byte) if byte.is_ascii_whitespace() || byte == b'#' => break,
                Some(quote @ (b'\'' | b'"')) => {
                    form = self.read_quoted(quote, &mut buffer)?;
                    // A closing quote must end the token.
                    match self.peek() {
                        None => {}
                        Some(byte) if byte.is_ascii_whitespace() || byte == b'#' => {}
                        Some(_) => {
                            return Err(self.error(
                                "unexpected text after closing quote",
                                self.position(),
                            ));
                        }
                    }
                    break;
                }
                Some(byte) => {
                    self.bump();
                    buffer.push(byte);
                }
            }
        }

        let text = String::from_utf8(buffer)
            .map_err(|_| self.error("package definition text is not valid UTF-8", position))?;

        Ok(Some(Token {
            text,
            position,
            form,
        }))
    }

    fn read_quoted(
        &mut self,
        quote: u8,
        text: &mut Vec<u8>,
    ) -> Result<ValueForm, PackageParseError> {
        let open_position = self.position();

        if self.grammar == GrammarVersion::V0 {
            if quote == b'\'' {
                return Err(self.error(
                    "single-quoted strings require at least the v1 grammar",
                    open_position,
                ));
            }
            if !text.is_empty() {
                return Err(self.error(
                    "quotes may only open a value in the v0 grammar",
                    open_position,
                ));
            }
            // v0 double quotes are raw: no escape processing at all.
            self.bump();
            loop {
                match self.bump() {
                    None => {
                        return Err(
                            self.error("unterminated double-quoted string", open_position)
                        );
                    }
                    Some(b'"') => break,
                    Some(byte) => text.push(byte),
                }
            }
            return Ok(ValueForm::DoubleQuoted);
        }

        self.bump();
        loop {
            match self.bump() {
                None => {
                    return Err(self.error("unterminated quoted string", open_position));
                }
                Some(byte) if byte == quote => break,
                Some(b'\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated escape", open_position))?;
                    match escaped {
                        b'\\' => text.push(b'\\'),
                        // Single-quoted strings only support doubled backslashes.
                        b'\'' | b'"' if quote == b'"' => text.push(escaped),
                        _ => {
                            return Err(self.error(
                                format!("invalid escape \"\\{}\"", escaped as char),
                                open_position,
                            ));
                        }
                    }
                }
                Some(byte) => text.push(byte),
            }
        }

        Ok(if quote == b'\'' {
            ValueForm::SingleQuoted
        } else {
            ValueForm::DoubleQuoted
        })
    }
}

/// Phase one of parsing: recognize only the optional leading
/// `grammar vN` marker so the version-specific lexer can be chosen.
pub fn detect_grammar_version(
    text: &str,
    source_description: &str,
) -> Result<GrammarVersion, PackageParseError> {
    let mut scanner = Lexer::new(text, GrammarVersion::V1, source_description);
    scanner.skip_whitespace_and_comments();

    let mut first_word = String::new();
    while let Some(byte) = scanner.peek() {
        if byte.is_ascii_whitespace() || byte == b'#' {
            break;
        }
        scanner.bump();
        first_word.push(byte as char);
    }

    if first_word != "grammar" {
        return Ok(GrammarVersion::default());
    }

    scanner.skip_whitespace_and_comments();
    let version_position = scanner.position();
    let mut version_word = String::new();
    while let Some(byte) = scanner.peek() {
        if byte.is_ascii_whitespace() || byte == b'#' {
            break;
        }
        scanner.bump();
        version_word.push(byte as char);
    }

    let number = version_word
        .strip_prefix('v')
        .and_then(|n| n.parse::<u32>().ok());
    match number.and_then(GrammarVersion::from_number) {
        Some(version) => Ok(version),
        None => Err(PackageParseError::new(
            format!("unsupported grammar version \"{}\"", version_word),
            source_description,
            version_position.line,
            version_position.column,
        )),
    }
}
