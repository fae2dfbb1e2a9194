//! Value quoting, kept symmetric with the lexer: anything quoted here
//! lexes back to the identical string under the same grammar version.

use crate::parser::{V0_ASSET_DISALLOWED, V0_PATH_VALUE_REGEX};

/// Characters that force quoting in any grammar: whitespace splits
/// tokens, quotes open strings (mid-token in v1+), `#` starts a
/// comment.
pub fn bare_safe(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_ascii_whitespace() || c == '\'' || c == '"' || c == '#')
}

/// Can this value appear as a `set` value in the v0 grammar, where no
/// quoting is available?
pub fn v0_set_safe(value: &str) -> bool {
    value.is_empty() || bare_safe(value)
}

/// Can this value appear as an `append`/`path` value in the v0
/// grammar?
pub fn v0_path_safe(value: &str) -> bool {
    V0_PATH_VALUE_REGEX.is_match(value) && !value.contains('#')
}

/// Can this location appear in a v0 `archive`/`resource` statement?
pub fn v0_asset_safe(location: &str) -> bool {
    bare_safe(location) && !location.contains(V0_ASSET_DISALLOWED)
}

/// v0 `command` text goes inside raw double quotes with no escape
/// processing.
pub fn v0_command_safe(command: &str) -> bool {
    !command.contains('"')
}

/// Quote a value for the v1+ grammars, preferring bare, then single
/// quotes (backslash doubling only), then double quotes (full
/// escapes).
pub fn quote(value: &str) -> String {
    if bare_safe(value) {
        return value.to_string();
    }
    if !value.contains('\'') {
        return single_quote(value);
    }
    double_quote(value)
}

/// Single-quoted values are otherwise literal; only backslashes are
/// escaped, by doubling.
pub fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', r"\\"))
}

pub fn double_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_when_possible() {
        assert_eq!(quote("plain-value"), "plain-value");
        assert_eq!(quote("@/lib"), "@/lib");
    }

    #[test]
    fn test_single_quotes_for_spaces() {
        assert_eq!(quote("two words"), "'two words'");
    }

    #[test]
    fn test_double_quotes_when_single_quote_present() {
        assert_eq!(quote("it's"), "\"it's\"");
        assert_eq!(quote("a\"b'c"), "\"a\\\"b'c\"");
    }

    #[test]
    fn test_backslash_doubling() {
        assert_eq!(single_quote(r"a\b"), r"'a\\b'");
        assert_eq!(double_quote(r"a\b"), "\"a\\\\b\"");
    }

    #[test]
    fn test_v0_predicates() {
        assert!(v0_path_safe("/usr/lib"));
        assert!(!v0_path_safe("/usr:lib"));
        assert!(!v0_path_safe("has space"));
        assert!(v0_asset_safe("lib/thing.tgz"));
        assert!(!v0_asset_safe("lib/thing@2.tgz"));
        assert!(v0_command_safe("echo hi"));
        assert!(!v0_command_safe("echo \"hi\""));
    }
}
