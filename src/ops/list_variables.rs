//! Render a resolved environment as `NAME=VALUE` lines.

use crate::env::RuntimeEnvironment;

/// One line per variable, sorted by name, trailing newline included
/// when any variable exists.
pub fn list_variables(environment: &RuntimeEnvironment<'_>) -> String {
    let mut out = String::new();
    for (name, value) in environment.variables() {
        out.push_str(name);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}
