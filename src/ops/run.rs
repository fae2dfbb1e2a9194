//! Resolve an environment, then execute a command inside it.

use std::process::Command;

use anyhow::{Context, Result};

use crate::core::descriptor::DEFAULT_CONFIG;
use crate::core::package::Package;
use crate::core::statement::StatementKind;
use crate::ops::resolve::{resolve_environment, ResolveOptions};
use crate::sources::Repository;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub resolve: ResolveOptions,
    /// Explicit argv; when empty, the selected config's `command`
    /// statement runs instead.
    pub argv: Vec<String>,
}

/// Run either the caller's argv or the config's command statement with
/// the resolved variables applied. Returns the child's exit code.
pub fn run(repository: &Repository, options: &RunOptions) -> Result<i32> {
    let (environment, base) = resolve_environment(repository, &options.resolve)?;

    let mut command = if options.argv.is_empty() {
        let config_name = options.resolve.config.as_deref().unwrap_or(DEFAULT_CONFIG);
        let text = command_statement(&base, config_name)?.ok_or_else(|| {
            anyhow::anyhow!(
                "config {} of {} has no command statement and no command was given",
                config_name,
                base.name_or_file_or_description()
            )
        })?;
        shell_command(&text)
    } else {
        let mut command = Command::new(&options.argv[0]);
        command.args(&options.argv[1..]);
        command
    };

    command.envs(environment.variables());

    let status = command
        .status()
        .with_context(|| format!("failed to execute {:?}", command.get_program()))?;

    Ok(status.code().unwrap_or(1))
}

/// The `command` statement text of one config, if any.
pub fn command_statement(package: &Package, config_name: &str) -> Result<Option<String>> {
    let config = package.config(config_name)?;
    let mut found = None;
    config.walk(&mut |statement| {
        if let StatementKind::Command { command } = &statement.kind {
            if found.is_none() {
                found = Some(command.clone());
            }
        }
    });
    Ok(found)
}

#[cfg(unix)]
fn shell_command(text: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(text);
    command
}

#[cfg(windows)]
fn shell_command(text: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(text);
    command
}
