//! Moor CLI - a declarative package and environment manager

use anyhow::Result;
use clap::Parser;
use moor::util::diagnostic::Diagnostic;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        let color = std::env::var_os("NO_COLOR").is_none();
        eprint!("{}", Diagnostic::from_fatal(&e).format(color));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("moor=debug")
    } else {
        EnvFilter::new("moor=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    // Execute command
    let repository = cli.repository;
    match cli.command {
        Commands::Check(args) => commands::check::execute(args),
        Commands::Env(args) => commands::env::execute(args, repository),
        Commands::Run(args) => {
            let code = commands::run::execute(args, repository)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Tree(args) => commands::tree::execute(args, repository),
        Commands::Fmt(args) => commands::fmt::execute(args),
        Commands::List(args) => commands::list::execute(args, repository),
        Commands::Publish(args) => commands::publish::execute(args, repository),
    }
}
