//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Moor - a declarative package and environment manager
#[derive(Parser)]
#[command(name = "moor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Root directory of the package repository
    #[arg(long, global = true, env = "MOOR_REPOSITORY")]
    pub repository: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a package definition for syntax errors
    Check(CheckArgs),

    /// Print the environment a package resolves to
    Env(EnvArgs),

    /// Run a command inside the resolved environment
    Run(RunArgs),

    /// Display the dependency tree
    Tree(TreeArgs),

    /// Reprint a definition in canonical form
    Fmt(FmtArgs),

    /// List packages in the repository
    List(ListArgs),

    /// Publish a package definition and its assets
    Publish(PublishArgs),
}

/// How the base package is named and tweaked; shared by the
/// environment-producing commands.
#[derive(Args)]
pub struct PackageArgs {
    /// Package descriptor (name/version:config); defaults to the
    /// package.moor in the current directory
    pub package: Option<String>,

    /// Read the definition from a file instead
    #[arg(short, long, conflicts_with = "package")]
    pub file: Option<PathBuf>,

    /// Read the definition from stdin
    #[arg(long, conflicts_with_all = ["package", "file"])]
    pub stdin: bool,

    /// Config to apply (overrides the descriptor's config)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Set a variable, NAME=VALUE; wins over package statements
    #[arg(long, value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Append to a path variable, NAME=VALUE
    #[arg(long, value_name = "NAME=VALUE")]
    pub append: Vec<String>,

    /// Retrieve assets while resolving, optionally into DIR
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    pub update: Option<Option<PathBuf>>,

    /// Ignore all include statements
    #[arg(long)]
    pub suppress_includes: bool,

    /// Ignore includes that name a different package
    #[arg(long, conflicts_with = "suppress_includes")]
    pub suppress_cross_package_includes: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Definition file to check (defaults to package.moor)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct EnvArgs {
    #[command(flatten)]
    pub package: PackageArgs,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub package: PackageArgs,

    /// Command to run; omitted, the config's command statement runs
    #[arg(last = true)]
    pub argv: Vec<String>,
}

#[derive(Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub package: PackageArgs,

    /// Emit Graphviz DOT instead of indented text
    #[arg(long)]
    pub dot: bool,
}

#[derive(Args)]
pub struct FmtArgs {
    /// Definition file to reformat (defaults to package.moor)
    pub path: Option<PathBuf>,

    /// Rewrite the file in place instead of printing
    #[arg(long)]
    pub write: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only list versions of this package
    pub name: Option<String>,
}

#[derive(Args)]
pub struct PublishArgs {
    /// Descriptor to publish under, name/version
    pub descriptor: String,

    /// Definition file to publish (defaults to package.moor)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}
