//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use keg::util::shell::ColorChoice;

/// keg - build-option resolution and scoped build workspaces
#[derive(Parser)]
#[command(name = "keg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors; also silences the retention notice
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// True if the command wants machine-readable output.
    pub fn wants_json(&self) -> bool {
        matches!(&self.command, Commands::Options(args) if args.json)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve build options against supplied flags
    Options(OptionsArgs),

    /// Stage files in a scoped temporary workspace
    Stage(StageArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct OptionsArgs {
    /// Option the package declares (e.g. with-foo, without-bar, HEAD)
    #[arg(long = "declare", value_name = "OPTION")]
    pub declare: Vec<String>,

    /// Dependency of the package: name[:build|:test|:optional|:recommended]
    #[arg(long = "dependency", value_name = "SPEC")]
    pub dependencies: Vec<String>,

    /// Capability to evaluate with/without
    #[arg(long = "query", value_name = "NAME")]
    pub queries: Vec<String>,

    /// Print a single JSON object
    #[arg(long)]
    pub json: bool,

    /// Flags as the user passed them, after `--` (e.g. -- --with-foo --HEAD)
    #[arg(last = true, value_name = "FLAGS")]
    pub flags: Vec<String>,
}

#[derive(Args)]
pub struct StageArgs {
    /// Label for the workspace directory (e.g. foo@1.2)
    pub prefix: String,

    /// File or directory to copy into the workspace
    #[arg(long = "copy", value_name = "PATH")]
    pub copy: Vec<PathBuf>,

    /// Keep the workspace after staging
    #[arg(long)]
    pub retain: bool,

    /// Root under which the workspace is created
    #[arg(long, env = "KEG_TEMP")]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: CompletionShell,
}
