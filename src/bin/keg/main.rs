//! keg CLI - build-option resolution and scoped build workspaces

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use keg::util::Shell;

fn main() {
    // Parse CLI
    let cli = Cli::parse();

    let shell = Arc::new(Shell::from_flags(
        cli.quiet,
        cli.verbose,
        cli.color,
        cli.wants_json(),
    ));

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("keg=debug")
    } else {
        EnvFilter::new("keg=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(shell.use_color())
        .without_time()
        .init();

    if let Err(e) = run(cli, &shell) {
        shell.error(format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Arc<Shell>) -> Result<()> {
    match cli.command {
        Commands::Options(args) => commands::options::execute(args, shell),
        Commands::Stage(args) => commands::stage::execute(args, shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
