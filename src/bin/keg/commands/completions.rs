//! `keg completions` command
//!
//! Generates shell completions for bash, zsh, fish, elvish and PowerShell.

use std::io;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    generate(args.shell, &mut cmd, bin_name, &mut io::stdout().lock());

    Ok(())
}
