//! `keg stage` command
//!
//! Copies files into a scoped workspace, lists what ended up there, and then
//! lets the workspace clean itself up (or keeps it with `--retain`).
//!
//! Ctrl-C and friends are recorded while staging runs. Staging stops at the
//! next file, the workspace is cleaned up, and only then is the signal
//! delivered.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::cli::StageArgs;
use keg::core::WorkspaceOptions;
use keg::util::fs::copy_dir_all;
use keg::util::shell::Status;
use keg::util::signal::InterruptWatcher;
use keg::util::{GlobalContext, Shell};

pub fn execute(args: StageArgs, shell: &Arc<Shell>) -> Result<()> {
    let mut ctx = GlobalContext::new()?.with_shell(Arc::clone(shell));
    if let Some(dir) = args.temp_dir {
        ctx.set_temp_dir(ctx.cwd().join(dir));
    }

    let options = WorkspaceOptions {
        retain: args.retain,
        ..WorkspaceOptions::default()
    };
    let workspace = ctx.workspace(&args.prefix, options);
    let watcher = InterruptWatcher::install();

    let result = workspace.run(|ws| -> Result<()> {
        if shell.is_quiet() {
            ws.quiet();
        }

        let dir = ws
            .tmpdir()
            .context("workspace directory was not created")?
            .to_path_buf();
        shell.status(Status::Staging, dir.display());

        for src in &args.copy {
            watcher.check()?;
            // Relative paths are relative to where keg was started, not the workspace
            let src = ctx.cwd().join(src);
            stage_path(&src, &dir)?;
            shell.status(Status::Copied, src.display());
        }

        watcher.check()?;
        for entry in WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let rel = entry.path().strip_prefix(&dir)?;
            println!("{}", rel.display());
        }

        Ok(())
    });

    watcher.resume();
    result
}

fn stage_path(src: &Path, dir: &Path) -> Result<()> {
    let name = src
        .file_name()
        .with_context(|| format!("cannot stage `{}`: no file name", src.display()))?;
    let dst = dir.join(name);

    let meta = fs::metadata(src)
        .with_context(|| format!("cannot stage `{}`", src.display()))?;
    if meta.is_dir() {
        copy_dir_all(src, &dst)
    } else {
        fs::copy(src, &dst)
            .map(|_| ())
            .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))
    }
}
