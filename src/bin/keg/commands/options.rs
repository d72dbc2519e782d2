//! `keg options` command
//!
//! Evaluates declared options against supplied flags and prints what the
//! build would see.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::OptionsArgs;
use keg::core::{BuildOptions, Dependency, Options};
use keg::util::Shell;

#[derive(Serialize)]
struct OptionsReport {
    declared: Options,
    supplied: Options,
    used: Options,
    unused: Options,
    head: bool,
    stable: bool,
    bottle: bool,
    any_args_or_options: bool,
    queries: Vec<QueryReport>,
    dependencies: Vec<DependencyReport>,
}

#[derive(Serialize)]
struct QueryReport {
    name: String,
    with: bool,
    without: bool,
}

#[derive(Serialize)]
struct DependencyReport {
    name: String,
    with: bool,
    pruned: bool,
}

pub fn execute(args: OptionsArgs, shell: &Arc<Shell>) -> Result<()> {
    let mut declared = Options::from_names(&args.declare);

    let mut dependencies = Vec::new();
    for spec in &args.dependencies {
        let dep = Dependency::parse(spec)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid --dependency `{}`", spec))?;
        declared.declare_dependency(&dep);
        dependencies.push(dep);
    }

    let build = BuildOptions::new(Options::from_flags(&args.flags), declared);
    tracing::debug!("resolving {}", build);

    let report = OptionsReport {
        declared: build.options().clone(),
        supplied: build.args().clone(),
        used: build.used_options(),
        unused: build.unused_options(),
        head: build.is_head(),
        stable: build.is_stable(),
        bottle: build.is_bottle(),
        any_args_or_options: build.any_args_or_options(),
        queries: args
            .queries
            .iter()
            .map(|name| QueryReport {
                name: name.clone(),
                with: build.with(name),
                without: build.without(name),
            })
            .collect(),
        dependencies: dependencies
            .iter()
            .map(|dep| DependencyReport {
                name: dep.name().to_string(),
                with: build.with(dep),
                pruned: build.should_prune(dep),
            })
            .collect(),
    };

    if shell.is_json() {
        shell.json_value(&serde_json::to_value(&report)?);
        return Ok(());
    }

    println!("declared: {}", report.declared);
    println!("supplied: {}", report.supplied);
    println!("used: {}", report.used);
    println!("unused: {}", report.unused);
    println!("head: {}", report.head);
    println!("stable: {}", report.stable);
    println!("bottle: {}", report.bottle);
    println!("any args or options: {}", report.any_args_or_options);
    for query in &report.queries {
        println!("with {}: {}", query.name, query.with);
    }
    for dep in &report.dependencies {
        let state = if dep.pruned { "pruned" } else { "kept" };
        println!("dependency {}: {}", dep.name, state);
    }

    Ok(())
}
