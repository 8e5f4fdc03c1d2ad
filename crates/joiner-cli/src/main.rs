// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::{CandidateSetting, Config};
use env_logger::{Env, Target};
use joiner_tui::{HeadlessHost, restore_node};
use joiner_app::TriggerKind;
use joiner_wildcards::{CandidateFetcher, Client, DirectoryFetcher};
use runtime::{FileRuntime, SharedFetcher};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_ENV: &str = "JOINER_LOG";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `joiner --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    init_logging(&config)?;

    let workflow_path = match &options.workflow_path {
        Some(path) => path.clone(),
        None => config.workflow_path()?,
    };

    if options.print_joined {
        return print_joined(&workflow_path);
    }

    let fetcher = build_fetcher(&config).with_context(|| {
        format!(
            "invalid [wildcards] config in {}; fix base_url/timeout/dir values",
            options.config_path.display()
        )
    })?;

    if options.check_only {
        runtime::read_workflow(&workflow_path).with_context(|| {
            format!(
                "workflow {} is unreadable -- pass --workflow or set [workflow].path",
                workflow_path.display()
            )
        })?;
        if let Some(fetcher) = &fetcher {
            check_candidates(fetcher.as_ref())?;
        }
        return Ok(());
    }

    log::info!("starting editor on {}", workflow_path.display());
    let mut runtime = FileRuntime::new(workflow_path, fetcher);
    joiner_tui::run_app(&mut runtime)
}

fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {} -- set [log].file to move it", path.display()))?;

    // The terminal belongs to the editor, so records go to the file.
    env_logger::Builder::from_env(Env::new().filter_or(LOG_ENV, config.log_level()))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("initialize logger")?;
    Ok(())
}

fn build_fetcher(config: &Config) -> Result<Option<SharedFetcher>> {
    let fetcher: SharedFetcher = match config.candidate_setting()? {
        CandidateSetting::Disabled => return Ok(None),
        CandidateSetting::Directory(dir) => Arc::new(DirectoryFetcher::new(dir)),
        CandidateSetting::Server { base_url, timeout } => {
            Arc::new(Client::new(&base_url, timeout)?)
        }
    };
    Ok(Some(fetcher))
}

/// Fetches every candidate kind once and reports the counts. Unlike the
/// editor, an unreachable source is an error here.
fn check_candidates(fetcher: &dyn CandidateFetcher) -> Result<Vec<(TriggerKind, usize)>> {
    let mut counts = Vec::new();
    for kind in TriggerKind::ALL {
        let values = fetcher
            .fetch(kind)
            .with_context(|| {
                format!("fetch {} candidates from {}", kind.as_str(), fetcher.describe())
            })?;
        println!("{}: {} candidate(s)", kind.as_str(), values.len());
        counts.push((kind, values.len()));
    }
    Ok(counts)
}

fn print_joined(workflow_path: &Path) -> Result<()> {
    let (saved, _) = runtime::read_workflow(workflow_path)?;
    let mut host = HeadlessHost::default();
    for node in &saved {
        let (node, _) = restore_node(node, &mut host);
        println!("# node {} ({} fields)", node.id().get(), node.field_count());
        println!("{}", node.joined_output());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    workflow_path: Option<PathBuf>,
    print_config_path: bool,
    print_example: bool,
    print_joined: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        workflow_path: None,
        print_config_path: false,
        print_example: false,
        print_joined: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--workflow" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--workflow requires a file path"))?;
                options.workflow_path = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--print-joined" => {
                options.print_joined = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("joiner");
    println!("  --config <path>          Use a specific config path");
    println!("  --workflow <path>        Edit a specific workflow file");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --print-joined           Print each node's joined text and exit");
    println!("  --check                  Validate config, workflow and candidate source");
    println!("  --help                   Show this help");
}
