// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use featurepipe::config::{load_and_validate_config, Config, RuntimeBuilder};
use featurepipe::features::{FeatureManifest, FsFeatureCatalog};
use featurepipe::model::{InputManifest, Pipeline, RunMode, RunStatus};
use featurepipe::pipeline::{validate, PipelineGraph};
use featurepipe::sandbox::run_child;
use featurepipe::storage::RecordStore;

const USAGE: &str = "\
Usage: featurepipe [--config <config.yaml>] <command> [args]

Commands:
  validate <pipeline.json>                          Check a pipeline graph
  run <pipeline.json> [--manifest <m.json>] [--mode sync|async]
                                                    Create and execute a run
  publish <manifest.json>                           Add a feature to the catalog
  release <run-id>                                  Drop a finished run's artefact references
  gc [--days <n>]                                   Sweep expired artefacts and orphans
  sandbox-child --catalog <dir> <hash> <inputs> <output>
                                                    Internal: invoke one feature";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let code = match dispatch(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn dispatch(mut args: Vec<String>) -> Result<i32> {
    let config_path = take_option(&mut args, "--config")?;
    if args.is_empty() {
        eprintln!("{}", USAGE);
        return Ok(2);
    }
    let command = args.remove(0);

    // The child never touches the parent's config or stores
    if command == "sandbox-child" {
        return sandbox_child(args);
    }

    let config = match config_path {
        Some(path) => load_and_validate_config(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => Config::default(),
    };

    match command.as_str() {
        "validate" => validate_command(&config, args),
        "run" => run_command(&config, args).await,
        "publish" => publish_command(&config, args),
        "release" => release_command(&config, args),
        "gc" => gc_command(&config, args),
        other => {
            eprintln!("Unknown command '{}'\n\n{}", other, USAGE);
            Ok(2)
        }
    }
}

/// Remove `--flag value` from `args`, returning the value
fn take_option(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    match args.iter().position(|arg| arg == flag) {
        Some(index) => {
            if index + 1 >= args.len() {
                bail!("{} requires a value", flag);
            }
            let value = args.remove(index + 1);
            args.remove(index);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn single_argument(args: Vec<String>, what: &str) -> Result<String> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(value), None) => Ok(value),
        _ => bail!("expected exactly one argument: {}", what),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn open_catalog(config: &Config) -> Result<FsFeatureCatalog> {
    Ok(FsFeatureCatalog::open(
        config.features.get_catalog_dir(&config.storage),
    )?)
}

fn validate_command(config: &Config, args: Vec<String>) -> Result<i32> {
    let path = PathBuf::from(single_argument(args, "<pipeline.json>")?);
    let catalog = open_catalog(config)?;
    let report = validate(&read_json(&path)?, &catalog);

    for warning in report.warning_messages() {
        println!("warning: {}", warning);
    }
    if report.is_valid() {
        println!("{} is valid", path.display());
        return Ok(0);
    }
    for error in report.error_messages() {
        println!("error: {}", error);
    }
    Ok(1)
}

async fn run_command(config: &Config, mut args: Vec<String>) -> Result<i32> {
    let mode = take_option(&mut args, "--mode")?;
    let manifest_path = take_option(&mut args, "--manifest")?;
    let path = PathBuf::from(single_argument(args, "<pipeline.json>")?);

    let runtime = RuntimeBuilder::from_config(config)?;
    let mode = match mode {
        Some(mode) => mode.parse::<RunMode>().map_err(|e| anyhow!(e))?,
        None => runtime.default_mode,
    };

    let raw = read_json(&path)?;
    let report = validate(&raw, runtime.catalog.as_ref());
    if !report.is_valid() {
        for error in report.error_messages() {
            println!("error: {}", error);
        }
        return Ok(1);
    }
    let graph: PipelineGraph = serde_json::from_value(raw)
        .with_context(|| format!("decoding graph in {}", path.display()))?;

    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("cannot derive a pipeline name from {}", path.display()))?;
    let pipeline = Pipeline::new(name, graph, runtime.catalog.as_ref());
    runtime.records.save_pipeline(&pipeline)?;

    let manifest: InputManifest = match manifest_path {
        Some(manifest_path) => serde_json::from_value(read_json(Path::new(&manifest_path))?)
            .with_context(|| format!("decoding input manifest {}", manifest_path))?,
        None => InputManifest::new(),
    };

    let run = runtime.orchestrator.create_run(&pipeline, manifest, mode)?;
    let finished = runtime.orchestrator.execute(run.id).await?;
    runtime.flush()?;

    println!("run {} finished: {}", finished.id, finished.status);
    for step in runtime.orchestrator.steps(finished.id)? {
        let status = step.status.to_string();
        match (&step.artefact_hash, &step.error) {
            (Some(hash), _) => println!("  {:<20} {:<8} {}", step.node_id, status, hash),
            (None, Some(error)) => println!("  {:<20} {:<8} {}", step.node_id, status, error),
            (None, None) => println!("  {:<20} {}", step.node_id, status),
        }
    }
    if let Some(message) = &finished.error_message {
        println!("{}", message);
    }

    Ok(if finished.status == RunStatus::Success { 0 } else { 1 })
}

fn publish_command(config: &Config, args: Vec<String>) -> Result<i32> {
    let path = PathBuf::from(single_argument(args, "<manifest.json>")?);
    let manifest: FeatureManifest = serde_json::from_value(read_json(&path)?)
        .with_context(|| format!("decoding feature manifest {}", path.display()))?;

    let record = open_catalog(config)?.publish(manifest)?;
    println!("{} v{} {}", record.name(), record.version, record.hash);
    Ok(0)
}

fn release_command(config: &Config, args: Vec<String>) -> Result<i32> {
    let run_id: Uuid = single_argument(args, "<run-id>")?
        .parse()
        .context("parsing run id")?;
    let runtime = RuntimeBuilder::from_config(config)?;
    let released = runtime.orchestrator.release_run(run_id)?;
    runtime.flush()?;
    println!("released {} artefact reference(s)", released);
    Ok(0)
}

fn gc_command(config: &Config, mut args: Vec<String>) -> Result<i32> {
    let days = take_option(&mut args, "--days")?;
    if !args.is_empty() {
        bail!("unexpected arguments: {}", args.join(" "));
    }

    let runtime = RuntimeBuilder::from_config(config)?;
    let retention = match days {
        Some(days) => chrono::Duration::days(days.parse().context("parsing --days")?),
        None => runtime.retention,
    };

    let swept = runtime.artefacts.sweep_expired(retention)?;
    let report = runtime.artefacts.cleanup_orphans()?;
    runtime.flush()?;

    println!(
        "swept {} expired artefact(s); removed {} orphan blob(s) and {} orphan record(s)",
        swept, report.blobs_removed, report.records_removed
    );
    Ok(0)
}

fn sandbox_child(mut args: Vec<String>) -> Result<i32> {
    let catalog = take_option(&mut args, "--catalog")?
        .ok_or_else(|| anyhow!("sandbox-child requires --catalog <dir>"))?;
    let (hash, inputs, output) = match args.as_slice() {
        [hash, inputs, output] => (hash, inputs, output),
        _ => bail!("sandbox-child expects <hash> <inputs> <output>"),
    };

    run_child(
        Path::new(&catalog),
        hash,
        Path::new(inputs),
        Path::new(output),
    )?;
    Ok(0)
}
