use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sprite_pipeline::foundation::logging;
use sprite_pipeline::prelude::*;
use sprite_pipeline::publish::classify;

const DEFAULT_CONFIG_FILE: &str = "sprites.toml";

fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("status", sub)) => status(&matches, sub),
        Some(("init-config", sub)) => init_config(&matches, sub),
        Some(("run", sub)) => run(&matches, sub),
        _ => run(&matches, &matches),
    }
}

fn cli() -> Command {
    Command::new("sprite_baker")
        .about("Renders four-view sprites for every changed model and publishes them")
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("DIR")
                .help("Project root holding models/, sprites/ and static/")
                .default_value(".")
                .global(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (.toml or .ron), relative to the root")
                .default_value(DEFAULT_CONFIG_FILE)
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("FILTER")
                .help("Log filter when RUST_LOG is not set (e.g. debug, sprite_pipeline=trace)")
                .global(true),
        )
        .args(run_args())
        .subcommand(
            Command::new("run")
                .about("Render stale models and publish every category (default)")
                .args(run_args()),
        )
        .subcommand(
            Command::new("status")
                .about("Show the staleness verdict and alias of every model without rendering")
                .arg(category_arg()),
        )
        .subcommand(
            Command::new("init-config")
                .about("Write a configuration file with the default values")
                .arg(
                    Arg::new("overwrite")
                        .long("overwrite")
                        .help("Replace an existing configuration file")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn category_arg() -> Arg {
    Arg::new("category")
        .long("category")
        .value_name("NAME")
        .help("Only process this category; may be repeated")
        .action(ArgAction::Append)
}

fn run_args() -> Vec<Arg> {
    vec![
        category_arg(),
        Arg::new("force")
            .short('f')
            .long("force")
            .help("Render every model regardless of staleness")
            .action(ArgAction::SetTrue),
        Arg::new("dry-run")
            .short('n')
            .long("dry-run")
            .help("Report what would be rendered without touching any file")
            .action(ArgAction::SetTrue),
        Arg::new("size")
            .long("size")
            .value_name("WxH")
            .help("Sprite resolution, e.g. 256 or 320x240"),
    ]
}

/// Configuration and project root shared by every subcommand
struct Session {
    root: PathBuf,
    config_path: PathBuf,
    config: PipelineConfig,
}

fn load_session(global: &ArgMatches) -> Result<Session> {
    let root = global.get_one::<String>("root").map_or_else(|| PathBuf::from("."), PathBuf::from);
    let root = root
        .canonicalize()
        .with_context(|| format!("Project root '{}' is not accessible", root.display()))?;

    let config_path = global
        .get_one::<String>("config")
        .map_or_else(|| root.join(DEFAULT_CONFIG_FILE), |path| root.join(path));

    let loaded = load_config(&config_path)?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    let level = global
        .get_one::<String>("log-level")
        .map_or(config.logging.level.as_str(), String::as_str);
    logging::init_with_level(level);

    if found {
        log::info!("Loaded configuration from '{}'", config_path.display());
    } else {
        log::info!("No configuration at '{}', using defaults", config_path.display());
    }
    log::info!("Project root: {}", root.display());
    Ok(Session {
        root,
        config_path,
        config,
    })
}

/// Read the configuration file, `None` when there is none
///
/// Runs before logging is set up so the file can choose the log level.
fn load_config(path: &Path) -> Result<Option<PipelineConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    PipelineConfig::load_from_file(path)
        .map(Some)
        .with_context(|| format!("Failed to load configuration from '{}'", path.display()))
}

fn selected_categories(matches: &ArgMatches) -> Option<Vec<ModelCategory>> {
    matches
        .get_many::<String>("category")
        .map(|names| names.map(ModelCategory::new).collect())
}

fn run(global: &ArgMatches, matches: &ArgMatches) -> Result<()> {
    let mut session = load_session(global)?;

    if let Some(size) = matches.get_one::<String>("size") {
        let (width, height) = parse_size(size)?;
        session.config = session.config.with_resolution(width, height);
    }
    if let Some(categories) = selected_categories(matches) {
        let names: Vec<&str> = categories.iter().map(ModelCategory::as_str).collect();
        session.config = session.config.with_categories(names);
    }
    session.config.validate().context("Invalid configuration")?;

    let options = RunOptions {
        force: matches.get_flag("force"),
        dry_run: matches.get_flag("dry-run"),
        categories: None,
    };

    let backend = HeadlessBackend::new(session.config.render.clone());
    let mut orchestrator = RenderOrchestrator::new(&session.config, &session.root, backend);
    let report = orchestrator.run(&options).context("Sprite pipeline failed")?;

    println!(
        "{} rendered, {} skipped, {} pending in {:.1}s",
        report.rendered_count(),
        report.skipped_count(),
        report.pending_count(),
        report.elapsed.as_secs_f64()
    );

    let conflicts: Vec<&ConflictError> = report.conflicts().collect();
    if !conflicts.is_empty() {
        for conflict in &conflicts {
            eprintln!("conflict: {conflict}");
        }
        bail!("{} sprite aliases could not be published", conflicts.len());
    }
    Ok(())
}

fn status(global: &ArgMatches, matches: &ArgMatches) -> Result<()> {
    let session = load_session(global)?;
    session.config.validate().context("Invalid configuration")?;

    let options = RunOptions {
        dry_run: true,
        categories: selected_categories(matches),
        ..RunOptions::default()
    };

    let backend = HeadlessBackend::new(session.config.render.clone());
    let mut orchestrator = RenderOrchestrator::new(&session.config, &session.root, backend);
    let report = orchestrator.run(&options).context("Failed to inspect the catalog")?;

    println!("{:<32} {:<8} {:<20} {:<20} alias", "model", "state", "source", "sprites");
    for model in &report.models {
        let verdict = match model.outcome {
            ModelOutcome::Skipped(verdict) | ModelOutcome::WouldRender(verdict) => verdict,
            ModelOutcome::Rendered { previous, .. } => previous,
        };
        let (source, output) = match verdict {
            Freshness::Fresh { source, output } | Freshness::Stale { source, output } => {
                (format_time(source), format_time(output))
            }
            Freshness::Missing | Freshness::Empty => ("-".to_string(), "-".to_string()),
        };
        let alias = classify(&model.entry.alias_path)
            .with_context(|| format!("Failed to inspect '{}'", model.entry.alias_path.display()))?;

        println!(
            "{:<32} {:<8} {:<20} {:<20} {}",
            format!("{}/{}", model.entry.category, model.entry.id),
            verdict.label(),
            source,
            output,
            alias
        );
    }

    println!("{} of {} models need rendering", report.pending_count(), report.models.len());
    Ok(())
}

fn init_config(global: &ArgMatches, matches: &ArgMatches) -> Result<()> {
    let session = load_session(global)?;
    write_default_config(&session.config_path, matches.get_flag("overwrite"))?;
    println!("Wrote {}", session.config_path.display());
    Ok(())
}

fn write_default_config(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!("'{}' already exists; pass --overwrite to replace it", path.display());
    }
    PipelineConfig::default()
        .save_to_file(path)
        .with_context(|| format!("Failed to write '{}'", path.display()))
}

fn parse_size(value: &str) -> Result<(u32, u32)> {
    let (width, height) = match value.split_once(['x', 'X']) {
        Some((width, height)) => (width, height),
        None => (value, value),
    };
    let width = width.trim().parse().with_context(|| format!("Invalid sprite width in '{value}'"))?;
    let height = height.trim().parse().with_context(|| format!("Invalid sprite height in '{value}'"))?;
    Ok((width, height))
}

fn format_time(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
