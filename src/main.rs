//! autobuild - Main entry point
//!
//! Loads the build configuration, applies command line overrides and either
//! builds the task list or checks an existing one.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use autobuild::actions::registry::ActionRegistry;
use autobuild::check::{check_tasks, CheckOutcome};
use autobuild::cli::{BuildArgs, Cli, Commands};
use autobuild::config_file::BuildConfig;
use autobuild::{BuildInfo, ConfigBuilder, FileTransport};

/// Initialize tracing; RUST_LOG overrides the default level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    info!("autobuild starting up");

    if let Err(e) = ctrlc::set_handler(|| {
        info!("Interrupt detected, exiting.");
        std::process::exit(1);
    }) {
        warn!("Failed to install interrupt handler: {}", e);
    }

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            info!("Loading build configuration: {:?}", path);
            BuildConfig::load_from_file(path)?
        }
        None => BuildConfig::default(),
    };

    match cli.command {
        Some(Commands::Build(args)) => run_build(config, &args),
        Some(Commands::Check { task_list }) => run_check(&config, task_list),
        None => {
            debug!("No command specified, running build");
            run_build(config, &BuildArgs::default())
        }
    }
}

fn run_build(mut config: BuildConfig, args: &BuildArgs) -> Result<()> {
    args.apply_to(&mut config)?;
    config.validate()?;

    if !config.prepare_task_list()? {
        info!("Task list already present, skipping build");
        return Ok(());
    }

    let facts = config.fact_table()?;
    let build = BuildInfo::new(facts)
        .with_config_server(config.config_server.as_str())
        .with_reg_64(config.use_reg_64);
    let mut builder = ConfigBuilder::new(build, FileTransport::new("."));

    let root = config.initial_root();
    builder
        .start_with_file(&config.task_list, &root, &config.build_file)
        .with_context(|| format!("Config build from '{}' failed", root))?;

    info!(
        "Build complete: {} task(s) written to {:?}",
        builder.task_list().len(),
        config.task_list
    );
    Ok(())
}

fn run_check(config: &BuildConfig, task_list: Option<PathBuf>) -> Result<()> {
    let path = task_list.unwrap_or_else(|| config.task_list.clone());
    info!("Checking task list {:?}", path);

    let tasks = FileTransport::read_tasks(&path)?;
    let checks = check_tasks(&ActionRegistry::with_core_actions(), &tasks);

    let mut failures = 0;
    for check in &checks {
        match check.outcome {
            CheckOutcome::Valid => debug!("{}", check),
            CheckOutcome::Unknown => warn!("{}", check),
            CheckOutcome::Invalid(_) | CheckOutcome::Malformed => {
                error!("{}", check);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} task(s) failed validation", failures, checks.len());
    }
    info!("All {} task(s) passed validation", checks.len());
    Ok(())
}
