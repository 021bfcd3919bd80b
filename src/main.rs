use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{error, info, warn};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use failover::aggregator::StatusAggregator;
use failover::cluster::{ClusterSessionFactory, OrderBatchWorkload};
use failover::config::Config;
use failover::controller::{ControllerExit, ExecutionController, InjectedFaults, RandomFaults, StopHandle};
use failover::dashboard::{self, DashboardState};
use failover::journal::FileJournal;

fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("failover")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("failover.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = if verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("SIGTERM handler unavailable: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Turn the first SIGINT/SIGTERM into a cooperative stop
fn stop_on_signal(stop: StopHandle) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        println!("{}", "Stopping...".yellow());
        stop.request_stop();
    });
}

async fn handle_run_command(config: &Config) -> Result<ExitCode> {
    let factory = ClusterSessionFactory::from_config(config)?;
    let workload = InjectedFaults::new(
        OrderBatchWorkload::from_config(&config.workload),
        RandomFaults::new(config.workload.failure_rate),
    );
    let journal = FileJournal::new(&config.log.path).context("Failed to open cycle log")?;

    println!(
        "{} master {} (restart ceiling {}, failure rate {})",
        "Running:".green(),
        config.controller.master_url,
        config.controller.max_restarts,
        config.workload.failure_rate
    );
    println!("{} {}", "Cycle log:".cyan(), config.log.path.display());

    let mut controller = ExecutionController::new(
        factory,
        workload,
        journal,
        config.controller.clone(),
        CancellationToken::new(),
    );
    stop_on_signal(controller.stop_handle());

    match controller.run().await {
        Ok(ControllerExit::Stopped) | Ok(ControllerExit::AlreadyFinished) => {
            let state = controller.state();
            println!(
                "{} {} cycles, {} succeeded",
                "Stopped:".green(),
                state.cycles_started,
                state.cycles_succeeded
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_fatal() => {
            error!("Controller terminated: {}", e);
            eprintln!("{} {}", "Terminated:".red().bold(), e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("Controller failed"),
    }
}

async fn handle_monitor_command(config: &Config) -> Result<ExitCode> {
    let aggregator = Arc::new(StatusAggregator::from_config(config)?);
    let state = DashboardState::new(aggregator.handle()).with_api_log_lines(config.monitor.api_log_lines);
    let shutdown = CancellationToken::new();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("Shutdown signal received");
            shutdown.cancel();
        });
    }

    let poller = {
        let aggregator = aggregator.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { aggregator.run(shutdown).await })
    };

    println!("{} http://{}", "Dashboard:".green(), config.monitor.bind_addr);
    let served = dashboard::serve(&config.monitor.bind_addr, state, shutdown.clone()).await;

    shutdown.cancel();
    poller.await.context("Status aggregator task failed")?;
    served.context("Dashboard failed")?;
    Ok(ExitCode::SUCCESS)
}

async fn handle_check_command(config: &Config, json: bool) -> Result<ExitCode> {
    let aggregator = StatusAggregator::from_config(config)?;
    let status = aggregator.tick().await;

    if json {
        println!("{}", serde_json::to_string_pretty(status.as_ref())?);
    } else {
        print!("{}", cli::output::summary(&status, config.monitor.api_log_lines));
    }

    if status.all_healthy() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn run_application(cli: &Cli, mut config: Config) -> Result<ExitCode> {
    info!("Starting application");

    match &cli.command {
        Commands::Run {
            max_restarts,
            failure_rate,
        } => {
            if let Some(max) = max_restarts {
                config.controller.max_restarts = *max;
            }
            if let Some(rate) = failure_rate {
                config.workload.failure_rate = *rate;
            }
            config.validate().context("Invalid command line override")?;
            handle_run_command(&config).await
        }
        Commands::Monitor { bind } => {
            if let Some(addr) = bind {
                config.monitor.bind_addr = addr.clone();
            }
            handle_monitor_command(&config).await
        }
        Commands::Check { json } => handle_check_command(&config, *json).await,
    }
}

fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let (config, source) = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config, cli.is_verbose()).context("Failed to setup logging")?;

    for skipped in &source.skipped {
        eprintln!("{} {}", "Warning:".yellow(), skipped);
        warn!("{}", skipped);
    }
    match &source.path {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    runtime
        .block_on(run_application(&cli, config))
        .context("Application failed")
}
