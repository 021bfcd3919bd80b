//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: supervise the batch job
//! - monitor: aggregate health and serve the dashboard
//! - check: probe everything once and print the result

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Failover - self-healing batch runner with a health dashboard
#[derive(Parser, Debug)]
#[command(name = "failover")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the execution controller until stopped or out of restarts
    Run {
        /// Override the restart ceiling
        #[arg(long)]
        max_restarts: Option<u32>,

        /// Override the injected failure rate (0.0 - 1.0)
        #[arg(long)]
        failure_rate: Option<f64>,
    },

    /// Run the status aggregator and serve the dashboard
    Monitor {
        /// Address to bind the dashboard to
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Probe every subsystem once and print the status
    Check {
        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}
