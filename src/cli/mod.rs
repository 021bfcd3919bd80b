//! CLI module for failover - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands to run the controller,
//! run the monitor, and check health once.

pub mod commands;
pub mod output;

pub use commands::Cli;
