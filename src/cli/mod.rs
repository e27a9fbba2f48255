//! CLI argument parsing for distlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Distlock: distributed mutual exclusion over a shared lock catalog.
///
/// Every process pointing at the same catalog directory competes for the
/// same named locks. While a process holds a lock it keeps a liveness record
/// in the catalog fresh.
#[derive(Parser, Debug)]
#[command(name = "distlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the YAML config file.
    #[arg(long, global = true, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for distlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding a named lock.
    ///
    /// Acquires the lock (waiting per config or flags), runs the command
    /// without a shell, then releases the lock.
    Run(RunArgs),

    /// Check whether a lock session is still the current holder.
    Status(StatusArgs),

    /// Lock management commands.
    ///
    /// List or clear locks in the catalog.
    Lock(LockCommand),

    /// List process liveness records.
    Pings,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Name of the lock to hold.
    pub name: String,

    /// Command line to execute while the lock is held.
    pub command: String,

    /// Reason recorded on the lock.
    #[arg(long, default_value = "distlock run")]
    pub reason: String,

    /// Milliseconds to wait for a contended lock (0 tries once).
    #[arg(long, conflicts_with = "forever")]
    pub wait_ms: Option<u64>,

    /// Wait for the lock indefinitely.
    #[arg(long)]
    pub forever: bool,

    /// Milliseconds between acquisition attempts.
    #[arg(long)]
    pub retry_ms: Option<u64>,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Session id printed when the lock was acquired.
    pub session_id: String,
}

/// Lock subcommand wrapper.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all held locks.
    ///
    /// Shows each lock with its owner, age, and reason.
    List,

    /// Clear a specific lock.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Name of the lock to clear.
    pub name: String,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
