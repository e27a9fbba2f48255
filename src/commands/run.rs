//! Implementation of the `distlock run` command.
//!
//! `run` starts a lock manager on the file catalog, acquires the named lock,
//! executes the command while the liveness daemon keeps pinging, and releases
//! the lock once the command exits.

use super::open_catalog;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{DistLockError, Result};
use crate::locks::{LockManager, WaitPolicy};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub fn cmd_run(config: &Config, args: RunArgs) -> Result<()> {
    let argv = parse_command(&args.command)?;
    let wait = wait_policy(config, &args);
    let retry_interval = match args.retry_ms {
        Some(0) => {
            return Err(DistLockError::InvalidArgument(
                "--retry-ms must be greater than 0".to_string(),
            ));
        }
        Some(ms) => Duration::from_millis(ms),
        None => config.retry_interval(),
    };

    let catalog = Arc::new(open_catalog(config)?);
    let manager = LockManager::from_config(config, catalog);
    manager.start()?;

    let outcome = run_locked(&manager, &args, &argv, wait, retry_interval);

    manager.stop();
    outcome
}

fn run_locked(
    manager: &LockManager,
    args: &RunArgs,
    argv: &[String],
    wait: WaitPolicy,
    retry_interval: Duration,
) -> Result<()> {
    let handle = manager.lock(&args.name, &args.reason, wait, retry_interval)?;
    eprintln!(
        "Acquired lock '{}' (session {})",
        args.name,
        handle.session_id()
    );

    let program = &argv[0];
    let status = Command::new(program).args(&argv[1..]).status();

    handle.release();
    if manager.pending_unlocks() > 0 {
        warn!(
            lock = %args.name,
            "lock release was deferred and may outlive this process; \
             clear it with `distlock lock clear` if it lingers"
        );
    }

    let status = status.map_err(|e| {
        DistLockError::CommandFailed(format!(
            "failed to execute '{}': {}\n\n\
             Fix: ensure the command is installed and in PATH.",
            args.command, e
        ))
    })?;

    if !status.success() {
        return Err(DistLockError::CommandFailed(format!(
            "'{}' exited with code {}",
            args.command,
            status
                .code()
                .map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string())
        )));
    }

    Ok(())
}

/// Parse the command with shell-words for execution without a shell.
fn parse_command(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command).map_err(|e| {
        DistLockError::InvalidArgument(format!(
            "failed to parse command '{}': {}\n\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            command, e
        ))
    })?;

    if argv.is_empty() {
        return Err(DistLockError::InvalidArgument(
            "command is empty after parsing".to_string(),
        ));
    }

    Ok(argv)
}

fn wait_policy(config: &Config, args: &RunArgs) -> WaitPolicy {
    if args.forever {
        WaitPolicy::Forever
    } else if let Some(ms) = args.wait_ms {
        WaitPolicy::from(Duration::from_millis(ms))
    } else {
        config.wait_policy()
    }
}
