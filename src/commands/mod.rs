//! Command implementations for distlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every command works against the file-backed catalog
//! named by `catalog_dir` in the config.

mod run;

use crate::catalog::{FileCatalog, LockCatalog, LockEntry};
use crate::cli::{Cli, Command, LockAction, LockClearArgs, LockCommand, StatusArgs};
use crate::config::Config;
use crate::error::{DistLockError, Result};
use crate::locks::{LockManager, LockSessionId};
use std::sync::Arc;

/// Dispatch a command to its implementation.
///
/// Loads the config first; a missing config file means defaults.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Command::Run(args) => run::cmd_run(&config, args),
        Command::Status(args) => cmd_status(&config, args),
        Command::Lock(lock_cmd) => dispatch_lock(&config, lock_cmd),
        Command::Pings => cmd_pings(&config),
    }
}

/// Dispatch lock subcommands.
fn dispatch_lock(config: &Config, lock_cmd: LockCommand) -> Result<()> {
    match lock_cmd.action {
        LockAction::List => cmd_lock_list(config),
        LockAction::Clear(args) => cmd_lock_clear(config, args),
    }
}

pub(crate) fn open_catalog(config: &Config) -> Result<FileCatalog> {
    FileCatalog::open(&config.catalog_dir)
}

fn cmd_status(config: &Config, args: StatusArgs) -> Result<()> {
    let session_id: LockSessionId = args.session_id.parse()?;
    let catalog = Arc::new(open_catalog(config)?);

    // No daemon needed for a one-off lookup.
    let manager = LockManager::from_config(config, catalog.clone());
    manager.check_status(&session_id)?;

    let record = catalog.get_lock_by_session(&session_id)?;
    println!("Session {} holds lock '{}'", session_id, record.name);
    println!("  Owner:      {}", record.who);
    println!("  Acquired:   {}", record.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Age:        {}", record.age_string());
    println!("  Reason:     {}", record.reason);

    Ok(())
}

fn cmd_lock_list(config: &Config) -> Result<()> {
    let catalog = open_catalog(config)?;
    let locks = catalog.list_locks()?;

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();

    for entry in &locks {
        match entry {
            LockEntry::Held(lock) => {
                println!("  {}:", lock.name);
                println!("    Owner:      {}", lock.who);
                println!("    Process:    {}", lock.process_id);
                println!("    Session:    {}", lock.session_id);
                println!("    Acquired:   {}", lock.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
                println!("    Age:        {}", lock.age_string());
                println!("    Reason:     {}", lock.reason);
            }
            LockEntry::Unreadable { name, path, error } => {
                println!("  {}: UNREADABLE", name);
                println!("    Path:       {}", path.display());
                println!("    Error:      {}", error);
                println!("    Clear with: distlock lock clear {} --force", name);
            }
        }
        println!();
    }

    Ok(())
}

fn cmd_lock_clear(config: &Config, args: LockClearArgs) -> Result<()> {
    // Require --force flag
    if !args.force {
        return Err(DistLockError::InvalidArgument(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock lets another process acquire it while the current holder\n\
             may still believe it owns it. Only clear locks whose holder has crashed.\n\n\
             To clear the lock, run:\n  distlock lock clear {} --force",
            args.name
        )));
    }

    let catalog = open_catalog(config)?;
    let Some(cleared) = catalog.clear_lock(&args.name)? else {
        tracing::warn!(lock = %args.name, "unreadable lock cleared by force");
        println!("Cleared lock: {} (record was unreadable)", args.name);
        return Ok(());
    };

    tracing::warn!(
        lock = %cleared.name,
        owner = %cleared.who,
        session = %cleared.session_id,
        "lock cleared by force"
    );

    println!("Cleared lock: {}", cleared.name);
    println!();
    println!("Lock details:");
    println!("  Owner:      {}", cleared.who);
    println!("  Session:    {}", cleared.session_id);
    println!("  Acquired:   {}", cleared.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Age:        {}", cleared.age_string());
    println!("  Reason:     {}", cleared.reason);

    Ok(())
}

fn cmd_pings(config: &Config) -> Result<()> {
    let catalog = open_catalog(config)?;
    let pings = catalog.list_pings()?;

    if pings.is_empty() {
        println!("No live processes.");
        return Ok(());
    }

    println!("Processes ({}):", pings.len());
    for ping in &pings {
        println!(
            "  {:<40} last ping {} ago{}",
            ping.process_id,
            ping.age_string(),
            if ping.is_stale(config.ping_stale_minutes) {
                ", STALE"
            } else {
                ""
            }
        );
    }

    let stale_count = pings
        .iter()
        .filter(|p| p.is_stale(config.ping_stale_minutes))
        .count();
    if stale_count > 0 {
        println!();
        println!(
            "Note: {} process(es) have not pinged for over {} min.",
            stale_count, config.ping_stale_minutes
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LockRequest;
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config_in(temp_dir: &TempDir) -> Config {
        Config {
            catalog_dir: temp_dir.path().join("catalog").to_string_lossy().to_string(),
            ..Config::default()
        }
    }

    fn cli(config_path: PathBuf, command: Command) -> Cli {
        Cli {
            config: config_path,
            verbose: 0,
            command,
        }
    }

    #[test]
    fn test_lock_clear_requires_force() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let err = cmd_lock_clear(
            &config,
            LockClearArgs {
                name: "nightly".to_string(),
                force: false,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    fn test_lock_clear_removes_record() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        let catalog = open_catalog(&config).unwrap();
        let session = LockSessionId::generate();
        catalog
            .grab_lock(&LockRequest {
                name: "nightly",
                session_id: &session,
                who: "crashed:main",
                process_id: "crashed",
                time: Utc::now(),
                reason: "backup",
            })
            .unwrap();

        cmd_lock_clear(
            &config,
            LockClearArgs {
                name: "nightly".to_string(),
                force: true,
            },
        )
        .unwrap();
        assert!(catalog.list_locks().unwrap().is_empty());
    }

    #[test]
    fn test_lock_clear_removes_unreadable_record() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        let catalog = open_catalog(&config).unwrap();
        let lock_dir = catalog.locks_dir().join("nightly");
        std::fs::create_dir(&lock_dir).unwrap();
        std::fs::write(lock_dir.join("garbled.json"), "").unwrap();

        cmd_lock_list(&config).unwrap();
        cmd_lock_clear(
            &config,
            LockClearArgs {
                name: "nightly".to_string(),
                force: true,
            },
        )
        .unwrap();

        assert!(catalog.list_locks().unwrap().is_empty());
        assert!(!lock_dir.exists());
    }

    #[test]
    fn test_status_of_unknown_session() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let err = cmd_status(
            &config,
            StatusArgs {
                session_id: LockSessionId::generate().to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DistLockError::LockNotFound(_)));
    }

    #[test]
    fn test_status_rejects_malformed_session() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let err = cmd_status(
            &config,
            StatusArgs {
                session_id: "nope".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DistLockError::InvalidArgument(_)));
    }

    #[test]
    fn test_dispatch_reads_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("distlock.yaml");
        let catalog_dir = temp_dir.path().join("from-config");
        std::fs::write(
            &config_path,
            format!("catalog_dir: {}\n", catalog_dir.display()),
        )
        .unwrap();

        dispatch(cli(config_path, Command::Pings)).unwrap();
        assert!(catalog_dir.join("pings").is_dir());
    }

    #[test]
    fn test_dispatch_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("distlock.yaml");
        std::fs::write(&config_path, "ping_interval_ms: 0\n").unwrap();

        let err = dispatch(cli(config_path, Command::Pings)).unwrap_err();
        assert!(matches!(err, DistLockError::Config(_)));
    }
}
