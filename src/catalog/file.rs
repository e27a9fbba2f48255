//! Directory-backed lock catalog.
//!
//! # Layout
//!
//! ```text
//! <root>/locks/<name>/<session>.json   JSON LockRecord, one directory per held lock
//! <root>/pings/<process>.ping          JSON PingRecord, one per live process
//! ```
//!
//! A lock is acquired by writing its record into a private staging directory
//! and renaming that directory to `locks/<name>`. The rename fails while
//! `locks/<name>` holds a record, which gives `grab_lock` its acquire-if-free
//! guarantee for every process that shares the directory. A lock directory is
//! never observed half written.
//!
//! Unlock removes `<session>.json` by name and then the emptied directory.
//! A release can therefore only ever delete its own session's record, however
//! it interleaves with other releases, forced clears or new acquisitions. An
//! empty lock directory counts as free.
//!
//! Ping files are rewritten atomically.

use super::LockCatalog;
use super::types::{LockRecord, LockRequest, PingRecord};
use crate::error::{DistLockError, Result};
use crate::fs::{atomic_write, remove_if_exists};
use crate::locks::LockSessionId;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const RECORD_EXTENSION: &str = "json";
const PING_EXTENSION: &str = "ping";

/// A [`LockCatalog`] stored as JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: PathBuf,
}

/// One entry of [`FileCatalog::list_locks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEntry {
    /// A lock with a readable record.
    Held(LockRecord),
    /// Something occupies the lock name but no record can be read from it.
    /// It still blocks acquisition until cleared.
    Unreadable {
        name: String,
        path: PathBuf,
        error: String,
    },
}

impl LockEntry {
    pub fn name(&self) -> &str {
        match self {
            LockEntry::Held(record) => &record.name,
            LockEntry::Unreadable { name, .. } => name,
        }
    }
}

/// What currently occupies a lock directory.
enum Occupant {
    Free,
    Held(LockRecord),
    Unreadable(String),
}

impl Occupant {
    fn is_taken(&self) -> bool {
        !matches!(self, Occupant::Free)
    }
}

impl FileCatalog {
    /// Open (and create if needed) a catalog rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let catalog = Self {
            root: root.as_ref().to_path_buf(),
        };

        for dir in [catalog.locks_dir(), catalog.pings_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                DistLockError::Catalog(format!(
                    "failed to create catalog directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(catalog)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn pings_dir(&self) -> PathBuf {
        self.root.join("pings")
    }

    fn lock_dir(&self, name: &str) -> Result<PathBuf> {
        validate_lock_name(name)?;
        Ok(self.locks_dir().join(name))
    }

    /// A hidden sibling of the lock directories, unique to this call.
    fn scratch_dir(&self, name: &str, purpose: &str) -> PathBuf {
        self.locks_dir()
            .join(format!(".{}.{}.{}", name, Uuid::new_v4().simple(), purpose))
    }

    fn ping_path(&self, process_id: &str) -> PathBuf {
        self.pings_dir()
            .join(format!("{}.{}", file_key(process_id), PING_EXTENSION))
    }

    /// List every occupied lock name, sorted by name.
    ///
    /// Names whose record cannot be read are reported as
    /// [`LockEntry::Unreadable`] so they can be found and cleared.
    pub fn list_locks(&self) -> Result<Vec<LockEntry>> {
        let mut locks = Vec::new();

        for (name, path) in self.lock_entries()? {
            match occupant(&path) {
                Occupant::Free => {}
                Occupant::Held(record) => locks.push(LockEntry::Held(record)),
                Occupant::Unreadable(error) => {
                    locks.push(LockEntry::Unreadable { name, path, error })
                }
            }
        }

        locks.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(locks)
    }

    /// List every liveness record, sorted by process identity.
    pub fn list_pings(&self) -> Result<Vec<PingRecord>> {
        let mut pings: Vec<PingRecord> = read_dir_paths(&self.pings_dir())?
            .into_iter()
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(PING_EXTENSION))
            .filter_map(|path| read_record(&path).ok())
            .collect();

        pings.sort_by(|a, b| a.process_id.cmp(&b.process_id));
        Ok(pings)
    }

    /// Forcibly remove whatever holds `name`, whoever holds it.
    ///
    /// The caller is responsible for deciding that clearing is appropriate;
    /// the holder will lose its lock without being told. Unreadable entries
    /// are removed too.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(LockRecord))` - The record that was removed
    /// * `Ok(None)` - The name was occupied by something without a readable record
    /// * `Err(DistLockError::LockNotFound)` - Nothing is held under `name`
    pub fn clear_lock(&self, name: &str) -> Result<Option<LockRecord>> {
        let path = self.lock_dir(name)?;
        let not_found = || {
            DistLockError::LockNotFound(format!(
                "lock '{}' does not exist at: {}",
                name,
                path.display()
            ))
        };

        // Move the entry out of the way first so the record reported is the
        // one actually removed.
        let removed = self.scratch_dir(name, "clearing");
        if let Err(e) = fs::rename(&path, &removed) {
            return Err(if e.kind() == ErrorKind::NotFound {
                not_found()
            } else {
                DistLockError::Catalog(format!(
                    "failed to clear lock '{}' at {}: {}",
                    name,
                    path.display(),
                    e
                ))
            });
        }

        let cleared = match occupant(&removed) {
            Occupant::Free => None,
            Occupant::Held(record) => Some(Some(record)),
            Occupant::Unreadable(_) => Some(None),
        };

        let removal = if removed.is_dir() {
            fs::remove_dir_all(&removed)
        } else {
            fs::remove_file(&removed)
        };
        removal.map_err(|e| {
            DistLockError::Catalog(format!(
                "cleared lock '{}' but failed to remove {}: {}",
                name,
                removed.display(),
                e
            ))
        })?;

        cleared.ok_or_else(not_found)
    }

    /// Every visible entry of the locks directory, paired with its name.
    fn lock_entries(&self) -> Result<Vec<(String, PathBuf)>> {
        Ok(read_dir_paths(&self.locks_dir())?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                (!name.starts_with('.')).then_some((name, path))
            })
            .collect())
    }

    /// The path `session_id`'s record would have inside each lock directory.
    fn session_record_candidates(&self, session_id: &LockSessionId) -> Result<Vec<PathBuf>> {
        let file_name = record_file_name(session_id);
        Ok(self
            .lock_entries()?
            .into_iter()
            .filter(|(_, path)| path.is_dir())
            .map(|(_, path)| path.join(&file_name))
            .collect())
    }
}

impl LockCatalog for FileCatalog {
    fn grab_lock(&self, request: &LockRequest<'_>) -> Result<LockRecord> {
        let dir = self.lock_dir(request.name)?;
        if occupant(&dir).is_taken() {
            return Err(contention(request.name, &dir));
        }

        let record = LockRecord::locked(request);
        let json = to_json(&record)?;

        let staging = self.scratch_dir(request.name, "staging");
        write_staged_record(&staging, &record_file_name(request.session_id), &json).map_err(
            |e| {
                let _ = fs::remove_dir_all(&staging);
                DistLockError::Catalog(format!(
                    "failed to stage lock record in '{}': {}",
                    staging.display(),
                    e
                ))
            },
        )?;

        // Renaming onto a directory that holds a record fails; an empty one is
        // replaced.
        if let Err(e) = fs::rename(&staging, &dir) {
            let _ = fs::remove_dir_all(&staging);
            if dir.exists() {
                return Err(contention(request.name, &dir));
            }
            return Err(DistLockError::Catalog(format!(
                "failed to publish lock '{}': {}",
                request.name, e
            )));
        }

        Ok(record)
    }

    fn unlock(&self, session_id: &LockSessionId) -> Result<()> {
        for record_path in self.session_record_candidates(session_id)? {
            if remove_if_exists(&record_path)? {
                if let Some(dir) = record_path.parent() {
                    // Fails harmlessly if a new holder has already moved in.
                    let _ = fs::remove_dir(dir);
                }
                break;
            }
        }
        Ok(())
    }

    fn ping(&self, process_id: &str, time: DateTime<Utc>) -> Result<()> {
        let record = PingRecord {
            process_id: process_id.to_string(),
            pinged_at: time,
        };
        atomic_write(self.ping_path(process_id), to_json(&record)?.as_bytes())
    }

    fn get_lock_by_session(&self, session_id: &LockSessionId) -> Result<LockRecord> {
        for record_path in self.session_record_candidates(session_id)? {
            match read_record::<LockRecord>(&record_path) {
                Ok(record) => return Ok(record),
                // Not in this directory, or released since the listing.
                Err(_) if !record_path.exists() => continue,
                Err(e) => return Err(e),
            }
        }
        Err(DistLockError::LockNotFound(format!(
            "no lock held by session {}",
            session_id
        )))
    }

    fn stop_ping(&self, process_id: &str) -> Result<()> {
        remove_if_exists(self.ping_path(process_id)).map(|_| ())
    }
}

fn contention(name: &str, dir: &Path) -> DistLockError {
    let holder = match occupant(dir) {
        Occupant::Held(existing) => format!(
            "held by {} for {} ({})",
            existing.who,
            existing.age_string(),
            existing.reason
        ),
        Occupant::Unreadable(_) => {
            "held by an unreadable record; see 'distlock lock list'".to_string()
        }
        Occupant::Free => {
            // Left behind by a release that stopped between its two steps.
            let _ = fs::remove_dir(dir);
            "being released".to_string()
        }
    };
    DistLockError::LockStateChangeFailed(format!("'{}' {}", name, holder))
}

/// Inspect a lock directory (or whatever sits at its path).
fn occupant(path: &Path) -> Occupant {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Occupant::Free,
        Err(e) => return Occupant::Unreadable(e.to_string()),
    };
    if !metadata.is_dir() {
        return Occupant::Unreadable("not a lock directory".to_string());
    }

    let entries = match read_dir_paths(path) {
        Ok(entries) => entries,
        // Released and removed while we looked.
        Err(_) if !path.exists() => return Occupant::Free,
        Err(e) => return Occupant::Unreadable(e.to_string()),
    };
    if entries.is_empty() {
        return Occupant::Free;
    }

    let Some(record_path) = entries
        .iter()
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION))
    else {
        return Occupant::Unreadable("no lock record".to_string());
    };

    match read_record(record_path) {
        Ok(record) => Occupant::Held(record),
        Err(_) if !record_path.exists() => Occupant::Free,
        Err(e) => Occupant::Unreadable(e.to_string()),
    }
}

fn write_staged_record(staging: &Path, file_name: &str, json: &str) -> std::io::Result<()> {
    fs::create_dir(staging)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging.join(file_name))?;
    file.write_all(json.as_bytes())?;
    file.sync_all()
}

fn record_file_name(session_id: &LockSessionId) -> String {
    format!("{}.{}", session_id, RECORD_EXTENSION)
}

/// Lock names become directory names, so they must stay inside the locks directory.
fn validate_lock_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(DistLockError::InvalidArgument(format!(
            "lock name '{}' cannot be stored in a file catalog",
            name
        )));
    }
    Ok(())
}

/// Map an arbitrary identity onto a safe file name.
fn file_key(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

fn read_dir_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        DistLockError::Catalog(format!(
            "failed to read catalog directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    entries
        .map(|entry| {
            entry.map(|e| e.path()).map_err(|e| {
                DistLockError::Catalog(format!("failed to read catalog directory entry: {}", e))
            })
        })
        .collect()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DistLockError::Catalog(format!("failed to serialize record: {}", e)))
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        DistLockError::Catalog(format!(
            "failed to read record '{}': {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        DistLockError::Catalog(format!(
            "failed to parse record '{}': {}",
            path.display(),
            e
        ))
    })
}
