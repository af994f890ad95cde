//! Ledger persistence with file locking.
//!
//! [`LedgerStore`] is the only owner of the at-rest ledger. The engine reads
//! and writes through [`LedgerStore::update`], which runs one
//! read-modify-write cycle under an exclusive lock.

use crate::{Error, Ledger, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// What an update closure wants done with the working ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change<T> {
    /// Persist the working ledger, then return the value
    Commit(T),
    /// Drop the working ledger unsaved
    Discard(T),
}

/// Durable storage for the whole ledger
pub trait LedgerStore: Send + Sync {
    /// Load the full ledger; a store with no saved state yields an empty one
    fn load(&self) -> Result<Ledger>;

    /// Replace the saved ledger atomically
    fn save(&self, ledger: &Ledger) -> Result<()>;

    /// Run one exclusive read-modify-write cycle
    ///
    /// Nothing is written when `f` returns an error or [`Change::Discard`].
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Ledger) -> Result<Change<T>>;
}

// ============================================================================
// JSON file store
// ============================================================================

/// Ledger kept in a single JSON document
///
/// Writers are serialized by an in-process mutex and by an advisory lock on
/// a sidecar `.lock` file, so separate processes sharing the file are safe too.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    gate: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self {
            path,
            lock_path,
            gate: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open (creating if needed) the sidecar lock file
    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        Ok(file)
    }

    /// Read and parse the ledger; caller holds the lock
    fn read_unlocked(&self) -> Result<Ledger> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No ledger file at {:?}, starting empty", self.path);
                return Ok(Ledger::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            tracing::warn!("Ledger file {:?} is empty, starting empty", self.path);
            return Ok(Ledger::new());
        }

        let ledger: Ledger =
            serde_json::from_str(&contents).map_err(|source| Error::CorruptLedger {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!("Loaded {} accounts from {:?}", ledger.len(), self.path);
        Ok(ledger)
    }

    /// Atomically write the ledger; caller holds the lock
    ///
    /// 1. Write to a temp file in the same directory
    /// 2. Sync it to disk
    /// 3. Rename it over the original
    fn write_unlocked(&self, ledger: &Ledger) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, ledger)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} accounts to {:?}", ledger.len(), self.path);
        Ok(())
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Ledger> {
        let _gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let result = self.read_unlocked();
        lock.unlock()?;
        result
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        let _gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;
        let result = self.write_unlocked(ledger);
        lock.unlock()?;
        result
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Ledger) -> Result<Change<T>>,
    {
        let _gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let result = self.read_unlocked().and_then(|mut ledger| match f(&mut ledger)? {
            Change::Commit(value) => {
                self.write_unlocked(&ledger)?;
                Ok(value)
            }
            Change::Discard(value) => Ok(value),
        });

        lock.unlock()?;
        result
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Ledger held in memory, for tests and embedding
///
/// Writes can be made to fail on demand to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with an IO error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::Other,
                "simulated write failure",
            )));
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Ledger> {
        Ok(self.ledger.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        self.check_writable()?;
        *self.ledger.lock().unwrap_or_else(|e| e.into_inner()) = ledger.clone();
        Ok(())
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Ledger) -> Result<Change<T>>,
    {
        let mut saved = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        let mut working = saved.clone();
        match f(&mut working)? {
            Change::Commit(value) => {
                self.check_writable()?;
                *saved = working;
                Ok(value)
            }
            Change::Discard(value) => Ok(value),
        }
    }
}
