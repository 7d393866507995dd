//! Durable watchlist storage.
//!
//! The watchlist lives in a CSV file with one row per host:
//!
//! ```text
//! Sub Domains,SSL Expiry Date,days_until_expiry
//! example.com,2030-01-01,1172
//! broken.example.com,Error: Could not retrieve SSL expiry,-1
//! ```
//!
//! Readers take lock-free snapshots. Writers go through [`WatchlistStore::lock`],
//! which hands out a single [`WatchlistWriter`] at a time, so every
//! load-modify-save cycle is serialized. The writer holds both an in-process
//! mutex and an exclusive advisory lock on `<watchlist>.lock`, so a CLI
//! invocation and a running daemon never interleave their cycles either.
//! Saves write a temporary file next to the target and rename it into place,
//! so a snapshot never observes a half-written file.

use crate::core::WatchEntry;
use fs4::fs_std::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

/// Column headers of the persisted layout, in order.
pub const WATCHLIST_HEADERS: [&str; 3] = ["Sub Domains", "SSL Expiry Date", "days_until_expiry"];

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access watchlist at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed watchlist at {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to replace watchlist at {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("watchlist I/O task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Owner of the persisted watchlist.
#[derive(Debug)]
pub struct WatchlistStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl WatchlistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current watchlist for display.
    ///
    /// Does not take the write lock, so the result may already be superseded
    /// by a concurrent writer. A missing file is an empty watchlist; an
    /// unreadable one is logged and also reads as empty.
    pub async fn snapshot(&self) -> Vec<WatchEntry> {
        match self.read().await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Could not read watchlist, treating it as empty");
                Vec::new()
            }
        }
    }

    /// Checks whether `host` is already a key in the watchlist.
    pub async fn exists(&self, host: &str) -> bool {
        self.snapshot().await.iter().any(|entry| entry.host == host)
    }

    /// Path of the advisory lock file guarding writers across processes.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("watchlist"));
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Waits for exclusive write access to the watchlist.
    ///
    /// Other writers in this process queue on the mutex; writers in other
    /// processes block on the lock file until this writer is dropped.
    pub async fn lock(&self) -> Result<WatchlistWriter<'_>, StoreError> {
        let guard = self.write_lock.lock().await;
        let lock_path = self.lock_path();
        let lock_file = tokio::task::spawn_blocking(move || lock_exclusive(&lock_path)).await??;
        debug!(path = %self.path.display(), "Acquired watchlist write lock");
        Ok(WatchlistWriter {
            store: self,
            _lock_file: lock_file,
            _guard: guard,
        })
    }

    async fn read(&self) -> Result<Vec<WatchEntry>, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_entries(&path)).await?
    }

    async fn write(&self, entries: Vec<WatchEntry>) -> Result<(), StoreError> {
        let path = self.path.clone();
        let count = entries.len();
        tokio::task::spawn_blocking(move || write_entries(&path, &entries)).await??;
        metrics::gauge!("watchlist_entries").set(count as f64);
        Ok(())
    }
}

/// Exclusive access to the watchlist for one read-modify-write cycle.
///
/// Dropping the writer releases the lock. The lock file is closed before the
/// mutex guard is released.
pub struct WatchlistWriter<'a> {
    store: &'a WatchlistStore,
    _lock_file: File,
    _guard: MutexGuard<'a, ()>,
}

impl WatchlistWriter<'_> {
    /// Loads the watchlist. Unlike [`WatchlistStore::snapshot`], a corrupt file
    /// is an error, so the caller never saves over data it could not read.
    pub async fn load(&self) -> Result<Vec<WatchEntry>, StoreError> {
        self.store.read().await
    }

    /// Atomically replaces the persisted watchlist with `entries`.
    pub async fn save(&self, entries: &[WatchEntry]) -> Result<(), StoreError> {
        self.store.write(entries.to_vec()).await
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn lock_exclusive(lock_path: &Path) -> Result<File, StoreError> {
    let io_err = |source: io::Error| StoreError::Io {
        path: lock_path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(parent_dir(lock_path)).map_err(io_err)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(io_err)?;
    // Released when the file is closed.
    FileExt::lock_exclusive(&file).map_err(io_err)?;
    Ok(file)
}

fn read_entries(path: &Path) -> Result<Vec<WatchEntry>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No watchlist file yet");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let mut entries = Vec::new();
    for result in reader.deserialize() {
        let entry: WatchEntry = result.map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if entry.host.is_empty() {
            warn!(path = %path.display(), "Skipping watchlist row with an empty host");
            continue;
        }
        entries.push(entry);
    }
    Ok(entries)
}

fn write_entries(path: &Path, entries: &[WatchEntry]) -> Result<(), StoreError> {
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let csv_err = |source: csv::Error| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let dir = parent_dir(path);
    std::fs::create_dir_all(dir).map_err(io_err)?;

    // The temporary file must live in the same directory for the rename to be atomic.
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        if entries.is_empty() {
            writer.write_record(WATCHLIST_HEADERS).map_err(csv_err)?;
        }
        for entry in entries {
            writer.serialize(entry).map_err(csv_err)?;
        }
        writer.flush().map_err(io_err)?;
    }
    tmp.as_file_mut().flush().map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;

    tmp.persist(path).map_err(|e| StoreError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    debug!(path = %path.display(), count = entries.len(), "Saved watchlist");
    Ok(())
}
