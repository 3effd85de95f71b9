// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Synchronous file operations and size accounting.
//!
//! Every method blocks the calling thread and must be run on a blocking-capable thread.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use filetime::FileTime;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

const ENTRIES_DIR: &str = "entries";
const STAGING_DIR: &str = "staging";

#[derive(Debug)]
struct Usage {
    size: u64,
    capacity: u64,
}

/// A directory of entries plus a sibling staging directory for in-progress writes.
///
/// The mutex serializes every file operation together with the size bookkeeping, so the
/// tracked size always matches what the operations did.
#[derive(Debug)]
pub(crate) struct Store {
    root: PathBuf,
    entries: PathBuf,
    staging: PathBuf,
    usage: Mutex<Usage>,
}

impl Store {
    /// Creates the directories if needed, measures what is already stored and trims it to
    /// `capacity`.
    pub(crate) fn open(root: PathBuf, capacity: u64) -> io::Result<Self> {
        let entries = root.join(ENTRIES_DIR);
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&entries)?;
        fs::create_dir_all(&staging)?;

        let store = Self {
            root,
            entries,
            staging,
            usage: Mutex::new(Usage { size: 0, capacity }),
        };

        {
            let mut usage = store.usage.lock();
            usage.size = store.measure()?;
            store.trim(&mut usage);
        }
        Ok(store)
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file that holds the entry for a rendered key.
    pub(crate) fn path_for(&self, key: &str) -> PathBuf {
        self.entries.join(hex::encode(Sha256::digest(key.as_bytes())))
    }

    pub(crate) fn size(&self) -> u64 {
        self.usage.lock().size
    }

    pub(crate) fn capacity(&self) -> u64 {
        self.usage.lock().capacity
    }

    pub(crate) fn set_capacity(&self, capacity: u64) {
        let mut usage = self.usage.lock();
        usage.capacity = capacity;
        self.trim(&mut usage);
    }

    /// Reads and decodes the entry at `path`.
    ///
    /// A missing file is absence. A file that fails to decode is deleted and reported as
    /// absence. A successful read marks the entry as recently used.
    pub(crate) fn load<V, E>(&self, path: &Path, decode: impl FnOnce(&[u8]) -> Result<V, E>) -> io::Result<Option<V>>
    where
        E: std::fmt::Display,
    {
        let mut usage = self.usage.lock();

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error),
        };

        match decode(&bytes) {
            Ok(value) => {
                if let Err(error) = filetime::set_file_mtime(path, FileTime::now()) {
                    tracing::debug!(cache.path = %path.display(), cache.error = %error, "cache.touch_failed");
                }
                Ok(Some(value))
            }
            Err(error) => {
                tracing::warn!(cache.path = %path.display(), cache.error = %error, "cache.corrupt_entry");
                Self::remove(&mut usage, path, bytes.len() as u64);
                Ok(None)
            }
        }
    }

    /// Atomically replaces the entry at `path` with `bytes`, then trims to capacity.
    pub(crate) fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut usage = self.usage.lock();
        let previous = file_len(path)?;

        let mut staged = self.staged_file()?;
        staged.write_all(bytes)?;
        staged.as_file().sync_data()?;
        staged.persist(path).map_err(|error| error.error)?;

        usage.size = usage.size.saturating_sub(previous) + bytes.len() as u64;
        self.trim(&mut usage);
        Ok(())
    }

    /// Deletes every entry and re-measures the directory.
    pub(crate) fn clear(&self) {
        let mut usage = self.usage.lock();

        match self.listing() {
            Ok(listing) => {
                for entry in listing {
                    if let Err(error) = fs::remove_file(&entry.path) {
                        tracing::warn!(cache.path = %entry.path.display(), cache.error = %error, "cache.clear_failed");
                    }
                }
            }
            Err(error) => {
                tracing::warn!(cache.path = %self.entries.display(), cache.error = %error, "cache.clear_failed");
            }
        }

        match self.measure() {
            Ok(size) => usage.size = size,
            Err(error) => {
                tracing::warn!(cache.path = %self.entries.display(), cache.error = %error, "cache.clear_failed");
            }
        }
    }

    fn staged_file(&self) -> io::Result<NamedTempFile> {
        // The staging directory may have been removed from under us; recreate it once.
        match tempfile::Builder::new().prefix("tmp").tempfile_in(&self.staging) {
            Ok(file) => Ok(file),
            Err(_) => {
                fs::create_dir_all(&self.staging)?;
                fs::create_dir_all(&self.entries)?;
                tempfile::Builder::new().prefix("tmp").tempfile_in(&self.staging)
            }
        }
    }

    /// Evicts least recently used entries until the tracked size fits the capacity.
    fn trim(&self, usage: &mut Usage) {
        if usage.size <= usage.capacity {
            return;
        }

        let mut listing = match self.listing() {
            Ok(listing) => listing,
            Err(error) => {
                tracing::warn!(cache.path = %self.entries.display(), cache.error = %error, "cache.trim_failed");
                return;
            }
        };
        listing.sort_by_key(|entry| entry.accessed);

        for entry in listing {
            if usage.size <= usage.capacity {
                break;
            }
            tracing::debug!(cache.path = %entry.path.display(), cache.bytes = entry.len, "cache.evicted");
            Self::remove(usage, &entry.path, entry.len);
        }
    }

    fn remove(usage: &mut Usage, path: &Path, len: u64) {
        match fs::remove_file(path) {
            Ok(()) => usage.size = usage.size.saturating_sub(len),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                tracing::warn!(cache.path = %path.display(), cache.error = %error, "cache.remove_failed");
            }
        }
    }

    fn measure(&self) -> io::Result<u64> {
        Ok(self.listing()?.iter().map(|entry| entry.len).sum())
    }

    fn listing(&self) -> io::Result<Vec<Listed>> {
        let mut listed = Vec::new();
        for dir_entry in fs::read_dir(&self.entries)? {
            let dir_entry = dir_entry?;
            let metadata = match dir_entry.metadata() {
                Ok(metadata) => metadata,
                // Removed concurrently by another process.
                Err(error) if error.kind() == io::ErrorKind::NotFound => continue,
                Err(error) => return Err(error),
            };
            if !metadata.is_file() {
                continue;
            }
            listed.push(Listed {
                path: dir_entry.path(),
                len: metadata.len(),
                accessed: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(listed)
    }
}

#[derive(Debug)]
struct Listed {
    path: PathBuf,
    len: u64,
    accessed: SystemTime,
}

fn file_len(path: &Path) -> io::Result<u64> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(error) => Err(error),
    }
}
