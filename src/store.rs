//! Origin-scoped persistence of known-broken sources.
//!
//! Storage is a cosmetic hint, never correctness-critical: every backend
//! failure is absorbed by [`KnownBrokenStore`], reads degrade to an empty map
//! and writes degrade to no-ops.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::sources::{self, BrokenSources};

/// Storage key used by the canonical flag-only schema.
pub const DEFAULT_STORAGE_KEY: &str = "broken_images";

const DEFAULT_MAX_FILE_BYTES: usize = 1024 * 1024;
static TEMP_FILE_NONCE: AtomicUsize = AtomicUsize::new(0);

/// Failure reported by a [`StorageBackend`].
#[derive(Debug)]
pub enum StorageError {
    /// The host has no persistent storage, or access to it is denied.
    Unavailable,
    /// Stored or outgoing payload exceeds the backend's size cap.
    TooLarge { actual: usize, limit: usize },
    /// Filesystem failure.
    Io(io::Error),
    /// Backend-specific failure (quota, security error) in display form.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "persistent storage unavailable"),
            Self::TooLarge { actual, limit } => write!(
                f,
                "storage payload too large (actual={} limit={})",
                actual, limit
            ),
            Self::Io(err) => write!(f, "storage i/o failed: {}", err),
            Self::Backend(message) => write!(f, "storage backend failed: {}", message),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Key-value text storage scoped to one origin.
pub trait StorageBackend {
    /// Stored text for `key`, `None` when the key was never written.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the text stored under `key`.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for &T {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for Box<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }
}

/// Backend for hosts without persistent storage.
///
/// Detection and styling keep working; only cross-visit memory is lost.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStorage;

impl StorageBackend for NoStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// In-process storage. Clones share the same underlying map, so two
/// controllers built from clones behave like two page views of one origin.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw text stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    /// Overwrite the raw text under `key`, bypassing serialization.
    pub fn set_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.items.borrow_mut().insert(key.into(), value.into());
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_raw(key, value);
        Ok(())
    }
}

/// File-backed storage for one origin.
///
/// Paths are deterministic: `<root>/<origin-hex>/<key-hex>.json`. Writes go
/// through a temp file and a rename so readers never observe a partial
/// payload. Payloads above `max_file_bytes` are rejected on both paths.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
    max_file_bytes: usize,
}

impl FileStorage {
    /// Storage for `origin` (for example `https://example.com`) under `root`.
    pub fn for_origin(root: impl Into<PathBuf>, origin: &str) -> Self {
        Self {
            dir: root.into().join(hex(origin.as_bytes())),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    /// Set the maximum payload size in bytes. `0` is treated as `1`.
    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes.max(1);
        self
    }

    /// Directory holding this origin's items.
    pub fn origin_dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// File backing `key`.
    pub fn item_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hex(key.as_bytes())))
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.item_path(key);
        let len = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let limit = self.max_file_bytes;
        if len > limit as u64 {
            return Err(StorageError::TooLarge {
                actual: usize::try_from(len).unwrap_or(usize::MAX),
                limit,
            });
        }
        let mut text = String::with_capacity(len as usize);
        File::open(&path)?
            .take(limit as u64 + 1)
            .read_to_string(&mut text)?;
        if text.len() > limit {
            return Err(StorageError::TooLarge {
                actual: text.len(),
                limit,
            });
        }
        Ok(Some(text))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if value.len() > self.max_file_bytes {
            return Err(StorageError::TooLarge {
                actual: value.len(),
                limit: self.max_file_bytes,
            });
        }
        fs::create_dir_all(&self.dir)?;
        let final_path = self.item_path(key);
        let nonce = TEMP_FILE_NONCE.fetch_add(1, Ordering::Relaxed);
        let temp_path = self.dir.join(format!(
            "{}.json.tmp-{}-{}",
            hex(key.as_bytes()),
            std::process::id(),
            nonce
        ));
        let result = write_then_rename(&temp_path, &final_path, value.as_bytes());
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result.map_err(StorageError::from)
    }
}

fn write_then_rename(temp_path: &Path, final_path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    file.write_all(payload)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp_path, final_path)
}

fn hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Durable set of sources seen broken on earlier visits.
///
/// Never overwritten wholesale by the core: the only write path is
/// read-merge-write. Concurrent page views race last-writer-wins.
#[derive(Clone, Debug)]
pub struct KnownBrokenStore<S> {
    backend: S,
    key: String,
}

impl<S: StorageBackend> KnownBrokenStore<S> {
    /// Store under [`DEFAULT_STORAGE_KEY`].
    pub fn new(backend: S) -> Self {
        Self::with_key(backend, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Persisted mapping. Unavailable storage, backend errors and malformed
    /// content all read as the empty mapping.
    pub fn read(&self) -> BrokenSources {
        match self.read_for_merge() {
            Ok(sources) => sources,
            Err(err) => {
                log::debug!("reading {:?} failed, using empty set: {}", self.key, err);
                BrokenSources::new()
            }
        }
    }

    /// Like [`read`](Self::read), but a backend failure is an error: the
    /// stored mapping may exist and must not be replaced.
    fn read_for_merge(&self) -> Result<BrokenSources, StorageError> {
        let Some(text) = self.backend.get_item(&self.key)? else {
            return Ok(BrokenSources::new());
        };
        match serde_json::from_str::<Option<BrokenSources>>(&text) {
            Ok(sources) => Ok(sources.unwrap_or_default()),
            Err(err) => {
                log::debug!("ignoring malformed {:?} payload: {}", self.key, err);
                Ok(BrokenSources::new())
            }
        }
    }

    /// Persist `sources`. Silently does nothing when storage is unavailable.
    pub fn write(&self, sources: &BrokenSources) {
        let text = match serde_json::to_string(sources) {
            Ok(text) => text,
            Err(err) => {
                log::debug!("serializing {:?} failed: {}", self.key, err);
                return;
            }
        };
        if let Err(err) = self.backend.set_item(&self.key, &text) {
            log::debug!("writing {:?} failed: {}", self.key, err);
        }
    }

    /// Merge `discovered` into a fresh read and write the union back.
    ///
    /// Returns the union that was written, or `None` when the stored mapping
    /// could not be read. Nothing is written in that case, so entries from
    /// earlier visits are never lost to an unreadable store.
    pub fn merge_and_write(&self, discovered: &BrokenSources) -> Option<BrokenSources> {
        let stored = match self.read_for_merge() {
            Ok(stored) => stored,
            Err(err) => {
                log::debug!("reading {:?} failed, skipping merge: {}", self.key, err);
                return None;
            }
        };
        let merged = sources::merge(&stored, discovered);
        self.write(&merged);
        Some(merged)
    }
}
