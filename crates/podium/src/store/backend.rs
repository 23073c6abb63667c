//! Byte-level storage backends.
//!
//! Keys are `/`-separated relative paths. `put_new` is exclusive per key:
//! a second write to the same key fails with `DuplicateWrite`, which is
//! the only coordination concurrent runs need.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use walkdir::WalkDir;

use crate::error::{PodiumError, Result};

/// Append-only object storage.
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Store bytes under a key that must not exist yet.
    fn put_new(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Fetch the bytes stored under a key, or `NotFound`.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// All keys starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Process-local backend for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn put_new(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        if objects.contains_key(key) {
            return Err(PodiumError::DuplicateWrite {
                path: key.to_string(),
            });
        }
        objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| PodiumError::NotFound(key.to_string()))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// Distinguishes temp files of concurrent writers in one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Backend rooted at a local directory.
///
/// Objects are written to a hidden temp file and then hard-linked into
/// place, so readers never observe a partially written object and the
/// link itself provides create-new exclusivity.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| PodiumError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return Err(PodiumError::Config(format!("Invalid storage key '{}'", key)));
        }
        Ok(key.split('/').fold(self.root.clone(), |path, part| path.join(part)))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PodiumError + '_ {
    move |source| PodiumError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl StorageBackend for LocalBackend {
    fn put_new(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(io_error(parent))?;

        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = parent.join(format!(
            ".{}.{}-{}.tmp",
            file_name,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let written = File::create(&temp)
            .and_then(|mut file| {
                file.write_all(bytes)?;
                file.sync_all()
            })
            .map_err(io_error(&temp));
        let linked = written.and_then(|()| match fs::hard_link(&temp, &path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => Err(PodiumError::DuplicateWrite {
                path: key.to_string(),
            }),
            Err(source) => Err(PodiumError::Io {
                path: path.clone(),
                source,
            }),
        });
        // The temp file is dropped whatever happened.
        let _ = fs::remove_file(&temp);
        linked
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == IoErrorKind::NotFound => Err(PodiumError::NotFound(key.to_string())),
            Err(source) => Err(PodiumError::Io { path, source }),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        // Only walk the deepest directory the prefix names.
        let start = match prefix.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => self.path_for(dir)?,
            _ => self.root.clone(),
        };
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&start).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
