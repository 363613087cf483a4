//! Fragment provisioning and teardown.
//!
//! Fragments are named `fragment{i}`. The memory backend has nothing to
//! provision; the RocksDB backend keeps one database directory per fragment
//! under the configured data directory.

use crate::config::DEFAULT_DATA_DIR;
use crate::error::{FragmentError, Result};
use crate::store::{FragmentStore, MemoryFragmentStore, PersistentFragmentStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const FRAGMENT_NAME_PREFIX: &str = "fragment";

/// Where fragment data lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FragmentBackend {
    #[default]
    Memory,
    #[serde(rename = "rocksdb")]
    RocksDb {
        #[serde(default = "default_data_dir")]
        data_dir: PathBuf,
    },
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

impl FragmentBackend {
    pub fn rocksdb(data_dir: impl Into<PathBuf>) -> Self {
        FragmentBackend::RocksDb {
            data_dir: data_dir.into(),
        }
    }
}

pub fn fragment_name(index: usize) -> String {
    format!("{FRAGMENT_NAME_PREFIX}{index}")
}

pub fn fragment_path(data_dir: &Path, index: usize) -> PathBuf {
    data_dir.join(fragment_name(index))
}

/// Open (creating if needed) `count` fragments. Any failure is a
/// connectivity error for that fragment and aborts setup.
pub fn open_fragments(
    backend: &FragmentBackend,
    count: usize,
) -> Result<Vec<Box<dyn FragmentStore>>> {
    let mut fragments: Vec<Box<dyn FragmentStore>> = Vec::with_capacity(count);
    for index in 0..count {
        let fragment: Box<dyn FragmentStore> = match backend {
            FragmentBackend::Memory => Box::new(MemoryFragmentStore::new()),
            FragmentBackend::RocksDb { data_dir } => {
                let path = fragment_path(data_dir, index);
                let store = PersistentFragmentStore::open(&path).map_err(|source| {
                    FragmentError::Connect {
                        fragment: index,
                        source,
                    }
                })?;
                debug!(fragment = index, path = %path.display(), "opened fragment");
                Box::new(store)
            }
        };
        fragments.push(fragment);
    }
    info!(count, backend = ?backend, "all fragment connections established");
    Ok(fragments)
}

/// Remove the storage of `count` fragments. Missing fragments are ignored.
pub fn drop_fragments(backend: &FragmentBackend, count: usize) -> anyhow::Result<()> {
    let FragmentBackend::RocksDb { data_dir } = backend else {
        return Ok(());
    };
    for index in 0..count {
        let path = fragment_path(data_dir, index);
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
            debug!(fragment = index, path = %path.display(), "dropped fragment");
        }
    }
    Ok(())
}

/// Drops the fragments it covers when it goes out of scope.
#[derive(Debug)]
pub struct FragmentSetGuard {
    backend: FragmentBackend,
    count: usize,
}

impl FragmentSetGuard {
    /// Drop any stale fragments, then arm the guard.
    pub fn fresh(backend: FragmentBackend, count: usize) -> anyhow::Result<Self> {
        drop_fragments(&backend, count)?;
        Ok(Self { backend, count })
    }
}

impl Drop for FragmentSetGuard {
    fn drop(&mut self) {
        if let Err(err) = drop_fragments(&self.backend, self.count) {
            warn!(error = %err, "failed to clean up fragments");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_fragments_open_empty() {
        let fragments = open_fragments(&FragmentBackend::Memory, 3).unwrap();
        assert_eq!(fragments.len(), 3);
        for fragment in &fragments {
            assert_eq!(fragment.stats().unwrap().students, 0);
        }
    }

    #[test]
    fn guard_removes_rocksdb_fragments() {
        let dir = tempdir().unwrap();
        let backend = FragmentBackend::rocksdb(dir.path());
        {
            let _guard = FragmentSetGuard::fresh(backend.clone(), 2).unwrap();
            let fragments = open_fragments(&backend, 2).unwrap();
            assert_eq!(fragments.len(), 2);
            assert!(fragment_path(dir.path(), 0).exists());
            assert!(fragment_path(dir.path(), 1).exists());
        }
        assert!(!fragment_path(dir.path(), 0).exists());
        assert!(!fragment_path(dir.path(), 1).exists());
    }

    #[test]
    fn unopenable_fragment_is_connect_error() {
        let dir = tempdir().unwrap();
        // A regular file where the database directory should be.
        std::fs::write(dir.path().join("fragment0"), b"not a database").unwrap();
        let err = open_fragments(&FragmentBackend::rocksdb(dir.path()), 1).err().unwrap();
        assert!(matches!(err, FragmentError::Connect { fragment: 0, .. }));
    }

    #[test]
    fn backend_serde_shape() {
        let json = serde_json::to_string(&FragmentBackend::rocksdb("/tmp/frag")).unwrap();
        assert_eq!(json, r#"{"kind":"rocksdb","data_dir":"/tmp/frag"}"#);
        let memory: FragmentBackend = serde_json::from_str(r#"{"kind":"memory"}"#).unwrap();
        assert_eq!(memory, FragmentBackend::Memory);
    }
}
