//! Pluggable persistence backends for the performance store
//!
//! The store only needs a key-value medium that can hold the serialized
//! snapshot and alert lists. The in-memory lists stay authoritative; a
//! backend that falls behind is a logged diagnostic, never a failure.

use crate::error::MonitorResult;

use std::fs;
use std::path::PathBuf;

/// Well-known key for the serialized snapshot list
pub const SNAPSHOTS_KEY: &str = "perfwatch_snapshots";
/// Well-known key for the serialized alert list
pub const ALERTS_KEY: &str = "perfwatch_alerts";

/// Storage medium behind the performance store
pub trait StorageBackend: Send + Sync {
    fn load(&self, key: &str) -> MonitorResult<Option<String>>;
    fn save(&self, key: &str, value: &str) -> MonitorResult<()>;
    fn remove(&self, key: &str) -> MonitorResult<()>;
}

/// In-memory only: nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryBackend;

impl StorageBackend for MemoryBackend {
    fn load(&self, _key: &str) -> MonitorResult<Option<String>> {
        Ok(None)
    }

    fn save(&self, _key: &str, _value: &str) -> MonitorResult<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> MonitorResult<()> {
        Ok(())
    }
}

/// File-per-key backend under a dedicated directory
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> MonitorResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileBackend {
    fn load(&self, key: &str) -> MonitorResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&self, key: &str, value: &str) -> MonitorResult<()> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> MonitorResult<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_holds_nothing() {
        let backend = MemoryBackend;
        backend.save("k", "v").unwrap();
        assert!(backend.load("k").unwrap().is_none());
        backend.remove("k").unwrap();
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();

        assert!(backend.load(SNAPSHOTS_KEY).unwrap().is_none());
        backend.save(SNAPSHOTS_KEY, "[1,2,3]").unwrap();
        assert_eq!(
            backend.load(SNAPSHOTS_KEY).unwrap().as_deref(),
            Some("[1,2,3]")
        );

        backend.remove(SNAPSHOTS_KEY).unwrap();
        assert!(backend.load(SNAPSHOTS_KEY).unwrap().is_none());
    }
}
