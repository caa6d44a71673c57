//! Artifact store: in-memory with automatic disk spill for large payloads

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::TempDir;
use thiserror::Error;

/// Payloads larger than this many serialized bytes are spilled to disk
const SPILL_THRESHOLD: usize = 100 * 1024;

/// Errors from the artifact store
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No artifact exists with the given id
    #[error("no artifact with id '{0}'")]
    NotFound(String),

    /// I/O error reading or writing a spill file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Metadata about a stored artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    /// Artifact identifier
    pub artifact_id: String,
    /// Display name
    pub name: String,
    /// Serialized payload size in bytes
    pub size_bytes: usize,
    /// Whether the payload lives on disk
    pub spilled: bool,
}

#[derive(Default)]
struct StoreInner {
    memory: HashMap<String, Value>,
    info: HashMap<String, ArtifactInfo>,
    spill_dir: Option<TempDir>,
}

/// Storage for pipeline artifacts.
///
/// Small payloads (<= 100 KiB serialized) stay in memory; larger ones
/// are spilled to a temporary directory and read back on demand. The
/// spill directory lives as long as the store.
#[derive(Default)]
pub struct ArtifactStore {
    inner: Mutex<StoreInner>,
}

impl ArtifactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an artifact, spilling to disk when the serialized payload
    /// exceeds the threshold. Returns metadata describing what was
    /// stored.
    pub fn store(
        &self,
        artifact_id: impl Into<String>,
        name: impl Into<String>,
        data: Value,
    ) -> Result<ArtifactInfo, ArtifactError> {
        let artifact_id = artifact_id.into();
        let serialized = serde_json::to_vec(&data)?;
        let size = serialized.len();
        let spilled = size > SPILL_THRESHOLD;

        let mut inner = self.inner.lock();
        if spilled {
            let path = Self::spill_path(&mut inner, &artifact_id)?;
            fs::write(&path, &serialized)?;
            inner.memory.remove(&artifact_id);
            log::debug!("artifact '{artifact_id}' spilled to disk ({size} bytes)");
        } else {
            inner.memory.insert(artifact_id.clone(), data);
            // Drop any stale spill file from a previous larger version
            if let Some(dir) = &inner.spill_dir {
                let stale = dir.path().join(Self::file_name(&artifact_id));
                if stale.exists() {
                    fs::remove_file(stale)?;
                }
            }
        }

        let info = ArtifactInfo {
            artifact_id: artifact_id.clone(),
            name: name.into(),
            size_bytes: size,
            spilled,
        };
        inner.info.insert(artifact_id, info.clone());
        Ok(info)
    }

    /// Retrieve an artifact by id
    pub fn retrieve(&self, artifact_id: &str) -> Result<Value, ArtifactError> {
        let inner = self.inner.lock();
        let info = inner
            .info
            .get(artifact_id)
            .ok_or_else(|| ArtifactError::NotFound(artifact_id.to_string()))?;

        if !info.spilled {
            return Ok(inner.memory[artifact_id].clone());
        }

        let dir = inner
            .spill_dir
            .as_ref()
            .ok_or_else(|| ArtifactError::NotFound(artifact_id.to_string()))?;
        let raw = fs::read(dir.path().join(Self::file_name(artifact_id)))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Check whether an artifact exists
    pub fn has(&self, artifact_id: &str) -> bool {
        self.inner.lock().info.contains_key(artifact_id)
    }

    /// Metadata for all stored artifacts
    pub fn list(&self) -> Vec<ArtifactInfo> {
        self.inner.lock().info.values().cloned().collect()
    }

    fn spill_path(inner: &mut StoreInner, artifact_id: &str) -> Result<PathBuf, ArtifactError> {
        if inner.spill_dir.is_none() {
            inner.spill_dir = Some(tempfile::Builder::new().prefix("skein-artifacts-").tempdir()?);
        }
        let dir = inner.spill_dir.as_ref().unwrap_or_else(|| unreachable!());
        Ok(dir.path().join(Self::file_name(artifact_id)))
    }

    fn file_name(artifact_id: &str) -> String {
        let safe: String = artifact_id
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("{safe}.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_small_artifact_stays_in_memory() {
        let store = ArtifactStore::new();
        let info = store.store("a1", "small", json!({"k": "v"})).unwrap();
        assert!(!info.spilled);
        assert_eq!(store.retrieve("a1").unwrap(), json!({"k": "v"}));
    }

    #[test]
    fn test_large_artifact_spills_and_round_trips() {
        let store = ArtifactStore::new();
        let payload = json!("x".repeat(SPILL_THRESHOLD + 1));
        let info = store.store("big", "large", payload.clone()).unwrap();
        assert!(info.spilled);
        assert!(info.size_bytes > SPILL_THRESHOLD);
        assert_eq!(store.retrieve("big").unwrap(), payload);
    }

    #[test]
    fn test_missing_artifact() {
        let store = ArtifactStore::new();
        assert!(!store.has("nope"));
        assert!(matches!(
            store.retrieve("nope"),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn test_overwrite_shrinks_back_to_memory() {
        let store = ArtifactStore::new();
        store
            .store("a", "v1", json!("x".repeat(SPILL_THRESHOLD + 1)))
            .unwrap();
        let info = store.store("a", "v2", json!("tiny")).unwrap();
        assert!(!info.spilled);
        assert_eq!(store.retrieve("a").unwrap(), json!("tiny"));
        assert_eq!(store.list().len(), 1);
    }
}
