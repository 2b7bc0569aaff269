use crate::domain::documents::EvidenceDocument;
use crate::domain::models::Artifact;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("evidence store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot encode slot {slot}: {source}")]
    Encode {
        slot: String,
        source: serde_json::Error,
    },
}

pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Directory of named evidence documents, one `<slot>.json` per phase.
///
/// Each slot has a single writer per run. A slot is replaced wholesale on
/// write, never appended to.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    dir: PathBuf,
}

impl EvidenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slot))
    }

    pub fn has(&self, slot: &str) -> bool {
        self.slot_path(slot).exists()
    }

    pub fn write<T: Serialize>(
        &self,
        slot: &str,
        phase_name: &str,
        payload: &T,
    ) -> Result<PathBuf, StoreError> {
        self.ensure()?;
        let doc = EvidenceDocument {
            phase_name: phase_name.to_string(),
            timestamp: timestamp_now(),
            payload,
        };
        let body = serde_json::to_string_pretty(&doc).map_err(|source| StoreError::Encode {
            slot: slot.to_string(),
            source,
        })?;
        let path = self.slot_path(slot);
        let tmp = self.dir.join(format!(".{}.json.tmp", slot));
        std::fs::write(&tmp, body).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Deletes a slot. Returns whether there was anything to delete.
    pub fn remove(&self, slot: &str) -> Result<bool, StoreError> {
        let path = self.slot_path(slot);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Reads a slot. Absent or unreadable evidence is `None`, never an error.
    pub fn read<T: DeserializeOwned + Default>(&self, slot: &str) -> Option<EvidenceDocument<T>> {
        let path = self.slot_path(slot);
        if !path.exists() {
            log::debug!("slot {} absent", slot);
            return None;
        }
        let raw = match std::fs::read_to_string(&path) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("cannot read slot {}: {}", slot, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::warn!("slot {} is malformed, treating as absent: {}", slot, e);
                None
            }
        }
    }

    pub fn read_payload<T: DeserializeOwned + Default>(&self, slot: &str) -> Option<T> {
        self.read(slot).map(|d| d.payload)
    }

    /// Lists every `.json` document in the store, sorted by name.
    pub fn artifacts(&self) -> Result<Vec<Artifact>, StoreError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let io = |source| StoreError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(io)? {
            let entry = entry.map_err(io)?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".json") || name.starts_with('.') {
                continue;
            }
            let bytes = std::fs::read(entry.path()).map_err(|source| StoreError::Io {
                path: entry.path(),
                source,
            })?;
            out.push(Artifact {
                file: name,
                size: bytes.len() as u64,
                sha256: sha256_hex(&bytes),
            });
        }
        out.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(out)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
