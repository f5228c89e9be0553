//! Exportable thread state
//!
//! A snapshot carries everything needed to rebuild a thread exactly: ids, content,
//! authors, tombstones, child order and voter sets. The core never writes it
//! anywhere; callers hand the bytes to whatever storage they use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::store::ThreadStore;
use super::ThreadError;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub version: u32,
    pub thread_id: Uuid,
    pub exported_at: DateTime<Utc>,
    /// Hex SHA-256 of the serialized store
    pub checksum: String,
    pub store: ThreadStore,
}

impl ThreadSnapshot {
    pub fn new(thread_id: Uuid, store: ThreadStore) -> Result<Self, ThreadError> {
        let checksum = checksum(&store)?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            thread_id,
            exported_at: Utc::now(),
            checksum,
            store,
        })
    }

    /// Serialize the snapshot for an external store
    pub fn to_bytes(&self) -> Result<Vec<u8>, ThreadError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize and verify a snapshot
    pub fn from_bytes(data: &[u8]) -> Result<Self, ThreadError> {
        let snapshot: Self = serde_json::from_slice(data)?;
        snapshot.verify()?;
        Ok(snapshot)
    }

    /// Check version, checksum and structural invariants.
    pub fn verify(&self) -> Result<(), ThreadError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(ThreadError::CorruptSnapshot(format!(
                "unsupported version {}",
                self.version
            )));
        }
        let actual = checksum(&self.store)?;
        if actual != self.checksum {
            return Err(ThreadError::CorruptSnapshot(format!(
                "checksum mismatch for thread {}",
                self.thread_id
            )));
        }
        if !self.store.is_consistent() {
            return Err(ThreadError::CorruptSnapshot(format!(
                "inconsistent comment tree in thread {}",
                self.thread_id
            )));
        }
        Ok(())
    }
}

fn checksum(store: &ThreadStore) -> Result<String, ThreadError> {
    let bytes = serde_json::to_vec(store)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
