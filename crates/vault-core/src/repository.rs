use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::record::Record;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Bonds,
    Messages,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Bonds => "bonds",
            Collection::Messages => "messages",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both collections as persisted: `{"bonds": [...], "messages": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub bonds: Vec<Record>,
    #[serde(default)]
    pub messages: Vec<Record>,
}

impl StoreSnapshot {
    pub fn records(&self, collection: Collection) -> &Vec<Record> {
        match collection {
            Collection::Bonds => &self.bonds,
            Collection::Messages => &self.messages,
        }
    }

    pub fn records_mut(&mut self, collection: Collection) -> &mut Vec<Record> {
        match collection {
            Collection::Bonds => &mut self.bonds,
            Collection::Messages => &mut self.messages,
        }
    }
}

/// Accepted on-disk shapes. The bare list predates messages and holds bonds only.
#[derive(Deserialize)]
#[serde(untagged)]
enum DurableState {
    LegacyBonds(Vec<Record>),
    Structured(StoreSnapshot),
}

impl From<DurableState> for StoreSnapshot {
    fn from(state: DurableState) -> Self {
        match state {
            DurableState::Structured(snapshot) => snapshot,
            DurableState::LegacyBonds(bonds) => StoreSnapshot {
                bonds,
                messages: Vec::new(),
            },
        }
    }
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<StoreSnapshot, RepositoryError> {
    let state: DurableState = serde_json::from_slice(bytes)
        .map_err(|err| RepositoryError::Corrupt(err.to_string()))?;
    Ok(state.into())
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("durable state not found")]
    Missing,
    #[error("durable state is corrupt: {0}")]
    Corrupt(String),
    #[error("storage io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub trait RecordRepository: Send + Sync {
    fn load_snapshot(&self) -> Result<StoreSnapshot, RepositoryError>;
    fn save_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), RepositoryError>;
}

#[derive(Clone, Default)]
pub struct InMemoryRecordRepository {
    snapshot: Arc<RwLock<Option<StoreSnapshot>>>,
}

impl InMemoryRecordRepository {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Some(snapshot))),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn shared(snapshot: StoreSnapshot) -> Arc<Self> {
        Arc::new(Self::new(snapshot))
    }

    pub fn saved(&self) -> Option<StoreSnapshot> {
        self.snapshot.read().clone()
    }
}

impl RecordRepository for InMemoryRecordRepository {
    fn load_snapshot(&self) -> Result<StoreSnapshot, RepositoryError> {
        self.snapshot.read().clone().ok_or(RepositoryError::Missing)
    }

    fn save_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), RepositoryError> {
        *self.snapshot.write() = Some(snapshot.clone());
        Ok(())
    }
}

/// Single JSON file holding both collections, replaced atomically on save.
#[derive(Clone, Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl RecordRepository for JsonFileRepository {
    fn load_snapshot(&self) -> Result<StoreSnapshot, RepositoryError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(RepositoryError::Missing),
            Err(err) => return Err(RepositoryError::Io(err.to_string())),
        };
        decode_snapshot(&bytes)
    }

    fn save_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), RepositoryError> {
        let payload = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| RepositoryError::Serialization(err.to_string()))?;

        let parent = self.parent_dir();
        std::fs::create_dir_all(&parent).map_err(|err| RepositoryError::Io(err.to_string()))?;

        let mut temp = NamedTempFile::new_in(&parent)
            .map_err(|err| RepositoryError::Io(err.to_string()))?;
        temp.write_all(&payload)
            .map_err(|err| RepositoryError::Io(err.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| RepositoryError::Io(err.to_string()))?;
        temp.persist(&self.path)
            .map_err(|err| RepositoryError::Io(err.error.to_string()))?;
        Ok(())
    }
}
