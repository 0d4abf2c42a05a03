use std::collections::HashSet;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::record::{Record, ID_FIELD, TIMESTAMP_FIELD};
use crate::repository::{Collection, RecordRepository, RepositoryError, StoreSnapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} record not found: {id}")]
    NotFound { collection: Collection, id: String },
    #[error("{collection} record already exists: {id}")]
    Conflict { collection: Collection, id: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        StoreError::StorageUnavailable(err.to_string())
    }
}

/// In-memory bonds and messages mirrored to a [`RecordRepository`].
///
/// All mutations run under one write lock and are written through before the
/// new state becomes visible. A failed save leaves the in-memory state as it
/// was. When durable state holds duplicate ids, `update` and `delete` act on
/// the first match in sequence order.
pub struct RecordStore {
    repo: Arc<dyn RecordRepository>,
    state: RwLock<StoreSnapshot>,
}

impl RecordStore {
    /// Loads durable state. Missing or unreadable state yields an empty store.
    pub fn open(repo: Arc<dyn RecordRepository>) -> Self {
        let snapshot = match repo.load_snapshot() {
            Ok(snapshot) => {
                info!(
                    bonds = snapshot.bonds.len(),
                    messages = snapshot.messages.len(),
                    "loaded durable state"
                );
                warn_on_duplicate_ids(&snapshot);
                snapshot
            }
            Err(RepositoryError::Missing) => {
                info!("no durable state found, starting with an empty store");
                StoreSnapshot::default()
            }
            Err(err) => {
                warn!(error = %err, "durable state unreadable, starting with an empty store");
                StoreSnapshot::default()
            }
        };
        Self::with_snapshot(repo, snapshot)
    }

    pub fn with_snapshot(repo: Arc<dyn RecordRepository>, snapshot: StoreSnapshot) -> Self {
        Self {
            repo,
            state: RwLock::new(snapshot),
        }
    }

    pub fn list(&self, collection: Collection) -> Vec<Record> {
        self.state.read().records(collection).clone()
    }

    pub fn get(&self, collection: Collection, id: &str) -> Option<Record> {
        self.state
            .read()
            .records(collection)
            .iter()
            .find(|record| record.id() == Some(id))
            .cloned()
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.state.read().records(collection).len()
    }

    /// Appends a record and returns its id.
    pub fn create(&self, collection: Collection, fields: Record) -> Result<String, StoreError> {
        let record = self.insert(collection, fields)?;
        Ok(record.id().unwrap_or_default().to_string())
    }

    /// Appends a record and returns it as stored, with `id` (and `timestamp`
    /// for messages) assigned.
    pub fn insert(&self, collection: Collection, mut fields: Record) -> Result<Record, StoreError> {
        let id = fields.ensure_id();
        if collection == Collection::Messages {
            fields.insert(TIMESTAMP_FIELD, now_rfc3339());
        }
        let record = self.mutate(|snapshot| {
            let records = snapshot.records_mut(collection);
            if records.iter().any(|existing| existing.id() == Some(id.as_str())) {
                return Err(StoreError::Conflict {
                    collection,
                    id: id.clone(),
                });
            }
            records.push(fields.clone());
            Ok(fields)
        })?;
        info!(collection = %collection, id = %id, "record created");
        Ok(record)
    }

    /// Shallow-merges `patch` into the first record with `id`.
    pub fn update(
        &self,
        collection: Collection,
        id: &str,
        mut patch: Record,
    ) -> Result<Record, StoreError> {
        if let Some(patch_id) = patch.remove(ID_FIELD) {
            if !patch_id.trim().is_empty() && patch_id != id {
                return Err(StoreError::InvalidArgument(format!(
                    "record id mismatch: path has {id}, body has {patch_id}"
                )));
            }
        }
        if collection == Collection::Messages {
            patch.remove(TIMESTAMP_FIELD);
        }

        let updated = self.mutate(|snapshot| {
            let record = snapshot
                .records_mut(collection)
                .iter_mut()
                .find(|record| record.id() == Some(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection,
                    id: id.to_string(),
                })?;
            record.merge(&patch);
            Ok(record.clone())
        })?;
        info!(collection = %collection, id = %id, fields = patch.len(), "record updated");
        Ok(updated)
    }

    /// Removes the first record with `id`. Returns whether one was removed;
    /// an absent id is not an error.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let removed = self.mutate(|snapshot| {
            let records = snapshot.records_mut(collection);
            match records.iter().position(|record| record.id() == Some(id)) {
                Some(index) => {
                    records.remove(index);
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;
        if removed {
            info!(collection = %collection, id = %id, "record deleted");
        } else {
            debug!(collection = %collection, id = %id, "delete of absent record");
        }
        Ok(removed)
    }

    /// Bulk append with a single save. Either every record lands or none do.
    pub fn append_all(
        &self,
        collection: Collection,
        mut records: Vec<Record>,
    ) -> Result<usize, StoreError> {
        for record in records.iter_mut() {
            record.ensure_id();
            if collection == Collection::Messages {
                record.insert(TIMESTAMP_FIELD, now_rfc3339());
            }
        }
        let count = records.len();
        self.mutate(|snapshot| {
            let existing = snapshot.records_mut(collection);
            let mut seen: HashSet<String> = existing
                .iter()
                .filter_map(|record| record.id().map(str::to_string))
                .collect();
            for record in &records {
                let id = record.id().unwrap_or_default();
                if !seen.insert(id.to_string()) {
                    return Err(StoreError::Conflict {
                        collection,
                        id: id.to_string(),
                    });
                }
            }
            existing.extend(records);
            Ok(())
        })?;
        info!(collection = %collection, count, "records appended");
        Ok(count)
    }

    fn mutate<F, R>(&self, mutator: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<R, StoreError>,
    {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        let result = mutator(&mut next)?;
        self.repo.save_snapshot(&next).map_err(|err| {
            warn!(error = %err, "failed to persist store");
            StoreError::from(err)
        })?;
        *guard = next;
        Ok(result)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn warn_on_duplicate_ids(snapshot: &StoreSnapshot) {
    for collection in [Collection::Bonds, Collection::Messages] {
        let mut seen = HashSet::new();
        let duplicates = snapshot
            .records(collection)
            .iter()
            .filter_map(Record::id)
            .filter(|id| !seen.insert(*id))
            .count();
        if duplicates > 0 {
            warn!(
                collection = %collection,
                duplicates,
                "durable state holds duplicate ids; updates and deletes affect the first match"
            );
        }
    }
}
