//! Shared library service wrapper used across clients.
//!
//! The typed CRUD surface is what application code consumes; the engine
//! owns version bumping through the repository layer, so callers never
//! touch sync bookkeeping directly.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    ConflictLogRepository, Database, LibSqlConflictLogRepository, LibSqlReplicaRepository,
    ReplicaRepository,
};
use crate::models::{
    CategoryFields, EntityFields, EntityKind, LocalId, NewConflict, Payload, RemoteId,
    RemoteRecord, ReplicaRecord, SyncConflict, Tracked,
};
use crate::{Error, Result};

/// Thread-safe service for replica and conflict-log operations.
#[derive(Clone)]
pub struct LibraryService {
    db: Arc<Mutex<Database>>,
}

impl LibraryService {
    /// Open the library at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open an in-memory library (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Create a record; it starts at version 1 with no remote link.
    pub async fn create<T: EntityFields>(&self, fields: &T) -> Result<Tracked<T>> {
        let payload = fields.to_payload()?;
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        let record = repo.insert(T::KIND, &payload).await?;
        Tracked::from_record(record)
    }

    /// Fetch a record by local id. Soft-deleted records are still reachable
    /// here; [`list`](Self::list) is the business view.
    pub async fn get<T: EntityFields>(&self, id: LocalId) -> Result<Option<Tracked<T>>> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        match repo.get(T::KIND, id).await? {
            Some(record) => Ok(Some(Tracked::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// List live records, ordered by local id.
    pub async fn list<T: EntityFields>(&self) -> Result<Vec<Tracked<T>>> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        let records = repo.list(T::KIND).await?;
        records.into_iter().map(Tracked::from_record).collect()
    }

    /// Replace a record's fields; each accepted update bumps the version.
    pub async fn update<T: EntityFields>(&self, id: LocalId, fields: &T) -> Result<Tracked<T>> {
        let payload = fields.to_payload()?;
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        let record = repo.update(T::KIND, id, &payload).await?;
        Tracked::from_record(record)
    }

    /// Soft-delete a record. Deletion is a versioned mutation, not a row
    /// removal.
    pub async fn soft_delete(&self, entity: EntityKind, id: LocalId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        repo.soft_delete(entity, id).await
    }

    /// Find a live category by exact name.
    pub async fn find_category(&self, name: &str) -> Result<Option<Tracked<CategoryFields>>> {
        let name = name.trim();
        let categories = self.list::<CategoryFields>().await?;
        Ok(categories
            .into_iter()
            .find(|category| category.fields.name == name))
    }

    /// Find a live category by name, creating it when absent.
    pub async fn get_or_create_category(&self, name: &str) -> Result<Tracked<CategoryFields>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "category name cannot be empty".to_string(),
            ));
        }
        if let Some(existing) = self.find_category(name).await? {
            return Ok(existing);
        }
        self.create(&CategoryFields::new(name)).await
    }

    /// List recent conflicts, newest first.
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let db = self.db.lock().await;
        let repo = LibSqlConflictLogRepository::new(db.connection());
        repo.list_recent(limit).await
    }

    pub async fn unresolved_conflict_count(&self) -> Result<i64> {
        let db = self.db.lock().await;
        let repo = LibSqlConflictLogRepository::new(db.connection());
        repo.unresolved_count().await
    }

    // Sync-engine surface. These mutate engine-owned columns and never bump
    // versions on their own.

    pub(crate) async fn records_for_sync(&self, entity: EntityKind) -> Result<Vec<ReplicaRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        repo.list_all(entity).await
    }

    pub(crate) async fn unsynced_records(&self, entity: EntityKind) -> Result<Vec<ReplicaRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        repo.list_unsynced(entity).await
    }

    pub(crate) async fn mirror_remote(
        &self,
        entity: EntityKind,
        payload: &Payload,
        remote: &RemoteRecord,
    ) -> Result<LocalId> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        repo.insert_mirrored(entity, payload, remote).await
    }

    pub(crate) async fn adopt_remote(
        &self,
        entity: EntityKind,
        id: LocalId,
        payload: &Payload,
        remote: &RemoteRecord,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        repo.adopt_remote(entity, id, payload, remote).await
    }

    pub(crate) async fn link_remote(
        &self,
        entity: EntityKind,
        id: LocalId,
        remote_id: RemoteId,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        repo.link_remote(entity, id, remote_id).await
    }

    pub(crate) async fn mark_pushed(
        &self,
        entity: EntityKind,
        id: LocalId,
        remote_id: RemoteId,
        version: i64,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        repo.mark_pushed(entity, id, remote_id, version).await
    }

    pub(crate) async fn detach_remote(&self, entity: EntityKind, id: LocalId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlReplicaRepository::new(db.connection());
        repo.detach_remote(entity, id).await
    }

    pub(crate) async fn record_conflict(&self, conflict: &NewConflict) -> Result<i64> {
        let db = self.db.lock().await;
        let repo = LibSqlConflictLogRepository::new(db.connection());
        repo.record(conflict).await
    }
}
