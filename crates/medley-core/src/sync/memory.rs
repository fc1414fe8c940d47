//! In-memory [`RemoteStore`] with the same semantics as the hosted backend.
//!
//! Owner-scoped tables, store-assigned ids, and compare-and-swap updates
//! that report a mismatch instead of failing. Multi-device tests share one
//! instance behind an `Arc` so two engines race against the same rows.

use std::collections::{BTreeMap, HashMap, HashSet};

use tokio::sync::Mutex;

use crate::models::{EntityKind, OwnerId, RemoteId, RemoteRecord};

use super::remote::{
    NewRemoteRecord, RemoteError, RemoteResult, RemoteStore, RemoteUpdate, UpdateOutcome,
};

#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<(OwnerId, EntityKind), BTreeMap<RemoteId, RemoteRecord>>,
    next_id: i64,
    fail_select_all: HashSet<EntityKind>,
    fail_inserts: HashSet<EntityKind>,
    races: HashMap<EntityKind, Vec<(OwnerId, RemoteId, RemoteUpdate)>>,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a row directly, keeping the id counter ahead of it.
    pub async fn seed(&self, owner: &OwnerId, entity: EntityKind, record: RemoteRecord) {
        let mut inner = self.inner.lock().await;
        inner.next_id = inner.next_id.max(record.id.get());
        inner
            .tables
            .entry((*owner, entity))
            .or_default()
            .insert(record.id, record);
    }

    /// Force the next assigned id. Useful when a test pins expected ids.
    pub async fn set_next_id(&self, next: i64) {
        self.inner.lock().await.next_id = next - 1;
    }

    /// Snapshot one table without touching injected failures.
    pub async fn rows(&self, owner: &OwnerId, entity: EntityKind) -> Vec<RemoteRecord> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(&(*owner, entity))
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn row_count(&self, owner: &OwnerId, entity: EntityKind) -> usize {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(&(*owner, entity))
            .map_or(0, BTreeMap::len)
    }

    /// Make the next `select_all` for this entity fail once.
    pub async fn fail_next_select_all(&self, entity: EntityKind) {
        self.inner.lock().await.fail_select_all.insert(entity);
    }

    /// Make the next `insert` for this entity fail once.
    pub async fn fail_next_insert(&self, entity: EntityKind) {
        self.inner.lock().await.fail_inserts.insert(entity);
    }

    /// Mutate a row right after the next `select_all` for its entity, so the
    /// caller works from a snapshot that is already stale. Simulates another
    /// device writing between fetch and conditional update.
    pub async fn race_after_next_select_all(
        &self,
        owner: &OwnerId,
        entity: EntityKind,
        id: RemoteId,
        update: RemoteUpdate,
    ) {
        self.inner
            .lock()
            .await
            .races
            .entry(entity)
            .or_default()
            .push((*owner, id, update));
    }

    /// Drop a row outright, as an out-of-band hard delete would.
    pub async fn remove_row(&self, owner: &OwnerId, entity: EntityKind, id: RemoteId) {
        let mut inner = self.inner.lock().await;
        if let Some(table) = inner.tables.get_mut(&(*owner, entity)) {
            table.remove(&id);
        }
    }
}

impl RemoteStore for MemoryRemoteStore {
    async fn select_all(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
    ) -> RemoteResult<Vec<RemoteRecord>> {
        let mut inner = self.inner.lock().await;
        if inner.fail_select_all.remove(&entity) {
            return Err(RemoteError::Api(format!(
                "injected select_all failure for {entity}"
            )));
        }
        let snapshot = inner
            .tables
            .get(&(*owner, entity))
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default();
        // Armed races land after the snapshot is taken.
        if let Some(pending) = inner.races.remove(&entity) {
            for (race_owner, id, update) in pending {
                if let Some(row) = inner
                    .tables
                    .get_mut(&(race_owner, entity))
                    .and_then(|table| table.get_mut(&id))
                {
                    row.payload = update.payload;
                    row.is_deleted = update.is_deleted;
                    row.version = update.version;
                    row.updated_at = update.updated_at;
                }
            }
        }
        Ok(snapshot)
    }

    async fn select_one(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        id: RemoteId,
    ) -> RemoteResult<Option<RemoteRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tables
            .get(&(*owner, entity))
            .and_then(|table| table.get(&id))
            .cloned())
    }

    async fn insert(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        record: NewRemoteRecord,
    ) -> RemoteResult<RemoteRecord> {
        let mut inner = self.inner.lock().await;
        if inner.fail_inserts.remove(&entity) {
            return Err(RemoteError::Api(format!(
                "injected insert failure for {entity}"
            )));
        }
        inner.next_id += 1;
        let stored = RemoteRecord {
            id: RemoteId::new(inner.next_id),
            version: 1,
            is_deleted: false,
            created_at: record.created_at,
            updated_at: record.updated_at,
            payload: record.payload,
        };
        inner
            .tables
            .entry((*owner, entity))
            .or_default()
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_if_version(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        id: RemoteId,
        expected_version: i64,
        update: RemoteUpdate,
    ) -> RemoteResult<UpdateOutcome> {
        let mut inner = self.inner.lock().await;
        let Some(row) = inner
            .tables
            .get_mut(&(*owner, entity))
            .and_then(|table| table.get_mut(&id))
        else {
            // A vanished row and a stale version look the same to a
            // conditional update.
            return Ok(UpdateOutcome::VersionMismatch);
        };
        if row.version != expected_version {
            return Ok(UpdateOutcome::VersionMismatch);
        }
        row.payload = update.payload;
        row.is_deleted = update.is_deleted;
        row.version = update.version;
        row.updated_at = update.updated_at;
        Ok(UpdateOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Payload;
    use pretty_assertions::assert_eq;

    fn owner() -> OwnerId {
        OwnerId::new(uuid::Uuid::new_v4())
    }

    fn payload(name: &str) -> Payload {
        let mut map = Payload::new();
        map.insert("name".to_string(), serde_json::Value::from(name));
        map
    }

    fn new_record(name: &str) -> NewRemoteRecord {
        NewRemoteRecord {
            payload: payload(name),
            created_at: 100,
            updated_at: 100,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_assigns_sequential_ids_and_version_one() {
        let store = MemoryRemoteStore::new();
        let me = owner();

        let first = store
            .insert(EntityKind::Category, &me, new_record("Watching"))
            .await
            .unwrap();
        let second = store
            .insert(EntityKind::Category, &me, new_record("Backlog"))
            .await
            .unwrap();

        assert_eq!(first.id, RemoteId::new(1));
        assert_eq!(second.id, RemoteId::new(2));
        assert_eq!(first.version, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn select_all_is_ordered_and_keeps_tombstones() {
        let store = MemoryRemoteStore::new();
        let me = owner();
        store
            .seed(
                &me,
                EntityKind::Category,
                RemoteRecord {
                    id: RemoteId::new(7),
                    version: 3,
                    is_deleted: true,
                    created_at: 0,
                    updated_at: 0,
                    payload: payload("gone"),
                },
            )
            .await;
        store
            .seed(
                &me,
                EntityKind::Category,
                RemoteRecord {
                    id: RemoteId::new(2),
                    version: 1,
                    is_deleted: false,
                    created_at: 0,
                    updated_at: 0,
                    payload: payload("kept"),
                },
            )
            .await;

        let rows = store.select_all(EntityKind::Category, &me).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![2, 7]);
        assert!(rows[1].is_deleted);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn owners_do_not_see_each_other() {
        let store = MemoryRemoteStore::new();
        let alice = owner();
        let bob = owner();
        store
            .insert(EntityKind::Category, &alice, new_record("Watching"))
            .await
            .unwrap();

        assert_eq!(store.row_count(&alice, EntityKind::Category).await, 1);
        assert!(store
            .select_all(EntityKind::Category, &bob)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conditional_update_applies_only_on_matching_version() {
        let store = MemoryRemoteStore::new();
        let me = owner();
        let row = store
            .insert(EntityKind::Category, &me, new_record("Watching"))
            .await
            .unwrap();

        let update = RemoteUpdate {
            payload: payload("Watching now"),
            is_deleted: false,
            version: 2,
            updated_at: 200,
        };
        let outcome = store
            .update_if_version(EntityKind::Category, &me, row.id, 1, update.clone())
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);

        // A second writer still expecting version 1 loses.
        let outcome = store
            .update_if_version(EntityKind::Category, &me, row.id, 1, update)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::VersionMismatch);

        let rows = store.rows(&me, EntityKind::Category).await;
        assert_eq!(rows[0].version, 2);
        assert_eq!(
            rows[0].payload.get("name").and_then(|v| v.as_str()),
            Some("Watching now")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn updating_a_missing_row_is_a_mismatch() {
        let store = MemoryRemoteStore::new();
        let me = owner();
        let outcome = store
            .update_if_version(
                EntityKind::Category,
                &me,
                RemoteId::new(99),
                1,
                RemoteUpdate {
                    payload: Payload::new(),
                    is_deleted: false,
                    version: 2,
                    updated_at: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::VersionMismatch);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn injected_failures_fire_once() {
        let store = MemoryRemoteStore::new();
        let me = owner();
        store.fail_next_select_all(EntityKind::Category).await;

        assert!(store.select_all(EntityKind::Category, &me).await.is_err());
        assert!(store.select_all(EntityKind::Category, &me).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn armed_race_lands_after_snapshot() {
        let store = MemoryRemoteStore::new();
        let me = owner();
        let row = store
            .insert(EntityKind::Category, &me, new_record("Watching"))
            .await
            .unwrap();

        store
            .race_after_next_select_all(
                &me,
                EntityKind::Category,
                row.id,
                RemoteUpdate {
                    payload: payload("Renamed elsewhere"),
                    is_deleted: false,
                    version: 2,
                    updated_at: 300,
                },
            )
            .await;

        let snapshot = store.select_all(EntityKind::Category, &me).await.unwrap();
        assert_eq!(snapshot[0].version, 1, "caller sees the pre-race row");

        let rows = store.rows(&me, EntityKind::Category).await;
        assert_eq!(rows[0].version, 2, "the store itself moved on");
    }
}
