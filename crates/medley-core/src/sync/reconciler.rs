//! Generic per-entity reconciliation: one entity type, one owner, one pass.
//!
//! The pass walks the remote collection first, settling linked rows by
//! version and attaching or mirroring unlinked ones, then uploads local
//! records that have never synced. Natural-key matching runs before any
//! insert in both directions so two replicas that created the same logical
//! record independently end up sharing one remote row.
//!
//! Failure boundaries: a failed collection fetch aborts the stage; a single
//! record's failure is logged and retried on a later pass. A conditional
//! update that matches zero rows is the conflict signal, not a failure.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::models::{
    ConflictKind, EntityKind, LocalId, NewConflict, OwnerId, Payload, RemoteId, RemoteRecord,
    ReplicaRecord, SyncMeta,
};
use crate::services::LibraryService;

use super::adapter::EntityAdapter;
use super::engine::EntityCounts;
use super::id_map::{payload_to_local, payload_to_remote, IdMapper};
use super::remote::{NewRemoteRecord, RemoteStore, RemoteUpdate, UpdateOutcome};
use super::strategy::{SyncAction, SyncStrategy};

/// How one entity stage ended. Fatal errors travel as `Err` instead.
pub(crate) enum StageOutcome {
    Completed(EntityCounts),
    Cancelled(EntityCounts),
}

pub(crate) struct EntityPass<'a, R: RemoteStore> {
    entity: EntityKind,
    adapter: &'static EntityAdapter,
    library: &'a LibraryService,
    remote: &'a R,
    strategy: &'a dyn SyncStrategy,
    mapper: &'a IdMapper,
    owner: OwnerId,
    counts: EntityCounts,
    /// Remote ids that already carry or gained a local link this pass.
    claimed_remotes: HashSet<RemoteId>,
    /// Local ids whose remote row vanished this pass; re-uploaded next pass.
    severed: HashSet<LocalId>,
}

impl<'a, R: RemoteStore> EntityPass<'a, R> {
    pub(crate) fn new(
        entity: EntityKind,
        library: &'a LibraryService,
        remote: &'a R,
        strategy: &'a dyn SyncStrategy,
        mapper: &'a IdMapper,
        owner: OwnerId,
    ) -> Self {
        Self {
            entity,
            adapter: entity.adapter(),
            library,
            remote,
            strategy,
            mapper,
            owner,
            counts: EntityCounts::default(),
            claimed_remotes: HashSet::new(),
            severed: HashSet::new(),
        }
    }

    pub(crate) async fn run(mut self, cancel: &AtomicBool) -> Result<StageOutcome> {
        let remote_rows = self
            .remote
            .select_all(self.entity, &self.owner)
            .await
            .map_err(Error::Remote)?;
        let locals = self.library.records_for_sync(self.entity).await?;

        let mut linked_by_remote: HashMap<RemoteId, ReplicaRecord> = HashMap::new();
        let mut unlinked_by_key: HashMap<String, Vec<ReplicaRecord>> = HashMap::new();
        for record in locals {
            if let Some(remote_id) = record.meta.remote_id {
                self.claimed_remotes.insert(remote_id);
                linked_by_remote.insert(remote_id, record);
            } else if !record.meta.is_deleted {
                if let Some(key) = (self.adapter.natural_key)(&record.payload) {
                    unlinked_by_key.entry(key).or_default().push(record);
                }
            }
        }
        for candidates in unlinked_by_key.values_mut() {
            candidates.sort_by_key(|record| record.meta.local_id);
        }

        // Remote side first: linked rows settle by version, the rest attach
        // by natural key or get mirrored.
        let mut seen_remote = HashSet::new();
        for remote in &remote_rows {
            if cancel.load(Ordering::SeqCst) {
                return Ok(StageOutcome::Cancelled(self.counts));
            }
            seen_remote.insert(remote.id);
            if let Some(local) = linked_by_remote.get(&remote.id).cloned() {
                self.settle_linked(&local, remote).await?;
            } else {
                self.place_unlinked_remote(remote, &mut unlinked_by_key)
                    .await?;
            }
        }

        // Linked rows whose remote counterpart is gone entirely. select_all
        // includes tombstones, so absence means the row was hard-removed.
        for (remote_id, local) in &linked_by_remote {
            if seen_remote.contains(remote_id) {
                continue;
            }
            if cancel.load(Ordering::SeqCst) {
                return Ok(StageOutcome::Cancelled(self.counts));
            }
            tracing::warn!(
                "Remote {} row {} vanished; severing local link {}",
                self.entity,
                remote_id,
                local.meta.local_id
            );
            self.record_conflict(
                ConflictKind::RemoteMissing,
                Some(local.payload.clone()),
                None,
            )
            .await?;
            self.library
                .detach_remote(self.entity, local.meta.local_id)
                .await?;
            self.severed.insert(local.meta.local_id);
        }

        // Local side: anything still unlinked and live goes up. Re-query so
        // rows linked moments ago (and app writes during the pass) are seen
        // with their current state.
        let mut remote_by_key: HashMap<String, Vec<&RemoteRecord>> = HashMap::new();
        for remote in &remote_rows {
            if remote.is_deleted {
                continue;
            }
            if let Some(key) = (self.adapter.natural_key)(&remote.payload) {
                remote_by_key.entry(key).or_default().push(remote);
            }
        }

        let pending = self.library.unsynced_records(self.entity).await?;
        for local in pending {
            if cancel.load(Ordering::SeqCst) {
                return Ok(StageOutcome::Cancelled(self.counts));
            }
            if self.severed.contains(&local.meta.local_id) {
                continue;
            }
            self.upload_local(&local, &remote_by_key).await?;
        }

        Ok(StageOutcome::Completed(self.counts))
    }

    /// Step 3 of the pass: both sides agree on identity, versions decide.
    async fn settle_linked(&mut self, local: &ReplicaRecord, remote: &RemoteRecord) -> Result<()> {
        match self.strategy.arbitrate(&local.meta, remote.version) {
            SyncAction::Keep => Ok(()),
            SyncAction::Pull => self.adopt(local.meta.local_id, remote).await,
            SyncAction::Push => {
                self.push_update(&local.meta, &local.payload, remote.id, remote.version)
                    .await
            }
        }
    }

    /// A remote row with no linked local: attach by natural key or mirror.
    async fn place_unlinked_remote(
        &mut self,
        remote: &RemoteRecord,
        unlinked_by_key: &mut HashMap<String, Vec<ReplicaRecord>>,
    ) -> Result<()> {
        let key = if remote.is_deleted {
            // Tombstones never capture fresh local records by key.
            None
        } else {
            (self.adapter.natural_key)(&remote.payload)
        };

        if let Some(key) = key {
            if let Some(candidates) = unlinked_by_key.get_mut(&key) {
                if !candidates.is_empty() {
                    if candidates.len() > 1 {
                        tracing::warn!(
                            "{} local records share the natural key of remote {} row {}",
                            candidates.len(),
                            self.entity,
                            remote.id
                        );
                        self.record_conflict(
                            ConflictKind::NaturalKeyAmbiguity,
                            Some(candidates[0].payload.clone()),
                            Some(remote.payload.clone()),
                        )
                        .await?;
                    }
                    // Candidates are sorted, so this is the lowest local id.
                    let local = candidates.remove(0);
                    self.claimed_remotes.insert(remote.id);
                    self.counts.attached += 1;
                    return self.attach_and_settle(&local, remote).await;
                }
            }
        }

        self.mirror(remote).await
    }

    /// Join a never-synced local record to an existing remote row, then
    /// settle the pair like any other link.
    async fn attach_and_settle(
        &mut self,
        local: &ReplicaRecord,
        remote: &RemoteRecord,
    ) -> Result<()> {
        if local.meta.version > remote.version {
            self.library
                .link_remote(self.entity, local.meta.local_id, remote.id)
                .await?;
            let mut meta = local.meta.clone();
            meta.remote_id = Some(remote.id);
            self.push_update(&meta, &local.payload, remote.id, remote.version)
                .await
        } else {
            // Remote is as new or newer; its fields win outright.
            self.adopt(local.meta.local_id, remote).await
        }
    }

    /// Insert a local mirror of a remote-only row.
    async fn mirror(&mut self, remote: &RemoteRecord) -> Result<()> {
        match payload_to_local(self.mapper, self.adapter, &remote.payload) {
            Ok(payload) => {
                self.library
                    .mirror_remote(self.entity, &payload, remote)
                    .await?;
                self.counts.pulled += 1;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    "Skipping remote {} row {}: {}",
                    self.entity,
                    remote.id,
                    error
                );
                self.counts.skipped += 1;
                Ok(())
            }
        }
    }

    /// Overwrite a local record with remote-authoritative state.
    async fn adopt(&mut self, id: LocalId, remote: &RemoteRecord) -> Result<()> {
        match payload_to_local(self.mapper, self.adapter, &remote.payload) {
            Ok(payload) => {
                self.library
                    .adopt_remote(self.entity, id, &payload, remote)
                    .await?;
                self.counts.pulled += 1;
                Ok(())
            }
            Err(error) => {
                tracing::warn!("Skipping pull of {} {}: {}", self.entity, id, error);
                self.counts.skipped += 1;
                Ok(())
            }
        }
    }

    /// Conditional update against the version we fetched. Zero rows matched
    /// means another writer got there first.
    async fn push_update(
        &mut self,
        meta: &SyncMeta,
        payload: &Payload,
        remote_id: RemoteId,
        expected_version: i64,
    ) -> Result<()> {
        let translated = match payload_to_remote(self.mapper, self.adapter, payload) {
            Ok(translated) => translated,
            Err(error) => {
                tracing::warn!(
                    "Skipping push of {} {}: {}",
                    self.entity,
                    meta.local_id,
                    error
                );
                self.counts.skipped += 1;
                return Ok(());
            }
        };
        let update = RemoteUpdate {
            payload: translated,
            is_deleted: meta.is_deleted,
            version: meta.version,
            updated_at: meta.updated_at,
        };

        match self
            .remote
            .update_if_version(self.entity, &self.owner, remote_id, expected_version, update)
            .await
        {
            Ok(UpdateOutcome::Applied) => {
                self.library
                    .mark_pushed(self.entity, meta.local_id, remote_id, meta.version)
                    .await?;
                self.counts.pushed += 1;
                Ok(())
            }
            Ok(UpdateOutcome::VersionMismatch) => self.lost_race(meta, payload, remote_id).await,
            Err(error) => {
                tracing::warn!(
                    "Push of {} {} failed, will retry next pass: {}",
                    self.entity,
                    meta.local_id,
                    error
                );
                self.counts.skipped += 1;
                Ok(())
            }
        }
    }

    /// Another writer won between our fetch and our conditional update.
    /// Record both sides, then converge on whatever the remote holds now.
    async fn lost_race(
        &mut self,
        meta: &SyncMeta,
        payload: &Payload,
        remote_id: RemoteId,
    ) -> Result<()> {
        match self
            .remote
            .select_one(self.entity, &self.owner, remote_id)
            .await
        {
            Ok(Some(current)) => {
                tracing::info!(
                    "Version race on {} {}: remote moved to {}",
                    self.entity,
                    remote_id,
                    current.version
                );
                self.record_conflict(
                    ConflictKind::VersionRace,
                    Some(payload.clone()),
                    Some(current.payload.clone()),
                )
                .await?;
                self.adopt(meta.local_id, &current).await
            }
            Ok(None) => {
                tracing::warn!(
                    "Remote {} row {} vanished mid-push; severing local link {}",
                    self.entity,
                    remote_id,
                    meta.local_id
                );
                self.record_conflict(ConflictKind::RemoteMissing, Some(payload.clone()), None)
                    .await?;
                self.library.detach_remote(self.entity, meta.local_id).await?;
                self.severed.insert(meta.local_id);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    "Could not read back {} {} after a lost race: {}",
                    self.entity,
                    remote_id,
                    error
                );
                self.counts.skipped += 1;
                Ok(())
            }
        }
    }

    /// Step 4 of the pass: a live local record with no remote identity.
    async fn upload_local(
        &mut self,
        local: &ReplicaRecord,
        remote_by_key: &HashMap<String, Vec<&RemoteRecord>>,
    ) -> Result<()> {
        if let Some(key) = (self.adapter.natural_key)(&local.payload) {
            let mut candidates: Vec<&RemoteRecord> = remote_by_key
                .get(&key)
                .map(|rows| {
                    rows.iter()
                        .filter(|remote| !self.claimed_remotes.contains(&remote.id))
                        .copied()
                        .collect()
                })
                .unwrap_or_default();
            if !candidates.is_empty() {
                candidates.sort_by_key(|remote| remote.id);
                if candidates.len() > 1 {
                    tracing::warn!(
                        "{} remote {} rows share the natural key of local record {}",
                        candidates.len(),
                        self.entity,
                        local.meta.local_id
                    );
                    self.record_conflict(
                        ConflictKind::NaturalKeyAmbiguity,
                        Some(local.payload.clone()),
                        Some(candidates[0].payload.clone()),
                    )
                    .await?;
                }
                let remote = candidates[0];
                self.claimed_remotes.insert(remote.id);
                self.counts.attached += 1;
                return self.attach_and_settle(local, remote).await;
            }
        }

        let payload = match payload_to_remote(self.mapper, self.adapter, &local.payload) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(
                    "Skipping upload of {} {}: {}",
                    self.entity,
                    local.meta.local_id,
                    error
                );
                self.counts.skipped += 1;
                return Ok(());
            }
        };
        let record = NewRemoteRecord {
            payload,
            created_at: local.meta.created_at,
            updated_at: local.meta.updated_at,
        };
        match self.remote.insert(self.entity, &self.owner, record).await {
            Ok(stored) => {
                // The store starts fresh rows at version 1; the local copy
                // adopts that token so both sides agree.
                self.library
                    .mark_pushed(self.entity, local.meta.local_id, stored.id, stored.version)
                    .await?;
                self.claimed_remotes.insert(stored.id);
                self.counts.inserted += 1;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    "Upload of {} {} failed, will retry next pass: {}",
                    self.entity,
                    local.meta.local_id,
                    error
                );
                self.counts.skipped += 1;
                Ok(())
            }
        }
    }

    async fn record_conflict(
        &mut self,
        kind: ConflictKind,
        local_payload: Option<Payload>,
        remote_payload: Option<Payload>,
    ) -> Result<()> {
        self.library
            .record_conflict(&NewConflict {
                entity: self.entity,
                kind,
                strategy: self.strategy.name(),
                local_payload,
                remote_payload,
            })
            .await?;
        self.counts.conflicts += 1;
        Ok(())
    }
}
