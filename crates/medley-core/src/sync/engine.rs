//! Sync orchestration: one pass at a time, entity stages in dependency
//! order, a change notification after every pass that ran.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::models::{EntityKind, OwnerId, SYNC_STAGES};
use crate::services::LibraryService;

use super::id_map::IdMapper;
use super::reconciler::{EntityPass, StageOutcome};
use super::remote::RemoteStore;
use super::strategy::{SyncStrategy, VersionedStrategy};

/// Broadcast to the application after a pass so views re-read the replica.
/// Carries no payload; the replica is the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChanged;

/// Per-entity tallies for one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EntityCounts {
    /// Remote state adopted locally (pulls, mirrors, post-conflict adoptions).
    pub pulled: usize,
    /// Conditional updates that applied.
    pub pushed: usize,
    /// First-time remote inserts.
    pub inserted: usize,
    /// Natural-key links formed.
    pub attached: usize,
    /// Conflict rows written.
    pub conflicts: usize,
    /// Records deferred to the next pass.
    pub skipped: usize,
}

impl EntityCounts {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pulled == 0
            && self.pushed == 0
            && self.inserted == 0
            && self.attached == 0
            && self.conflicts == 0
            && self.skipped == 0
    }
}

impl std::ops::AddAssign for EntityCounts {
    fn add_assign(&mut self, other: Self) {
        self.pulled += other.pulled;
        self.pushed += other.pushed;
        self.inserted += other.inserted;
        self.attached += other.attached;
        self.conflicts += other.conflicts;
        self.skipped += other.skipped;
    }
}

/// How a pass ended. Abort and cancellation keep the progress already made;
/// the next pass picks up from durable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed,
    Cancelled { stopped_at: EntityKind },
    Aborted { entity: EntityKind, reason: String },
    /// Another pass was in flight; this request was dropped, not queued.
    SkippedBusy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub counts: BTreeMap<EntityKind, EntityCounts>,
}

impl SyncReport {
    fn started() -> Self {
        Self {
            outcome: SyncOutcome::Completed,
            counts: BTreeMap::new(),
        }
    }

    const fn skipped_busy() -> Self {
        Self {
            outcome: SyncOutcome::SkippedBusy,
            counts: BTreeMap::new(),
        }
    }

    /// True unless the request was dropped because a pass was in flight.
    #[must_use]
    pub const fn ran(&self) -> bool {
        !matches!(self.outcome, SyncOutcome::SkippedBusy)
    }

    #[must_use]
    pub fn total(&self) -> EntityCounts {
        let mut total = EntityCounts::default();
        for counts in self.counts.values() {
            total += *counts;
        }
        total
    }
}

pub struct SyncEngine<R: RemoteStore> {
    library: LibraryService,
    remote: Arc<R>,
    strategy: Box<dyn SyncStrategy>,
    owner: OwnerId,
    in_flight: AtomicBool,
    cancel: AtomicBool,
    events: broadcast::Sender<DataChanged>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(library: LibraryService, remote: Arc<R>, owner: OwnerId) -> Self {
        Self::with_strategy(library, remote, owner, Box::new(VersionedStrategy))
    }

    pub fn with_strategy(
        library: LibraryService,
        remote: Arc<R>,
        owner: OwnerId,
        strategy: Box<dyn SyncStrategy>,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            library,
            remote,
            strategy,
            owner,
            in_flight: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            events,
        }
    }

    /// Receive a [`DataChanged`] after every pass that ran, complete or not.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DataChanged> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Request a cooperative stop of the in-flight pass. Honored between
    /// records; a no-op when nothing is running.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Run one full pass. Safe to call repeatedly; a call while a pass is
    /// in flight is dropped and reported as such.
    pub async fn run_pass(&self) -> SyncReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Sync pass already in flight; dropping request");
            return SyncReport::skipped_busy();
        }
        let _guard = InFlightGuard {
            flag: &self.in_flight,
        };
        self.cancel.store(false, Ordering::SeqCst);

        tracing::info!("Starting sync pass");
        let mut report = SyncReport::started();
        let mut mapper = IdMapper::new();

        'stages: for stage in SYNC_STAGES {
            for &entity in stage {
                let pass = EntityPass::new(
                    entity,
                    &self.library,
                    self.remote.as_ref(),
                    self.strategy.as_ref(),
                    &mapper,
                    self.owner,
                );
                match pass.run(&self.cancel).await {
                    Ok(StageOutcome::Completed(counts)) => {
                        report.counts.insert(entity, counts);
                        // Dependent stages translate against links formed
                        // moments ago, so the map refreshes here and nowhere
                        // else.
                        match self.library.records_for_sync(entity).await {
                            Ok(records) => mapper.rebuild(entity, &records),
                            Err(error) => {
                                tracing::error!(
                                    "Could not rebuild the {} id map: {}",
                                    entity,
                                    error
                                );
                                report.outcome = SyncOutcome::Aborted {
                                    entity,
                                    reason: error.to_string(),
                                };
                                break 'stages;
                            }
                        }
                    }
                    Ok(StageOutcome::Cancelled(counts)) => {
                        tracing::info!("Sync pass cancelled during {}", entity);
                        report.counts.insert(entity, counts);
                        report.outcome = SyncOutcome::Cancelled { stopped_at: entity };
                        break 'stages;
                    }
                    Err(error) => {
                        tracing::error!("Sync stage {} aborted the pass: {}", entity, error);
                        report.outcome = SyncOutcome::Aborted {
                            entity,
                            reason: error.to_string(),
                        };
                        break 'stages;
                    }
                }
            }
        }

        if matches!(report.outcome, SyncOutcome::Completed) {
            tracing::info!("Sync pass completed");
        }

        // Partial passes still changed durable state.
        let _ = self.events.send(DataChanged);
        report
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
