//! Multi-replica scenarios driving the whole engine against a shared
//! in-memory store. Each test plays out one of the situations the engine
//! exists for: first sync, concurrent creation, races, tombstones, partial
//! failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pretty_assertions::{assert_eq, assert_ne};
use tokio::sync::Notify;

use crate::models::{
    CategoryFields, ConflictKind, EntityFields, EntityKind, EpisodeProgressFields, FolderFields,
    GameSessionFields, MediaItemFields, MediaKind, MediaListFields, MediaRunFields, OwnerId,
    RemoteId, RemoteRecord, RunState, WatchSourceFields,
};
use crate::services::LibraryService;

use super::remote::{NewRemoteRecord, RemoteResult, RemoteStore, RemoteUpdate, UpdateOutcome};
use super::{EntityCounts, MemoryRemoteStore, SyncEngine, SyncOutcome, SyncReport};

struct Replica {
    library: LibraryService,
    engine: SyncEngine<MemoryRemoteStore>,
}

async fn replica(remote: &Arc<MemoryRemoteStore>, owner: OwnerId) -> Replica {
    let library = LibraryService::open_in_memory().await.unwrap();
    let engine = SyncEngine::new(library.clone(), Arc::clone(remote), owner);
    Replica { library, engine }
}

fn owner() -> OwnerId {
    OwnerId::new(uuid::Uuid::new_v4())
}

fn entity_counts(report: &SyncReport, entity: EntityKind) -> EntityCounts {
    report.counts.get(&entity).copied().unwrap_or_default()
}

#[tokio::test(flavor = "multi_thread")]
async fn two_replicas_converge_on_a_full_library() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let a = replica(&remote, me).await;
    let b = replica(&remote, me).await;

    // Replica A builds out every entity type, references in local id space.
    let watching = a.library.get_or_create_category("Watching").await.unwrap();
    let seasonal = a
        .library
        .create(&FolderFields::new("Seasonal 2026"))
        .await
        .unwrap();
    let mut source = WatchSourceFields::new("Crunchyroll");
    source.url = Some("https://www.crunchyroll.com".to_string());
    let crunchyroll = a.library.create(&source).await.unwrap();

    let mut anime = MediaItemFields::new(MediaKind::Anime, "Planetes")
        .in_category(watching.local_id());
    anime.watch_source_id = Some(crunchyroll.local_id());
    let planetes = a.library.create(&anime).await.unwrap();
    let outer_wilds = a
        .library
        .create(&MediaItemFields::new(MediaKind::Game, "Outer Wilds"))
        .await
        .unwrap();

    let mut favorites = MediaListFields::new("Favorites");
    favorites.folder_id = Some(seasonal.local_id());
    favorites.media_item_ids = vec![planetes.local_id(), outer_wilds.local_id()];
    a.library.create(&favorites).await.unwrap();

    let anime_run = a
        .library
        .create(&MediaRunFields::new(planetes.local_id(), 1))
        .await
        .unwrap();
    let game_run = a
        .library
        .create(&MediaRunFields::new(outer_wilds.local_id(), 1))
        .await
        .unwrap();
    a.library
        .create(&EpisodeProgressFields {
            run_id: anime_run.local_id(),
            episode_number: 1,
            watched_at: 1_700_000_000_000,
        })
        .await
        .unwrap();
    a.library
        .create(&GameSessionFields {
            run_id: game_run.local_id(),
            started_at: 1_700_000_100_000,
            minutes: 95,
            note: Some("Brittle Hollow".to_string()),
        })
        .await
        .unwrap();

    let first = a.engine.run_pass().await;
    assert_eq!(first.outcome, SyncOutcome::Completed);
    assert_eq!(first.total().inserted, 10);
    assert_eq!(entity_counts(&first, EntityKind::MediaItem).inserted, 2);
    assert_eq!(entity_counts(&first, EntityKind::MediaRun).inserted, 2);

    // Uploaded payloads must reference remote ids, not A's private ones.
    let remote_categories = remote.rows(&me, EntityKind::Category).await;
    let remote_items = remote.rows(&me, EntityKind::MediaItem).await;
    let remote_runs = remote.rows(&me, EntityKind::MediaRun).await;
    let remote_planetes = remote_items
        .iter()
        .find(|row| row.payload.get("title").and_then(|v| v.as_str()) == Some("Planetes"))
        .unwrap();
    assert_eq!(
        remote_planetes.payload.get("category_id").and_then(|v| v.as_i64()),
        Some(remote_categories[0].id.get())
    );
    let remote_anime_run = remote_runs
        .iter()
        .find(|row| {
            row.payload.get("media_item_id").and_then(|v| v.as_i64())
                == Some(remote_planetes.id.get())
        })
        .unwrap();
    let remote_episodes = remote.rows(&me, EntityKind::EpisodeProgress).await;
    assert_eq!(
        remote_episodes[0].payload.get("run_id").and_then(|v| v.as_i64()),
        Some(remote_anime_run.id.get())
    );

    // Replica B pulls everything and rewires references into its own ids.
    let second = b.engine.run_pass().await;
    assert_eq!(second.outcome, SyncOutcome::Completed);
    assert_eq!(second.total().pulled, 10);

    let b_categories = b.library.list::<CategoryFields>().await.unwrap();
    let b_sources = b.library.list::<WatchSourceFields>().await.unwrap();
    let b_folders = b.library.list::<FolderFields>().await.unwrap();
    let b_items = b.library.list::<MediaItemFields>().await.unwrap();
    let b_lists = b.library.list::<MediaListFields>().await.unwrap();
    let b_runs = b.library.list::<MediaRunFields>().await.unwrap();
    assert_eq!(b_categories.len(), 1);
    assert_eq!(b_items.len(), 2);

    let b_planetes = b_items
        .iter()
        .find(|item| item.fields.title == "Planetes")
        .unwrap();
    let b_outer_wilds = b_items
        .iter()
        .find(|item| item.fields.title == "Outer Wilds")
        .unwrap();
    assert_eq!(
        b_planetes.fields.category_id,
        Some(b_categories[0].local_id())
    );
    assert_eq!(
        b_planetes.fields.watch_source_id,
        Some(b_sources[0].local_id())
    );
    assert!(b_planetes.meta.is_linked());
    assert_eq!(b_planetes.meta.version, 1);

    assert_eq!(b_lists[0].fields.folder_id, Some(b_folders[0].local_id()));
    assert_eq!(
        b_lists[0].fields.media_item_ids,
        vec![b_planetes.local_id(), b_outer_wilds.local_id()]
    );

    let b_anime_run = b_runs
        .iter()
        .find(|run| run.fields.media_item_id == b_planetes.local_id())
        .unwrap();
    assert_eq!(b_anime_run.fields.state, RunState::Active);
    let b_episodes = b.library.list::<EpisodeProgressFields>().await.unwrap();
    assert_eq!(b_episodes[0].fields.run_id, b_anime_run.local_id());
    let b_sessions = b.library.list::<GameSessionFields>().await.unwrap();
    assert_eq!(b_sessions[0].fields.minutes, 95);
    assert_eq!(b_sessions[0].fields.note.as_deref(), Some("Brittle Hollow"));

    // Steady state: nothing left to move in either direction.
    assert!(a.engine.run_pass().await.total().is_empty());
    assert!(b.engine.run_pass().await.total().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn independent_creations_share_one_remote_row() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let a = replica(&remote, me).await;
    let b = replica(&remote, me).await;

    // Same category on both devices before either ever syncs; B also tweaks
    // its copy, so B's version is ahead.
    a.library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    let b_cat = b
        .library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    b.library
        .update(
            b_cat.local_id(),
            &CategoryFields::new("Watching").with_sort_order(5),
        )
        .await
        .unwrap();

    remote.set_next_id(42).await;
    a.engine.run_pass().await;

    let report = b.engine.run_pass().await;
    let counts = entity_counts(&report, EntityKind::Category);
    assert_eq!(counts.attached, 1);
    assert_eq!(counts.pushed, 1);
    assert_eq!(counts.inserted, 0, "no duplicate row for the shared key");

    let b_after = b
        .library
        .get::<CategoryFields>(b_cat.local_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(b_after.meta.remote_id, Some(RemoteId::new(42)));
    assert_eq!(b_after.meta.version, 2);

    // B's newer edit won the shared row.
    let rows = remote.rows(&me, EntityKind::Category).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, RemoteId::new(42));
    assert_eq!(rows[0].version, 2);
    assert_eq!(
        rows[0].payload.get("sort_order").and_then(|v| v.as_i64()),
        Some(5)
    );

    // A catches up to B's edit, then everything is settled.
    let report = a.engine.run_pass().await;
    assert_eq!(entity_counts(&report, EntityKind::Category).pulled, 1);
    let a_cats = a.library.list::<CategoryFields>().await.unwrap();
    assert_eq!(a_cats[0].fields.sort_order, 5);
    assert_eq!(a_cats[0].meta.version, 2);

    assert!(a.engine.run_pass().await.total().is_empty());
    assert!(b.engine.run_pass().await.total().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn deletion_replicates_as_a_tombstone() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let a = replica(&remote, me).await;
    let b = replica(&remote, me).await;

    let cat = a
        .library
        .create(&CategoryFields::new("Weekend rewatch"))
        .await
        .unwrap();
    a.engine.run_pass().await;
    b.engine.run_pass().await;
    let b_id = b.library.list::<CategoryFields>().await.unwrap()[0].local_id();

    a.library
        .soft_delete(EntityKind::Category, cat.local_id())
        .await
        .unwrap();
    let report = a.engine.run_pass().await;
    assert_eq!(entity_counts(&report, EntityKind::Category).pushed, 1);

    let rows = remote.rows(&me, EntityKind::Category).await;
    assert!(rows[0].is_deleted);
    assert_eq!(rows[0].version, 2);

    let report = b.engine.run_pass().await;
    assert_eq!(entity_counts(&report, EntityKind::Category).pulled, 1);
    assert!(b.library.list::<CategoryFields>().await.unwrap().is_empty());
    let b_cat = b
        .library
        .get::<CategoryFields>(b_id)
        .await
        .unwrap()
        .unwrap();
    assert!(b_cat.meta.is_deleted);
    assert_eq!(b_cat.meta.version, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn tombstones_do_not_capture_new_records_by_key() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let a = replica(&remote, me).await;

    let cat = a
        .library
        .create(&CategoryFields::new("Weekend"))
        .await
        .unwrap();
    a.engine.run_pass().await;
    a.library
        .soft_delete(EntityKind::Category, cat.local_id())
        .await
        .unwrap();
    a.engine.run_pass().await;

    // A fresh device re-creates the same name while the remote row with that
    // name is a tombstone.
    let b = replica(&remote, me).await;
    b.library
        .create(&CategoryFields::new("Weekend"))
        .await
        .unwrap();
    let report = b.engine.run_pass().await;
    let counts = entity_counts(&report, EntityKind::Category);
    assert_eq!(counts.pulled, 1, "the tombstone still mirrors");
    assert_eq!(counts.inserted, 1, "the live record gets its own row");
    assert_eq!(counts.attached, 0);

    assert_eq!(remote.row_count(&me, EntityKind::Category).await, 2);
    let live = b.library.list::<CategoryFields>().await.unwrap();
    assert_eq!(live.len(), 1);
    assert!(live[0].meta.is_linked());
    assert_ne!(live[0].meta.remote_id, Some(RemoteId::new(1)));
}

#[tokio::test(flavor = "multi_thread")]
async fn deleted_records_that_never_synced_stay_local() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let a = replica(&remote, me).await;

    let cat = a
        .library
        .create(&CategoryFields::new("Mistake"))
        .await
        .unwrap();
    a.library
        .soft_delete(EntityKind::Category, cat.local_id())
        .await
        .unwrap();

    let report = a.engine.run_pass().await;
    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert!(report.total().is_empty());
    assert_eq!(remote.row_count(&me, EntityKind::Category).await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn lost_version_race_is_logged_and_adopted() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let b = replica(&remote, me).await;

    let cat = b
        .library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    b.engine.run_pass().await;
    b.library
        .update(
            cat.local_id(),
            &CategoryFields::new("Watching").with_sort_order(1),
        )
        .await
        .unwrap();
    b.library
        .update(
            cat.local_id(),
            &CategoryFields::new("Watching").with_sort_order(2),
        )
        .await
        .unwrap();
    b.engine.run_pass().await;

    // Both sides now hold version 3. B edits to version 4 while another
    // device commits its own version 4 between B's fetch and B's
    // conditional update.
    let mine = CategoryFields::new("Watching").with_sort_order(9);
    b.library.update(cat.local_id(), &mine).await.unwrap();
    let rival = CategoryFields::new("Watching").with_sort_order(77);
    remote
        .race_after_next_select_all(
            &me,
            EntityKind::Category,
            RemoteId::new(1),
            RemoteUpdate {
                payload: rival.to_payload().unwrap(),
                is_deleted: false,
                version: 4,
                updated_at: 9_000,
            },
        )
        .await;

    let report = b.engine.run_pass().await;
    let counts = entity_counts(&report, EntityKind::Category);
    assert_eq!(counts.conflicts, 1);
    assert_eq!(counts.pulled, 1, "B converges on the winning write");
    assert_eq!(counts.pushed, 0);

    let after = b
        .library
        .get::<CategoryFields>(cat.local_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.fields.sort_order, 77);
    assert_eq!(after.meta.version, 4);

    let conflicts = b.library.list_conflicts(10).await.unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind, ConflictKind::VersionRace);
    assert_eq!(conflicts[0].entity, EntityKind::Category);
    assert_eq!(conflicts[0].strategy, "versioned");
    assert_eq!(conflicts[0].local_payload, Some(mine.to_payload().unwrap()));
    assert_eq!(
        conflicts[0].remote_payload,
        Some(rival.to_payload().unwrap())
    );

    // The winner was never clobbered.
    let rows = remote.rows(&me, EntityKind::Category).await;
    assert_eq!(rows[0].version, 4);
    assert_eq!(
        rows[0].payload.get("sort_order").and_then(|v| v.as_i64()),
        Some(77)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn stage_failure_aborts_but_keeps_earlier_progress() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let a = replica(&remote, me).await;

    let cat = a.library.get_or_create_category("Watching").await.unwrap();
    a.library
        .create(&MediaItemFields::new(MediaKind::Anime, "Planetes").in_category(cat.local_id()))
        .await
        .unwrap();
    remote.fail_next_select_all(EntityKind::MediaItem).await;

    let report = a.engine.run_pass().await;
    assert!(matches!(
        report.outcome,
        SyncOutcome::Aborted {
            entity: EntityKind::MediaItem,
            ..
        }
    ));
    assert_eq!(report.counts.len(), 3, "only the first stage ran to completion");
    assert_eq!(entity_counts(&report, EntityKind::Category).inserted, 1);
    assert_eq!(remote.row_count(&me, EntityKind::Category).await, 1);
    assert_eq!(remote.row_count(&me, EntityKind::MediaItem).await, 0);

    // The next pass starts from the durable progress and finishes the job.
    let retry = a.engine.run_pass().await;
    assert_eq!(retry.outcome, SyncOutcome::Completed);
    assert_eq!(entity_counts(&retry, EntityKind::MediaItem).inserted, 1);

    let categories = remote.rows(&me, EntityKind::Category).await;
    let items = remote.rows(&me, EntityKind::MediaItem).await;
    assert_eq!(
        items[0].payload.get("category_id").and_then(|v| v.as_i64()),
        Some(categories[0].id.get())
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_upload_is_retried_on_the_next_pass() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let a = replica(&remote, me).await;

    a.library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    a.library
        .create(&CategoryFields::new("Backlog"))
        .await
        .unwrap();
    remote.fail_next_insert(EntityKind::Category).await;

    let first = a.engine.run_pass().await;
    assert_eq!(first.outcome, SyncOutcome::Completed);
    let counts = entity_counts(&first, EntityKind::Category);
    assert_eq!(counts.inserted, 1);
    assert_eq!(counts.skipped, 1);
    assert_eq!(remote.row_count(&me, EntityKind::Category).await, 1);

    let second = a.engine.run_pass().await;
    assert_eq!(entity_counts(&second, EntityKind::Category).inserted, 1);
    let names: Vec<_> = remote
        .rows(&me, EntityKind::Category)
        .await
        .into_iter()
        .map(|row| row.payload.get("name").and_then(|v| v.as_str()).unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Backlog".to_string(), "Watching".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn vanished_remote_rows_sever_links_and_reupload_later() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let a = replica(&remote, me).await;

    let cat = a
        .library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    a.engine.run_pass().await;
    let first_id = a
        .library
        .get::<CategoryFields>(cat.local_id())
        .await
        .unwrap()
        .unwrap()
        .meta
        .remote_id
        .unwrap();

    remote.remove_row(&me, EntityKind::Category, first_id).await;

    let severed = a.engine.run_pass().await;
    let counts = entity_counts(&severed, EntityKind::Category);
    assert_eq!(counts.conflicts, 1);
    assert_eq!(counts.inserted, 0, "re-upload waits for the next pass");
    let detached = a
        .library
        .get::<CategoryFields>(cat.local_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detached.meta.remote_id, None);
    let conflicts = a.library.list_conflicts(10).await.unwrap();
    assert_eq!(conflicts[0].kind, ConflictKind::RemoteMissing);

    let reupload = a.engine.run_pass().await;
    assert_eq!(entity_counts(&reupload, EntityKind::Category).inserted, 1);
    let relinked = a
        .library
        .get::<CategoryFields>(cat.local_id())
        .await
        .unwrap()
        .unwrap();
    assert!(relinked.meta.is_linked());
    assert_ne!(relinked.meta.remote_id, Some(first_id));
    assert_eq!(remote.row_count(&me, EntityKind::Category).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicated_natural_keys_attach_the_lowest_id_and_log() {
    let me = owner();
    let remote = Arc::new(MemoryRemoteStore::new());
    let a = replica(&remote, me).await;
    let b = replica(&remote, me).await;

    b.library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    b.engine.run_pass().await;

    // Two local records contend for the one remote row with their key.
    let first = a
        .library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    let second = a
        .library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();

    let report = a.engine.run_pass().await;
    let counts = entity_counts(&report, EntityKind::Category);
    assert_eq!(counts.attached, 1);
    assert_eq!(counts.conflicts, 1);
    assert_eq!(counts.inserted, 1);

    let lower = a
        .library
        .get::<CategoryFields>(first.local_id())
        .await
        .unwrap()
        .unwrap();
    let higher = a
        .library
        .get::<CategoryFields>(second.local_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lower.meta.remote_id, Some(RemoteId::new(1)));
    assert!(higher.meta.is_linked());
    assert_ne!(higher.meta.remote_id, lower.meta.remote_id);
    assert_eq!(remote.row_count(&me, EntityKind::Category).await, 2);
    let conflicts = a.library.list_conflicts(10).await.unwrap();
    assert_eq!(conflicts[0].kind, ConflictKind::NaturalKeyAmbiguity);
}

#[tokio::test(flavor = "multi_thread")]
async fn owners_never_see_each_others_rows() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let alice = owner();
    let bob = owner();
    let a = replica(&remote, alice).await;
    let b = replica(&remote, bob).await;

    a.library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    a.engine.run_pass().await;

    let report = b.engine.run_pass().await;
    assert!(report.total().is_empty());
    assert!(b.library.list::<CategoryFields>().await.unwrap().is_empty());

    b.library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    b.engine.run_pass().await;
    assert_eq!(remote.row_count(&alice, EntityKind::Category).await, 1);
    assert_eq!(remote.row_count(&bob, EntityKind::Category).await, 1);
}

/// Store wrapper whose first `select_all` parks until the test opens the
/// gate, pinning the engine mid-pass at a known point.
struct GatedStore {
    inner: MemoryRemoteStore,
    closed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: MemoryRemoteStore::new(),
            closed: AtomicBool::new(true),
            reached: Notify::new(),
            release: Notify::new(),
        }
    }

    async fn wait_for_fetch(&self) {
        self.reached.notified().await;
    }

    fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }
}

impl RemoteStore for GatedStore {
    async fn select_all(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
    ) -> RemoteResult<Vec<RemoteRecord>> {
        if self.closed.load(Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        self.inner.select_all(entity, owner).await
    }

    async fn select_one(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        id: RemoteId,
    ) -> RemoteResult<Option<RemoteRecord>> {
        self.inner.select_one(entity, owner, id).await
    }

    async fn insert(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        record: NewRemoteRecord,
    ) -> RemoteResult<RemoteRecord> {
        self.inner.insert(entity, owner, record).await
    }

    async fn update_if_version(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        id: RemoteId,
        expected_version: i64,
        update: RemoteUpdate,
    ) -> RemoteResult<UpdateOutcome> {
        self.inner
            .update_if_version(entity, owner, id, expected_version, update)
            .await
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn overlapping_pass_requests_are_dropped() {
    let me = owner();
    let remote = Arc::new(GatedStore::new());
    let library = LibraryService::open_in_memory().await.unwrap();
    let engine = Arc::new(SyncEngine::new(library, Arc::clone(&remote), me));

    let background = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run_pass().await })
    };
    remote.wait_for_fetch().await;
    assert!(engine.is_syncing());

    let busy = engine.run_pass().await;
    assert_eq!(busy.outcome, SyncOutcome::SkippedBusy);
    assert!(!busy.ran());

    remote.open();
    let report = background.await.unwrap();
    assert_eq!(report.outcome, SyncOutcome::Completed);
    assert!(!engine.is_syncing());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_stops_the_pass_and_later_passes_resume() {
    let me = owner();
    let remote = Arc::new(GatedStore::new());
    let library = LibraryService::open_in_memory().await.unwrap();
    library
        .create(&CategoryFields::new("Watching"))
        .await
        .unwrap();
    let engine = Arc::new(SyncEngine::new(library, Arc::clone(&remote), me));
    let mut events = engine.subscribe();

    let background = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run_pass().await })
    };
    remote.wait_for_fetch().await;
    engine.cancel();
    remote.open();

    let report = background.await.unwrap();
    assert_eq!(
        report.outcome,
        SyncOutcome::Cancelled {
            stopped_at: EntityKind::Category
        }
    );
    assert_eq!(remote.inner.row_count(&me, EntityKind::Category).await, 0);
    assert!(events.recv().await.is_ok(), "partial passes still notify");

    let resumed = engine.run_pass().await;
    assert_eq!(resumed.outcome, SyncOutcome::Completed);
    assert_eq!(entity_counts(&resumed, EntityKind::Category).inserted, 1);
    assert_eq!(remote.inner.row_count(&me, EntityKind::Category).await, 1);
}
