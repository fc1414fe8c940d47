//! Data models for Medley

mod category;
mod conflict;
mod entity;
mod folder;
mod ids;
mod media_item;
mod media_list;
mod media_run;
mod progress;
mod record;
mod watch_source;

pub use category::CategoryFields;
pub use conflict::{ConflictKind, NewConflict, SyncConflict};
pub use entity::{EntityKind, SYNC_STAGES};
pub use folder::FolderFields;
pub use ids::{LocalId, OwnerId, RemoteId};
pub use media_item::{MediaItemFields, MediaKind};
pub use media_list::MediaListFields;
pub use media_run::{MediaRunFields, RunState};
pub use progress::{EpisodeProgressFields, GameSessionFields};
pub use record::{EntityFields, Payload, RemoteRecord, ReplicaRecord, SyncMeta, Tracked};
pub use watch_source::WatchSourceFields;
