//! Entity kinds and their sync ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The entity types the engine synchronizes.
///
/// Variant order is the foreign-key dependency order; `Ord` and the stage
/// table below both rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Folder,
    WatchSource,
    MediaItem,
    MediaList,
    MediaRun,
    EpisodeProgress,
    GameSession,
}

/// Reconciliation stages. Entities inside one stage are independent of each
/// other; every entity only references entities from earlier stages.
pub const SYNC_STAGES: [&[EntityKind]; 5] = [
    &[
        EntityKind::Category,
        EntityKind::Folder,
        EntityKind::WatchSource,
    ],
    &[EntityKind::MediaItem],
    &[EntityKind::MediaList],
    &[EntityKind::MediaRun],
    &[EntityKind::EpisodeProgress, EntityKind::GameSession],
];

impl EntityKind {
    pub const ALL: [Self; 8] = [
        Self::Category,
        Self::Folder,
        Self::WatchSource,
        Self::MediaItem,
        Self::MediaList,
        Self::MediaRun,
        Self::EpisodeProgress,
        Self::GameSession,
    ];

    /// Table name, shared by the local replica schema and the remote store.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Folder => "folders",
            Self::WatchSource => "watch_sources",
            Self::MediaItem => "media_items",
            Self::MediaList => "media_lists",
            Self::MediaRun => "media_runs",
            Self::EpisodeProgress => "episode_progress",
            Self::GameSession => "game_sessions",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Folder => "folder",
            Self::WatchSource => "watch_source",
            Self::MediaItem => "media_item",
            Self::MediaList => "media_list",
            Self::MediaRun => "media_run",
            Self::EpisodeProgress => "episode_progress",
            Self::GameSession => "game_session",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown entity kind: {s}")))
    }
}
