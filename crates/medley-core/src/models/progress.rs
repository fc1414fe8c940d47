//! Granular progress models hanging off a run.

use serde::{Deserialize, Serialize};

use crate::models::{EntityFields, EntityKind, LocalId};

/// One watched episode (or read chapter) within a run.
///
/// `(run_id, episode_number)` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeProgressFields {
    /// Reference into the media-runs table, local ID space.
    pub run_id: LocalId,
    pub episode_number: i64,
    /// When it was watched (Unix ms).
    pub watched_at: i64,
}

impl EntityFields for EpisodeProgressFields {
    const KIND: EntityKind = EntityKind::EpisodeProgress;
}

/// One play session within a game run.
///
/// `(run_id, started_at)` is the natural key; two sessions of the same run
/// cannot start on the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSessionFields {
    /// Reference into the media-runs table, local ID space.
    pub run_id: LocalId,
    /// Session start (Unix ms).
    pub started_at: i64,
    pub minutes: i64,
    #[serde(default)]
    pub note: Option<String>,
}

impl EntityFields for GameSessionFields {
    const KIND: EntityKind = EntityKind::GameSession;
}
