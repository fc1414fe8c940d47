//! Media run model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{EntityFields, EntityKind, LocalId};

/// Lifecycle of one run through a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Planned,
    Active,
    Paused,
    Completed,
    Dropped,
}

impl RunState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One complete watch/read/play-through of a media item.
///
/// `(media_item_id, run_number)` is the natural key; the run number counts
/// rewatches/replays per title starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRunFields {
    /// Reference into the media-items table, local ID space.
    pub media_item_id: LocalId,
    pub run_number: i64,
    pub state: RunState,
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub finished_at: Option<i64>,
}

impl MediaRunFields {
    #[must_use]
    pub const fn new(media_item_id: LocalId, run_number: i64) -> Self {
        Self {
            media_item_id,
            run_number,
            state: RunState::Active,
            started_at: None,
            finished_at: None,
        }
    }
}

impl EntityFields for MediaRunFields {
    const KIND: EntityKind = EntityKind::MediaRun;
}
