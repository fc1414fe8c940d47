//! Media item model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::models::{EntityFields, EntityKind, LocalId};

/// The medium a tracked title belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Anime,
    Manga,
    Game,
    Movie,
}

impl MediaKind {
    pub const ALL: [Self; 4] = [Self::Anime, Self::Manga, Self::Game, Self::Movie];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anime => "anime",
            Self::Manga => "manga",
            Self::Game => "game",
            Self::Movie => "movie",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown media kind: {s}")))
    }
}

/// A tracked title.
///
/// `(kind, title)` is the natural key. Per-medium metadata (episode counts,
/// platforms, ISBNs) rides in `details` as opaque JSON; the engine never
/// inspects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItemFields {
    pub kind: MediaKind,
    pub title: String,
    /// Reference into the categories table, local ID space.
    #[serde(default)]
    pub category_id: Option<LocalId>,
    /// Reference into the watch-sources table, local ID space.
    #[serde(default)]
    pub watch_source_id: Option<LocalId>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl MediaItemFields {
    #[must_use]
    pub fn new(kind: MediaKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            category_id: None,
            watch_source_id: None,
            score: None,
            notes: None,
            details: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub const fn in_category(mut self, category_id: LocalId) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

impl EntityFields for MediaItemFields {
    const KIND: EntityKind = EntityKind::MediaItem;
}
