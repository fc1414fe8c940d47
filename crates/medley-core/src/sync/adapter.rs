//! Per-entity reconciliation data.
//!
//! One generic reconciliation routine drives every entity kind; what varies
//! per kind is captured here as plain data and pure functions instead of a
//! trait hierarchy: how to compute the natural key, and which payload fields
//! are foreign keys needing ID translation.

use crate::models::{EntityKind, Payload};

/// How a foreign-key field is shaped inside the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyShape {
    /// A single id, possibly null.
    Scalar,
    /// An array of ids.
    IdArray,
}

/// One payload field that references another entity.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub field: &'static str,
    pub target: EntityKind,
    pub shape: ForeignKeyShape,
    /// Required keys abort the record's translation when missing or null.
    pub required: bool,
}

/// Everything the reconciler needs to know about one entity kind.
///
/// `natural_key` operates on local-space payloads; remote payloads must be
/// translated before keying so that id-bearing keys compare correctly.
#[derive(Clone, Copy)]
pub struct EntityAdapter {
    pub kind: EntityKind,
    pub natural_key: fn(&Payload) -> Option<String>,
    pub foreign_keys: &'static [ForeignKey],
}

impl EntityKind {
    #[must_use]
    pub fn adapter(self) -> &'static EntityAdapter {
        match self {
            Self::Category => &CATEGORY,
            Self::Folder => &FOLDER,
            Self::WatchSource => &WATCH_SOURCE,
            Self::MediaItem => &MEDIA_ITEM,
            Self::MediaList => &MEDIA_LIST,
            Self::MediaRun => &MEDIA_RUN,
            Self::EpisodeProgress => &EPISODE_PROGRESS,
            Self::GameSession => &GAME_SESSION,
        }
    }
}

static CATEGORY: EntityAdapter = EntityAdapter {
    kind: EntityKind::Category,
    natural_key: name_key,
    foreign_keys: &[],
};

static FOLDER: EntityAdapter = EntityAdapter {
    kind: EntityKind::Folder,
    natural_key: name_key,
    foreign_keys: &[],
};

static WATCH_SOURCE: EntityAdapter = EntityAdapter {
    kind: EntityKind::WatchSource,
    natural_key: name_key,
    foreign_keys: &[],
};

static MEDIA_ITEM: EntityAdapter = EntityAdapter {
    kind: EntityKind::MediaItem,
    natural_key: media_item_key,
    foreign_keys: &[
        ForeignKey {
            field: "category_id",
            target: EntityKind::Category,
            shape: ForeignKeyShape::Scalar,
            required: false,
        },
        ForeignKey {
            field: "watch_source_id",
            target: EntityKind::WatchSource,
            shape: ForeignKeyShape::Scalar,
            required: false,
        },
    ],
};

static MEDIA_LIST: EntityAdapter = EntityAdapter {
    kind: EntityKind::MediaList,
    natural_key: name_key,
    foreign_keys: &[
        ForeignKey {
            field: "folder_id",
            target: EntityKind::Folder,
            shape: ForeignKeyShape::Scalar,
            required: false,
        },
        ForeignKey {
            field: "media_item_ids",
            target: EntityKind::MediaItem,
            shape: ForeignKeyShape::IdArray,
            required: false,
        },
    ],
};

static MEDIA_RUN: EntityAdapter = EntityAdapter {
    kind: EntityKind::MediaRun,
    natural_key: media_run_key,
    foreign_keys: &[ForeignKey {
        field: "media_item_id",
        target: EntityKind::MediaItem,
        shape: ForeignKeyShape::Scalar,
        required: true,
    }],
};

static EPISODE_PROGRESS: EntityAdapter = EntityAdapter {
    kind: EntityKind::EpisodeProgress,
    natural_key: episode_progress_key,
    foreign_keys: &[ForeignKey {
        field: "run_id",
        target: EntityKind::MediaRun,
        shape: ForeignKeyShape::Scalar,
        required: true,
    }],
};

static GAME_SESSION: EntityAdapter = EntityAdapter {
    kind: EntityKind::GameSession,
    natural_key: game_session_key,
    foreign_keys: &[ForeignKey {
        field: "run_id",
        target: EntityKind::MediaRun,
        shape: ForeignKeyShape::Scalar,
        required: true,
    }],
};

fn text_part(payload: &Payload, field: &str) -> Option<String> {
    let value = payload.get(field)?.as_str()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn int_part(payload: &Payload, field: &str) -> Option<i64> {
    payload.get(field)?.as_i64()
}

fn name_key(payload: &Payload) -> Option<String> {
    text_part(payload, "name")
}

fn media_item_key(payload: &Payload) -> Option<String> {
    let kind = text_part(payload, "kind")?;
    let title = text_part(payload, "title")?;
    Some(format!("{kind}|{title}"))
}

fn media_run_key(payload: &Payload) -> Option<String> {
    let media_item_id = int_part(payload, "media_item_id")?;
    let run_number = int_part(payload, "run_number")?;
    Some(format!("{media_item_id}|{run_number}"))
}

fn episode_progress_key(payload: &Payload) -> Option<String> {
    let run_id = int_part(payload, "run_id")?;
    let episode_number = int_part(payload, "episode_number")?;
    Some(format!("{run_id}|{episode_number}"))
}

fn game_session_key(payload: &Payload) -> Option<String> {
    let run_id = int_part(payload, "run_id")?;
    let started_at = int_part(payload, "started_at")?;
    Some(format!("{run_id}|{started_at}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CategoryFields, EntityFields, LocalId, MediaItemFields, MediaKind, MediaRunFields,
    };

    #[test]
    fn every_kind_has_an_adapter_for_itself() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.adapter().kind, kind);
        }
    }

    #[test]
    fn name_key_trims_and_rejects_empty() {
        let payload = CategoryFields::new("  Watching  ").to_payload().unwrap();
        assert_eq!(name_key(&payload), Some("Watching".to_string()));

        let payload = CategoryFields::new("   ").to_payload().unwrap();
        assert_eq!(name_key(&payload), None);
    }

    #[test]
    fn media_item_key_combines_kind_and_title() {
        let payload = MediaItemFields::new(MediaKind::Anime, "Planetes")
            .to_payload()
            .unwrap();
        assert_eq!(media_item_key(&payload), Some("anime|Planetes".to_string()));
    }

    #[test]
    fn media_run_key_uses_parent_and_run_number() {
        let payload = MediaRunFields::new(LocalId::new(12), 3).to_payload().unwrap();
        assert_eq!(media_run_key(&payload), Some("12|3".to_string()));
    }

    #[test]
    fn run_key_missing_parent_is_unkeyable() {
        let mut payload = MediaRunFields::new(LocalId::new(12), 3).to_payload().unwrap();
        payload.remove("media_item_id");
        assert_eq!(media_run_key(&payload), None);
    }
}
