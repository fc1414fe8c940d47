//! Media list model

use serde::{Deserialize, Serialize};

use crate::models::{EntityFields, EntityKind, LocalId};

/// An ordered, hand-curated list of media items; natural key is the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaListFields {
    pub name: String,
    /// Reference into the folders table, local ID space.
    #[serde(default)]
    pub folder_id: Option<LocalId>,
    /// Member references into the media-items table, local ID space.
    #[serde(default)]
    pub media_item_ids: Vec<LocalId>,
}

impl MediaListFields {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder_id: None,
            media_item_ids: Vec::new(),
        }
    }
}

impl EntityFields for MediaListFields {
    const KIND: EntityKind = EntityKind::MediaList;
}
