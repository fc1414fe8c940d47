//! Folder model

use serde::{Deserialize, Serialize};

use crate::models::{EntityFields, EntityKind};

/// A grouping for media lists; natural key is the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderFields {
    pub name: String,
    #[serde(default)]
    pub sort_order: i64,
}

impl FolderFields {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort_order: 0,
        }
    }
}

impl EntityFields for FolderFields {
    const KIND: EntityKind = EntityKind::Folder;
}
