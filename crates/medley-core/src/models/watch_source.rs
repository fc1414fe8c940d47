//! Watch source model

use serde::{Deserialize, Serialize};

use crate::models::{EntityFields, EntityKind};

/// Where a media item is consumed (a streaming service, a store, a shelf).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSourceFields {
    pub name: String,
    /// Optional landing page.
    #[serde(default)]
    pub url: Option<String>,
}

impl WatchSourceFields {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }
}

impl EntityFields for WatchSourceFields {
    const KIND: EntityKind = EntityKind::WatchSource;
}
