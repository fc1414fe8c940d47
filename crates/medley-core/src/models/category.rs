//! Category model

use serde::{Deserialize, Serialize};

use crate::models::{EntityFields, EntityKind};

/// A user-defined shelf for media items ("Watching", "Backlog", ...).
///
/// The name doubles as the natural key when two replicas created the same
/// category independently before ever syncing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFields {
    pub name: String,
    #[serde(default)]
    pub sort_order: i64,
}

impl CategoryFields {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort_order: 0,
        }
    }

    #[must_use]
    pub const fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }
}

impl EntityFields for CategoryFields {
    const KIND: EntityKind = EntityKind::Category;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_sort_order() {
        let fields = CategoryFields::new("Watching").with_sort_order(3);
        assert_eq!(fields.name, "Watching");
        assert_eq!(fields.sort_order, 3);
    }
}
