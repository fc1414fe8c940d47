//! Record shapes shared by every synchronized entity.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{EntityKind, LocalId, RemoteId};

/// Opaque business fields of one record, as stored and transmitted.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// The engine-owned fields every replica row carries.
///
/// Callers never set `version` or the remote link themselves; the replica
/// store bumps the version on every accepted mutation and the engine owns
/// the link fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    pub local_id: LocalId,
    /// `None` until the record has synced at least once.
    pub remote_id: Option<RemoteId>,
    /// Optimistic-concurrency token; starts at 1, +1 per accepted mutation.
    pub version: i64,
    pub is_deleted: bool,
    /// Creation timestamp (Unix ms), informational only.
    pub created_at: i64,
    /// Last mutation timestamp (Unix ms), informational only.
    pub updated_at: i64,
    /// Set after a successful push or pull; diagnostics only.
    pub last_synced_at: Option<i64>,
}

impl SyncMeta {
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// One raw row of the local replica: managed meta plus opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaRecord {
    pub meta: SyncMeta,
    pub payload: Payload,
}

/// One row as the remote authoritative store holds it.
///
/// Foreign keys inside `payload` are in remote ID space until the engine
/// translates them.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    pub id: RemoteId,
    pub version: i64,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub payload: Payload,
}

/// Business-field structs of syncable entities.
///
/// The constant ties the struct to its replica table; `to_payload` is the
/// bridge into the opaque representation the store and engine work with.
pub trait EntityFields: Serialize + DeserializeOwned + Clone {
    const KIND: EntityKind;

    fn to_payload(&self) -> Result<Payload> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(Error::InvalidInput(
                "entity fields must serialize to a JSON object".to_string(),
            )),
        }
    }
}

/// A typed view of one replica row.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    pub meta: SyncMeta,
    pub fields: T,
}

impl<T: EntityFields> Tracked<T> {
    pub fn from_record(record: ReplicaRecord) -> Result<Self> {
        let fields = serde_json::from_value(serde_json::Value::Object(record.payload))?;
        Ok(Self {
            meta: record.meta,
            fields,
        })
    }

    #[must_use]
    pub const fn local_id(&self) -> LocalId {
        self.meta.local_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryFields;
    use pretty_assertions::assert_eq;

    fn meta() -> SyncMeta {
        SyncMeta {
            local_id: LocalId::new(1),
            remote_id: None,
            version: 1,
            is_deleted: false,
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
            last_synced_at: None,
        }
    }

    #[test]
    fn typed_view_roundtrips_through_payload() {
        let fields = CategoryFields::new("Watching");
        let record = ReplicaRecord {
            meta: meta(),
            payload: fields.to_payload().unwrap(),
        };
        let tracked = Tracked::<CategoryFields>::from_record(record).unwrap();
        assert_eq!(tracked.fields, fields);
        assert_eq!(tracked.local_id(), LocalId::new(1));
    }

    #[test]
    fn unlinked_meta_reports_not_linked() {
        let mut m = meta();
        assert!(!m.is_linked());
        m.remote_id = Some(RemoteId::new(9));
        assert!(m.is_linked());
    }

    #[test]
    fn payload_of_fields_keeps_field_names() {
        let payload = CategoryFields::new("Backlog").to_payload().unwrap();
        assert_eq!(payload.get("name").and_then(|v| v.as_str()), Some("Backlog"));
        assert!(payload.contains_key("sort_order"));
    }
}
