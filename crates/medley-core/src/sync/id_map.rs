//! Bidirectional local/remote ID maps and foreign-key translation.
//!
//! Maps are rebuilt per entity per pass by scanning linked replica rows;
//! linear scans are fine at personal-library scale. The resolver trait keeps
//! the reconciler independent of how the maps are built, so an index-backed
//! variant can replace the scan without touching the reconciliation code.

use std::collections::HashMap;

use thiserror::Error;

use crate::models::{EntityKind, LocalId, Payload, RemoteId, ReplicaRecord};

use super::adapter::{EntityAdapter, ForeignKey, ForeignKeyShape};

/// Resolves ids across the two spaces for foreign-key translation.
pub trait IdResolver {
    fn to_remote(&self, entity: EntityKind, id: LocalId) -> Option<RemoteId>;
    fn to_local(&self, entity: EntityKind, id: RemoteId) -> Option<LocalId>;
}

/// Scan-built resolver covering all entity kinds.
#[derive(Debug, Default)]
pub struct IdMapper {
    forward: HashMap<(EntityKind, LocalId), RemoteId>,
    backward: HashMap<(EntityKind, RemoteId), LocalId>,
}

impl IdMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace one entity's links with the current state of its replica
    /// rows. Called after each reconciliation stage so dependent stages see
    /// links created moments ago.
    pub fn rebuild(&mut self, entity: EntityKind, records: &[ReplicaRecord]) {
        self.forward.retain(|(kind, _), _| *kind != entity);
        self.backward.retain(|(kind, _), _| *kind != entity);
        for record in records {
            if let Some(remote_id) = record.meta.remote_id {
                self.forward.insert((entity, record.meta.local_id), remote_id);
                self.backward.insert((entity, remote_id), record.meta.local_id);
            }
        }
    }
}

impl IdResolver for IdMapper {
    fn to_remote(&self, entity: EntityKind, id: LocalId) -> Option<RemoteId> {
        self.forward.get(&(entity, id)).copied()
    }

    fn to_local(&self, entity: EntityKind, id: RemoteId) -> Option<LocalId> {
        self.backward.get(&(entity, id)).copied()
    }
}

/// Why one record's payload could not cross the ID boundary.
///
/// Translation failures are per-record events: the reconciler skips the
/// record and retries on a later pass once the missing link exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("required field `{field}` is missing or null")]
    MissingField { field: &'static str },
    #[error("field `{field}` references {target} {id}, which has no {space} mapping")]
    Unmapped {
        field: &'static str,
        target: EntityKind,
        id: i64,
        space: &'static str,
    },
    #[error("field `{field}` is not an id or id array")]
    Malformed { field: &'static str },
}

#[derive(Clone, Copy)]
enum Direction {
    ToRemote,
    ToLocal,
}

impl Direction {
    const fn missing_space(self) -> &'static str {
        match self {
            Self::ToRemote => "remote",
            Self::ToLocal => "local",
        }
    }
}

/// Translate every foreign-key field from local to remote ID space.
pub fn payload_to_remote(
    resolver: &dyn IdResolver,
    adapter: &EntityAdapter,
    payload: &Payload,
) -> Result<Payload, TranslateError> {
    translate(resolver, adapter, payload, Direction::ToRemote)
}

/// Translate every foreign-key field from remote to local ID space.
pub fn payload_to_local(
    resolver: &dyn IdResolver,
    adapter: &EntityAdapter,
    payload: &Payload,
) -> Result<Payload, TranslateError> {
    translate(resolver, adapter, payload, Direction::ToLocal)
}

fn translate(
    resolver: &dyn IdResolver,
    adapter: &EntityAdapter,
    payload: &Payload,
    direction: Direction,
) -> Result<Payload, TranslateError> {
    let mut out = payload.clone();
    for fk in adapter.foreign_keys {
        let current = match out.get(fk.field) {
            None | Some(serde_json::Value::Null) => {
                if fk.required {
                    return Err(TranslateError::MissingField { field: fk.field });
                }
                continue;
            }
            Some(value) => value.clone(),
        };

        let translated = match fk.shape {
            ForeignKeyShape::Scalar => map_id(resolver, fk, direction, &current)?,
            ForeignKeyShape::IdArray => match current {
                serde_json::Value::Array(items) => serde_json::Value::Array(
                    items
                        .iter()
                        .map(|item| map_id(resolver, fk, direction, item))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                _ => return Err(TranslateError::Malformed { field: fk.field }),
            },
        };
        out.insert(fk.field.to_string(), translated);
    }
    Ok(out)
}

fn map_id(
    resolver: &dyn IdResolver,
    fk: &ForeignKey,
    direction: Direction,
    raw: &serde_json::Value,
) -> Result<serde_json::Value, TranslateError> {
    let id = raw
        .as_i64()
        .ok_or(TranslateError::Malformed { field: fk.field })?;
    let mapped = match direction {
        Direction::ToRemote => resolver
            .to_remote(fk.target, LocalId::new(id))
            .map(RemoteId::get),
        Direction::ToLocal => resolver
            .to_local(fk.target, RemoteId::new(id))
            .map(LocalId::get),
    };
    let mapped = mapped.ok_or(TranslateError::Unmapped {
        field: fk.field,
        target: fk.target,
        id,
        space: direction.missing_space(),
    })?;
    Ok(serde_json::Value::from(mapped))
}
