//! Sync conflict model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::models::{EntityKind, Payload};

/// Why a conflict row was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// A conditional push matched zero rows; somebody else committed first.
    VersionRace,
    /// More than one candidate shared a natural key during reconciliation.
    NaturalKeyAmbiguity,
    /// The remote row behind a local link no longer exists.
    RemoteMissing,
}

impl ConflictKind {
    pub const ALL: [Self; 3] = [
        Self::VersionRace,
        Self::NaturalKeyAmbiguity,
        Self::RemoteMissing,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VersionRace => "version_race",
            Self::NaturalKeyAmbiguity => "natural_key_ambiguity",
            Self::RemoteMissing => "remote_missing",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown conflict kind: {s}")))
    }
}

/// A recorded conflict, preserved for manual recovery tooling.
///
/// Append-only: the engine writes these and never resolves or expires them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncConflict {
    pub id: i64,
    pub entity: EntityKind,
    pub kind: ConflictKind,
    /// Name of the strategy that arbitrated the pass.
    pub strategy: String,
    /// The discarded or colliding local payload, if any.
    pub local_payload: Option<Payload>,
    /// The remote payload that won or collided, if any.
    pub remote_payload: Option<Payload>,
    pub created_at: i64,
    pub resolved: bool,
}

/// Input for appending one conflict row.
#[derive(Debug, Clone)]
pub struct NewConflict {
    pub entity: EntityKind,
    pub kind: ConflictKind,
    pub strategy: &'static str,
    pub local_payload: Option<Payload>,
    pub remote_payload: Option<Payload>,
}
