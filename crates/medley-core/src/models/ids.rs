//! Identifier newtypes for the two ID spaces and the owner scope.
//!
//! Local and remote identities live in independent spaces and must never be
//! mixed; the newtypes make an accidental cross-space assignment a type
//! error. Only the sync engine's ID mapper translates between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Device-local row identity assigned by the replica store.
///
/// Never transmitted to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalId(i64);

impl LocalId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Remote row identity assigned by the authoritative store on first insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteId(i64);

impl RemoteId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated user's identity; every remote query is scoped by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(Uuid);

impl OwnerId {
    #[must_use]
    pub const fn new(raw: Uuid) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for OwnerId {
    fn from(raw: Uuid) -> Self {
        Self(raw)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OwnerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_id_roundtrips_through_display() {
        let id = LocalId::new(42);
        let parsed: LocalId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn local_id_rejects_garbage() {
        assert!("not-a-number".parse::<LocalId>().is_err());
    }

    #[test]
    fn owner_id_parses_uuid() {
        let owner: OwnerId = "00000000-0000-0000-0000-000000000001".parse().unwrap();
        assert_eq!(owner.to_string(), "00000000-0000-0000-0000-000000000001");
    }

    #[test]
    fn ids_serialize_as_plain_integers() {
        let raw = serde_json::to_string(&LocalId::new(7)).unwrap();
        assert_eq!(raw, "7");
        let raw = serde_json::to_string(&RemoteId::new(9)).unwrap();
        assert_eq!(raw, "9");
    }
}
