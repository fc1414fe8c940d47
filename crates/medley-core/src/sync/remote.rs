//! The narrow interface to the remote authoritative store.

use thiserror::Error;

use crate::models::{EntityKind, OwnerId, Payload, RemoteId, RemoteRecord};

/// Errors crossing the remote boundary.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Input for a first insert; the store assigns `id` and `version = 1`.
#[derive(Debug, Clone)]
pub struct NewRemoteRecord {
    pub payload: Payload,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for a conditional update. `version` is the value to store, not the
/// expectation; the expectation travels separately.
#[derive(Debug, Clone)]
pub struct RemoteUpdate {
    pub payload: Payload,
    pub is_deleted: bool,
    pub version: i64,
    pub updated_at: i64,
}

/// Result of a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// Zero rows matched: the expected version is stale or the row is gone.
    VersionMismatch,
}

/// Operations the engine needs from the authoritative store.
///
/// Every call is owner-scoped. There is intentionally no delete operation:
/// deletion is a versioned update of `is_deleted` like any other mutation.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Fetch the full collection for one owner, ordered by id ascending.
    ///
    /// Includes soft-deleted rows; tombstones must replicate.
    async fn select_all(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
    ) -> RemoteResult<Vec<RemoteRecord>>;

    /// Fetch one row by id, used to learn the winning state after a lost
    /// race.
    async fn select_one(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        id: RemoteId,
    ) -> RemoteResult<Option<RemoteRecord>>;

    /// Insert a new row; the store assigns the id and starts the version
    /// at 1.
    async fn insert(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        record: NewRemoteRecord,
    ) -> RemoteResult<RemoteRecord>;

    /// Compare-and-swap update: applies only while the stored version still
    /// equals `expected_version`.
    async fn update_if_version(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        id: RemoteId,
        expected_version: i64,
        update: RemoteUpdate,
    ) -> RemoteResult<UpdateOutcome>;
}
