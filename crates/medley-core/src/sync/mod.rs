//! Offline-first synchronization between the local replica and the remote
//! authoritative store.
//!
//! One [`SyncEngine::run_pass`] reconciles every entity type in dependency
//! order. Versions are the only concurrency tokens; timestamps are never
//! compared. Conflicts the engine cannot settle automatically end up in the
//! conflict log rather than being merged or silently dropped.

pub mod adapter;
pub mod engine;
pub mod http;
pub mod id_map;
pub mod memory;
mod reconciler;
pub mod remote;
pub mod strategy;

#[cfg(test)]
mod tests;

pub use adapter::{EntityAdapter, ForeignKey, ForeignKeyShape};
pub use engine::{DataChanged, EntityCounts, SyncEngine, SyncOutcome, SyncReport};
pub use http::SupabaseRestStore;
pub use id_map::{payload_to_local, payload_to_remote, IdMapper, IdResolver, TranslateError};
pub use memory::MemoryRemoteStore;
pub use remote::{
    NewRemoteRecord, RemoteError, RemoteResult, RemoteStore, RemoteUpdate, UpdateOutcome,
};
pub use strategy::{SyncAction, SyncStrategy, VersionedStrategy};
