//! medley-core - Core library for Medley
//!
//! This crate contains the shared models, the local replica store, the
//! offline-first sync engine, and the Supabase auth client used by all
//! Medley interfaces.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{EntityKind, LocalId, OwnerId, RemoteId};
pub use services::LibraryService;
pub use sync::{SyncEngine, SyncOutcome, SyncReport};
