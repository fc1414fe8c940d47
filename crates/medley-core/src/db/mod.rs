//! Database layer for Medley

mod conflicts;
mod connection;
mod migrations;
mod replica;

pub use conflicts::{ConflictLogRepository, LibSqlConflictLogRepository};
pub use connection::Database;
pub use replica::{LibSqlReplicaRepository, ReplicaRepository};
