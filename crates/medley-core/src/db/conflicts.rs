//! Conflict log repository implementation

use libsql::Connection;

use crate::error::Result;
use crate::models::{ConflictKind, EntityKind, NewConflict, Payload, SyncConflict};
use crate::util::now_millis;

/// Trait for conflict log operations (async)
///
/// The log is append-only; listing exists for diagnostic tooling and the
/// count feeds status output. Nothing in the engine resolves entries.
#[allow(async_fn_in_trait)]
pub trait ConflictLogRepository {
    /// Append one conflict row, returning its id.
    async fn record(&self, conflict: &NewConflict) -> Result<i64>;

    /// List the most recent conflicts, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<SyncConflict>>;

    /// Count unresolved conflicts.
    async fn unresolved_count(&self) -> Result<i64>;
}

/// libSQL implementation of `ConflictLogRepository`
pub struct LibSqlConflictLogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlConflictLogRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ConflictLogRepository for LibSqlConflictLogRepository<'_> {
    async fn record(&self, conflict: &NewConflict) -> Result<i64> {
        let local_payload = payload_column(conflict.local_payload.as_ref())?;
        let remote_payload = payload_column(conflict.remote_payload.as_ref())?;

        self.conn
            .execute(
                "INSERT INTO sync_conflicts
                     (entity, kind, strategy, local_payload, remote_payload, created_at, resolved)
                 VALUES (?, ?, ?, ?, ?, ?, 0)",
                libsql::params![
                    conflict.entity.as_str(),
                    conflict.kind.as_str(),
                    conflict.strategy,
                    local_payload,
                    remote_payload,
                    now_millis()
                ],
            )
            .await?;
        Ok(self.conn.last_insert_rowid())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, entity, kind, strategy, local_payload, remote_payload,
                        created_at, resolved
                 FROM sync_conflicts
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?",
                [i64::try_from(limit).unwrap_or(i64::MAX)],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            let entity: String = row.get(1)?;
            let kind: String = row.get(2)?;
            conflicts.push(SyncConflict {
                id: row.get(0)?,
                entity: entity.parse::<EntityKind>()?,
                kind: kind.parse::<ConflictKind>()?,
                strategy: row.get(3)?,
                local_payload: read_payload(&row, 4)?,
                remote_payload: read_payload(&row, 5)?,
                created_at: row.get(6)?,
                resolved: row.get::<i64>(7)? != 0,
            });
        }
        Ok(conflicts)
    }

    async fn unresolved_count(&self) -> Result<i64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM sync_conflicts WHERE resolved = 0", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

fn payload_column(payload: Option<&Payload>) -> Result<libsql::Value> {
    match payload {
        Some(map) => Ok(libsql::Value::Text(serde_json::to_string(map)?)),
        None => Ok(libsql::Value::Null),
    }
}

fn read_payload(row: &libsql::Row, idx: i32) -> Result<Option<Payload>> {
    match row.get_value(idx)? {
        libsql::Value::Null => Ok(None),
        libsql::Value::Text(text) => Ok(Some(serde_json::from_str(&text)?)),
        other => Err(crate::error::Error::Database(format!(
            "expected text or null in column {idx}, got {other:?}"
        ))),
    }
}
