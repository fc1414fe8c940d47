//! Local replica store: one uniform table per entity kind.
//!
//! Version bumping lives here, not in callers. Application-path writes
//! (`insert`, `update`, `soft_delete`) bump `version` themselves; sync-path
//! writes (`adopt_remote`, `mark_pushed`, ...) set the engine's exact values
//! and never bump.

use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::{
    EntityKind, LocalId, Payload, RemoteId, RemoteRecord, ReplicaRecord, SyncMeta,
};
use crate::util::now_millis;

const RECORD_COLUMNS: &str =
    "local_id, remote_id, version, is_deleted, created_at, updated_at, last_synced_at, payload";

/// Trait for replica row storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ReplicaRepository {
    /// Insert a new record at version 1 with no remote link.
    async fn insert(&self, entity: EntityKind, payload: &Payload) -> Result<ReplicaRecord>;

    /// Replace a record's business fields, bumping its version.
    async fn update(
        &self,
        entity: EntityKind,
        id: LocalId,
        payload: &Payload,
    ) -> Result<ReplicaRecord>;

    /// Mark a record deleted, bumping its version. Idempotent.
    async fn soft_delete(&self, entity: EntityKind, id: LocalId) -> Result<()>;

    /// Fetch one record by local id, deleted or not.
    async fn get(&self, entity: EntityKind, id: LocalId) -> Result<Option<ReplicaRecord>>;

    /// List live records ordered by local id.
    async fn list(&self, entity: EntityKind) -> Result<Vec<ReplicaRecord>>;

    /// List every record including deleted ones, ordered by local id.
    async fn list_all(&self, entity: EntityKind) -> Result<Vec<ReplicaRecord>>;

    /// List live records that have never synced, ordered by local id.
    async fn list_unsynced(&self, entity: EntityKind) -> Result<Vec<ReplicaRecord>>;

    /// Insert a local mirror of a remote row, already in local ID space.
    async fn insert_mirrored(
        &self,
        entity: EntityKind,
        payload: &Payload,
        remote: &RemoteRecord,
    ) -> Result<LocalId>;

    /// Overwrite a record with remote-authoritative state and link it.
    async fn adopt_remote(
        &self,
        entity: EntityKind,
        id: LocalId,
        payload: &Payload,
        remote: &RemoteRecord,
    ) -> Result<()>;

    /// Attach a remote identity without touching fields or version.
    async fn link_remote(
        &self,
        entity: EntityKind,
        id: LocalId,
        remote_id: RemoteId,
    ) -> Result<()>;

    /// Record a successful push: link, confirmed version, sync watermark.
    async fn mark_pushed(
        &self,
        entity: EntityKind,
        id: LocalId,
        remote_id: RemoteId,
        version: i64,
    ) -> Result<()>;

    /// Sever a record's remote link so a later pass re-inserts it.
    async fn detach_remote(&self, entity: EntityKind, id: LocalId) -> Result<()>;
}

/// libSQL implementation of `ReplicaRepository`
pub struct LibSqlReplicaRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlReplicaRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn query_records(&self, sql: &str) -> Result<Vec<ReplicaRecord>> {
        let mut rows = self.conn.query(sql, ()).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(read_record(&row)?);
        }
        Ok(records)
    }
}

impl ReplicaRepository for LibSqlReplicaRepository<'_> {
    async fn insert(&self, entity: EntityKind, payload: &Payload) -> Result<ReplicaRecord> {
        let now = now_millis();
        let payload_json = serde_json::to_string(payload)?;
        let sql = format!(
            "INSERT INTO {} (remote_id, version, is_deleted, created_at, updated_at, last_synced_at, payload)
             VALUES (NULL, 1, 0, ?, ?, NULL, ?)",
            entity.table()
        );
        self.conn
            .execute(&sql, libsql::params![now, now, payload_json])
            .await?;

        Ok(ReplicaRecord {
            meta: SyncMeta {
                local_id: LocalId::new(self.conn.last_insert_rowid()),
                remote_id: None,
                version: 1,
                is_deleted: false,
                created_at: now,
                updated_at: now,
                last_synced_at: None,
            },
            payload: payload.clone(),
        })
    }

    async fn update(
        &self,
        entity: EntityKind,
        id: LocalId,
        payload: &Payload,
    ) -> Result<ReplicaRecord> {
        let now = now_millis();
        let payload_json = serde_json::to_string(payload)?;
        let sql = format!(
            "UPDATE {} SET payload = ?, version = version + 1, updated_at = ? WHERE local_id = ?",
            entity.table()
        );
        let affected = self
            .conn
            .execute(&sql, libsql::params![payload_json, now, id.get()])
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{entity} {id}")));
        }

        self.get(entity, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{entity} {id}")))
    }

    async fn soft_delete(&self, entity: EntityKind, id: LocalId) -> Result<()> {
        let now = now_millis();
        let sql = format!(
            "UPDATE {} SET is_deleted = 1, version = version + 1, updated_at = ?
             WHERE local_id = ? AND is_deleted = 0",
            entity.table()
        );
        let affected = self
            .conn
            .execute(&sql, libsql::params![now, id.get()])
            .await?;
        if affected == 0 && self.get(entity, id).await?.is_none() {
            return Err(Error::NotFound(format!("{entity} {id}")));
        }
        Ok(())
    }

    async fn get(&self, entity: EntityKind, id: LocalId) -> Result<Option<ReplicaRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE local_id = ?",
            entity.table()
        );
        let mut rows = self.conn.query(&sql, [id.get()]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(read_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, entity: EntityKind) -> Result<Vec<ReplicaRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE is_deleted = 0 ORDER BY local_id",
            entity.table()
        );
        self.query_records(&sql).await
    }

    async fn list_all(&self, entity: EntityKind) -> Result<Vec<ReplicaRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} ORDER BY local_id",
            entity.table()
        );
        self.query_records(&sql).await
    }

    async fn list_unsynced(&self, entity: EntityKind) -> Result<Vec<ReplicaRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {}
             WHERE remote_id IS NULL AND is_deleted = 0 ORDER BY local_id",
            entity.table()
        );
        self.query_records(&sql).await
    }

    async fn insert_mirrored(
        &self,
        entity: EntityKind,
        payload: &Payload,
        remote: &RemoteRecord,
    ) -> Result<LocalId> {
        let now = now_millis();
        let payload_json = serde_json::to_string(payload)?;
        let sql = format!(
            "INSERT INTO {} (remote_id, version, is_deleted, created_at, updated_at, last_synced_at, payload)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            entity.table()
        );
        self.conn
            .execute(
                &sql,
                libsql::params![
                    remote.id.get(),
                    remote.version,
                    i64::from(remote.is_deleted),
                    remote.created_at,
                    remote.updated_at,
                    now,
                    payload_json
                ],
            )
            .await?;
        Ok(LocalId::new(self.conn.last_insert_rowid()))
    }

    async fn adopt_remote(
        &self,
        entity: EntityKind,
        id: LocalId,
        payload: &Payload,
        remote: &RemoteRecord,
    ) -> Result<()> {
        let now = now_millis();
        let payload_json = serde_json::to_string(payload)?;
        let sql = format!(
            "UPDATE {} SET remote_id = ?, version = ?, is_deleted = ?, updated_at = ?,
                           last_synced_at = ?, payload = ?
             WHERE local_id = ?",
            entity.table()
        );
        let affected = self
            .conn
            .execute(
                &sql,
                libsql::params![
                    remote.id.get(),
                    remote.version,
                    i64::from(remote.is_deleted),
                    remote.updated_at,
                    now,
                    payload_json,
                    id.get()
                ],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{entity} {id}")));
        }
        Ok(())
    }

    async fn link_remote(
        &self,
        entity: EntityKind,
        id: LocalId,
        remote_id: RemoteId,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET remote_id = ? WHERE local_id = ?",
            entity.table()
        );
        let affected = self
            .conn
            .execute(&sql, [remote_id.get(), id.get()])
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{entity} {id}")));
        }
        Ok(())
    }

    async fn mark_pushed(
        &self,
        entity: EntityKind,
        id: LocalId,
        remote_id: RemoteId,
        version: i64,
    ) -> Result<()> {
        let now = now_millis();
        let sql = format!(
            "UPDATE {} SET remote_id = ?, version = ?, last_synced_at = ? WHERE local_id = ?",
            entity.table()
        );
        let affected = self
            .conn
            .execute(
                &sql,
                libsql::params![remote_id.get(), version, now, id.get()],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{entity} {id}")));
        }
        Ok(())
    }

    async fn detach_remote(&self, entity: EntityKind, id: LocalId) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET remote_id = NULL, last_synced_at = NULL WHERE local_id = ?",
            entity.table()
        );
        let affected = self.conn.execute(&sql, [id.get()]).await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{entity} {id}")));
        }
        Ok(())
    }
}

fn read_record(row: &libsql::Row) -> Result<ReplicaRecord> {
    let payload_json: String = row.get(7)?;
    let payload: Payload = serde_json::from_str(&payload_json)?;

    Ok(ReplicaRecord {
        meta: SyncMeta {
            local_id: LocalId::new(row.get::<i64>(0)?),
            remote_id: opt_i64(row, 1)?.map(RemoteId::new),
            version: row.get(2)?,
            is_deleted: row.get::<i64>(3)? != 0,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            last_synced_at: opt_i64(row, 6)?,
        },
        payload,
    })
}

fn opt_i64(row: &libsql::Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        libsql::Value::Null => Ok(None),
        libsql::Value::Integer(value) => Ok(Some(value)),
        other => Err(Error::Database(format!(
            "expected integer or null in column {idx}, got {other:?}"
        ))),
    }
}
