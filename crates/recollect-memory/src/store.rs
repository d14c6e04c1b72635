// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed memory store with an FTS5 mirror for BM25 retrieval.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use recollect_core::{
    AdapterType, HealthStatus, MemoryId, MemoryRecord, MemoryStoreAdapter, PluginAdapter,
    RecollectError, UserId,
};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::hashing::normalize;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memory_records (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    semantic_hash TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memory_records_hash ON memory_records(user_id, semantic_hash);
CREATE INDEX IF NOT EXISTS idx_memory_records_created ON memory_records(user_id, created_at);

CREATE VIRTUAL TABLE IF NOT EXISTS memory_records_fts USING fts5(
    content,
    content='memory_records',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS memory_records_ai AFTER INSERT ON memory_records BEGIN
    INSERT INTO memory_records_fts(rowid, content) VALUES (new.rowid, new.content);
END;

CREATE TRIGGER IF NOT EXISTS memory_records_ad AFTER DELETE ON memory_records BEGIN
    INSERT INTO memory_records_fts(memory_records_fts, rowid, content)
        VALUES('delete', old.rowid, old.content);
END;

CREATE TRIGGER IF NOT EXISTS memory_records_au AFTER UPDATE OF content ON memory_records BEGIN
    INSERT INTO memory_records_fts(memory_records_fts, rowid, content)
        VALUES('delete', old.rowid, old.content);
    INSERT INTO memory_records_fts(rowid, content) VALUES (new.rowid, new.content);
END;
";

const RECORD_COLUMNS: &str =
    "id, user_id, content, semantic_hash, is_active, created_at, updated_at";

fn storage_err(e: tokio_rusqlite::Error) -> RecollectError {
    RecollectError::Storage {
        source: Box::new(e),
    }
}

fn to_db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_db_time(idx: usize, value: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_record(row: &rusqlite::Row) -> Result<MemoryRecord, rusqlite::Error> {
    Ok(MemoryRecord {
        id: MemoryId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        content: row.get(2)?,
        semantic_hash: row.get(3)?,
        is_active: row.get(4)?,
        created_at: from_db_time(5, row.get(5)?)?,
        updated_at: from_db_time(6, row.get(6)?)?,
    })
}

/// Combine `existing` with `additional`, skipping text already contained.
pub fn merged_content(existing: &str, additional: &str) -> String {
    if normalize(existing).contains(&normalize(additional)) {
        existing.to_string()
    } else {
        format!("{existing}; {additional}")
    }
}

/// FTS5 query matching any word of `message`.
///
/// Tokens are reduced to alphanumerics and quoted, so user text can never
/// inject FTS operators. Returns `None` when nothing searchable remains.
pub fn fts_query(message: &str) -> Option<String> {
    let normalized = normalize(message);
    let mut seen = HashSet::new();
    let tokens: Vec<String> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1 && seen.insert(*t))
        .map(|t| format!("\"{t}\""))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" OR "))
    }
}

/// Persistent memory store in SQLite.
///
/// Records are soft-deleted only. An FTS5 external-content table mirrors
/// `content` through triggers and backs [`MemoryStoreAdapter::contextual_retrieve`].
pub struct SqliteMemoryStore {
    conn: Connection,
}

impl SqliteMemoryStore {
    /// Open (or create) the database at `path` and initialize the schema.
    pub async fn open(path: impl AsRef<Path>, wal_mode: bool) -> Result<Self, RecollectError> {
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(RecollectError::storage)?;
        if wal_mode {
            conn.call(|conn| -> Result<(), rusqlite::Error> {
                conn.pragma_update(None, "journal_mode", "WAL")?;
                Ok(())
            })
            .await
            .map_err(storage_err)?;
        }
        Self::new(conn).await
    }

    pub async fn open_in_memory() -> Result<Self, RecollectError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(RecollectError::storage)?;
        Self::new(conn).await
    }

    /// Wrap an existing connection, creating the schema if missing.
    pub async fn new(conn: Connection) -> Result<Self, RecollectError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(storage_err)?;
        debug!("memory store schema ready");
        Ok(Self { conn })
    }

    pub async fn get_by_id(&self, id: &MemoryId) -> Result<Option<MemoryRecord>, RecollectError> {
        let id = id.0.clone();
        self.conn
            .call(move |conn| -> Result<_, rusqlite::Error> {
                let sql = format!("SELECT {RECORD_COLUMNS} FROM memory_records WHERE id = ?1");
                conn.query_row(&sql, rusqlite::params![id], row_to_record)
                    .optional()
            })
            .await
            .map_err(storage_err)
    }

    /// Soft-delete a record. Returns whether an active record was deactivated.
    pub async fn deactivate(&self, id: &MemoryId) -> Result<bool, RecollectError> {
        let id = id.0.clone();
        let now = to_db_time(Utc::now());
        self.conn
            .call(move |conn| -> Result<_, rusqlite::Error> {
                let changed = conn.execute(
                    "UPDATE memory_records SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
                    rusqlite::params![now, id],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(storage_err)
    }

    pub async fn count_active(&self, user: &UserId) -> Result<usize, RecollectError> {
        let user = user.0.clone();
        self.conn
            .call(move |conn| -> Result<_, rusqlite::Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM memory_records WHERE user_id = ?1 AND is_active = 1",
                    rusqlite::params![user],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            })
            .await
            .map_err(storage_err)
    }

    async fn set_content(
        &self,
        id: &MemoryId,
        compute: impl FnOnce(&str) -> String + Send + 'static,
    ) -> Result<(), RecollectError> {
        let id = id.0.clone();
        let now = to_db_time(Utc::now());
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                let existing: String = tx.query_row(
                    "SELECT content FROM memory_records WHERE id = ?1",
                    rusqlite::params![id],
                    |row| row.get(0),
                )?;
                let content = compute(&existing);
                tx.execute(
                    "UPDATE memory_records SET content = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![content, now, id],
                )?;
                tx.commit()
            })
            .await
            .map_err(storage_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteMemoryStore {
    fn name(&self) -> &str {
        "sqlite-memory-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(semver::Version::new(0, 1, 0))
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::MemoryStore
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        let ping = self
            .conn
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await;
        Ok(match ping {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    /// Lets SQLite refresh query planner statistics before the process exits.
    async fn shutdown(&self) -> Result<(), RecollectError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("PRAGMA optimize;") })
            .await
            .map_err(storage_err)?;
        debug!("memory store shut down");
        Ok(())
    }
}

#[async_trait]
impl MemoryStoreAdapter for SqliteMemoryStore {
    async fn find_by_semantic_hash(
        &self,
        user: &UserId,
        semantic_hash: &str,
    ) -> Result<Option<MemoryRecord>, RecollectError> {
        let user = user.0.clone();
        let hash = semantic_hash.to_string();
        self.conn
            .call(move |conn| -> Result<_, rusqlite::Error> {
                let sql = format!(
                    "SELECT {RECORD_COLUMNS} FROM memory_records \
                     WHERE user_id = ?1 AND semantic_hash = ?2 AND is_active = 1 \
                     ORDER BY created_at DESC LIMIT 1"
                );
                conn.query_row(&sql, rusqlite::params![user, hash], row_to_record)
                    .optional()
            })
            .await
            .map_err(storage_err)
    }

    async fn find_recent(
        &self,
        user: &UserId,
        hours_window: u32,
    ) -> Result<Vec<MemoryRecord>, RecollectError> {
        let user = user.0.clone();
        let cutoff = to_db_time(Utc::now() - chrono::Duration::hours(i64::from(hours_window)));
        self.conn
            .call(move |conn| -> Result<_, rusqlite::Error> {
                let sql = format!(
                    "SELECT {RECORD_COLUMNS} FROM memory_records \
                     WHERE user_id = ?1 AND is_active = 1 AND created_at >= ?2 \
                     ORDER BY created_at DESC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map(rusqlite::params![user, cutoff], row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(storage_err)
    }

    async fn create(
        &self,
        user: &UserId,
        content: &str,
        semantic_hash: &str,
    ) -> Result<MemoryRecord, RecollectError> {
        let now = Utc::now();
        let record = MemoryRecord {
            id: MemoryId::generate(),
            user_id: user.clone(),
            content: content.to_string(),
            semantic_hash: semantic_hash.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let row = record.clone();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let stamp = to_db_time(row.created_at);
                conn.execute(
                    "INSERT INTO memory_records (id, user_id, content, semantic_hash, is_active, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                    rusqlite::params![row.id.0, row.user_id.0, row.content, row.semantic_hash, stamp],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)?;
        Ok(record)
    }

    async fn update(&self, id: &MemoryId, new_content: &str) -> Result<(), RecollectError> {
        let new_content = new_content.to_string();
        self.set_content(id, move |_| new_content).await
    }

    async fn merge(&self, id: &MemoryId, additional_content: &str) -> Result<(), RecollectError> {
        let additional = additional_content.to_string();
        self.set_content(id, move |existing| merged_content(existing, &additional))
            .await
    }

    async fn contextual_retrieve(
        &self,
        user: &UserId,
        message: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, RecollectError> {
        let Some(query) = fts_query(message) else {
            return Ok(vec![]);
        };
        let user = user.0.clone();
        self.conn
            .call(move |conn| -> Result<_, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT m.id, m.user_id, m.content, m.semantic_hash, m.is_active, m.created_at, m.updated_at \
                     FROM memory_records_fts f JOIN memory_records m ON m.rowid = f.rowid \
                     WHERE memory_records_fts MATCH ?1 AND m.user_id = ?2 AND m.is_active = 1 \
                     ORDER BY bm25(memory_records_fts) LIMIT ?3",
                )?;
                let records = stmt
                    .query_map(rusqlite::params![query, user, limit as i64], row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(storage_err)
    }
}
