// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — one immutable record per edit operation.
//
// SQLite schema:
//   audit_records(
//     operation_id      TEXT    PRIMARY KEY,   -- UUID v4
//     started_at        TEXT    NOT NULL,      -- RFC 3339
//     finished_at       TEXT    NOT NULL,      -- RFC 3339
//     input_hash        TEXT    NOT NULL,      -- SHA-256 hex digest
//     output_hash       TEXT,                  -- SHA-256 hex digest
//     adopted_engine    TEXT,                  -- "redact-reinsert" | "stream-rewrite"
//     final_success     INTEGER NOT NULL,      -- 0 / 1
//     any_font_fallback INTEGER NOT NULL,      -- 0 / 1
//     record            TEXT    NOT NULL       -- full JSON document
//   )

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rusqlite::{Connection, params};
use tracing::{debug, info, instrument};
use typekeep_core::AuditRecord;
use typekeep_core::error::TypekeepError;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS audit_records (
    operation_id      TEXT    PRIMARY KEY,
    started_at        TEXT    NOT NULL,
    finished_at       TEXT    NOT NULL,
    input_hash        TEXT    NOT NULL,
    output_hash       TEXT,
    adopted_engine    TEXT,
    final_success     INTEGER NOT NULL,
    any_font_fallback INTEGER NOT NULL,
    record            TEXT    NOT NULL
);";

// ---------------------------------------------------------------------------
// Local error helpers
// ---------------------------------------------------------------------------

/// Convert a `rusqlite::Error` into a `TypekeepError::Audit`.
fn db_err(e: rusqlite::Error) -> TypekeepError {
    TypekeepError::Audit(e.to_string())
}

// ---------------------------------------------------------------------------
// Sink abstraction
// ---------------------------------------------------------------------------

/// Destination for audit records, injected into the engine manager.
pub trait AuditSink {
    /// Persist one finished operation. Called exactly once per operation.
    fn persist(&mut self, record: &AuditRecord) -> Result<(), TypekeepError>;
}

/// Discards every record (audit disabled).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn persist(&mut self, _record: &AuditRecord) -> Result<(), TypekeepError> {
        Ok(())
    }
}

/// Keeps records in memory. Clones share the same buffer, so a test can keep
/// one handle and give the other to the manager.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditSink {
    records: Rc<RefCell<Vec<AuditRecord>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record persisted so far, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn persist(&mut self, record: &AuditRecord) -> Result<(), TypekeepError> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

/// Writes each record as `<operation_id>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    /// Use `dir` for records, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TypekeepError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a record with this id is (or would be) written to.
    pub fn record_path(&self, operation_id: &uuid::Uuid) -> PathBuf {
        self.dir.join(format!("{operation_id}.json"))
    }

    /// Read a previously written record back.
    pub fn load(path: impl AsRef<Path>) -> Result<AuditRecord, TypekeepError> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl AuditSink for JsonFileSink {
    #[instrument(skip_all, fields(operation_id = %record.operation_id))]
    fn persist(&mut self, record: &AuditRecord) -> Result<(), TypekeepError> {
        let path = self.record_path(&record.operation_id);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        info!(path = %path.display(), "audit record written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SQLite-backed log
// ---------------------------------------------------------------------------

/// Append-only audit log backed by a SQLite database.
///
/// The searchable columns are denormalised from the record; the full record
/// is kept as JSON so nothing is lost.
pub struct SqliteAuditLog {
    conn: Connection,
}

impl SqliteAuditLog {
    /// Open (or create) the audit database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TypekeepError> {
        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, TypekeepError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Every record whose input had this SHA-256 digest, oldest first.
    pub fn records_for_input(&self, input_hash: &str) -> Result<Vec<AuditRecord>, TypekeepError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT record FROM audit_records
                 WHERE input_hash = ?1
                 ORDER BY started_at ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![input_hash], |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let json = row.map_err(db_err)?;
            records.push(serde_json::from_str(&json)?);
        }
        Ok(records)
    }

    /// The most recent `limit` records, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, TypekeepError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT record FROM audit_records
                 ORDER BY finished_at DESC, rowid DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let json = row.map_err(db_err)?;
            records.push(serde_json::from_str(&json)?);
        }
        Ok(records)
    }

    /// Number of operations whose adopted attempt still showed a font fallback.
    pub fn fallback_count(&self) -> Result<u64, TypekeepError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM audit_records WHERE any_font_fallback = 1",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    /// Return the total number of records.
    pub fn count(&self) -> Result<u64, TypekeepError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_records", [], |row| row.get(0))
            .map_err(db_err)
    }
}

impl AuditSink for SqliteAuditLog {
    #[instrument(
        skip_all,
        fields(operation_id = %record.operation_id, success = record.final_success)
    )]
    fn persist(&mut self, record: &AuditRecord) -> Result<(), TypekeepError> {
        let json = serde_json::to_string(record)?;
        let adopted = record.adopted_engine.map(|e| e.as_str().to_string());

        self.conn
            .execute(
                "INSERT INTO audit_records (
                    operation_id, started_at, finished_at, input_hash, output_hash,
                    adopted_engine, final_success, any_font_fallback, record
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.operation_id.to_string(),
                    record.started_at.to_rfc3339(),
                    record.finished_at.to_rfc3339(),
                    record.input_hash,
                    record.output_hash,
                    adopted,
                    record.final_success as i32,
                    record.any_font_fallback as i32,
                    json
                ],
            )
            .map_err(db_err)?;

        debug!("audit record stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::path::PathBuf;
    use typekeep_core::{
        EditParameters, EngineAttempt, EngineId, FontSummary, StyleOverrides,
    };

    fn record(input_hash: &str, fallback: bool, offset_secs: i64) -> AuditRecord {
        let started = Utc::now() + Duration::seconds(offset_secs);
        AuditRecord {
            operation_id: uuid::Uuid::new_v4(),
            operation_type: "edit-text".into(),
            started_at: started,
            finished_at: started + Duration::milliseconds(20),
            input_path: PathBuf::from("in.pdf"),
            output_path: Some(PathBuf::from("out.pdf")),
            input_hash: input_hash.into(),
            output_hash: Some("beef".into()),
            parameters: EditParameters {
                search_text: "ALCANTARA".into(),
                replacement_text: "ALCÂNTARA".into(),
                style_overrides: StyleOverrides::default(),
                preferred_engine: None,
                strict_fonts: false,
            },
            attempts: vec![EngineAttempt::failed(EngineId::StreamRewrite, "x", 1.0)],
            adopted_engine: Some(EngineId::RedactReinsert),
            final_success: true,
            any_font_fallback: fallback,
            font_preservation_success: !fallback,
            font_summary: FontSummary::default(),
        }
    }

    #[test]
    fn sqlite_persist_and_count() {
        let mut log = SqliteAuditLog::open_in_memory().unwrap();
        assert_eq!(log.count().unwrap(), 0);

        log.persist(&record("aaa", true, 0)).unwrap();
        log.persist(&record("bbb", false, 1)).unwrap();

        assert_eq!(log.count().unwrap(), 2);
        assert_eq!(log.fallback_count().unwrap(), 1);
    }

    #[test]
    fn sqlite_round_trips_full_record() {
        let mut log = SqliteAuditLog::open_in_memory().unwrap();
        let original = record("aaa", false, 0);
        log.persist(&original).unwrap();

        let stored = log.records_for_input("aaa").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], original);
        assert!(log.records_for_input("zzz").unwrap().is_empty());
    }

    #[test]
    fn sqlite_rejects_duplicate_operation_ids() {
        let mut log = SqliteAuditLog::open_in_memory().unwrap();
        let r = record("aaa", false, 0);
        log.persist(&r).unwrap();
        assert!(matches!(log.persist(&r), Err(TypekeepError::Audit(_))));
    }

    #[test]
    fn sqlite_recent_is_newest_first() {
        let mut log = SqliteAuditLog::open_in_memory().unwrap();
        for i in 0..4 {
            log.persist(&record(&format!("h{i}"), false, i)).unwrap();
        }
        let recent = log.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].input_hash, "h3");
        assert_eq!(recent[1].input_hash, "h2");
    }

    #[test]
    fn json_sink_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path().join("audit")).unwrap();
        let r = record("aaa", true, 0);
        sink.persist(&r).unwrap();

        let path = sink.record_path(&r.operation_id);
        assert!(path.exists());
        assert_eq!(JsonFileSink::load(&path).unwrap(), r);
    }

    #[test]
    fn memory_sink_clones_share_records() {
        let observer = MemoryAuditSink::new();
        let mut writer = observer.clone();
        writer.persist(&record("aaa", false, 0)).unwrap();
        assert_eq!(observer.len(), 1);
        assert_eq!(observer.records()[0].input_hash, "aaa");
    }
}
