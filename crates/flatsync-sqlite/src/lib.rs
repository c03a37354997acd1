//! SQLite-backed [`DataStore`] implementation.
//!
//! Wraps a single `rusqlite` connection behind a mutex. The engine's
//! single-writer model issues calls strictly sequentially, so the mutex only
//! serializes accidental cross-run sharing; there is no internal pooling.

use anyhow::Context;
use flatsync_core::{BatchOutcome, DataStore, EngineError, EngineResult, Record, RowError, Value};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Store over an embedded SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database file.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing and dry runs).
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("failed to enable foreign key enforcement")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn store_err(e: rusqlite::Error) -> EngineError {
    EngineError::Write(e.to_string())
}

fn sql_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Integer(i) => rusqlite::types::Value::Integer(*i),
        Value::Real(r) => rusqlite::types::Value::Real(*r),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

fn row_to_record(columns: &[String], row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let mut record = Record::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        let value = match row.get_ref(idx)? {
            rusqlite::types::ValueRef::Null => Value::Null,
            rusqlite::types::ValueRef::Integer(i) => Value::Integer(i),
            rusqlite::types::ValueRef::Real(r) => Value::Real(r),
            rusqlite::types::ValueRef::Text(t) => {
                Value::Text(String::from_utf8_lossy(t).into_owned())
            }
            rusqlite::types::ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        };
        record.push(name.clone(), value);
    }
    Ok(record)
}

#[async_trait::async_trait]
impl DataStore for SqliteStore {
    async fn exec(&self, statements: &str) -> EngineResult<()> {
        let conn = self.lock();
        conn.execute_batch(statements).map_err(store_err)
    }

    async fn run(&self, statement: &str, params: &[Value]) -> EngineResult<u64> {
        let conn = self.lock();
        let mut stmt = conn.prepare(statement).map_err(store_err)?;
        let changed = stmt
            .execute(rusqlite::params_from_iter(params.iter().map(sql_value)))
            .map_err(store_err)?;
        Ok(changed as u64)
    }

    async fn get(&self, statement: &str, params: &[Value]) -> EngineResult<Option<Record>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(statement).map_err(store_err)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        stmt.query_row(
            rusqlite::params_from_iter(params.iter().map(sql_value)),
            |row| row_to_record(&columns, row),
        )
        .optional()
        .map_err(store_err)
    }

    async fn all(&self, statement: &str, params: &[Value]) -> EngineResult<Vec<Record>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(statement).map_err(store_err)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(sql_value)))
            .map_err(store_err)?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(store_err)? {
            records.push(row_to_record(&columns, row).map_err(store_err)?);
        }
        Ok(records)
    }

    async fn write_batch(
        &self,
        statement: &str,
        rows: &[Vec<Value>],
        continue_on_error: bool,
    ) -> EngineResult<BatchOutcome> {
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(store_err)?;
        let mut outcome = BatchOutcome::default();

        {
            let mut stmt = tx.prepare(statement).map_err(store_err)?;
            for (idx, row) in rows.iter().enumerate() {
                let result =
                    stmt.execute(rusqlite::params_from_iter(row.iter().map(sql_value)));
                match result {
                    Ok(changed) => outcome.rows_written += changed as u64,
                    Err(e) if continue_on_error => {
                        debug!(row = idx, error = %e, "skipping failed row");
                        outcome.row_errors.push(RowError {
                            row: idx,
                            message: e.to_string(),
                        });
                    }
                    // dropping the transaction rolls the batch back
                    Err(e) => return Err(store_err(e)),
                }
            }
        }

        tx.commit().map_err(store_err)?;
        debug!(
            rows_written = outcome.rows_written,
            row_errors = outcome.row_errors.len(),
            "batch committed"
        );
        Ok(outcome)
    }

    async fn table_exists(&self, table: &str) -> EngineResult<bool> {
        let conn = self.lock();
        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                rusqlite::params![table],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        Ok(name.is_some())
    }
}
