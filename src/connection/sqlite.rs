use super::{Connection, Row};
use crate::core::{DriverError, Value};
use crate::sql::Dialect;
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{ToSql, params_from_iter};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(v) => ToSqlOutput::from(*v),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Boolean(b) => ToSqlOutput::from(i64::from(*b)),
        })
    }
}

/// SQLite backend over a single `rusqlite` connection.
///
/// Statements are serialized through an async mutex; rusqlite calls are
/// blocking but short for the workloads this crate targets.
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteConnection {
    pub fn open_in_memory() -> Result<Self, DriverError> {
        Ok(Self::from_connection(rusqlite::Connection::open_in_memory()?))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening sqlite database");
        Ok(Self::from_connection(rusqlite::Connection::open(path)?))
    }

    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DriverError> {
        let conn = self.conn.lock().await;
        let affected = conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        let conn = self.conn.lock().await;
        collect_rows(&conn, sql, params)
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), DriverError> {
        let conn = self.conn.lock().await;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

fn collect_rows(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Row>, DriverError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let width = stmt.column_count();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for index in 0..width {
            values.push(read_column(row.get_ref(index)?, index)?);
        }
        out.push(values);
    }
    Ok(out)
}

fn read_column(value: ValueRef<'_>, index: usize) -> Result<Value, DriverError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(v) => Ok(Value::Integer(v)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| Value::Text(text.to_string()))
            .map_err(|source| DriverError::InvalidText { index, source }),
        ValueRef::Real(_) => Err(DriverError::UnsupportedColumn {
            type_name: "REAL".to_string(),
            index,
        }),
        ValueRef::Blob(_) => Err(DriverError::UnsupportedColumn {
            type_name: "BLOB".to_string(),
            index,
        }),
    }
}
