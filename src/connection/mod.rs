//! Database connection seam.
//!
//! The controller talks to the database only through [`Connection`], so any
//! backend that can run a parameterized statement and hand rows back as
//! [`Value`]s can sit behind it.

pub mod config;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;

use crate::core::{DriverError, Value};
use crate::sql::Dialect;
use async_trait::async_trait;
use std::sync::Arc;

pub use config::{DatabaseConfig, DatabaseUrl};
#[cfg(feature = "postgres")]
pub use postgres::PgConnection;
pub use sqlite::SqliteConnection;

/// One result row, columns in select order.
pub type Row = Vec<Value>;

#[async_trait]
pub trait Connection: Send + Sync {
    /// Placeholder syntax the generated SQL must use.
    fn dialect(&self) -> Dialect;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DriverError>;

    /// Runs a statement and collects every returned row.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError>;

    /// Runs unparameterized statements separated by `;`. Used for DDL.
    async fn execute_batch(&self, sql: &str) -> Result<(), DriverError>;
}

/// Opens the backend named by the configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Connection>, DriverError> {
    config.validate()?;
    match &config.database_url {
        DatabaseUrl::SqliteMemory => Ok(Arc::new(SqliteConnection::open_in_memory()?)),
        DatabaseUrl::SqliteFile(path) => Ok(Arc::new(SqliteConnection::open(path)?)),
        #[cfg(feature = "postgres")]
        DatabaseUrl::Postgres(url) => Ok(Arc::new(PgConnection::connect(url).await?)),
        #[cfg(not(feature = "postgres"))]
        DatabaseUrl::Postgres(_) => Err(DriverError::Config(
            "built without the 'postgres' feature".to_string(),
        )),
    }
}
