// ============================================================================
// struct2db Library
// ============================================================================

//! Generic persistence for typed records.
//!
//! A record type declares its fields once with [`record!`]; the
//! [`Controller`] derives a table layout from it, generates parameterized
//! SQL, validates input against the declared rules and follows declared
//! relations when deleting.
//!
//! ```
//! use struct2db::{Controller, GetOptions, SaveOptions, SqliteConnection, record};
//! use std::sync::Arc;
//!
//! record! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Person {
//!         #[identity]
//!         pub id: i64,
//!         pub name: String [required],
//!         pub age: i32,
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = Arc::new(SqliteConnection::open_in_memory()?);
//! # use struct2db::Connection;
//! # conn.execute_batch("CREATE TABLE persons (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)").await?;
//! let controller = Controller::new(conn, "");
//!
//! let mut ann = Person { id: 0, name: "Ann".into(), age: 30 };
//! controller.save(&mut ann, &SaveOptions::default()).await?;
//! assert_ne!(ann.id, 0);
//!
//! let people = controller.get(Person::default, &GetOptions::default()).await?;
//! assert_eq!(people, vec![ann]);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod controller;
pub mod core;
pub mod introspect;
pub mod record;
pub mod schema;
pub mod sql;
pub mod validate;

// Re-export main types for convenience
pub use core::{
    ControllerError, DriverError, FieldError, FieldMap, Operation, Result, SchemaError,
    StringMap, ValidationTarget, Value, field_map, string_map,
};
pub use record::{FieldDef, FieldKind, FieldRules, FieldType, Record, Relation};
pub use schema::{Column, RegistryOptions, Schema, SchemaRegistry};
pub use sql::{Conjunction, Dialect, Order, RawFilter, SortDirection, SqlGenerator};

// Re-export connection API
pub use connection::{Connection, DatabaseConfig, DatabaseUrl, SqliteConnection, connect};
#[cfg(feature = "postgres")]
pub use connection::PgConnection;

pub use controller::{
    CASCADE_CHUNK_SIZE, Constructors, Controller, DeleteMultipleOptions, DeleteOptions,
    GetCountOptions, GetOptions, MAX_CASCADE_DEPTH, RecordFactory, SaveOptions, UpdateMultipleOptions,
};
