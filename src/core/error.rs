use crate::record::FieldKind;
use std::fmt;
use std::num::ParseIntError;
use thiserror::Error;

/// Controller operation in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Load,
    Delete,
    DeleteMultiple,
    UpdateMultiple,
    Get,
    GetCount,
    CascadeDelete,
    Register,
    Lookup,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Save => "save",
            Self::Load => "load",
            Self::Delete => "delete",
            Self::DeleteMultiple => "delete_multiple",
            Self::UpdateMultiple => "update_multiple",
            Self::Get => "get",
            Self::GetCount => "get_count",
            Self::CascadeDelete => "cascade_delete",
            Self::Register => "register",
            Self::Lookup => "lookup",
        };
        f.write_str(name)
    }
}

/// What was being validated when fields were rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationTarget {
    Record,
    Values,
    Filters,
    Order,
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Record => "record",
            Self::Values => "values",
            Self::Filters => "filters",
            Self::Order => "order",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("{op}: cannot resolve schema: {source}")]
    Schema {
        op: Operation,
        #[source]
        source: SchemaError,
    },

    #[error("{op}: invalid {target}: {}", .fields.join(", "))]
    Validation {
        op: Operation,
        target: ValidationTarget,
        fields: Vec<String>,
    },

    #[error("{op}: cannot convert identity '{input}' to integer: {source}")]
    Conversion {
        op: Operation,
        input: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{op}: missing values for update")]
    MissingValues { op: Operation },

    #[error("{op}: query failed: {source}")]
    Query {
        op: Operation,
        #[source]
        source: DriverError,
    },

    #[error("{op}: row scan failed: {source}")]
    Scan {
        op: Operation,
        #[source]
        source: FieldError,
    },

    /// Raised after parent rows were already deleted; rows removed before the
    /// failure stay removed.
    #[error("cascade delete of relation '{relation}' at depth {depth} failed: {source}")]
    Cascade {
        relation: String,
        depth: usize,
        parent_ids: Vec<i64>,
        #[source]
        source: Box<ControllerError>,
    },
}

impl ControllerError {
    /// Innermost error, looking through cascade wrappers.
    pub fn root(&self) -> &ControllerError {
        match self {
            Self::Cascade { source, .. } => source.root(),
            other => other,
        }
    }

    /// Invalid field names carried by a validation failure.
    pub fn invalid_fields(&self) -> &[String] {
        match self.root() {
            Self::Validation { fields, .. } => fields,
            _ => &[],
        }
    }
}

/// Failure to derive a schema handle from a record type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("record type '{0}' declares no data fields")]
    NoFields(String),

    #[error("record type '{type_name}' maps more than one field to '{name}'")]
    Duplicate { type_name: String, name: String },

    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("field '{field}' of '{type_name}' has no matching field in parent '{parent}'")]
    ParentMismatch {
        type_name: String,
        parent: String,
        field: String,
    },

    #[error("record type '{type_name}' has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("schema registry lock poisoned: {0}")]
    Lock(String),
}

impl<T> From<std::sync::PoisonError<T>> for SchemaError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

/// Failure to move a value into or out of a record field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{field}' expects {expected}, got {found}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        found: &'static str,
    },

    #[error("value {value} out of range for field '{field}'")]
    OutOfRange { field: String, value: i64 },

    #[error("row has {found} columns, expected {expected}")]
    ColumnCount { expected: usize, found: usize },

    #[error("query returned no row")]
    NoRow,
}

/// Failure reported by a database backend.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("postgres: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("unsupported column type '{type_name}' at index {index}")]
    UnsupportedColumn { type_name: String, index: usize },

    #[error("column {index} holds text that is not valid UTF-8: {source}")]
    InvalidText {
        index: usize,
        source: std::str::Utf8Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
