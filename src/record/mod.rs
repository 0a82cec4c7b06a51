//! Record capability.
//!
//! A record type describes its own fields once, through [`Record`], so the
//! controller can bind parameters, scan rows and validate maps without any
//! per-type code. The [`record!`](crate::record!) macro writes the impl.

use crate::core::{FieldError, Value};
use std::fmt;

mod field_type;
mod macros;

pub use field_type::FieldType;

/// Primitive kind of a data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `i64`
    Int64,
    /// `i32`
    Int,
    /// `String`
    Text,
    /// `bool`
    Bool,
}

impl FieldKind {
    /// Checks that `value` can be assigned to a field of this kind.
    pub fn check(self, field: &str, value: &Value) -> Result<(), FieldError> {
        match (self, value) {
            (Self::Int64, Value::Integer(_)) => Ok(()),
            (Self::Int, Value::Integer(v)) => {
                if i32::try_from(*v).is_ok() {
                    Ok(())
                } else {
                    Err(FieldError::OutOfRange {
                        field: field.to_string(),
                        value: *v,
                    })
                }
            }
            (Self::Text, Value::Text(_)) => Ok(()),
            (Self::Bool, Value::Boolean(_)) => Ok(()),
            (expected, other) => Err(FieldError::KindMismatch {
                field: field.to_string(),
                expected,
                found: other.type_name(),
            }),
        }
    }

    /// Parses string input into a value of this kind.
    ///
    /// Integers that fail to parse yield `None`. Booleans are `true` only
    /// for the exact input `"true"`, so they never fail.
    pub fn coerce(self, input: &str) -> Option<Value> {
        match self {
            Self::Int64 => input.parse::<i64>().ok().map(Value::Integer),
            Self::Int => input.parse::<i32>().ok().map(Value::from),
            Self::Text => Some(Value::Text(input.to_string())),
            Self::Bool => Some(Value::Boolean(input == "true")),
        }
    }

    pub fn zero_value(self) -> Value {
        match self {
            Self::Int64 | Self::Int => Value::Integer(0),
            Self::Text => Value::Text(String::new()),
            Self::Bool => Value::Boolean(false),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int64 => "int64",
            Self::Int => "int",
            Self::Text => "string",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Constraints checked on save and on update values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldRules {
    pub required: bool,
    pub len_min: Option<usize>,
    pub len_max: Option<usize>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub regex: Option<&'static str>,
    pub email: bool,
}

impl FieldRules {
    pub const fn new() -> Self {
        Self {
            required: false,
            len_min: None,
            len_max: None,
            min: None,
            max: None,
            regex: None,
            email: false,
        }
    }

    /// Value must be non-zero (integers) or non-empty (strings).
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn len_min(mut self, len: usize) -> Self {
        self.len_min = Some(len);
        self
    }

    #[must_use]
    pub const fn len_max(mut self, len: usize) -> Self {
        self.len_max = Some(len);
        self
    }

    #[must_use]
    pub const fn min(mut self, value: i64) -> Self {
        self.min = Some(value);
        self
    }

    #[must_use]
    pub const fn max(mut self, value: i64) -> Self {
        self.max = Some(value);
        self
    }

    /// Whole-value match against `pattern`.
    #[must_use]
    pub const fn regex(mut self, pattern: &'static str) -> Self {
        self.regex = Some(pattern);
        self
    }

    #[must_use]
    pub const fn email(mut self) -> Self {
        self.email = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::new()
    }
}

/// Declared data field of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    pub rules: FieldRules,
}

impl FieldDef {
    /// Field stored in a column of the same name, without rules.
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            column: name,
            kind,
            rules: FieldRules::new(),
        }
    }

    #[must_use]
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = column;
        self
    }

    #[must_use]
    pub const fn rules(mut self, rules: FieldRules) -> Self {
        self.rules = rules;
        self
    }
}

/// One-to-many link from a parent record type to its children.
///
/// The child type is looked up by `name` in the caller's constructor map at
/// delete time; `foreign_field` is the child's data field holding the
/// parent identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub foreign_field: &'static str,
}

impl Relation {
    pub const fn new(name: &'static str, foreign_field: &'static str) -> Self {
        Self {
            name,
            foreign_field,
        }
    }
}

/// Typed field access for a persisted record.
///
/// Implementations are normally generated by [`record!`](crate::record!).
/// The trait is object safe; the controller works on `&dyn Record`.
pub trait Record: Send + Sync + 'static {
    /// Name the schema registry caches this type under.
    fn type_name(&self) -> &'static str;
    /// Explicit table name, without prefix. `None` derives one from the type name.
    fn table_name(&self) -> Option<&'static str> {
        None
    }
    /// Name of the `i64` primary key field.
    fn identity_field(&self) -> &'static str;
    /// Data fields in column order.
    fn fields(&self) -> Vec<FieldDef>;
    /// Child relations followed by cascading delete.
    fn relations(&self) -> Vec<Relation> {
        Vec::new()
    }
    fn identity(&self) -> i64;
    fn set_identity(&mut self, id: i64);
    /// Current value of a data field, `None` if no such field exists.
    fn field_value(&self, name: &str) -> Option<Value>;
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), FieldError>;
    /// Identity and every data field back to zero values.
    fn reset(&mut self);
}
