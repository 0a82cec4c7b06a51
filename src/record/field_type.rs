use super::FieldKind;
use crate::core::{FieldError, Value};

/// Rust type usable as a record data field.
pub trait FieldType: Sized {
    const KIND: FieldKind;

    fn to_value(&self) -> Value;
    fn from_value(field: &str, value: Value) -> Result<Self, FieldError>;
    fn zero() -> Self;
}

fn mismatch(field: &str, expected: FieldKind, value: &Value) -> FieldError {
    FieldError::KindMismatch {
        field: field.to_string(),
        expected,
        found: value.type_name(),
    }
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Int64;

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Integer(v) => Ok(v),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }

    fn zero() -> Self {
        0
    }
}

impl FieldType for i32 {
    const KIND: FieldKind = FieldKind::Int;

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Integer(v) => i32::try_from(v).map_err(|_| FieldError::OutOfRange {
                field: field.to_string(),
                value: v,
            }),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }

    fn zero() -> Self {
        0
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }

    fn zero() -> Self {
        String::new()
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    // SQLite has no boolean storage class and hands back 0/1.
    fn from_value(field: &str, value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => Err(mismatch(field, Self::KIND, &other)),
        }
    }

    fn zero() -> Self {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_reads_sqlite_integers() {
        assert!(bool::from_value("active", Value::Integer(1)).unwrap());
        assert!(!bool::from_value("active", Value::Integer(0)).unwrap());
        assert!(bool::from_value("active", Value::Integer(2)).is_err());
    }

    #[test]
    fn test_null_is_rejected() {
        let err = String::from_value("name", Value::Null).unwrap_err();
        assert!(matches!(err, FieldError::KindMismatch { found: "NULL", .. }));
    }

    #[test]
    fn test_i32_range_checked() {
        assert_eq!(i32::from_value("age", Value::Integer(30)).unwrap(), 30);
        assert!(matches!(
            i32::from_value("age", Value::Integer(i64::MAX)),
            Err(FieldError::OutOfRange { .. })
        ));
    }
}
