//! Typed field access over [`Record`] without per-type code.
//!
//! Every function orders values the way the record's [`Schema`] orders its
//! columns, which is also the placeholder order of the generated SQL.

use crate::core::{FieldError, FieldMap, StringMap, Value};
use crate::record::Record;
use crate::schema::Schema;

/// Bound values of the record's fields, identity first when requested.
pub fn field_values(schema: &Schema, record: &dyn Record, include_identity: bool) -> Vec<Value> {
    let mut values = Vec::with_capacity(schema.columns().len() + 1);
    if include_identity {
        values.push(Value::Integer(record.identity()));
    }
    for column in schema.columns() {
        values.push(
            record
                .field_value(column.field)
                .unwrap_or_else(|| column.kind.zero_value()),
        );
    }
    values
}

/// The record's identity; `0` means no persisted row.
pub fn identity_value(record: &dyn Record) -> i64 {
    record.identity()
}

/// Writes a database-returned identity into the record.
pub fn bind_identity(
    schema: &Schema,
    record: &mut dyn Record,
    value: &Value,
) -> Result<(), FieldError> {
    match value {
        Value::Integer(id) => {
            record.set_identity(*id);
            Ok(())
        }
        other => Err(FieldError::KindMismatch {
            field: schema.identity_field().to_string(),
            expected: crate::record::FieldKind::Int64,
            found: other.type_name(),
        }),
    }
}

/// Binds a `[identity, fields...]` row into the record.
pub fn scan_row(schema: &Schema, record: &mut dyn Record, row: Vec<Value>) -> Result<(), FieldError> {
    let expected = schema.columns().len() + 1;
    if row.len() != expected {
        return Err(FieldError::ColumnCount {
            expected,
            found: row.len(),
        });
    }

    let mut values = row.into_iter();
    if let Some(id) = values.next() {
        bind_identity(schema, record, &id)?;
    }
    for (column, value) in schema.columns().iter().zip(values) {
        record.set_field(column.field, value)?;
    }
    Ok(())
}

/// Converts string input to typed values using each field's declared kind.
///
/// Keys that name no data field, and values that do not parse, are dropped
/// without error. Callers must not assume every key survives.
pub fn coerce_string_map(record: &dyn Record, input: &StringMap) -> FieldMap {
    let fields = record.fields();
    input
        .iter()
        .filter_map(|(name, raw)| {
            let def = fields.iter().find(|f| f.name == name.as_str())?;
            def.kind.coerce(raw).map(|v| (name.clone(), v))
        })
        .collect()
}

/// Identity and every data field back to zero values.
pub fn reset_fields(record: &mut dyn Record) {
    record.reset();
}

/// Map values in key order, matching the generated placeholders.
pub fn map_values(map: &FieldMap) -> Vec<Value> {
    map.values().cloned().collect()
}

/// JSON object of the record keyed by field name, identity included.
pub fn to_json(schema: &Schema, record: &dyn Record) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    object.insert(
        schema.identity_field().to_string(),
        serde_json::Value::from(record.identity()),
    );
    for column in schema.columns() {
        let value = record
            .field_value(column.field)
            .map(|v| v.to_json())
            .unwrap_or(serde_json::Value::Null);
        object.insert(column.field.to_string(), value);
    }
    serde_json::Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{field_map, string_map};
    use crate::record;

    record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Member {
            #[identity]
            id: i64,
            name: String,
            age: i32,
            active: bool,
            score: i64,
        }
    }

    fn schema() -> Schema {
        Schema::derive(&Member::default(), "").unwrap()
    }

    fn sample() -> Member {
        Member {
            id: 4,
            name: "Ann".to_string(),
            age: 30,
            active: true,
            score: -7,
        }
    }

    #[test]
    fn test_field_values_order() {
        let m = sample();
        assert_eq!(
            field_values(&schema(), &m, false),
            vec![
                Value::from("Ann"),
                Value::Integer(30),
                Value::Boolean(true),
                Value::Integer(-7)
            ]
        );
        let with_id = field_values(&schema(), &m, true);
        assert_eq!(with_id[0], Value::Integer(4));
        assert_eq!(with_id.len(), 5);
    }

    #[test]
    fn test_scan_row_binds_all_columns() {
        let mut m = Member::default();
        scan_row(
            &schema(),
            &mut m,
            vec![
                Value::Integer(4),
                Value::from("Ann"),
                Value::Integer(30),
                Value::Integer(1),
                Value::Integer(-7),
            ],
        )
        .unwrap();
        assert_eq!(m, sample());
    }

    #[test]
    fn test_scan_row_rejects_wrong_shape() {
        let mut m = Member::default();
        let err = scan_row(&schema(), &mut m, vec![Value::Integer(1)]).unwrap_err();
        assert_eq!(err, FieldError::ColumnCount { expected: 5, found: 1 });

        let err = scan_row(
            &schema(),
            &mut m,
            vec![
                Value::from("x"),
                Value::from("Ann"),
                Value::Integer(30),
                Value::Integer(1),
                Value::Integer(-7),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, FieldError::KindMismatch { .. }));
    }

    #[test]
    fn test_coerce_string_map_drops_unknown_and_unparsable() {
        let m = Member::default();
        let input = string_map([
            ("age", "30"),
            ("active", "true"),
            ("bogus", "x"),
            ("score", "not a number"),
            ("name", "Ann"),
        ]);
        assert_eq!(
            coerce_string_map(&m, &input),
            field_map([
                ("age", Value::Integer(30)),
                ("active", Value::Boolean(true)),
                ("name", Value::from("Ann")),
            ])
        );
    }

    #[test]
    fn test_reset_and_json() {
        let mut m = sample();
        let json = to_json(&schema(), &m);
        assert_eq!(json["id"], 4);
        assert_eq!(json["name"], "Ann");
        assert_eq!(json["active"], true);

        reset_fields(&mut m);
        assert_eq!(m, Member::default());
        assert_eq!(identity_value(&m), 0);
    }
}
