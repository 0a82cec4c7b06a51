//! Field validation for records and caller-supplied maps.
//!
//! Each function returns the names of the offending fields; an empty vector
//! means the input is valid. Names are reported once, in schema order for
//! records and key order for maps.

use crate::core::{FieldMap, Value};
use crate::record::{FieldRules, Record};
use crate::schema::{Column, Schema};
use crate::sql::{Order, RawFilter};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

/// Reported for a raw filter whose argument count does not match its `?`s.
pub const RAW_ARGS_FIELD: &str = "?";

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid");
    static ref PATTERNS: RwLock<HashMap<&'static str, Option<Regex>>> = RwLock::new(HashMap::new());
}

/// Identity must be non-negative; every data field must satisfy its rules.
pub fn validate_record(schema: &Schema, record: &dyn Record) -> Vec<String> {
    let mut invalid = Vec::new();
    if record.identity() < 0 {
        invalid.push(schema.identity_field().to_string());
    }
    for column in schema.columns() {
        let ok = record
            .field_value(column.field)
            .is_some_and(|value| value_ok(column, &value));
        if !ok {
            invalid.push(column.field.to_string());
        }
    }
    invalid
}

/// Assignments: known data field, matching kind, rules satisfied.
pub fn validate_values(schema: &Schema, values: &FieldMap) -> Vec<String> {
    values
        .iter()
        .filter(|(name, value)| {
            !schema
                .column(name)
                .is_some_and(|column| value_ok(column, value))
        })
        .map(|(name, _)| name.clone())
        .collect()
}

/// Predicates: known data field and matching kind. Raw predicates may also
/// reference the identity and must carry one argument per `?`.
pub fn validate_filters(schema: &Schema, filters: &FieldMap, raw: Option<&RawFilter>) -> Vec<String> {
    let mut invalid: Vec<String> = filters
        .iter()
        .filter(|(name, value)| {
            !schema
                .column(name)
                .is_some_and(|column| column.kind.check(name, value).is_ok())
        })
        .map(|(name, _)| name.clone())
        .collect();

    if let Some(raw) = raw {
        for field in raw.fields() {
            if !schema.has_field(field) && !invalid.iter().any(|f| f == field) {
                invalid.push(field.to_string());
            }
        }
        if raw.placeholder_count() != raw.args.len() {
            invalid.push(RAW_ARGS_FIELD.to_string());
        }
    }
    invalid
}

/// Order terms must name the identity or a data field.
pub fn validate_order(schema: &Schema, order: &[Order]) -> Vec<String> {
    order
        .iter()
        .filter(|o| !schema.has_field(&o.field))
        .map(|o| o.field.clone())
        .collect()
}

fn value_ok(column: &Column, value: &Value) -> bool {
    column.kind.check(column.field, value).is_ok() && rules_ok(&column.rules, value)
}

fn rules_ok(rules: &FieldRules, value: &Value) -> bool {
    if rules.is_empty() {
        return true;
    }
    match value {
        Value::Integer(v) => {
            !(rules.required && *v == 0)
                && rules.min.is_none_or(|min| *v >= min)
                && rules.max.is_none_or(|max| *v <= max)
        }
        Value::Text(s) => {
            let len = s.chars().count();
            !(rules.required && s.is_empty())
                && rules.len_min.is_none_or(|min| len >= min)
                && rules.len_max.is_none_or(|max| len <= max)
                && (!rules.email || s.is_empty() || EMAIL.is_match(s))
                && rules.regex.is_none_or(|pattern| pattern_matches(pattern, s))
        }
        Value::Boolean(b) => !(rules.required && !*b),
        Value::Null => !rules.required,
    }
}

fn pattern_matches(pattern: &'static str, input: &str) -> bool {
    if let Ok(cache) = PATTERNS.read() {
        if let Some(compiled) = cache.get(pattern) {
            return compiled.as_ref().is_some_and(|re| re.is_match(input));
        }
    }

    // Anchored so that the rule constrains the whole value.
    let compiled = match Regex::new(&format!("^(?:{})$", pattern)) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(pattern, error = %err, "invalid field regex, values will be rejected");
            None
        }
    };
    let matched = compiled.as_ref().is_some_and(|re| re.is_match(input));
    if let Ok(mut cache) = PATTERNS.write() {
        cache.insert(pattern, compiled);
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field_map;
    use crate::record;

    record! {
        #[derive(Debug, Clone, Default)]
        struct Signup {
            #[identity]
            id: i64,
            handle: String [required, len_min = 3, len_max = 8, regex = "[a-z0-9_]+"],
            email: String [email],
            age: i32 [min = 13, max = 120],
            accepted: bool [required],
            referrer: i64,
        }
    }

    fn schema() -> Schema {
        Schema::derive(&Signup::default(), "").unwrap()
    }

    fn valid() -> Signup {
        Signup {
            id: 0,
            handle: "ann_1".to_string(),
            email: "ann@example.com".to_string(),
            age: 30,
            accepted: true,
            referrer: 0,
        }
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(validate_record(&schema(), &valid()).is_empty());
    }

    #[test]
    fn test_record_rule_violations() {
        let mut s = valid();
        s.id = -1;
        s.handle = "Ann!".to_string();
        s.email = "not-an-email".to_string();
        s.age = 7;
        s.accepted = false;
        assert_eq!(
            validate_record(&schema(), &s),
            vec!["id", "handle", "email", "age", "accepted"]
        );
    }

    #[test]
    fn test_empty_email_left_to_required() {
        let mut s = valid();
        s.email = String::new();
        assert!(validate_record(&schema(), &s).is_empty());
    }

    #[test]
    fn test_handle_length_bounds() {
        let mut s = valid();
        s.handle = "ab".to_string();
        assert_eq!(validate_record(&schema(), &s), vec!["handle"]);
        s.handle = "abcdefghi".to_string();
        assert_eq!(validate_record(&schema(), &s), vec!["handle"]);
    }

    #[test]
    fn test_values_check_kind_and_rules() {
        let values = field_map([
            ("age", Value::from(200)),
            ("referrer", Value::from("x")),
            ("bogus", Value::from(1)),
            ("handle", Value::from("okay")),
        ]);
        assert_eq!(validate_values(&schema(), &values), vec!["age", "bogus", "referrer"]);
    }

    #[test]
    fn test_filters_ignore_rules_but_check_kind() {
        let filters = field_map([("age", Value::from(200)), ("handle", Value::from(""))]);
        assert!(validate_filters(&schema(), &filters, None).is_empty());

        let filters = field_map([("accepted", Value::from(1)), ("id", Value::from(1))]);
        assert_eq!(validate_filters(&schema(), &filters, None), vec!["accepted", "id"]);
    }

    #[test]
    fn test_raw_filter_references_and_arity() {
        let raw = RawFilter::new(".id > ? AND .nope = ?", vec![Value::from(1)]);
        assert_eq!(
            validate_filters(&schema(), &FieldMap::new(), Some(&raw)),
            vec!["nope", RAW_ARGS_FIELD]
        );
    }

    #[test]
    fn test_order_fields() {
        let order = [Order::asc("age"), Order::desc("id"), Order::asc("zzz")];
        assert_eq!(validate_order(&schema(), &order), vec!["zzz"]);
    }
}
