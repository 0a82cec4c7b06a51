//! Parameterized SQL for one record type.
//!
//! Placeholders are numbered in the order the introspector produces bound
//! values: identity/data fields in column order, then map entries in key
//! order, then raw-filter arguments.

use crate::core::{FieldMap, SchemaError};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};

mod raw;

pub use raw::{Conjunction, RawFilter, RawPart};

/// Placeholder and paging syntax of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// `$1, $2, ...`
    Postgres,
    /// `?1, ?2, ...`
    Sqlite,
}

impl Dialect {
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${}", n),
            Self::Sqlite => format!("?{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Order {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

struct Placeholders {
    dialect: Dialect,
    next: usize,
}

impl Placeholders {
    fn new(dialect: Dialect) -> Self {
        Self { dialect, next: 1 }
    }

    fn take(&mut self) -> String {
        let p = self.dialect.placeholder(self.next);
        self.next += 1;
        p
    }
}

/// SQL text generator over a derived [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlGenerator {
    schema: Schema,
    dialect: Dialect,
}

impl SqlGenerator {
    pub fn new(schema: Schema, dialect: Dialect) -> Self {
        Self { schema, dialect }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn data_columns(&self) -> Vec<&str> {
        self.schema.columns().iter().map(|c| c.name.as_str()).collect()
    }

    fn all_columns(&self) -> String {
        std::iter::once(self.schema.identity_column())
            .chain(self.data_columns())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Column for a field name; the identity field is accepted.
    fn column_for(&self, field: &str) -> Result<&str, SchemaError> {
        if field == self.schema.identity_field() {
            return Ok(self.schema.identity_column());
        }
        self.schema
            .column(field)
            .map(|c| c.name.as_str())
            .ok_or_else(|| SchemaError::UnknownField {
                type_name: self.schema.type_name().to_string(),
                field: field.to_string(),
            })
    }

    /// Insert of all data fields, returning the generated identity.
    pub fn insert(&self) -> String {
        let mut ph = Placeholders::new(self.dialect);
        let columns = self.data_columns();
        let values: Vec<String> = columns.iter().map(|_| ph.take()).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            self.schema.table(),
            columns.join(", "),
            values.join(", "),
            self.schema.identity_column()
        )
    }

    /// Insert with explicit identity that updates every data column when
    /// the identity already exists.
    pub fn upsert(&self) -> String {
        let mut ph = Placeholders::new(self.dialect);
        let columns = self.data_columns();
        let values: Vec<String> = (0..=columns.len()).map(|_| ph.take()).collect();
        let updates: Vec<String> = columns
            .iter()
            .map(|c| format!("{} = EXCLUDED.{}", c, c))
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
            self.schema.table(),
            self.all_columns(),
            values.join(", "),
            self.schema.identity_column(),
            updates.join(", ")
        )
    }

    /// Update of every data column; the identity is the last parameter.
    pub fn update_by_id(&self) -> String {
        let mut ph = Placeholders::new(self.dialect);
        let sets: Vec<String> = self
            .data_columns()
            .iter()
            .map(|c| format!("{} = {}", c, ph.take()))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.schema.table(),
            sets.join(", "),
            self.schema.identity_column(),
            ph.take()
        )
    }

    pub fn select_by_id(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.all_columns(),
            self.schema.table(),
            self.schema.identity_column(),
            self.dialect.placeholder(1)
        )
    }

    pub fn delete_by_id(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = {}",
            self.schema.table(),
            self.schema.identity_column(),
            self.dialect.placeholder(1)
        )
    }

    /// Select of identity and data columns. `limit == 0` means no limit.
    pub fn select(
        &self,
        order: &[Order],
        limit: usize,
        offset: usize,
        filters: &FieldMap,
        raw: Option<&RawFilter>,
    ) -> Result<String, SchemaError> {
        let mut ph = Placeholders::new(self.dialect);
        let mut sql = format!("SELECT {} FROM {}", self.all_columns(), self.schema.table());
        sql.push_str(&self.where_clause(filters, raw, &mut ph)?);

        if !order.is_empty() {
            let mut terms = Vec::with_capacity(order.len());
            for o in order {
                let dir = match o.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                terms.push(format!("{} {}", self.column_for(&o.field)?, dir));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if limit > 0 {
            sql.push_str(&format!(" LIMIT {}", limit));
        } else if offset > 0 && self.dialect == Dialect::Sqlite {
            sql.push_str(" LIMIT -1");
        }
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        Ok(sql)
    }

    pub fn select_count(
        &self,
        filters: &FieldMap,
        raw: Option<&RawFilter>,
    ) -> Result<String, SchemaError> {
        let mut ph = Placeholders::new(self.dialect);
        Ok(format!(
            "SELECT COUNT(*) FROM {}{}",
            self.schema.table(),
            self.where_clause(filters, raw, &mut ph)?
        ))
    }

    /// Delete of every matching row, returning the deleted identities.
    pub fn delete_returning_ids(
        &self,
        filters: &FieldMap,
        raw: Option<&RawFilter>,
    ) -> Result<String, SchemaError> {
        let mut ph = Placeholders::new(self.dialect);
        Ok(format!(
            "DELETE FROM {}{} RETURNING {}",
            self.schema.table(),
            self.where_clause(filters, raw, &mut ph)?,
            self.schema.identity_column()
        ))
    }

    /// Delete of rows whose `field` is any of `count` parameters, returning
    /// the deleted identities.
    pub fn delete_returning_ids_in(&self, field: &str, count: usize) -> Result<String, SchemaError> {
        let column = self.column_for(field)?;
        let list: Vec<String> = (1..=count).map(|n| self.dialect.placeholder(n)).collect();
        Ok(format!(
            "DELETE FROM {} WHERE {} IN ({}) RETURNING {}",
            self.schema.table(),
            column,
            list.join(", "),
            self.schema.identity_column()
        ))
    }

    /// Update of the `values` columns on every matching row. Parameters are
    /// the values, then the filters, then the raw arguments.
    pub fn update(
        &self,
        values: &FieldMap,
        filters: &FieldMap,
        raw: Option<&RawFilter>,
    ) -> Result<String, SchemaError> {
        let mut ph = Placeholders::new(self.dialect);
        let mut sets = Vec::with_capacity(values.len());
        for field in values.keys() {
            sets.push(format!("{} = {}", self.column_for(field)?, ph.take()));
        }
        Ok(format!(
            "UPDATE {} SET {}{}",
            self.schema.table(),
            sets.join(", "),
            self.where_clause(filters, raw, &mut ph)?
        ))
    }

    fn where_clause(
        &self,
        filters: &FieldMap,
        raw: Option<&RawFilter>,
        ph: &mut Placeholders,
    ) -> Result<String, SchemaError> {
        let mut preds = Vec::with_capacity(filters.len());
        for field in filters.keys() {
            preds.push(format!("{} = {}", self.column_for(field)?, ph.take()));
        }
        let fields = preds.join(" AND ");

        let Some(raw) = raw else {
            return Ok(if fields.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", fields)
            });
        };

        let mut raw_sql = String::with_capacity(raw.predicate.len() + 8);
        for part in raw.parts() {
            match part {
                RawPart::Text(t) => raw_sql.push_str(t),
                RawPart::Field(f) => raw_sql.push_str(self.column_for(f)?),
                RawPart::Param => raw_sql.push_str(&ph.take()),
            }
        }

        Ok(if fields.is_empty() {
            format!(" WHERE ({})", raw_sql)
        } else {
            format!(
                " WHERE ({}) {} ({})",
                fields,
                raw.conjunction.keyword(),
                raw_sql
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Value, field_map};
    use crate::record;

    record! {
        #[derive(Debug, Default)]
        struct Person table = "people" {
            #[identity]
            id: i64,
            name: String as "full_name",
            age: i32,
        }
    }

    fn generator(dialect: Dialect) -> SqlGenerator {
        SqlGenerator::new(Schema::derive(&Person::default(), "app_").unwrap(), dialect)
    }

    #[test]
    fn test_identity_statements() {
        let g = generator(Dialect::Postgres);
        assert_eq!(
            g.insert(),
            "INSERT INTO app_people (full_name, age) VALUES ($1, $2) RETURNING id"
        );
        assert_eq!(
            g.upsert(),
            "INSERT INTO app_people (id, full_name, age) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name, age = EXCLUDED.age"
        );
        assert_eq!(
            g.update_by_id(),
            "UPDATE app_people SET full_name = $1, age = $2 WHERE id = $3"
        );
        assert_eq!(
            g.select_by_id(),
            "SELECT id, full_name, age FROM app_people WHERE id = $1"
        );
        assert_eq!(g.delete_by_id(), "DELETE FROM app_people WHERE id = $1");
    }

    #[test]
    fn test_select_with_filters_order_and_paging() {
        let g = generator(Dialect::Sqlite);
        let filters = field_map([("name", Value::from("Ann")), ("age", Value::from(30))]);
        let sql = g
            .select(&[Order::desc("age"), Order::asc("id")], 10, 5, &filters, None)
            .unwrap();
        assert_eq!(
            sql,
            "SELECT id, full_name, age FROM app_people WHERE age = ?1 AND full_name = ?2 \
             ORDER BY age DESC, id ASC LIMIT 10 OFFSET 5"
        );
    }

    #[test]
    fn test_sqlite_offset_without_limit() {
        let g = generator(Dialect::Sqlite);
        let sql = g.select(&[], 0, 3, &FieldMap::new(), None).unwrap();
        assert!(sql.ends_with("LIMIT -1 OFFSET 3"));

        let g = generator(Dialect::Postgres);
        let sql = g.select(&[], 0, 3, &FieldMap::new(), None).unwrap();
        assert!(sql.ends_with("FROM app_people OFFSET 3"));
    }

    #[test]
    fn test_raw_filter_numbering_follows_map() {
        let g = generator(Dialect::Postgres);
        let filters = field_map([("age", 30)]);
        let raw = RawFilter::new(".name = ? OR .id > ?", vec![Value::from("x"), Value::from(1)]).or();
        assert_eq!(
            g.select_count(&filters, Some(&raw)).unwrap(),
            "SELECT COUNT(*) FROM app_people WHERE (age = $1) OR (full_name = $2 OR id > $3)"
        );
        assert_eq!(
            g.delete_returning_ids(&FieldMap::new(), Some(&raw)).unwrap(),
            "DELETE FROM app_people WHERE (full_name = $1 OR id > $2) RETURNING id"
        );
    }

    #[test]
    fn test_update_values_before_filters() {
        let g = generator(Dialect::Postgres);
        let values = field_map([("name", "Bob")]);
        let filters = field_map([("age", 30)]);
        assert_eq!(
            g.update(&values, &filters, None).unwrap(),
            "UPDATE app_people SET full_name = $1 WHERE age = $2"
        );
    }

    #[test]
    fn test_delete_in_and_unknown_field() {
        let g = generator(Dialect::Sqlite);
        assert_eq!(
            g.delete_returning_ids_in("age", 3).unwrap(),
            "DELETE FROM app_people WHERE age IN (?1, ?2, ?3) RETURNING id"
        );
        assert!(matches!(
            g.delete_returning_ids_in("group_id", 1),
            Err(SchemaError::UnknownField { .. })
        ));
        let bad = field_map([("nope", 1)]);
        assert!(g.select_count(&bad, None).is_err());
    }
}
