//! Schema handles derived from record types, and the registry caching them.

use crate::core::SchemaError;
use crate::record::{FieldKind, FieldRules, Record, Relation};
use std::collections::HashSet;

pub mod naming;
mod registry;

pub use registry::{RegistryOptions, SchemaRegistry};

/// Storage mapping of one data field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub field: &'static str,
    pub name: String,
    pub kind: FieldKind,
    pub rules: FieldRules,
}

/// Table layout of a record type: identity column plus one column per data
/// field, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    type_name: &'static str,
    table: String,
    identity_field: &'static str,
    identity_column: String,
    columns: Vec<Column>,
    relations: Vec<Relation>,
}

impl Schema {
    /// Derives the layout from the record's own declarations.
    pub fn derive(record: &dyn Record, table_prefix: &str) -> Result<Self, SchemaError> {
        let type_name = record.type_name();
        let table = match record.table_name() {
            Some(table) => format!("{}{}", table_prefix, table),
            None => format!("{}{}", table_prefix, naming::default_table_name(type_name)),
        };
        let columns = record
            .fields()
            .into_iter()
            .map(|def| Column {
                field: def.name,
                name: def.column.to_string(),
                kind: def.kind,
                rules: def.rules,
            })
            .collect();

        let schema = Self {
            type_name,
            table,
            identity_field: record.identity_field(),
            identity_column: record.identity_field().to_string(),
            columns,
            relations: record.relations(),
        };
        schema.check()?;
        Ok(schema)
    }

    /// Derives the layout of `record` as a view over `parent`'s table.
    ///
    /// The table, the identity column and every field's column come from the
    /// parent; each field of `record` must exist in the parent with the same
    /// kind. Rules and relations stay those of `record`.
    pub fn derive_from_parent(record: &dyn Record, parent: &Schema) -> Result<Self, SchemaError> {
        let type_name = record.type_name();
        let mut columns = Vec::new();
        for def in record.fields() {
            let parent_column = parent
                .column(def.name)
                .filter(|c| c.kind == def.kind)
                .ok_or_else(|| SchemaError::ParentMismatch {
                    type_name: type_name.to_string(),
                    parent: parent.type_name.to_string(),
                    field: def.name.to_string(),
                })?;
            columns.push(Column {
                field: def.name,
                name: parent_column.name.clone(),
                kind: def.kind,
                rules: def.rules,
            });
        }

        let schema = Self {
            type_name,
            table: parent.table.clone(),
            identity_field: record.identity_field(),
            identity_column: parent.identity_column.clone(),
            columns,
            relations: record.relations(),
        };
        schema.check()?;
        Ok(schema)
    }

    fn check(&self) -> Result<(), SchemaError> {
        if self.columns.is_empty() {
            return Err(SchemaError::NoFields(self.type_name.to_string()));
        }

        for ident in std::iter::once(&self.table)
            .chain(std::iter::once(&self.identity_column))
            .chain(self.columns.iter().map(|c| &c.name))
        {
            if !naming::is_valid_identifier(ident) {
                return Err(SchemaError::InvalidIdentifier(ident.clone()));
            }
        }

        let mut fields = HashSet::new();
        let mut columns = HashSet::new();
        fields.insert(self.identity_field);
        columns.insert(self.identity_column.as_str());
        for column in &self.columns {
            if !fields.insert(column.field) {
                return Err(self.duplicate(column.field));
            }
            if !columns.insert(column.name.as_str()) {
                return Err(self.duplicate(&column.name));
            }
        }
        Ok(())
    }

    fn duplicate(&self, name: &str) -> SchemaError {
        SchemaError::Duplicate {
            type_name: self.type_name.to_string(),
            name: name.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn identity_field(&self) -> &'static str {
        self.identity_field
    }

    pub fn identity_column(&self) -> &str {
        &self.identity_column
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Data column for a field name.
    pub fn column(&self, field: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Field name stored in `column`, identity included.
    pub fn field_for_column(&self, column: &str) -> Option<&'static str> {
        if column == self.identity_column {
            return Some(self.identity_field);
        }
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.field)
    }

    /// `true` if `field` is the identity or a data field.
    pub fn has_field(&self, field: &str) -> bool {
        field == self.identity_field || self.column(field).is_some()
    }
}
