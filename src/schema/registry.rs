use super::Schema;
use crate::core::SchemaError;
use crate::record::Record;
use crate::sql::{Dialect, SqlGenerator};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Settings shared by every generator the registry builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    pub table_prefix: String,
    pub dialect: Dialect,
}

impl RegistryOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            table_prefix: String::new(),
            dialect,
        }
    }

    pub fn table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = prefix.to_string();
        self
    }
}

/// One SQL generator per record type, keyed by type name.
///
/// Entries are built lazily on first use or registered up front; after
/// warm-up the registry is read-mostly. An entry changes only through
/// [`register`](Self::register) with `overwrite = true`.
#[derive(Debug)]
pub struct SchemaRegistry {
    options: RegistryOptions,
    generators: RwLock<HashMap<&'static str, Arc<SqlGenerator>>>,
}

impl SchemaRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            options,
            generators: RwLock::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Cached generator for the record's type, registering it if absent.
    pub fn resolve(&self, record: &dyn Record) -> Result<Arc<SqlGenerator>, SchemaError> {
        {
            let generators = self.generators.read()?;
            if let Some(generator) = generators.get(record.type_name()) {
                return Ok(generator.clone());
            }
        }

        let generator = Arc::new(self.build(record, None)?);
        let mut generators = self.generators.write()?;
        // A concurrent first use may have won the race; keep its entry.
        Ok(generators
            .entry(record.type_name())
            .or_insert(generator)
            .clone())
    }

    /// Builds and stores a generator for the record's type.
    ///
    /// With a `parent` the new schema maps onto the parent's table (see
    /// [`Schema::derive_from_parent`]); the parent is resolved first. Without
    /// `overwrite` an existing entry is kept and this is a no-op.
    pub fn register(
        &self,
        record: &dyn Record,
        parent: Option<&dyn Record>,
        overwrite: bool,
    ) -> Result<(), SchemaError> {
        if !overwrite && self.contains(record.type_name())? {
            return Ok(());
        }

        let parent = parent.map(|p| self.resolve(p)).transpose()?;
        let generator = Arc::new(self.build(record, parent.as_deref())?);

        let mut generators = self.generators.write()?;
        if overwrite {
            generators.insert(record.type_name(), generator);
        } else {
            generators.entry(record.type_name()).or_insert(generator);
        }
        Ok(())
    }

    /// Field name stored in `column` for the record's type.
    pub fn field_name_for_column(
        &self,
        record: &dyn Record,
        column: &str,
    ) -> Result<Option<&'static str>, SchemaError> {
        Ok(self.resolve(record)?.schema().field_for_column(column))
    }

    pub fn contains(&self, type_name: &str) -> Result<bool, SchemaError> {
        Ok(self.generators.read()?.contains_key(type_name))
    }

    pub fn len(&self) -> usize {
        self.generators.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(
        &self,
        record: &dyn Record,
        parent: Option<&SqlGenerator>,
    ) -> Result<SqlGenerator, SchemaError> {
        let schema = match parent {
            Some(parent) => Schema::derive_from_parent(record, parent.schema())?,
            None => Schema::derive(record, &self.options.table_prefix)?,
        };
        debug!(
            type_name = schema.type_name(),
            table = schema.table(),
            "derived schema"
        );
        Ok(SqlGenerator::new(schema, self.options.dialect))
    }
}
