//! Per-operation options.

use crate::core::FieldMap;
use crate::record::Record;
use crate::sql::{Order, RawFilter};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a fresh zero-valued record of one type.
pub type RecordFactory = Arc<dyn Fn() -> Box<dyn Record> + Send + Sync>;

/// Child record factories keyed by relation name, used by cascading delete.
#[derive(Clone, Default)]
pub struct Constructors {
    factories: HashMap<String, RecordFactory>,
}

impl Constructors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the factory for relation `name`.
    ///
    /// ```
    /// use struct2db::{Constructors, record};
    ///
    /// record! {
    ///     #[derive(Default)]
    ///     struct Person {
    ///         #[identity]
    ///         id: i64,
    ///         group_id: i64,
    ///     }
    /// }
    ///
    /// let constructors = Constructors::new().with("persons", || Person::default());
    /// assert!(constructors.contains("persons"));
    /// ```
    pub fn with<R, F>(mut self, name: &str, factory: F) -> Self
    where
        R: Record,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_string(), Arc::new(move || Box::new(factory()) as Box<dyn Record>));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn build(&self, name: &str) -> Option<Box<dyn Record>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for Constructors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("Constructors").field("relations", &names).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Update only; never insert. An absent row is left absent.
    pub no_insert: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub constructors: Constructors,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteMultipleOptions {
    pub filters: FieldMap,
    pub raw: Option<RawFilter>,
    /// Starting depth of the cascade. `MAX_CASCADE_DEPTH` or more disables it.
    pub cascade_delete_depth: usize,
    pub constructors: Constructors,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMultipleOptions {
    pub filters: FieldMap,
    pub raw: Option<RawFilter>,
    /// Treat every value as text and coerce it to the field's kind.
    pub convert_values_from_string: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub order: Vec<Order>,
    /// `0` means no limit.
    pub limit: usize,
    pub offset: usize,
    pub filters: FieldMap,
    pub raw: Option<RawFilter>,
}

#[derive(Debug, Clone, Default)]
pub struct GetCountOptions {
    pub filters: FieldMap,
    pub raw: Option<RawFilter>,
}
