//! Persistence controller.
//!
//! [`Controller`] turns record values into parameterized statements through
//! the cached per-type [`SqlGenerator`], runs them on a [`Connection`] and
//! binds rows back into records. Every operation validates its input against
//! the record's schema before touching the database.

mod cascade;
pub mod options;

use crate::connection::{self, Connection, DatabaseConfig, Row};
use crate::core::{
    ControllerError, DriverError, FieldError, FieldMap, Operation, Result, StringMap,
    ValidationTarget, Value,
};
use crate::introspect;
use crate::record::Record;
use crate::schema::{RegistryOptions, SchemaRegistry};
use crate::sql::SqlGenerator;
use crate::validate;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

pub use cascade::CASCADE_CHUNK_SIZE;
pub use options::{
    Constructors, DeleteMultipleOptions, DeleteOptions, GetCountOptions, GetOptions,
    RecordFactory, SaveOptions, UpdateMultipleOptions,
};

/// Cascading delete stops at this depth.
pub const MAX_CASCADE_DEPTH: usize = 3;

/// Entry point for persisting records.
///
/// Cheap to clone; clones share the connection and the schema registry.
#[derive(Clone)]
pub struct Controller {
    conn: Arc<dyn Connection>,
    registry: Arc<SchemaRegistry>,
}

impl Controller {
    /// Controller over `conn`, deriving table names with `table_prefix`.
    pub fn new(conn: Arc<dyn Connection>, table_prefix: &str) -> Self {
        let options = RegistryOptions::new(conn.dialect()).table_prefix(table_prefix);
        Self::with_registry(conn, Arc::new(SchemaRegistry::new(options)))
    }

    /// Controller sharing an existing registry.
    pub fn with_registry(conn: Arc<dyn Connection>, registry: Arc<SchemaRegistry>) -> Self {
        Self { conn, registry }
    }

    /// Opens the configured database and builds a controller over it.
    pub async fn connect(config: &DatabaseConfig) -> std::result::Result<Self, DriverError> {
        let conn = connection::connect(config).await?;
        event!(Level::INFO, url = %config.to_url(), "controller connected");
        Ok(Self::new(conn, &config.table_prefix))
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    fn generator(&self, op: Operation, record: &dyn Record) -> Result<Arc<SqlGenerator>> {
        self.registry
            .resolve(record)
            .map_err(|source| ControllerError::Schema { op, source })
    }

    async fn execute(&self, op: Operation, sql: &str, params: &[Value]) -> Result<u64> {
        event!(Level::DEBUG, %op, sql, params = params.len(), "execute");
        self.conn
            .execute(sql, params)
            .await
            .map_err(|source| ControllerError::Query { op, source })
    }

    async fn query(&self, op: Operation, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        event!(Level::DEBUG, %op, sql, params = params.len(), "query");
        self.conn
            .query(sql, params)
            .await
            .map_err(|source| ControllerError::Query { op, source })
    }

    /// Validates and writes the record.
    ///
    /// Identity `0` inserts and stores the generated identity in the record.
    /// Any other identity upserts, or with `no_insert` updates the existing
    /// row only; an absent row is then silently left absent.
    pub async fn save(&self, record: &mut dyn Record, opts: &SaveOptions) -> Result<()> {
        let op = Operation::Save;
        let generator = self.generator(op, record)?;
        let schema = generator.schema();

        let invalid = validate::validate_record(schema, record);
        if !invalid.is_empty() {
            return Err(validation(op, ValidationTarget::Record, invalid));
        }

        let span = info_span!(
            "struct2db.save",
            type_name = schema.type_name(),
            id = introspect::identity_value(record)
        );
        async {
            let id = introspect::identity_value(record);
            if id == 0 {
                let params = introspect::field_values(schema, record, false);
                let rows = self.query(op, &generator.insert(), &params).await?;
                let generated = rows
                    .into_iter()
                    .next()
                    .and_then(|row| row.into_iter().next())
                    .ok_or(ControllerError::Scan {
                        op,
                        source: FieldError::NoRow,
                    })?;
                introspect::bind_identity(schema, record, &generated)
                    .map_err(|source| ControllerError::Scan { op, source })?;
            } else if opts.no_insert {
                let mut params = introspect::field_values(schema, record, false);
                params.push(Value::Integer(id));
                self.execute(op, &generator.update_by_id(), &params).await?;
            } else {
                let params = introspect::field_values(schema, record, true);
                self.execute(op, &generator.upsert(), &params).await?;
            }
            event!(Level::DEBUG, id = introspect::identity_value(record), "record saved");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Reads the row with identity `id` into the record.
    ///
    /// A missing row is not an error: the record is reset to zero values.
    pub async fn load(&self, record: &mut dyn Record, id: &str) -> Result<()> {
        let op = Operation::Load;
        let id: i64 = id.parse().map_err(|source| ControllerError::Conversion {
            op,
            input: id.to_string(),
            source,
        })?;
        let generator = self.generator(op, record)?;

        let rows = self
            .query(op, &generator.select_by_id(), &[Value::Integer(id)])
            .await?;
        match rows.into_iter().next() {
            Some(row) => introspect::scan_row(generator.schema(), record, row)
                .map_err(|source| ControllerError::Scan { op, source }),
            None => {
                introspect::reset_fields(record);
                Ok(())
            }
        }
    }

    /// Deletes the record's row, resets the record and cascades to children.
    ///
    /// Identity `0` is a no-op. A cascade failure is returned after the
    /// record's own row is already gone.
    pub async fn delete(&self, record: &mut dyn Record, opts: &DeleteOptions) -> Result<()> {
        let op = Operation::Delete;
        let generator = self.generator(op, record)?;
        let id = introspect::identity_value(record);
        if id == 0 {
            return Ok(());
        }

        let span = info_span!("struct2db.delete", type_name = generator.schema().type_name(), id);
        async {
            self.execute(op, &generator.delete_by_id(), &[Value::Integer(id)])
                .await?;
            introspect::reset_fields(record);

            self.cascade(generator.clone(), vec![id], 0, &opts.constructors)
                .await
                .inspect_err(log_inconsistency)
        }
        .instrument(span)
        .await
    }

    /// Deletes every row matching the filters and returns their identities.
    ///
    /// Cascades over the deleted identities starting at
    /// `cascade_delete_depth`; at [`MAX_CASCADE_DEPTH`] or beyond nothing
    /// cascades.
    pub async fn delete_multiple<R, F>(&self, factory: F, opts: &DeleteMultipleOptions) -> Result<Vec<i64>>
    where
        R: Record,
        F: Fn() -> R,
    {
        let op = Operation::DeleteMultiple;
        let record = factory();
        let generator = self.generator(op, &record)?;
        let schema = generator.schema();

        check_filters(op, schema, &opts.filters, opts.raw.as_ref())?;
        let sql = generator
            .delete_returning_ids(&opts.filters, opts.raw.as_ref())
            .map_err(|source| ControllerError::Schema { op, source })?;
        let params = filter_params(&opts.filters, opts.raw.as_ref());

        let rows = self.query(op, &sql, &params).await?;
        let ids = ids_from_rows(schema.identity_field(), rows)
            .map_err(|source| ControllerError::Scan { op, source })?;
        event!(Level::DEBUG, type_name = schema.type_name(), deleted = ids.len(), "rows deleted");

        if opts.cascade_delete_depth < MAX_CASCADE_DEPTH {
            self.cascade(generator.clone(), ids.clone(), opts.cascade_delete_depth, &opts.constructors)
                .await
                .inspect_err(log_inconsistency)?;
        }
        Ok(ids)
    }

    /// Sets `values` on every row matching the filters.
    pub async fn update_multiple<R, F>(
        &self,
        factory: F,
        values: &FieldMap,
        opts: &UpdateMultipleOptions,
    ) -> Result<()>
    where
        R: Record,
        F: Fn() -> R,
    {
        let op = Operation::UpdateMultiple;
        if values.is_empty() {
            return Err(ControllerError::MissingValues { op });
        }

        let record = factory();
        let generator = self.generator(op, &record)?;
        let schema = generator.schema();

        let converted;
        let values = if opts.convert_values_from_string {
            let as_text: StringMap = values
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect();
            converted = introspect::coerce_string_map(&record, &as_text);
            if converted.is_empty() {
                return Err(ControllerError::MissingValues { op });
            }
            &converted
        } else {
            values
        };

        let invalid = validate::validate_values(schema, values);
        if !invalid.is_empty() {
            return Err(validation(op, ValidationTarget::Values, invalid));
        }
        check_filters(op, schema, &opts.filters, opts.raw.as_ref())?;

        let sql = generator
            .update(values, &opts.filters, opts.raw.as_ref())
            .map_err(|source| ControllerError::Schema { op, source })?;
        let mut params = introspect::map_values(values);
        params.extend(filter_params(&opts.filters, opts.raw.as_ref()));

        self.execute(op, &sql, &params).await?;
        Ok(())
    }

    /// Records matching the options, in the requested order.
    pub async fn get<R, F>(&self, factory: F, opts: &GetOptions) -> Result<Vec<R>>
    where
        R: Record,
        F: Fn() -> R,
    {
        self.get_with(factory, opts, |record| record).await
    }

    /// Like [`get`](Self::get), passing each bound record through `transform`.
    pub async fn get_with<R, F, T, M>(&self, factory: F, opts: &GetOptions, mut transform: M) -> Result<Vec<T>>
    where
        R: Record,
        F: Fn() -> R,
        M: FnMut(R) -> T,
    {
        let op = Operation::Get;
        let probe = factory();
        let generator = self.generator(op, &probe)?;
        let schema = generator.schema();

        let invalid = validate::validate_order(schema, &opts.order);
        if !invalid.is_empty() {
            return Err(validation(op, ValidationTarget::Order, invalid));
        }
        check_filters(op, schema, &opts.filters, opts.raw.as_ref())?;

        let sql = generator
            .select(&opts.order, opts.limit, opts.offset, &opts.filters, opts.raw.as_ref())
            .map_err(|source| ControllerError::Schema { op, source })?;
        let params = filter_params(&opts.filters, opts.raw.as_ref());

        let rows = self.query(op, &sql, &params).await?;
        let mut out = Vec::with_capacity(rows.len());
        let mut next = Some(probe);
        for row in rows {
            let mut record = next.take().unwrap_or_else(&factory);
            introspect::scan_row(schema, &mut record, row)
                .map_err(|source| ControllerError::Scan { op, source })?;
            out.push(transform(record));
        }
        Ok(out)
    }

    /// Number of rows matching the filters.
    pub async fn get_count<R, F>(&self, factory: F, opts: &GetCountOptions) -> Result<i64>
    where
        R: Record,
        F: Fn() -> R,
    {
        let op = Operation::GetCount;
        let record = factory();
        let generator = self.generator(op, &record)?;
        let schema = generator.schema();

        check_filters(op, schema, &opts.filters, opts.raw.as_ref())?;
        let sql = generator
            .select_count(&opts.filters, opts.raw.as_ref())
            .map_err(|source| ControllerError::Schema { op, source })?;
        let params = filter_params(&opts.filters, opts.raw.as_ref());

        let rows = self.query(op, &sql, &params).await?;
        match rows.first().and_then(|row| row.first()) {
            Some(Value::Integer(count)) => Ok(*count),
            Some(other) => Err(ControllerError::Scan {
                op,
                source: FieldError::KindMismatch {
                    field: "count".to_string(),
                    expected: crate::record::FieldKind::Int64,
                    found: other.type_name(),
                },
            }),
            None => Err(ControllerError::Scan {
                op,
                source: FieldError::NoRow,
            }),
        }
    }

    /// Registers the record's type ahead of first use, optionally as a view
    /// over `parent`'s table.
    pub fn register(&self, record: &dyn Record, parent: Option<&dyn Record>, overwrite: bool) -> Result<()> {
        self.registry
            .register(record, parent, overwrite)
            .map_err(|source| ControllerError::Schema {
                op: Operation::Register,
                source,
            })
    }

    /// Field of the record's type stored in `column`.
    pub fn field_name_for_column(&self, record: &dyn Record, column: &str) -> Result<Option<&'static str>> {
        self.registry
            .field_name_for_column(record, column)
            .map_err(|source| ControllerError::Schema {
                op: Operation::Lookup,
                source,
            })
    }

    /// Typed values for string input. Unknown keys and unparsable values are
    /// dropped.
    pub fn string_to_field_values(&self, record: &dyn Record, input: &StringMap) -> FieldMap {
        introspect::coerce_string_map(record, input)
    }
}

fn validation(op: Operation, target: ValidationTarget, fields: Vec<String>) -> ControllerError {
    ControllerError::Validation { op, target, fields }
}

fn check_filters(
    op: Operation,
    schema: &crate::schema::Schema,
    filters: &FieldMap,
    raw: Option<&crate::sql::RawFilter>,
) -> Result<()> {
    let invalid = validate::validate_filters(schema, filters, raw);
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(validation(op, ValidationTarget::Filters, invalid))
    }
}

/// Filter map values in key order, then raw arguments.
fn filter_params(filters: &FieldMap, raw: Option<&crate::sql::RawFilter>) -> Vec<Value> {
    let mut params = introspect::map_values(filters);
    if let Some(raw) = raw {
        params.extend(raw.args.iter().cloned());
    }
    params
}

fn ids_from_rows(identity_field: &str, rows: Vec<Row>) -> std::result::Result<Vec<i64>, FieldError> {
    rows.into_iter()
        .map(|row| match row.into_iter().next() {
            Some(Value::Integer(id)) => Ok(id),
            Some(other) => Err(FieldError::KindMismatch {
                field: identity_field.to_string(),
                expected: crate::record::FieldKind::Int64,
                found: other.type_name(),
            }),
            None => Err(FieldError::ColumnCount {
                expected: 1,
                found: 0,
            }),
        })
        .collect()
}

/// Parent identities shown in the inconsistency warning.
const LOGGED_PARENT_IDS: usize = 8;

fn logged_parent_ids(ids: &[i64]) -> &[i64] {
    &ids[..ids.len().min(LOGGED_PARENT_IDS)]
}

fn log_inconsistency(err: &ControllerError) {
    if let ControllerError::Cascade {
        relation,
        depth,
        parent_ids,
        ..
    } = err
    {
        event!(
            Level::WARN,
            relation = %relation,
            depth,
            parents = parent_ids.len(),
            sample = ?logged_parent_ids(parent_ids),
            error = %err.root(),
            "cascade delete failed after parent rows were removed; database may be inconsistent"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_parent_ids_are_capped() {
        let ids: Vec<i64> = (1..=33_000).collect();
        assert_eq!(logged_parent_ids(&ids), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(logged_parent_ids(&[4, 2]), &[4, 2]);
        assert!(logged_parent_ids(&[]).is_empty());
    }
}
