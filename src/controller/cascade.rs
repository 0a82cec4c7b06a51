use super::{Controller, MAX_CASCADE_DEPTH, ids_from_rows};
use crate::controller::options::Constructors;
use crate::core::{ControllerError, Operation, Result, Value};
use crate::sql::SqlGenerator;
use async_recursion::async_recursion;
use std::sync::Arc;
use tracing::{Level, event};

/// Parent identities bound per child delete statement. Stays below the
/// SQLite (32766) and PostgreSQL (65535) bind parameter limits.
pub const CASCADE_CHUNK_SIZE: usize = 900;

impl Controller {
    /// Deletes the children of `ids` along every relation of `parent`, then
    /// their children, until [`MAX_CASCADE_DEPTH`].
    ///
    /// Relations without a constructor are skipped. A failure stops the
    /// traversal; rows deleted before it stay deleted.
    #[async_recursion]
    pub(super) async fn cascade(
        &self,
        parent: Arc<SqlGenerator>,
        ids: Vec<i64>,
        depth: usize,
        constructors: &Constructors,
    ) -> Result<()> {
        if depth >= MAX_CASCADE_DEPTH || ids.is_empty() {
            return Ok(());
        }

        let op = Operation::CascadeDelete;

        for relation in parent.schema().relations() {
            let Some(child) = constructors.build(relation.name) else {
                event!(
                    Level::DEBUG,
                    relation = relation.name,
                    parent = parent.schema().type_name(),
                    "no constructor for relation, not cascading"
                );
                continue;
            };

            let wrap = |source: ControllerError| ControllerError::Cascade {
                relation: relation.name.to_string(),
                depth,
                parent_ids: ids.clone(),
                source: Box::new(source),
            };

            let generator = self
                .registry
                .resolve(child.as_ref())
                .map_err(|source| wrap(ControllerError::Schema { op, source }))?;

            let mut child_ids = Vec::new();
            for chunk in ids.chunks(CASCADE_CHUNK_SIZE) {
                let sql = generator
                    .delete_returning_ids_in(relation.foreign_field, chunk.len())
                    .map_err(|source| wrap(ControllerError::Schema { op, source }))?;
                let params: Vec<Value> = chunk.iter().copied().map(Value::Integer).collect();
                let rows = self.query(op, &sql, &params).await.map_err(wrap)?;
                child_ids.extend(
                    ids_from_rows(generator.schema().identity_field(), rows)
                        .map_err(|source| wrap(ControllerError::Scan { op, source }))?,
                );
            }
            event!(
                Level::DEBUG,
                relation = relation.name,
                depth,
                deleted = child_ids.len(),
                "cascade deleted children"
            );

            self.cascade(generator, child_ids, depth + 1, constructors)
                .await?;
        }
        Ok(())
    }
}
