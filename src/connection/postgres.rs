use super::{Connection, Row};
use crate::core::{DriverError, Value};
use crate::sql::Dialect;
use async_trait::async_trait;
use bytes::BytesMut;
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

/// PostgreSQL backend over one `tokio-postgres` client.
pub struct PgConnection {
    client: Client,
}

impl PgConnection {
    /// Connects without TLS and drives the connection on a spawned task.
    pub async fn connect(url: &str) -> Result<Self, DriverError> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "postgres connection closed with error");
            }
        });
        debug!("postgres connection established");
        Ok(Self { client })
    }
}

#[async_trait]
impl Connection for PgConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DriverError> {
        let params: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        Ok(self.client.execute(sql, &param_refs(&params)).await?)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        let params: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let rows = self.client.query(sql, &param_refs(&params)).await?;
        rows.iter().map(read_row).collect()
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), DriverError> {
        Ok(self.client.batch_execute(sql).await?)
    }
}

fn param_refs<'a>(params: &'a [PgParam<'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

/// Binds a [`Value`] to whatever integer width the server inferred.
#[derive(Debug)]
struct PgParam<'a>(&'a Value);

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Integer(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Text(s) => s.to_sql(ty, out),
            Value::Boolean(b) => b.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        [
            Type::INT2,
            Type::INT4,
            Type::INT8,
            Type::TEXT,
            Type::VARCHAR,
            Type::BPCHAR,
            Type::NAME,
            Type::BOOL,
        ]
        .contains(ty)
    }

    to_sql_checked!();
}

fn read_row(row: &tokio_postgres::Row) -> Result<Row, DriverError> {
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value: Value = if *ty == Type::INT8 {
            row.try_get::<_, Option<i64>>(index)?.into()
        } else if *ty == Type::INT4 {
            row.try_get::<_, Option<i32>>(index)?.into()
        } else if *ty == Type::INT2 {
            row.try_get::<_, Option<i16>>(index)?
                .map(|v| Value::Integer(i64::from(v)))
                .unwrap_or(Value::Null)
        } else if *ty == Type::BOOL {
            row.try_get::<_, Option<bool>>(index)?.into()
        } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
            row.try_get::<_, Option<String>>(index)?.into()
        } else {
            return Err(DriverError::UnsupportedColumn {
                type_name: ty.name().to_string(),
                index,
            });
        };
        values.push(value);
    }
    Ok(values)
}
