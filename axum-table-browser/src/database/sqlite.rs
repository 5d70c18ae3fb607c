//! SQLite database provider implementation

use crate::database::{blob_literal, quote_identifier};
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::pagination::{clamp_page, page_offset, total_pages};
use crate::schema::{ColumnInfo, PageData, RowRecord, TableInfo, TableSchema};
use crate::statement::{Mutation, Parameter};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::{debug, warn};

/// SQLite database provider
///
/// Opens a fresh connection for every operation and closes it afterwards.
pub struct SqliteProvider {
    options: SqliteConnectOptions,
}

impl SqliteProvider {
    /// Create a new SQLite provider
    ///
    /// # Arguments
    ///
    /// * `options` - Options used to open each connection
    pub fn new(options: SqliteConnectOptions) -> Self {
        Self { options }
    }

    /// Create a provider from a `sqlite:` connection URL
    pub fn from_url(url: &str) -> Result<Self, DatabaseError> {
        SqliteConnectOptions::from_str(url)
            .map(Self::new)
            .map_err(|error| DatabaseError::Connection(error.to_string()))
    }

    async fn connect(&self) -> Result<SqliteConnection, DatabaseError> {
        self.options
            .connect()
            .await
            .map_err(|error| DatabaseError::Connection(error.to_string()))
    }

    async fn release(connection: SqliteConnection) {
        if let Err(error) = connection.close().await {
            warn!("Failed to close SQLite connection: {}", error);
        }
    }

    /// Convert a SQLite row to a JSON object
    fn row_to_json(row: &SqliteRow) -> Result<RowRecord, DatabaseError> {
        let mut map = serde_json::Map::new();

        for column in row.columns() {
            let value = Self::extract_column_value(row, column)?;
            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }

    /// Extract a column value from a SQLite row and convert to JSON
    fn extract_column_value(
        row: &SqliteRow,
        column: &sqlx::sqlite::SqliteColumn,
    ) -> Result<Value, DatabaseError> {
        let index = column.ordinal();

        if row.try_get_raw(index)?.is_null() {
            return Ok(Value::Null);
        }

        // SQLite reports declared types; storage may still differ, so every
        // arm falls through to the generic probing below
        match column.type_info().name() {
            "INTEGER" | "BIGINT" | "INT" => {
                if let Ok(value) = row.try_get::<i64, _>(index) {
                    return Ok(Value::Number(value.into()));
                }
            }
            "REAL" | "FLOAT" | "DOUBLE" => {
                if let Ok(value) = row.try_get::<f64, _>(index) {
                    if let Some(number) = serde_json::Number::from_f64(value) {
                        return Ok(Value::Number(number));
                    }
                }
            }
            "BOOLEAN" | "BOOL" => {
                if let Ok(value) = row.try_get::<bool, _>(index) {
                    return Ok(Value::Bool(value));
                }
            }
            "BLOB" => {
                if let Ok(value) = row.try_get::<Vec<u8>, _>(index) {
                    return Ok(Value::String(blob_literal(&value)));
                }
            }
            _ => {
                if let Ok(value) = row.try_get::<String, _>(index) {
                    return Ok(Value::String(value));
                }
            }
        }

        if let Ok(value) = row.try_get::<i64, _>(index) {
            return Ok(Value::Number(value.into()));
        }
        if let Ok(value) = row.try_get::<f64, _>(index) {
            if let Some(number) = serde_json::Number::from_f64(value) {
                return Ok(Value::Number(number));
            }
        }
        if let Ok(value) = row.try_get::<String, _>(index) {
            return Ok(Value::String(value));
        }
        if let Ok(value) = row.try_get::<Vec<u8>, _>(index) {
            return Ok(Value::String(blob_literal(&value)));
        }

        Ok(Value::Null)
    }

    /// Render a mutation with `?` placeholders
    fn build_mutation_sql(mutation: &Mutation) -> String {
        mutation.to_sql(|_, _| "?".to_string())
    }

    /// Bind a primary key value with the SQLite type matching its JSON form
    fn bind_key<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: &'q Value,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    query.bind(integer)
                } else if let Some(float) = number.as_f64() {
                    query.bind(float)
                } else {
                    query.bind(number.to_string())
                }
            }
            Value::String(text) => query.bind(text.as_str()),
            Value::Bool(flag) => query.bind(*flag),
            Value::Null => query.bind(None::<String>),
            other => query.bind(other.to_string()),
        }
    }

    /// Whether a declared column type has BLOB affinity
    ///
    /// Follows SQLite's affinity rules: INT, CHAR, CLOB and TEXT win over
    /// BLOB. Columns without a declared type are treated as text.
    fn has_blob_affinity(declared: &str) -> bool {
        let declared = declared.to_ascii_uppercase();
        declared.contains("BLOB")
            && !["INT", "CHAR", "CLOB", "TEXT"]
                .iter()
                .any(|other| declared.contains(other))
    }

    async fn read_schema(
        connection: &mut SqliteConnection,
        table: &str,
    ) -> Result<TableSchema, DatabaseError> {
        let table_sql: Option<Option<String>> = sqlx::query_scalar(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ? AND name NOT LIKE 'sqlite_%'",
        )
        .bind(table)
        .fetch_optional(&mut *connection)
        .await?;

        let Some(table_sql) = table_sql else {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        };
        let without_rowid = table_sql
            .map(|sql| sql.to_uppercase().contains("WITHOUT ROWID"))
            .unwrap_or(false);

        // table_xinfo returns: cid, name, type, notnull, dflt_value, pk, hidden
        let column_rows = sqlx::query("SELECT * FROM pragma_table_xinfo(?)")
            .bind(table)
            .fetch_all(&mut *connection)
            .await?;

        let mut columns = Vec::new();
        let mut primary_key_columns = Vec::new();

        for row in column_rows {
            let hidden: i64 = row.try_get("hidden")?;
            // hidden columns of virtual tables are never selected
            if hidden == 1 {
                continue;
            }

            let name: String = row.try_get("name")?;
            let data_type: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("notnull")?;
            let default_value = row
                .try_get::<Option<String>, _>("dflt_value")
                .ok()
                .flatten();
            let primary_key: i64 = row.try_get("pk")?;

            let is_primary_key = primary_key > 0;
            if is_primary_key {
                primary_key_columns.push((primary_key, name.clone()));
            }

            columns.push(ColumnInfo {
                name,
                is_binary: Self::has_blob_affinity(&data_type),
                data_type,
                nullable: not_null == 0,
                default_value,
                is_primary_key,
                // 2 = virtual generated, 3 = stored generated
                is_generated: hidden == 2 || hidden == 3,
            });
        }

        if columns.is_empty() {
            return Err(DatabaseError::Schema(format!("Table {} has no columns", table)));
        }

        // A lone INTEGER PRIMARY KEY aliases the rowid and is assigned by SQLite
        if primary_key_columns.len() == 1 && !without_rowid {
            let key_name = &primary_key_columns[0].1;
            if let Some(column) = columns.iter_mut().find(|column| &column.name == key_name) {
                if column.data_type.eq_ignore_ascii_case("INTEGER") {
                    column.is_generated = true;
                }
            }
        }

        primary_key_columns.sort_by_key(|(order, _)| *order);

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            primary_key: primary_key_columns
                .into_iter()
                .map(|(_, name)| name)
                .collect(),
        })
    }

    async fn read_page(
        connection: &mut SqliteConnection,
        table: &str,
        page: u64,
        page_size: u64,
    ) -> Result<PageData, DatabaseError> {
        let schema = Self::read_schema(connection, table).await?;
        let quoted_table = quote_identifier(table);

        let count_query = format!("SELECT COUNT(*) FROM {}", quoted_table);
        let total: i64 = sqlx::query_scalar(&count_query)
            .fetch_one(&mut *connection)
            .await?;
        let total_rows = total as u64;

        let page = clamp_page(page, total_pages(total_rows, page_size));
        let select_query = format!("SELECT * FROM {} ORDER BY 1 LIMIT ? OFFSET ?", quoted_table);
        let rows = sqlx::query(&select_query)
            .bind(page_size as i64)
            .bind(page_offset(page, page_size) as i64)
            .fetch_all(&mut *connection)
            .await?;

        let columns = if let Some(first_row) = rows.first() {
            first_row
                .columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect()
        } else {
            schema.columns.into_iter().map(|column| column.name).collect()
        };

        let rows = rows
            .iter()
            .map(Self::row_to_json)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageData {
            page,
            total_rows,
            columns,
            rows,
        })
    }
}

#[async_trait]
impl DatabaseProvider for SqliteProvider {
    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        let query = "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

        let mut connection = self.connect().await?;
        let result = sqlx::query_scalar::<_, String>(query)
            .fetch_all(&mut connection)
            .await;
        Self::release(connection).await;

        Ok(result?
            .into_iter()
            .map(|name| TableInfo { name })
            .collect())
    }

    async fn load_schema(&self, table: &str) -> Result<TableSchema, DatabaseError> {
        let mut connection = self.connect().await?;
        let result = Self::read_schema(&mut connection, table).await;
        Self::release(connection).await;
        result
    }

    async fn load_page(
        &self,
        table: &str,
        page: u64,
        page_size: u64,
    ) -> Result<PageData, DatabaseError> {
        let mut connection = self.connect().await?;
        let result = Self::read_page(&mut connection, table, page, page_size.max(1)).await;
        Self::release(connection).await;
        result
    }

    async fn execute_mutation(&self, mutation: &Mutation) -> Result<u64, DatabaseError> {
        let sql = Self::build_mutation_sql(mutation);
        debug!(table = mutation.table(), %sql, "Executing mutation");

        let mut query = sqlx::query(&sql);
        for parameter in mutation.parameters() {
            query = match parameter {
                Parameter::Text(text) => query.bind(text),
                Parameter::Key(value) => Self::bind_key(query, value),
                Parameter::Bytes(bytes) => query.bind(bytes),
            };
        }

        let mut connection = self.connect().await?;
        let result = query.execute(&mut connection).await;
        Self::release(connection).await;

        Ok(result?.rows_affected())
    }
}
