//! PostgreSQL database provider implementation

use crate::database::quote_identifier;
use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::pagination::{clamp_page, page_offset, total_pages};
use crate::schema::{ColumnInfo, PageData, RowRecord, TableInfo, TableSchema};
use crate::statement::{Mutation, Parameter};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Row};
use std::str::FromStr;
use tracing::{debug, warn};

/// PostgreSQL database provider
///
/// Opens a fresh connection for every operation and closes it afterwards.
/// Only tables in the `public` schema are browsed.
pub struct PostgresProvider {
    options: PgConnectOptions,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider
    ///
    /// # Arguments
    ///
    /// * `options` - Options used to open each connection
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    /// Create a provider from a `postgres://` connection URL
    pub fn from_url(url: &str) -> Result<Self, DatabaseError> {
        PgConnectOptions::from_str(url)
            .map(Self::new)
            .map_err(|error| DatabaseError::Connection(error.to_string()))
    }

    async fn connect(&self) -> Result<PgConnection, DatabaseError> {
        self.options
            .connect()
            .await
            .map_err(|error| DatabaseError::Connection(error.to_string()))
    }

    async fn release(connection: PgConnection) {
        if let Err(error) = connection.close().await {
            warn!("Failed to close PostgreSQL connection: {}", error);
        }
    }

    /// Render a mutation with numbered placeholders cast to the column type
    ///
    /// Every value is bound as text, so the cast lets PostgreSQL parse it
    /// with the column's own input function. The cast names the base type
    /// without modifiers; length and precision are checked on assignment,
    /// where an oversized value fails instead of being truncated.
    fn build_mutation_sql(mutation: &Mutation) -> String {
        mutation.to_sql(|position, data_type| format!("CAST(${} AS {})", position, data_type))
    }

    /// Text form of a primary key value, as fed to its cast
    fn key_text(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Parse one `row_to_json` document
    ///
    /// Numbers keep their exact decimal text, so numeric values survive the
    /// trip through the form.
    fn parse_row(document: &str) -> Result<RowRecord, DatabaseError> {
        match serde_json::from_str::<Value>(document) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(DatabaseError::Query(format!(
                "Unexpected row document: {}",
                other
            ))),
            Err(error) => Err(DatabaseError::Query(error.to_string())),
        }
    }

    async fn read_schema(
        connection: &mut PgConnection,
        table: &str,
    ) -> Result<TableSchema, DatabaseError> {
        let column_query = r#"
            SELECT
                a.attname::text AS column_name,
                CASE a.atttypid
                    WHEN 'pg_catalog.bpchar'::regtype THEN 'bpchar'
                    WHEN 'pg_catalog._bpchar'::regtype THEN 'bpchar[]'
                    WHEN 'pg_catalog.bit'::regtype THEN 'varbit'
                    WHEN 'pg_catalog._bit'::regtype THEN 'varbit[]'
                    ELSE a.atttypid::regtype::text
                END AS data_type,
                NOT a.attnotnull AS nullable,
                pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS column_default,
                (a.attidentity <> '' OR a.attgenerated <> '') AS is_generated
            FROM pg_catalog.pg_attribute a
            JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_catalog.pg_attrdef d
              ON d.adrelid = a.attrelid
              AND d.adnum = a.attnum
            WHERE n.nspname = 'public'
              AND c.relname = $1
              AND c.relkind IN ('r', 'p')
              AND a.attnum > 0
              AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;

        let column_rows = sqlx::query(column_query)
            .bind(table)
            .fetch_all(&mut *connection)
            .await?;

        if column_rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }

        let primary_key_query = r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = 'public'
              AND tc.table_name = $1
              AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
        "#;

        let primary_key: Vec<String> = sqlx::query_scalar(primary_key_query)
            .bind(table)
            .fetch_all(&mut *connection)
            .await?;

        let columns: Vec<ColumnInfo> = column_rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("column_name")?;
                let default_value: Option<String> = row.try_get("column_default")?;
                let is_generated: bool = row.try_get("is_generated")?;

                // serial columns are generated through a sequence default
                let is_serial = default_value
                    .as_deref()
                    .is_some_and(|default| default.starts_with("nextval("));

                Ok(ColumnInfo {
                    is_primary_key: primary_key.contains(&name),
                    name,
                    data_type: row.try_get("data_type")?,
                    nullable: row.try_get("nullable")?,
                    default_value,
                    is_generated: is_generated || is_serial,
                    // bytea renders as \x… text and casts back unchanged
                    is_binary: false,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            primary_key,
        })
    }

    async fn read_page(
        connection: &mut PgConnection,
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

        // row_to_json renders every column type, including ones without a
        // Rust decoder, in the text form PostgreSQL accepts back on input
        let select_query = format!(
            "SELECT row_to_json(page_rows)::text FROM (SELECT * FROM {} ORDER BY 1 OFFSET $1 ROWS FETCH NEXT $2 ROWS ONLY) AS page_rows",
            quoted_table
        );
        let documents: Vec<String> = sqlx::query_scalar(&select_query)
            .bind(page_offset(page, page_size) as i64)
            .bind(page_size as i64)
            .fetch_all(&mut *connection)
            .await?;

        let rows = documents
            .iter()
            .map(|document| Self::parse_row(document))
            .collect::<Result<Vec<RowRecord>, _>>()?;

        Ok(PageData {
            page,
            total_rows,
            columns: schema.columns.into_iter().map(|column| column.name).collect(),
            rows,
        })
    }
}

#[async_trait]
impl DatabaseProvider for PostgresProvider {
    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        let query = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public'
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

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
                Parameter::Key(value) => query.bind(Self::key_text(value)),
                Parameter::Bytes(bytes) => query.bind(bytes),
            };
        }

        let mut connection = self.connect().await?;
        let result = query.execute(&mut connection).await;
        Self::release(connection).await;

        Ok(result?.rows_affected())
    }
}
