//! Database provider trait
//!
//! This trait defines the interface that all database implementations must provide.

use crate::schema::{PageData, TableInfo, TableSchema};
use crate::statement::Mutation;
use crate::ErrorKind;
use async_trait::async_trait;
use thiserror::Error;

/// Database provider trait for catalog listing, paging and row mutations
///
/// Every call opens its own connection, performs its round trips and
/// closes the connection before returning. Nothing is cached between calls.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// List all table names in the database
    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError>;

    /// Introspect the columns and primary key of a table
    ///
    /// # Errors
    ///
    /// [`DatabaseError::TableNotFound`] when the table does not exist or is
    /// not accessible.
    async fn load_schema(&self, table: &str) -> Result<TableSchema, DatabaseError>;

    /// Load one page of rows ordered by the first column
    ///
    /// Counts the rows, clamps `page` into the valid range and fetches
    /// `page_size` rows at the resulting offset, on one connection.
    ///
    /// # Arguments
    ///
    /// * `table` - Name of the table
    /// * `page` - Requested page, 1-based
    /// * `page_size` - Rows per page
    async fn load_page(
        &self,
        table: &str,
        page: u64,
        page_size: u64,
    ) -> Result<PageData, DatabaseError>;

    /// Execute a single autocommitted INSERT, UPDATE or DELETE
    ///
    /// # Returns
    ///
    /// Number of rows affected
    async fn execute_mutation(&self, mutation: &Mutation) -> Result<u64, DatabaseError>;
}

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database could not be opened or the connection dropped
    #[error("Connection error: {0}")]
    Connection(String),

    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Schema could not be read
    #[error("Schema error: {0}")]
    Schema(String),

    /// Statement rejected by the database
    #[error("Database error: {0}")]
    Query(String),

    /// Update or delete requested on a table without a primary key
    #[error("Primary key not found for table {0}")]
    PrimaryKeyNotFound(String),

    /// The table or row cannot support the requested statement
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid column name
    #[error("Invalid column: {0}")]
    InvalidColumn(String),
}

impl DatabaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::Connection(_) => ErrorKind::Connection,
            DatabaseError::TableNotFound(_) | DatabaseError::Schema(_) => ErrorKind::Schema,
            DatabaseError::Query(_) => ErrorKind::Query,
            DatabaseError::PrimaryKeyNotFound(_) | DatabaseError::Configuration(_) => {
                ErrorKind::Configuration
            }
            DatabaseError::InvalidColumn(_) => ErrorKind::Input,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DatabaseError::Connection(error.to_string()),
            _ => DatabaseError::Query(error.to_string()),
        }
    }
}
