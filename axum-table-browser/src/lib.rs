//! # axum-table-browser
//!
//! A generic database table browser: list tables, page through rows and
//! add, edit or delete single rows through a form generated from the table
//! schema. Served as an Axum layer with an embedded web UI.
//!
//! ## Features
//!
//! - Table listing from the database catalog
//! - Fixed-size pages ordered by the first column
//! - Record editor built from live schema introspection
//! - Insert, update and delete keyed on the declared primary key
//! - Support for SQLite and PostgreSQL
//!
//! ## Security Warning
//!
//! **This is a development tool only!**
//!
//! - No authentication/authorization built-in
//! - Exposes full database schema and data, and allows modifying rows
//! - Should never be exposed in production or public networks
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use axum_table_browser::TableBrowserLayer;
//! use sqlx::sqlite::SqliteConnectOptions;
//! use std::str::FromStr;
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = SqliteConnectOptions::from_str("sqlite:./shop.db")
//!         .unwrap();
//!
//!     let app = Router::new()
//!         .route("/", get(|| async { "Hello, World!" }))
//!         .merge(TableBrowserLayer::sqlite("/browser", options).into_router());
//!
//!     // Serve the application...
//! }
//! ```

// Public modules
pub mod api;
pub mod browser;
pub mod database;
pub mod editor;
pub mod frontend;
pub mod layer;
pub mod pagination;
pub mod schema;
pub mod statement;

// Public exports
pub use browser::{BrowserOptions, TableBrowser};
pub use editor::{EditorMode, EditorState, FormField, RecordEditor};
pub use layer::TableBrowserLayer;
pub use pagination::PageState;
pub use schema::{ColumnInfo, RowRecord, TableSchema};
pub use statement::Mutation;

// Re-export database providers
pub use database::traits::{DatabaseError, DatabaseProvider};

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
pub use database::postgres::PostgresProvider;

use serde::Serialize;
use thiserror::Error;

/// Failure kinds surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The database could not be reached
    Connection,
    /// The table could not be introspected
    Schema,
    /// A statement was rejected by the database
    Query,
    /// The table lacks something an operation needs (e.g. a primary key)
    Configuration,
    /// The request referenced a row or field that does not exist
    Input,
    /// The operation is not valid in the browser's current state
    State,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("No table selected")]
    NoTableSelected,

    #[error("No row at index {0} on the current page")]
    InvalidSelection(usize),

    #[error("No record editor is open")]
    EditorNotOpen,

    #[error("Unknown or generated column: {0}")]
    UnknownField(String),

    #[error("Column {0} is read-only in this form")]
    ReadOnlyField(String),

    #[error("The rows on screen changed; reload and select the row again")]
    StaleView,

    #[error("The record editor was replaced by another one")]
    EditorReplaced,

    #[error("Record editor is {actual:?}, expected {expected:?}")]
    UnexpectedEditorState {
        expected: EditorState,
        actual: EditorState,
    },

    #[error("The selected row no longer exists in {0}")]
    RowNotFound(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Database(error) => error.kind(),
            Error::InvalidSelection(_) | Error::UnknownField(_) | Error::ReadOnlyField(_) => {
                ErrorKind::Input
            }
            Error::NoTableSelected
            | Error::EditorNotOpen
            | Error::StaleView
            | Error::EditorReplaced
            | Error::UnexpectedEditorState { .. }
            | Error::RowNotFound(_) => ErrorKind::State,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
