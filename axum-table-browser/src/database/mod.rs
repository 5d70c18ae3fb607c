//! Database abstraction layer
//!
//! This module provides a database-agnostic interface for catalog listing,
//! schema introspection, paged reads and single-row mutations.

pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-export the main trait
pub use traits::{DatabaseError, DatabaseProvider};

/// Quote an identifier (table or column name) for SQLite and PostgreSQL
///
/// Both use double quotes for identifiers; embedded double quotes are
/// escaped by doubling them.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Render bytes as an SQL hex blob literal, `x'0a1b'`
pub fn blob_literal(bytes: &[u8]) -> String {
    format!("x'{}'", hex::encode(bytes))
}

/// Bytes of a literal produced by [`blob_literal`]
pub fn parse_blob_literal(text: &str) -> Option<Vec<u8>> {
    let digits = text
        .strip_prefix("x'")
        .or_else(|| text.strip_prefix("X'"))?
        .strip_suffix('\'')?;
    hex::decode(digits).ok()
}
