//! Schema and transfer types
//!
//! These types represent schema information discovered at runtime and the
//! payloads exchanged between the browser, the editor and the API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single row, keyed by column name
pub type RowRecord = serde_json::Map<String, Value>;

/// Column schema of a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Name of the table
    pub name: String,

    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,

    /// Primary key column names in key order (empty when the table has none)
    pub primary_key: Vec<String>,
}

impl TableSchema {
    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Columns the user supplies values for (everything not generated)
    pub fn editable_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|column| !column.is_generated)
    }

    /// Columns whose value is written from form text
    ///
    /// Binary columns are shown but never written back, so their stored
    /// bytes survive an edit of the other fields.
    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.editable_columns().filter(|column| !column.is_binary)
    }

    /// Primary key columns in key order
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.primary_key
            .iter()
            .filter_map(move |name| self.column(name))
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}

/// Information about a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// SQL data type as reported by the catalog (e.g. "INTEGER", "character varying(40)")
    pub data_type: String,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// Default value expression (if any)
    pub default_value: Option<String>,

    /// Whether this column is part of the primary key
    pub is_primary_key: bool,

    /// Whether the database assigns this column's value (auto-increment, identity, generated)
    pub is_generated: bool,

    /// Whether values are raw bytes, rendered as an `x'…'` hex literal
    #[serde(default)]
    pub is_binary: bool,
}

/// Information about a table (for listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    /// Table name
    pub name: String,
}

/// Response from listing tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesResponse {
    /// List of tables
    pub tables: Vec<TableInfo>,
}

/// One page of rows as returned by a provider
#[derive(Debug, Clone, Default)]
pub struct PageData {
    /// Page number actually loaded (clamped to the last page)
    pub page: u64,

    /// Total number of rows in the table
    pub total_rows: u64,

    /// Column names in table order
    pub columns: Vec<String>,

    /// The rows on this page
    pub rows: Vec<RowRecord>,
}

/// Snapshot of the browser for rendering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserView {
    /// Tables available in the selector
    pub tables: Vec<String>,

    /// Currently selected table
    pub current_table: Option<String>,

    /// Current page (1-based)
    pub current_page: u64,

    /// Total pages for the current table
    pub total_pages: u64,

    /// Total rows in the current table
    pub total_rows: u64,

    /// "Page X of Y"
    pub page_label: String,

    /// Whether the Previous control is enabled
    pub can_previous: bool,

    /// Whether the Next control is enabled
    pub can_next: bool,

    /// Column names of the grid
    pub columns: Vec<String>,

    /// Rows on the current page
    pub rows: Vec<RowRecord>,

    /// Changes whenever the rows on screen change; row indexes sent back
    /// must carry the version they were read from
    pub version: u64,

    /// Why the grid could not be refreshed after the last change
    pub load_error: Option<String>,

    /// The open record editor, if any
    pub editor: Option<EditorView>,
}

/// Snapshot of the record editor for rendering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    /// Identifies this editor session; saves must name it
    pub id: u64,

    /// Table being edited
    pub table: String,

    /// Insert or update
    pub mode: crate::editor::EditorMode,

    /// Editor lifecycle state
    pub state: crate::editor::EditorState,

    /// One entry per editable column
    pub fields: Vec<crate::editor::FormField>,

    /// Message of the last failed save
    pub last_error: Option<String>,
}

/// Identifies the editor session a cancel is meant for
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelEditorQuery {
    #[serde(default)]
    pub editor_id: Option<u64>,
}

/// Request to select a table
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectTableRequest {
    pub name: String,
}

/// Request targeting a row on the current page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSelection {
    pub row_index: usize,

    /// Browser version the index was read from
    pub version: u64,
}

/// Request to open the record editor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenEditorRequest {
    /// Row to edit; absent to add a new row
    #[serde(default)]
    pub row_index: Option<usize>,

    /// Browser version the index was read from; required with `row_index`
    #[serde(default)]
    pub version: Option<u64>,
}

/// Request to save the open record editor
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEditorRequest {
    /// Id of the editor session being saved
    pub editor_id: u64,

    /// Field values by column name; `null` binds SQL NULL
    #[serde(default)]
    pub values: HashMap<String, Option<String>>,
}

/// Text shown in a form field for a stored value
///
/// `NULL` has no text; strings are shown verbatim and everything else in
/// its JSON rendering.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
