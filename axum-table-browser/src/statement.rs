//! Single-row mutations planned from table schema
//!
//! A [`Mutation`] names the table, the columns to bind and the key that
//! targets the row. Providers render it into their SQL dialect; values are
//! always bound as parameters and never interpolated.

use crate::database::{parse_blob_literal, quote_identifier};
use crate::database::traits::DatabaseError;
use crate::schema::{RowRecord, TableSchema};
use serde_json::Value;
use std::collections::HashMap;

/// Field text by column name; `None` binds SQL NULL
pub type FieldValues = HashMap<String, Option<String>>;

/// A column bound to user-entered text
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub column: String,
    pub data_type: String,
    pub value: Option<String>,
}

/// A primary key column bound to the value stored in the row
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub column: String,
    pub data_type: String,
    pub value: Value,
    /// Raw bytes of a binary key, bound in place of `value`
    pub bytes: Option<Vec<u8>>,
}

impl KeyValue {
    fn parameter(&self) -> Parameter<'_> {
        match &self.bytes {
            Some(bytes) => Parameter::Bytes(bytes),
            None => Parameter::Key(&self.value),
        }
    }
}

/// A bound statement parameter, in placeholder order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parameter<'a> {
    Text(Option<&'a str>),
    Key(&'a Value),
    Bytes(&'a [u8]),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// `INSERT INTO table (values…) VALUES (…)`
    Insert {
        table: String,
        values: Vec<ColumnValue>,
    },
    /// `UPDATE table SET assignments… WHERE key…`
    Update {
        table: String,
        assignments: Vec<ColumnValue>,
        key: Vec<KeyValue>,
    },
    /// `DELETE FROM table WHERE key…`
    Delete { table: String, key: Vec<KeyValue> },
}

impl Mutation {
    /// Plan an insert over every writable column
    ///
    /// Columns missing from `values` bind NULL; binary columns are left to
    /// their default.
    pub fn insert(schema: &TableSchema, values: &FieldValues) -> Mutation {
        Mutation::Insert {
            table: schema.name.clone(),
            values: schema
                .writable_columns()
                .map(|column| ColumnValue {
                    column: column.name.clone(),
                    data_type: column.data_type.clone(),
                    value: values.get(&column.name).cloned().flatten(),
                })
                .collect(),
        }
    }

    /// Plan an update of `existing`, keyed on the primary key
    ///
    /// Key columns are matched against the values stored in `existing` and
    /// are never part of the SET list, and neither are binary columns.
    pub fn update(
        schema: &TableSchema,
        existing: &RowRecord,
        values: &FieldValues,
    ) -> Result<Mutation, DatabaseError> {
        let key = row_key(schema, existing)?;

        let assignments: Vec<ColumnValue> = schema
            .writable_columns()
            .filter(|column| !column.is_primary_key)
            .map(|column| ColumnValue {
                column: column.name.clone(),
                data_type: column.data_type.clone(),
                value: values.get(&column.name).cloned().flatten(),
            })
            .collect();

        if assignments.is_empty() {
            return Err(DatabaseError::Configuration(format!(
                "Table {} has no editable columns outside its primary key",
                schema.name
            )));
        }

        Ok(Mutation::Update {
            table: schema.name.clone(),
            assignments,
            key,
        })
    }

    /// Plan a delete of `row`, keyed on the primary key
    pub fn delete(schema: &TableSchema, row: &RowRecord) -> Result<Mutation, DatabaseError> {
        Ok(Mutation::Delete {
            table: schema.name.clone(),
            key: row_key(schema, row)?,
        })
    }

    pub fn table(&self) -> &str {
        match self {
            Mutation::Insert { table, .. }
            | Mutation::Update { table, .. }
            | Mutation::Delete { table, .. } => table,
        }
    }

    /// Parameters in the order their placeholders appear
    pub fn parameters(&self) -> Vec<Parameter<'_>> {
        match self {
            Mutation::Insert { values, .. } => values
                .iter()
                .map(|value| Parameter::Text(value.value.as_deref()))
                .collect(),
            Mutation::Update {
                assignments, key, ..
            } => assignments
                .iter()
                .map(|value| Parameter::Text(value.value.as_deref()))
                .chain(key.iter().map(KeyValue::parameter))
                .collect(),
            Mutation::Delete { key, .. } => {
                key.iter().map(KeyValue::parameter).collect()
            }
        }
    }

    /// Render the statement text
    ///
    /// `placeholder` receives the 1-based parameter position and the
    /// column's data type and returns the placeholder expression for it.
    pub fn to_sql<F>(&self, placeholder: F) -> String
    where
        F: Fn(usize, &str) -> String,
    {
        let mut position = 0;
        let mut next_placeholder = |data_type: &str| {
            position += 1;
            placeholder(position, data_type)
        };

        match self {
            Mutation::Insert { table, values } if values.is_empty() => {
                format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(table))
            }
            Mutation::Insert { table, values } => {
                let columns: Vec<String> = values
                    .iter()
                    .map(|value| quote_identifier(&value.column))
                    .collect();
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| next_placeholder(&value.data_type))
                    .collect();
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    quote_identifier(table),
                    columns.join(", "),
                    placeholders.join(", ")
                )
            }
            Mutation::Update {
                table,
                assignments,
                key,
            } => {
                let set_clause: Vec<String> = assignments
                    .iter()
                    .map(|value| {
                        format!(
                            "{} = {}",
                            quote_identifier(&value.column),
                            next_placeholder(&value.data_type)
                        )
                    })
                    .collect();
                let where_clause = key_condition(key, &mut next_placeholder);
                format!(
                    "UPDATE {} SET {} WHERE {}",
                    quote_identifier(table),
                    set_clause.join(", "),
                    where_clause
                )
            }
            Mutation::Delete { table, key } => {
                let where_clause = key_condition(key, &mut next_placeholder);
                format!(
                    "DELETE FROM {} WHERE {}",
                    quote_identifier(table),
                    where_clause
                )
            }
        }
    }

    /// Columns receiving values (INSERT columns or SET columns)
    pub fn bound_columns(&self) -> Vec<&str> {
        match self {
            Mutation::Insert { values, .. } => values.iter().map(|v| v.column.as_str()).collect(),
            Mutation::Update { assignments, .. } => {
                assignments.iter().map(|v| v.column.as_str()).collect()
            }
            Mutation::Delete { .. } => Vec::new(),
        }
    }

    /// Columns of the WHERE clause
    pub fn key_columns(&self) -> Vec<&str> {
        match self {
            Mutation::Insert { .. } => Vec::new(),
            Mutation::Update { key, .. } | Mutation::Delete { key, .. } => {
                key.iter().map(|k| k.column.as_str()).collect()
            }
        }
    }
}

fn key_condition<F>(key: &[KeyValue], next_placeholder: &mut F) -> String
where
    F: FnMut(&str) -> String,
{
    key.iter()
        .map(|part| {
            format!(
                "{} = {}",
                quote_identifier(&part.column),
                next_placeholder(&part.data_type)
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn row_key(schema: &TableSchema, row: &RowRecord) -> Result<Vec<KeyValue>, DatabaseError> {
    if !schema.has_primary_key() {
        return Err(DatabaseError::PrimaryKeyNotFound(schema.name.clone()));
    }

    schema
        .key_columns()
        .map(|column| {
            let value = match row.get(&column.name) {
                Some(value) if !value.is_null() => value,
                _ => {
                    return Err(DatabaseError::Configuration(format!(
                        "Row has no value for primary key column {}",
                        column.name
                    )))
                }
            };

            let bytes = match value {
                Value::String(text) if column.is_binary => {
                    Some(parse_blob_literal(text).ok_or_else(|| {
                        DatabaseError::Configuration(format!(
                            "Key column {} holds no readable blob",
                            column.name
                        ))
                    })?)
                }
                _ => None,
            };

            Ok(KeyValue {
                column: column.name.clone(),
                data_type: column.data_type.clone(),
                value: value.clone(),
                bytes,
            })
        })
        .collect()
}
