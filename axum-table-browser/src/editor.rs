//! Record editor
//!
//! Builds an input form from a table's live schema and saves it as a single
//! INSERT (no existing row) or UPDATE (existing row) statement.
//!
//! Lifecycle: `Opening → SchemaLoaded → FormReady → Saving → Saved`. A failed
//! save returns to `FormReady` with [`RecordEditor::last_error`] set so the
//! user can correct the input. A schema that cannot be loaded cancels the
//! editor before it shows a form; [`RecordEditor::cancel`] closes it
//! explicitly.

use crate::database::traits::DatabaseProvider;
use crate::schema::{display_value, EditorView, RowRecord, TableSchema};
use crate::statement::{FieldValues, Mutation};
use crate::{Error, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorState {
    Opening,
    SchemaLoaded,
    FormReady,
    Saving,
    Saved,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorMode {
    Insert,
    Update,
}

/// One labeled input of the form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    /// Column name, also the label
    pub name: String,

    /// Column data type, shown as a hint
    pub data_type: String,

    /// Current text; `None` means no value (binds NULL)
    pub value: Option<String>,

    /// Binary fields, and key fields of an existing row, are shown but never
    /// written
    pub read_only: bool,
}

/// An open editor session for one table
#[derive(Debug, Clone)]
pub struct RecordEditor {
    id: u64,
    schema: TableSchema,
    existing: Option<RowRecord>,
    fields: Vec<FormField>,
    state: EditorState,
    last_error: Option<String>,
}

impl RecordEditor {
    /// Start an editor for `table` in the `Opening` state
    ///
    /// The schema is not known yet; [`RecordEditor::load_schema`] and
    /// [`RecordEditor::build_form`] move it on to `FormReady`.
    pub fn new(table: &str, existing: Option<RowRecord>) -> Self {
        Self {
            id: 0,
            schema: TableSchema {
                name: table.to_string(),
                columns: Vec::new(),
                primary_key: Vec::new(),
            },
            existing,
            fields: Vec::new(),
            state: EditorState::Opening,
            last_error: None,
        }
    }

    /// Load the schema of `table` and build the form
    ///
    /// # Errors
    ///
    /// Schema failures (e.g. [`crate::DatabaseError::TableNotFound`]) are
    /// returned as is; no editor exists afterwards.
    pub async fn open<DB>(database: &DB, table: &str, existing: Option<RowRecord>) -> Result<Self>
    where
        DB: DatabaseProvider + ?Sized,
    {
        let mut editor = Self::new(table, existing);
        editor.load_schema(database).await?;
        editor.build_form()?;
        Ok(editor)
    }

    /// Fetch the column schema, fresh on every call
    ///
    /// `Opening → SchemaLoaded`; a failure cancels the editor.
    pub async fn load_schema<DB>(&mut self, database: &DB) -> Result<()>
    where
        DB: DatabaseProvider + ?Sized,
    {
        self.expect_state(EditorState::Opening)?;
        debug!(
            table = self.table(),
            editing = self.existing.is_some(),
            "Loading schema for record editor"
        );

        match database.load_schema(&self.schema.name).await {
            Ok(schema) => {
                self.schema = schema;
                self.state = EditorState::SchemaLoaded;
                Ok(())
            }
            Err(error) => {
                warn!("Closing record editor for '{}': {}", self.table(), error);
                self.state = EditorState::Cancelled;
                self.last_error = Some(error.to_string());
                Err(error.into())
            }
        }
    }

    /// Build the form from the loaded schema
    ///
    /// `SchemaLoaded → FormReady`.
    pub fn build_form(&mut self) -> Result<()> {
        self.expect_state(EditorState::SchemaLoaded)?;
        self.fields = Self::form_fields(&self.schema, self.existing.as_ref());
        self.state = EditorState::FormReady;
        Ok(())
    }

    /// Build an editor from an already loaded schema
    pub fn from_schema(schema: TableSchema, existing: Option<RowRecord>) -> Self {
        let fields = Self::form_fields(&schema, existing.as_ref());
        Self {
            id: 0,
            schema,
            existing,
            fields,
            state: EditorState::FormReady,
            last_error: None,
        }
    }

    /// One field per non-generated column, pre-filled from `existing`
    pub fn form_fields(schema: &TableSchema, existing: Option<&RowRecord>) -> Vec<FormField> {
        schema
            .editable_columns()
            .map(|column| FormField {
                name: column.name.clone(),
                data_type: column.data_type.clone(),
                value: existing
                    .and_then(|row| row.get(&column.name))
                    .and_then(display_value),
                read_only: column.is_binary || (existing.is_some() && column.is_primary_key),
            })
            .collect()
    }

    /// Tag the session with an id clients echo back on save
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn expect_state(&self, expected: EditorState) -> Result<()> {
        if self.state != expected {
            return Err(Error::UnexpectedEditorState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn mode(&self) -> EditorMode {
        if self.existing.is_some() {
            EditorMode::Update
        } else {
            EditorMode::Insert
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Set the text of one field
    pub fn set_value(&mut self, name: &str, value: Option<String>) -> Result<()> {
        let field = self
            .fields
            .iter_mut()
            .find(|field| field.name == name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;

        if field.read_only {
            // resubmitting the unchanged value is how forms post back
            if field.value == value {
                return Ok(());
            }
            return Err(Error::ReadOnlyField(name.to_string()));
        }

        field.value = value;
        Ok(())
    }

    /// Set several fields; nothing changes if any of them is rejected
    pub fn apply_values(&mut self, values: &FieldValues) -> Result<()> {
        let snapshot = self.fields.clone();

        for (name, value) in values {
            if let Err(error) = self.set_value(name, value.clone()) {
                self.fields = snapshot;
                return Err(error);
            }
        }
        Ok(())
    }

    /// The statement a save would execute
    pub fn statement(&self) -> Result<Mutation> {
        let values: FieldValues = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect();

        Ok(match &self.existing {
            None => Mutation::insert(&self.schema, &values),
            Some(existing) => Mutation::update(&self.schema, existing, &values)?,
        })
    }

    /// Execute the INSERT or UPDATE
    ///
    /// On failure the editor stays open with the error recorded. An UPDATE
    /// that matches no row fails with [`Error::RowNotFound`].
    ///
    /// # Returns
    ///
    /// Number of rows affected
    pub async fn save<DB>(&mut self, database: &DB) -> Result<u64>
    where
        DB: DatabaseProvider + ?Sized,
    {
        if self.state != EditorState::FormReady {
            return Err(Error::EditorNotOpen);
        }

        self.state = EditorState::Saving;
        let outcome = match self.statement() {
            Ok(mutation) => database
                .execute_mutation(&mutation)
                .await
                .map_err(Error::from),
            Err(error) => Err(error),
        };
        let outcome = match outcome {
            Ok(0) if self.mode() == EditorMode::Update => {
                Err(Error::RowNotFound(self.table().to_string()))
            }
            other => other,
        };

        match outcome {
            Ok(affected_rows) => {
                info!(table = self.table(), mode = ?self.mode(), "Record saved");
                self.state = EditorState::Saved;
                self.last_error = None;
                Ok(affected_rows)
            }
            Err(error) => {
                warn!("Saving record in '{}' failed: {}", self.table(), error);
                self.state = EditorState::FormReady;
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.state = EditorState::Cancelled;
    }

    pub fn view(&self) -> EditorView {
        EditorView {
            id: self.id,
            table: self.schema.name.clone(),
            mode: self.mode(),
            state: self.state,
            fields: self.fields.clone(),
            last_error: self.last_error.clone(),
        }
    }
}
