//! Table browser
//!
//! Holds the selected table, its pagination state and the rows on screen,
//! and drives the record editor. The database is re-queried after every
//! change; nothing here outlives the page it describes.

use crate::database::traits::DatabaseProvider;
use crate::editor::RecordEditor;
use crate::pagination::{total_pages, PageState, DEFAULT_PAGE_SIZE};
use crate::schema::{BrowserView, RowRecord};
use crate::statement::{FieldValues, Mutation};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Browser settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserOptions {
    /// Rows per page (at least 1)
    pub page_size: u64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl BrowserOptions {
    pub fn with_page_size(page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }
}

/// What a finished editor session means for the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorOutcome {
    /// The row was written; a failed reload afterwards shows up in
    /// [`TableBrowser::load_error`]
    Saved { affected_rows: u64 },
    /// The editor was closed without writing
    Cancelled,
}

pub struct TableBrowser<DB: DatabaseProvider> {
    database: Arc<DB>,
    options: BrowserOptions,
    started: bool,
    tables: Vec<String>,
    current_table: Option<String>,
    page: PageState,
    total_rows: u64,
    columns: Vec<String>,
    rows: Vec<RowRecord>,
    version: u64,
    load_error: Option<String>,
    editor: Option<RecordEditor>,
    editor_sessions: u64,
}

impl<DB: DatabaseProvider> TableBrowser<DB> {
    pub fn new(database: Arc<DB>, options: BrowserOptions) -> Self {
        Self {
            database,
            options: BrowserOptions::with_page_size(options.page_size),
            started: false,
            tables: Vec::new(),
            current_table: None,
            page: PageState::new(),
            total_rows: 0,
            columns: Vec::new(),
            rows: Vec::new(),
            version: 0,
            load_error: None,
            editor: None,
            editor_sessions: 0,
        }
    }

    /// List tables and select the first one, if any
    ///
    /// The browser only counts as started once the table list was read, so
    /// a failed start can be retried.
    pub async fn start(&mut self) -> Result<()> {
        self.list_tables().await?;
        self.started = true;

        if let Some(first) = self.tables.first().cloned() {
            self.select_table(&first).await?;
        }
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Refresh the table list from the catalog
    ///
    /// The current selection is dropped when its table disappeared.
    pub async fn list_tables(&mut self) -> Result<&[String]> {
        let tables = self.database.list_tables().await?;
        self.tables = tables.into_iter().map(|table| table.name).collect();
        debug!(count = self.tables.len(), "Listed tables");

        if let Some(current) = &self.current_table {
            if !self.tables.contains(current) {
                self.clear_selection();
            }
        }
        Ok(&self.tables)
    }

    /// Select a table and show its first page
    pub async fn select_table(&mut self, name: &str) -> Result<()> {
        info!(table = name, "Selecting table");
        self.current_table = Some(name.to_string());
        self.page.reset();
        self.editor = None;

        if let Err(error) = self.reload().await {
            // never leave rows of the previous table under the new name
            self.total_rows = 0;
            self.columns.clear();
            self.rows.clear();
            self.version += 1;
            return Err(error);
        }
        Ok(())
    }

    /// Load `page` of `table` and make it the displayed page
    pub async fn load_page(&mut self, table: &str, page: u64) -> Result<()> {
        let data = self
            .database
            .load_page(table, page, self.options.page_size)
            .await
            .inspect_err(|error| warn!("Failed to load rows from '{}': {}", table, error))?;

        self.page
            .apply(data.page, total_pages(data.total_rows, self.options.page_size));
        self.total_rows = data.total_rows;
        self.columns = data.columns;
        self.rows = data.rows;
        self.version += 1;
        self.load_error = None;
        Ok(())
    }

    /// Reload the current page of the current table
    pub async fn reload(&mut self) -> Result<()> {
        let table = self.current_table.clone().ok_or(Error::NoTableSelected)?;
        self.load_page(&table, self.page.current_page()).await
    }

    /// Step back one page; `Ok(false)` when already on the first page
    pub async fn go_to_previous_page(&mut self) -> Result<bool> {
        let before = self.page;
        if !self.page.previous() {
            return Ok(false);
        }
        self.reload_or_restore(before).await
    }

    /// Step forward one page; `Ok(false)` when already on the last page
    pub async fn go_to_next_page(&mut self) -> Result<bool> {
        let before = self.page;
        if !self.page.next() {
            return Ok(false);
        }
        self.reload_or_restore(before).await
    }

    /// Reload after a write that already succeeded
    ///
    /// A failure here must not be reported as a failed write, so it is kept
    /// in [`TableBrowser::load_error`] instead of being returned.
    async fn reload_after_write(&mut self) {
        if let Err(error) = self.reload().await {
            warn!("Row written but the page could not be reloaded: {}", error);
            self.load_error = Some(error.to_string());
        }
    }

    async fn reload_or_restore(&mut self, before: PageState) -> Result<bool> {
        match self.reload().await {
            Ok(()) => Ok(true),
            Err(error) => {
                self.page = before;
                Err(error)
            }
        }
    }

    /// Delete the row at `row_index` on the current page
    ///
    /// The row is targeted by the table's declared primary key. When the
    /// key matches nothing the page is reloaded and [`Error::RowNotFound`]
    /// returned.
    ///
    /// # Returns
    ///
    /// Number of rows deleted
    pub async fn delete_selected(&mut self, row_index: usize) -> Result<u64> {
        let table = self.current_table.clone().ok_or(Error::NoTableSelected)?;
        let row = self.selected_row(row_index)?.clone();

        let schema = self.database.load_schema(&table).await?;
        let mutation = Mutation::delete(&schema, &row)?;
        let deleted = self
            .database
            .execute_mutation(&mutation)
            .await
            .inspect_err(|error| warn!("Failed to delete from '{}': {}", table, error))?;
        self.reload_after_write().await;

        if deleted == 0 {
            warn!("Delete from '{}' matched no rows", table);
            return Err(Error::RowNotFound(table));
        }
        info!(table = %table, deleted, "Deleted row");
        Ok(deleted)
    }

    /// Confirm that a row index read from version `seen` still addresses
    /// the rows on screen
    pub fn check_version(&self, seen: u64) -> Result<()> {
        if seen != self.version {
            debug!(seen, current = self.version, "Rejecting stale row index");
            return Err(Error::StaleView);
        }
        Ok(())
    }

    /// Confirm that `id` names the open editor
    pub fn check_editor(&self, id: u64) -> Result<()> {
        match &self.editor {
            None => Err(Error::EditorNotOpen),
            Some(editor) if editor.id() != id => Err(Error::EditorReplaced),
            Some(_) => Ok(()),
        }
    }

    /// Open the record editor, to add a row (`None`) or edit the selected one
    ///
    /// A schema failure leaves no editor open.
    pub async fn open_editor(&mut self, selection: Option<usize>) -> Result<&RecordEditor> {
        let table = self.current_table.clone().ok_or(Error::NoTableSelected)?;
        let existing = match selection {
            Some(index) => Some(self.selected_row(index)?.clone()),
            None => None,
        };

        self.editor = None;
        let editor = RecordEditor::open(self.database.as_ref(), &table, existing).await?;
        self.editor_sessions += 1;
        Ok(&*self.editor.insert(editor.with_id(self.editor_sessions)))
    }

    /// Apply `values` to the open editor and save it
    ///
    /// On success the editor closes and the current page is reloaded; on
    /// failure the editor stays open for correction. A failed reload does
    /// not undo the save.
    pub async fn save_editor(&mut self, values: &FieldValues) -> Result<EditorOutcome> {
        let editor = self.editor.as_mut().ok_or(Error::EditorNotOpen)?;
        editor.apply_values(values)?;
        let affected_rows = editor.save(self.database.as_ref()).await?;

        self.finish_editor(EditorOutcome::Saved { affected_rows }).await
    }

    /// Close the open editor without saving
    pub async fn cancel_editor(&mut self) -> Result<EditorOutcome> {
        let editor = self.editor.as_mut().ok_or(Error::EditorNotOpen)?;
        editor.cancel();
        self.finish_editor(EditorOutcome::Cancelled).await
    }

    async fn finish_editor(&mut self, outcome: EditorOutcome) -> Result<EditorOutcome> {
        self.editor = None;
        if let EditorOutcome::Saved { .. } = outcome {
            self.reload_after_write().await;
        }
        Ok(outcome)
    }

    fn selected_row(&self, row_index: usize) -> Result<&RowRecord> {
        self.rows
            .get(row_index)
            .ok_or(Error::InvalidSelection(row_index))
    }

    fn clear_selection(&mut self) {
        self.current_table = None;
        self.page.reset();
        self.total_rows = 0;
        self.columns.clear();
        self.rows.clear();
        self.version += 1;
        self.editor = None;
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn current_table(&self) -> Option<&str> {
        self.current_table.as_deref()
    }

    pub fn page(&self) -> PageState {
        self.page
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    /// Bumped whenever the rows on screen are replaced
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Why the last reload after a write failed, until a page loads again
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn editor(&self) -> Option<&RecordEditor> {
        self.editor.as_ref()
    }

    pub fn options(&self) -> BrowserOptions {
        self.options
    }

    pub fn view(&self) -> BrowserView {
        BrowserView {
            tables: self.tables.clone(),
            current_table: self.current_table.clone(),
            current_page: self.page.current_page(),
            total_pages: self.page.total_pages(),
            total_rows: self.total_rows,
            page_label: self.page.label(),
            can_previous: self.page.has_previous(),
            can_next: self.page.has_next(),
            columns: self.columns.clone(),
            rows: self.rows.clone(),
            version: self.version,
            load_error: self.load_error.clone(),
            editor: self.editor.as_ref().map(RecordEditor::view),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::traits::DatabaseError;
    use crate::pagination::{clamp_page, page_offset};
    use crate::schema::{ColumnInfo, PageData, TableInfo, TableSchema};
    use crate::ErrorKind;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory `items (id, label)` table with `id` as primary key
    struct MemoryProvider {
        rows: Mutex<Vec<(i64, String)>>,
        page_requests: Mutex<Vec<u64>>,
        offline: Mutex<bool>,
        pages_unavailable: Mutex<bool>,
    }

    impl MemoryProvider {
        fn with_rows(count: i64) -> Self {
            Self {
                rows: Mutex::new((1..=count).map(|id| (id, format!("item {}", id))).collect()),
                page_requests: Mutex::new(Vec::new()),
                offline: Mutex::new(false),
                pages_unavailable: Mutex::new(false),
            }
        }

        fn check_online(&self) -> std::result::Result<(), DatabaseError> {
            if *self.offline.lock().unwrap() {
                return Err(DatabaseError::Connection("unreachable".to_string()));
            }
            Ok(())
        }

        fn schema() -> TableSchema {
            TableSchema {
                name: "items".to_string(),
                columns: vec![
                    ColumnInfo {
                        name: "id".to_string(),
                        data_type: "INTEGER".to_string(),
                        nullable: false,
                        default_value: None,
                        is_primary_key: true,
                        is_generated: true,
                        is_binary: false,
                    },
                    ColumnInfo {
                        name: "label".to_string(),
                        data_type: "TEXT".to_string(),
                        nullable: true,
                        default_value: None,
                        is_primary_key: false,
                        is_generated: false,
                        is_binary: false,
                    },
                ],
                primary_key: vec!["id".to_string()],
            }
        }
    }

    #[async_trait]
    impl DatabaseProvider for MemoryProvider {
        async fn list_tables(&self) -> std::result::Result<Vec<TableInfo>, DatabaseError> {
            self.check_online()?;
            Ok(vec![
                TableInfo {
                    name: "items".to_string(),
                },
                TableInfo {
                    name: "other".to_string(),
                },
            ])
        }

        async fn load_schema(&self, table: &str) -> std::result::Result<TableSchema, DatabaseError> {
            self.check_online()?;
            match table {
                "items" => Ok(Self::schema()),
                _ => Err(DatabaseError::TableNotFound(table.to_string())),
            }
        }

        async fn load_page(
            &self,
            table: &str,
            page: u64,
            page_size: u64,
        ) -> std::result::Result<PageData, DatabaseError> {
            self.check_online()?;
            if *self.pages_unavailable.lock().unwrap() {
                return Err(DatabaseError::Query("database is locked".to_string()));
            }
            self.page_requests.lock().unwrap().push(page);
            if table == "other" {
                return Ok(PageData {
                    page: 1,
                    total_rows: 0,
                    columns: vec!["x".to_string()],
                    rows: Vec::new(),
                });
            }

            let rows = self.rows.lock().unwrap();
            let total_rows = rows.len() as u64;
            let page = clamp_page(page, total_pages(total_rows, page_size));
            let offset = page_offset(page, page_size) as usize;
            Ok(PageData {
                page,
                total_rows,
                columns: vec!["id".to_string(), "label".to_string()],
                rows: rows
                    .iter()
                    .skip(offset)
                    .take(page_size as usize)
                    .map(|(id, label)| {
                        json!({"id": id, "label": label}).as_object().cloned().unwrap()
                    })
                    .collect(),
            })
        }

        async fn execute_mutation(
            &self,
            mutation: &Mutation,
        ) -> std::result::Result<u64, DatabaseError> {
            self.check_online()?;
            let mut rows = self.rows.lock().unwrap();
            match mutation {
                Mutation::Delete { key, .. } => {
                    let id = key[0].value.as_i64().unwrap();
                    let before = rows.len();
                    rows.retain(|(row_id, _)| *row_id != id);
                    Ok((before - rows.len()) as u64)
                }
                Mutation::Insert { values, .. } => {
                    let next_id = rows.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
                    rows.push((next_id, values[0].value.clone().unwrap_or_default()));
                    Ok(1)
                }
                Mutation::Update {
                    assignments, key, ..
                } => {
                    let id = key[0].value.as_i64().unwrap();
                    let mut updated = 0;
                    for row in rows.iter_mut().filter(|(row_id, _)| *row_id == id) {
                        row.1 = assignments[0].value.clone().unwrap_or_default();
                        updated += 1;
                    }
                    Ok(updated)
                }
            }
        }
    }

    async fn started(count: i64) -> TableBrowser<MemoryProvider> {
        let mut browser = TableBrowser::new(
            Arc::new(MemoryProvider::with_rows(count)),
            BrowserOptions::default(),
        );
        browser.start().await.unwrap();
        browser
    }

    #[tokio::test]
    async fn test_start_selects_first_table() {
        let browser = started(25).await;

        assert_eq!(browser.tables(), ["items", "other"]);
        assert_eq!(browser.current_table(), Some("items"));
        assert_eq!(browser.page().current_page(), 1);
        assert_eq!(browser.page().total_pages(), 3);
        assert_eq!(browser.rows().len(), 10);
        assert_eq!(browser.view().page_label, "Page 1 of 3");
        assert!(!browser.view().can_previous);
        assert!(browser.view().can_next);
    }

    #[tokio::test]
    async fn test_navigation_is_bounded() {
        let mut browser = started(25).await;

        assert!(!browser.go_to_previous_page().await.unwrap());
        assert!(browser.go_to_next_page().await.unwrap());
        assert!(browser.go_to_next_page().await.unwrap());
        assert_eq!(browser.page().current_page(), 3);
        assert_eq!(browser.rows().len(), 5);
        assert!(!browser.go_to_next_page().await.unwrap());
        assert_eq!(browser.page().current_page(), 3);
    }

    #[tokio::test]
    async fn test_selecting_table_resets_page() {
        let mut browser = started(25).await;
        browser.go_to_next_page().await.unwrap();
        assert_eq!(browser.page().current_page(), 2);

        browser.select_table("items").await.unwrap();
        assert_eq!(browser.page().current_page(), 1);
        assert_eq!(
            browser.database.page_requests.lock().unwrap().last(),
            Some(&1)
        );

        browser.select_table("other").await.unwrap();
        assert_eq!(browser.page().total_pages(), 0);
        assert!(browser.rows().is_empty());
        assert!(!browser.view().can_next);
    }

    #[tokio::test]
    async fn test_failed_navigation_keeps_page() {
        let mut browser = started(25).await;
        *browser.database.offline.lock().unwrap() = true;

        let error = browser.go_to_next_page().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Connection);
        assert_eq!(browser.page().current_page(), 1);
        assert_eq!(browser.rows().len(), 10);
    }

    #[tokio::test]
    async fn test_delete_last_row_on_last_page_steps_back() {
        let mut browser = started(11).await;
        browser.go_to_next_page().await.unwrap();
        assert_eq!(browser.rows().len(), 1);

        assert_eq!(browser.delete_selected(0).await.unwrap(), 1);
        assert_eq!(browser.page().current_page(), 1);
        assert_eq!(browser.page().total_pages(), 1);
        assert_eq!(browser.rows().len(), 10);
    }

    #[tokio::test]
    async fn test_delete_rejects_out_of_range_selection() {
        let mut browser = started(3).await;
        let error = browser.delete_selected(7).await.unwrap_err();
        assert!(matches!(error, Error::InvalidSelection(7)));
        assert_eq!(browser.rows().len(), 3);
    }

    #[tokio::test]
    async fn test_editor_round_trip_reloads_page() {
        let mut browser = started(3).await;

        let editor = browser.open_editor(None).await.unwrap();
        assert_eq!(editor.fields().len(), 1);

        let mut values = FieldValues::new();
        values.insert("label".to_string(), Some("fresh".to_string()));
        let outcome = browser.save_editor(&values).await.unwrap();

        assert_eq!(outcome, EditorOutcome::Saved { affected_rows: 1 });
        assert!(browser.editor().is_none());
        assert_eq!(browser.total_rows(), 4);
        assert_eq!(browser.rows()[3]["label"], json!("fresh"));
    }

    #[tokio::test]
    async fn test_edit_selected_row() {
        let mut browser = started(3).await;
        browser.open_editor(Some(1)).await.unwrap();

        let mut values = FieldValues::new();
        values.insert("label".to_string(), Some("renamed".to_string()));
        browser.save_editor(&values).await.unwrap();

        assert_eq!(browser.rows()[1]["label"], json!("renamed"));
        assert_eq!(browser.rows()[0]["label"], json!("item 1"));
    }

    #[tokio::test]
    async fn test_editor_schema_failure_leaves_no_editor() {
        let mut browser = started(3).await;
        browser.select_table("other").await.unwrap();

        let error = browser.open_editor(None).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Schema);
        assert!(browser.editor().is_none());
    }

    #[tokio::test]
    async fn test_cancel_editor() {
        let mut browser = started(3).await;
        browser.open_editor(None).await.unwrap();

        assert_eq!(
            browser.cancel_editor().await.unwrap(),
            EditorOutcome::Cancelled
        );
        assert!(browser.editor().is_none());
        assert!(matches!(
            browser.cancel_editor().await,
            Err(Error::EditorNotOpen)
        ));
    }

    #[tokio::test]
    async fn test_operations_require_selected_table() {
        let mut browser = TableBrowser::new(
            Arc::new(MemoryProvider::with_rows(0)),
            BrowserOptions::with_page_size(0),
        );

        assert_eq!(browser.options().page_size, 1);
        assert!(matches!(browser.reload().await, Err(Error::NoTableSelected)));
        assert!(matches!(
            browser.open_editor(None).await,
            Err(Error::NoTableSelected)
        ));
    }

    #[tokio::test]
    async fn test_save_is_reported_when_reload_fails() {
        let mut browser = started(3).await;
        browser.open_editor(Some(0)).await.unwrap();
        *browser.database.pages_unavailable.lock().unwrap() = true;

        let mut values = FieldValues::new();
        values.insert("label".to_string(), Some("renamed".to_string()));
        let outcome = browser.save_editor(&values).await.unwrap();

        assert_eq!(outcome, EditorOutcome::Saved { affected_rows: 1 });
        assert!(browser.editor().is_none());
        assert!(browser.load_error().unwrap().contains("locked"));
        assert_eq!(browser.database.rows.lock().unwrap()[0].1, "renamed");

        *browser.database.pages_unavailable.lock().unwrap() = false;
        browser.reload().await.unwrap();
        assert!(browser.load_error().is_none());
        assert_eq!(browser.rows()[0]["label"], json!("renamed"));
    }

    #[tokio::test]
    async fn test_delete_is_reported_when_reload_fails() {
        let mut browser = started(3).await;
        *browser.database.pages_unavailable.lock().unwrap() = true;

        assert_eq!(browser.delete_selected(0).await.unwrap(), 1);
        assert_eq!(browser.database.rows.lock().unwrap().len(), 2);
        assert!(browser.view().load_error.is_some());
    }

    #[tokio::test]
    async fn test_delete_of_vanished_row_reloads_and_fails() {
        let mut browser = started(3).await;
        browser.database.rows.lock().unwrap().retain(|(id, _)| *id != 1);

        let error = browser.delete_selected(0).await.unwrap_err();
        assert!(matches!(error, Error::RowNotFound(ref table) if table == "items"));
        assert_eq!(browser.rows().len(), 2);
        assert_eq!(browser.rows()[0]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_version_follows_the_rows_on_screen() {
        let mut browser = started(25).await;
        let first = browser.version();
        assert!(browser.check_version(first).is_ok());

        browser.go_to_next_page().await.unwrap();
        assert!(browser.version() > first);
        assert!(matches!(browser.check_version(first), Err(Error::StaleView)));

        // a no-op step keeps the same rows and the same version
        let second = browser.version();
        browser.go_to_next_page().await.unwrap();
        browser.go_to_next_page().await.unwrap();
        let last = browser.version();
        assert!(!browser.go_to_next_page().await.unwrap());
        assert_eq!(browser.version(), last);
        assert_ne!(second, last);
        assert_eq!(browser.view().version, last);
    }

    #[tokio::test]
    async fn test_editor_sessions_are_numbered() {
        let mut browser = started(3).await;
        assert!(matches!(browser.check_editor(1), Err(Error::EditorNotOpen)));

        let first = browser.open_editor(None).await.unwrap().id();
        let second = browser.open_editor(Some(0)).await.unwrap().id();
        assert_ne!(first, second);

        assert!(browser.check_editor(second).is_ok());
        assert!(matches!(
            browser.check_editor(first),
            Err(Error::EditorReplaced)
        ));
        assert_eq!(browser.view().editor.unwrap().id, second);
    }
}
