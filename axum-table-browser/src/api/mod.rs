//! REST API endpoints
//!
//! This module contains all API endpoint handlers for the table browser.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::browser::{BrowserOptions, TableBrowser};
use crate::database::traits::DatabaseProvider;
use crate::{Error, ErrorKind};

pub mod browser;
pub mod editor;
pub mod tables;

// Re-export handlers for convenience
pub use browser::{
    delete_row_handler, get_browser_handler, next_page_handler, previous_page_handler,
    refresh_tables_handler, reload_handler, select_table_handler,
};
pub use editor::{cancel_editor_handler, open_editor_handler, save_editor_handler};
pub use tables::{get_table_schema_handler, list_tables_handler};

/// Shared state of the API handlers
///
/// Stateless catalog endpoints use the provider directly; everything that
/// touches paging or the editor goes through the single browser, one
/// request at a time.
pub struct ApiState<DB: DatabaseProvider> {
    pub database: Arc<DB>,
    pub browser: Arc<Mutex<TableBrowser<DB>>>,
}

impl<DB: DatabaseProvider> ApiState<DB> {
    pub fn new(database: Arc<DB>, options: BrowserOptions) -> Self {
        let browser = TableBrowser::new(database.clone(), options);
        Self {
            database,
            browser: Arc::new(Mutex::new(browser)),
        }
    }
}

impl<DB: DatabaseProvider> Clone for ApiState<DB> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            browser: self.browser.clone(),
        }
    }
}

/// Create the API router with all endpoints
///
/// # Arguments
///
/// * `state` - Provider and browser shared by the handlers
///
/// # Returns
///
/// An Axum Router configured with all API routes
pub fn create_api_router<DB: DatabaseProvider>(state: ApiState<DB>) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/tables", get(list_tables_handler::<DB>))
        .route("/tables/{name}", get(get_table_schema_handler::<DB>))
        .route("/browser", get(get_browser_handler::<DB>))
        .route("/browser/tables", post(refresh_tables_handler::<DB>))
        .route("/browser/table", post(select_table_handler::<DB>))
        .route("/browser/previous", post(previous_page_handler::<DB>))
        .route("/browser/next", post(next_page_handler::<DB>))
        .route("/browser/reload", post(reload_handler::<DB>))
        .route("/browser/delete", post(delete_row_handler::<DB>))
        .route(
            "/browser/editor",
            post(open_editor_handler::<DB>).delete(cancel_editor_handler::<DB>),
        )
        .route("/browser/editor/save", post(save_editor_handler::<DB>))
        .with_state(state)
}

/// HTTP status for a failure kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Connection => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Schema => StatusCode::NOT_FOUND,
        ErrorKind::Query | ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::Configuration => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::State => StatusCode::CONFLICT,
    }
}

/// JSON error body `{ "error": message, "kind": kind }`
pub fn error_response(error: &Error) -> Response {
    let kind = error.kind();
    (
        status_for(kind),
        Json(serde_json::json!({
            "error": error.to_string(),
            "kind": kind,
        })),
    )
        .into_response()
}
