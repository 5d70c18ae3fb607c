//! Browser endpoints: table selection, paging and row deletion
//!
//! Every successful call answers with the full browser view, so the page
//! always renders what the server holds.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::warn;

use super::{error_response, ApiState};
use crate::browser::TableBrowser;
use crate::database::traits::DatabaseProvider;
use crate::schema::{RowSelection, SelectTableRequest};

fn view_response<DB: DatabaseProvider>(browser: &TableBrowser<DB>) -> Response {
    (StatusCode::OK, Json(browser.view())).into_response()
}

/// Handler for GET /api/browser
///
/// Returns the current view, starting the browser (table list plus first
/// table) on first use.
pub async fn get_browser_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
) -> Response {
    let mut browser = state.browser.lock().await;

    if !browser.is_started() {
        if let Err(error) = browser.start().await {
            warn!("Failed to start browser: {}", error);
            return error_response(&error);
        }
    }
    view_response(&browser)
}

/// Handler for POST /api/browser/tables
///
/// Re-reads the table list; selects the first table when nothing is selected.
pub async fn refresh_tables_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
) -> Response {
    let mut browser = state.browser.lock().await;

    let result = if browser.current_table().is_none() {
        browser.start().await
    } else {
        browser.list_tables().await.map(|_| ())
    };

    match result {
        Ok(()) => view_response(&browser),
        Err(error) => error_response(&error),
    }
}

/// Handler for POST /api/browser/table
///
/// Request body:
/// ```json
/// { "name": "products" }
/// ```
pub async fn select_table_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Json(request): Json<SelectTableRequest>,
) -> Response {
    let mut browser = state.browser.lock().await;

    match browser.select_table(&request.name).await {
        Ok(()) => view_response(&browser),
        Err(error) => error_response(&error),
    }
}

/// Handler for POST /api/browser/previous
///
/// A no-op on the first page.
pub async fn previous_page_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
) -> Response {
    let mut browser = state.browser.lock().await;

    match browser.go_to_previous_page().await {
        Ok(_) => view_response(&browser),
        Err(error) => error_response(&error),
    }
}

/// Handler for POST /api/browser/next
///
/// A no-op on the last page.
pub async fn next_page_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
) -> Response {
    let mut browser = state.browser.lock().await;

    match browser.go_to_next_page().await {
        Ok(_) => view_response(&browser),
        Err(error) => error_response(&error),
    }
}

/// Handler for POST /api/browser/reload
pub async fn reload_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
) -> Response {
    let mut browser = state.browser.lock().await;

    match browser.reload().await {
        Ok(()) => view_response(&browser),
        Err(error) => error_response(&error),
    }
}

/// Handler for POST /api/browser/delete
///
/// Deletes the selected row of the current page by its primary key. The
/// `version` must be the one of the view the row was picked from; if the
/// rows changed since, the request is refused with 409.
///
/// Request body:
/// ```json
/// { "rowIndex": 3, "version": 12 }
/// ```
pub async fn delete_row_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Json(selection): Json<RowSelection>,
) -> Response {
    let mut browser = state.browser.lock().await;

    if let Err(error) = browser.check_version(selection.version) {
        return error_response(&error);
    }
    match browser.delete_selected(selection.row_index).await {
        Ok(_) => view_response(&browser),
        Err(error) => error_response(&error),
    }
}
