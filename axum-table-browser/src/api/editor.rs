//! Record editor endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::{error_response, ApiState};
use crate::database::traits::DatabaseProvider;
use crate::schema::{CancelEditorQuery, OpenEditorRequest, SaveEditorRequest};
use crate::Error;

/// Handler for POST /api/browser/editor
///
/// Opens the editor for a new row (no `rowIndex`) or for the selected row.
/// Answers with the editor's form; a table whose schema cannot be read
/// answers with an error and no editor is left open. A `rowIndex` must come
/// with the `version` of the view it was picked from.
///
/// Request body:
/// ```json
/// { "rowIndex": 2, "version": 12 }
/// ```
pub async fn open_editor_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Json(request): Json<OpenEditorRequest>,
) -> Response {
    let mut browser = state.browser.lock().await;

    if request.row_index.is_some() {
        let checked = request
            .version
            .ok_or(Error::StaleView)
            .and_then(|seen| browser.check_version(seen));
        if let Err(error) = checked {
            return error_response(&error);
        }
    }
    match browser.open_editor(request.row_index).await {
        Ok(editor) => (StatusCode::OK, Json(editor.view())).into_response(),
        Err(error) => error_response(&error),
    }
}

/// Handler for POST /api/browser/editor/save
///
/// Applies the submitted values and saves. On success the editor closes and
/// the reloaded browser view is returned; on failure the editor stays open.
/// `editorId` must name the editor the form was opened as.
///
/// Request body:
/// ```json
/// { "editorId": 3, "values": { "name": "Pencil", "note": null } }
/// ```
pub async fn save_editor_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Json(request): Json<SaveEditorRequest>,
) -> Response {
    let mut browser = state.browser.lock().await;

    if let Err(error) = browser.check_editor(request.editor_id) {
        return error_response(&error);
    }
    match browser.save_editor(&request.values).await {
        Ok(_) => (StatusCode::OK, Json(browser.view())).into_response(),
        Err(error) => error_response(&error),
    }
}

/// Handler for DELETE /api/browser/editor
///
/// With `?editorId=3` only that editor session is cancelled.
pub async fn cancel_editor_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Query(query): Query<CancelEditorQuery>,
) -> Response {
    let mut browser = state.browser.lock().await;

    if let Some(id) = query.editor_id {
        if let Err(error) = browser.check_editor(id) {
            return error_response(&error);
        }
    }
    match browser.cancel_editor().await {
        Ok(_) => (StatusCode::OK, Json(browser.view())).into_response(),
        Err(error) => error_response(&error),
    }
}
