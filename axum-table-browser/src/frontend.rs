//! Frontend asset serving
//!
//! Serves the embedded browser UI with MIME types, caching headers and
//! base path injection so relative API calls resolve under the mount point.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use include_dir::{include_dir, Dir};
use std::sync::Arc;

// Embed the frontend dist directory at compile time
static FRONTEND_DISTRIBUTION: Dir = include_dir!("$CARGO_MANIFEST_DIR/frontend/dist");

/// State for frontend serving (stores base path for routing)
#[derive(Clone)]
pub struct FrontendState {
    pub base_path: Arc<String>,
}

impl FrontendState {
    pub fn new(base_path: String) -> Self {
        Self {
            base_path: Arc::new(base_path),
        }
    }
}

/// Create a router for serving frontend assets
///
/// - GET / -> index.html with injected <base href> tag
/// - GET /assets/* -> static assets with long-term caching
pub fn create_frontend_router(base_path: String) -> Router {
    let state = FrontendState::new(base_path);

    Router::new()
        .route("/", get(serve_index_page))
        .route("/assets/{*path}", get(serve_static_asset))
        .with_state(state)
}

/// Insert `<base href="{base_path}/">` right after the opening head tag
fn inject_base_href(document: &str, base_path: &str) -> String {
    let mut contents = document.to_string();
    if let Some(head_position) = contents.find("<head>") {
        let insert_position = head_position + "<head>".len();
        let base_tag = format!("\n    <base href=\"{}/\">", base_path);
        contents.insert_str(insert_position, &base_tag);
    }
    contents
}

/// Serve index.html, cached for an hour
async fn serve_index_page(State(state): State<FrontendState>) -> Response {
    match FRONTEND_DISTRIBUTION.get_file("index.html") {
        Some(file) => {
            let document = String::from_utf8_lossy(file.contents());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                    (header::CACHE_CONTROL, "public, max-age=3600"),
                ],
                inject_base_href(&document, &state.base_path),
            )
                .into_response()
        }
        None => serve_fallback_page(),
    }
}

/// Serve static assets with proper MIME types
///
/// Asset names carry no content hash, so they are revalidated on every load.
async fn serve_static_asset(Path(path): Path<String>) -> Response {
    let asset_path = format!("assets/{}", path);

    match FRONTEND_DISTRIBUTION.get_file(&asset_path) {
        Some(file) => {
            let mime_type = mime_guess::from_path(&asset_path)
                .first_or_octet_stream()
                .to_string();

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime_type),
                    (header::CACHE_CONTROL, "no-cache".to_string()),
                ],
                file.contents(),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Asset not found: {}", asset_path),
        )
            .into_response(),
    }
}

/// Shown when the embedded UI is missing its index page
fn serve_fallback_page() -> Response {
    let html = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>axum-table-browser</title>
</head>
<body>
    <h1>axum-table-browser</h1>
    <p>The web UI is not bundled in this build. The REST API is still available:</p>
    <ul>
        <li><code>GET api/tables</code> - List all tables</li>
        <li><code>GET api/tables/{name}</code> - Table schema</li>
        <li><code>GET api/browser</code> - Current table, page and rows</li>
        <li><code>POST api/browser/next</code>, <code>POST api/browser/previous</code> - Paging</li>
        <li><code>POST api/browser/editor</code> - Open the record editor</li>
    </ul>
</body>
</html>
"#;

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        html,
    )
        .into_response()
}
