//! TableBrowserLayer - Main Axum integration layer
//!
//! Entry point for mounting the table browser into an Axum application.

use crate::api::{create_api_router, ApiState};
use crate::browser::BrowserOptions;
use crate::database::traits::DatabaseProvider;
use crate::frontend::create_frontend_router;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[cfg(feature = "sqlite")]
use crate::database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
use crate::database::postgres::PostgresProvider;

/// Main layer for integrating the table browser into an Axum application
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use axum_table_browser::TableBrowserLayer;
/// use sqlx::sqlite::SqliteConnectOptions;
///
/// let options = SqliteConnectOptions::new().filename("shop.db");
/// let browser = TableBrowserLayer::sqlite("/browser", options).with_page_size(25);
/// let app: Router = Router::new().merge(browser.into_router());
/// ```
pub struct TableBrowserLayer<DB: DatabaseProvider> {
    base_path: String,
    database: Arc<DB>,
    options: BrowserOptions,
}

impl<DB: DatabaseProvider> TableBrowserLayer<DB> {
    /// Create a new table browser at the given base path
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the browser will be mounted (e.g., "/browser")
    /// * `database` - The database provider implementation
    pub fn new(base_path: impl Into<String>, database: DB) -> Self {
        Self {
            base_path: normalize_base_path(&base_path.into()),
            database: Arc::new(database),
            options: BrowserOptions::default(),
        }
    }

    /// Rows shown per page (at least one)
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.options = BrowserOptions::with_page_size(page_size);
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The provider shared with the browser, for host routes such as health checks
    pub fn database(&self) -> Arc<DB> {
        self.database.clone()
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// The returned router includes:
    /// - Frontend serving at `{base_path}/`
    /// - API endpoints at `{base_path}/api/*`
    /// - Permissive CORS middleware for development
    pub fn into_router(self) -> Router {
        let state = ApiState::new(self.database, self.options);
        let api_router = create_api_router(state);
        let frontend_router = create_frontend_router(self.base_path.clone());

        let router = Router::new().nest(&format!("{}/api", self.base_path), api_router);

        // axum refuses to nest at the root
        let router = if self.base_path.is_empty() {
            router.merge(frontend_router)
        } else {
            router.nest(&self.base_path, frontend_router)
        };

        router.layer(CorsLayer::permissive())
    }
}

/// Leading slash, no trailing slash; the root becomes the empty string
fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(feature = "sqlite")]
impl TableBrowserLayer<SqliteProvider> {
    /// Create a new table browser for SQLite
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the browser will be mounted
    /// * `options` - Options used to open a connection per operation
    pub fn sqlite(
        base_path: impl Into<String>,
        options: sqlx::sqlite::SqliteConnectOptions,
    ) -> Self {
        Self::new(base_path, SqliteProvider::new(options))
    }
}

#[cfg(feature = "postgres")]
impl TableBrowserLayer<PostgresProvider> {
    /// Create a new table browser for PostgreSQL
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the browser will be mounted
    /// * `options` - Options used to open a connection per operation
    pub fn postgres(
        base_path: impl Into<String>,
        options: sqlx::postgres::PgConnectOptions,
    ) -> Self {
        Self::new(base_path, PostgresProvider::new(options))
    }
}
