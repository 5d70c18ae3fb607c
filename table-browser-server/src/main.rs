use axum::{extract::State, http::StatusCode, routing::get, Router};
use axum_table_browser::{DatabaseError, DatabaseProvider, TableBrowserLayer};
use clap::Parser;
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod database;

use config::{Backend, Config};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Provider(#[from] DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    match config.backend()? {
        Backend::Sqlite => {
            let options = SqliteConnectOptions::from_str(&config.database_url)?;
            if config.seed_demo_data {
                database::seed(options.clone()).await?;
            }
            let layer = TableBrowserLayer::sqlite(&config.base_path, options);
            serve(&config, layer).await
        }
        Backend::Postgres => {
            if config.seed_demo_data {
                warn!("Demo data is only seeded into SQLite databases");
            }
            let options = PgConnectOptions::from_str(&config.database_url)?;
            let layer = TableBrowserLayer::postgres(&config.base_path, options);
            serve(&config, layer).await
        }
    }
}

async fn serve<DB: DatabaseProvider>(
    config: &Config,
    layer: TableBrowserLayer<DB>,
) -> Result<(), ServerError> {
    let layer = layer.with_page_size(config.page_size);
    let browser_path = match layer.base_path() {
        "" => "/".to_string(),
        base_path => base_path.to_string(),
    };
    let app = app(layer);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    info!("Server running at http://{}", config.bind_address);
    info!("Health check at http://{}/api/health", config.bind_address);
    info!(
        "Table browser available at http://{}{}",
        config.bind_address, browser_path
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Health check and welcome routes plus the browser layer
///
/// The layer carries its own CORS policy.
fn app<DB: DatabaseProvider>(layer: TableBrowserLayer<DB>) -> Router {
    let mut app = Router::new().route("/api/health", get(health_handler::<DB>));
    // the browser owns "/" when mounted at the root
    if !layer.base_path().is_empty() {
        app = app.route("/", get(root_handler));
    }

    // The browser layer returns a stateless Router, so it is merged after with_state()
    app.with_state(layer.database()).merge(layer.into_router())
}

async fn root_handler() -> &'static str {
    "Welcome to the table browser server"
}

async fn health_handler<DB: DatabaseProvider>(
    State(database): State<Arc<DB>>,
) -> Result<(StatusCode, &'static str), StatusCode> {
    database.list_tables().await.map_err(|error| {
        warn!("Health check failed: {}", error);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok((StatusCode::OK, "Server is healthy"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    async fn sqlite_layer(
        directory: &tempfile::TempDir,
    ) -> TableBrowserLayer<axum_table_browser::SqliteProvider> {
        let options = SqliteConnectOptions::new()
            .filename(directory.path().join("shop.db"))
            .create_if_missing(true);
        database::seed(options.clone()).await.unwrap();
        TableBrowserLayer::sqlite("/browser", options)
    }

    #[tokio::test]
    async fn test_browser_responses_carry_one_cors_header() {
        let directory = tempfile::tempdir().unwrap();
        let app = app(sqlite_layer(&directory).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/browser/api/tables")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let origins = response
            .headers()
            .get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .iter()
            .count();
        assert_eq!(origins, 1);
    }

    #[tokio::test]
    async fn test_health_and_root_routes() {
        let directory = tempfile::tempdir().unwrap();
        let app = app(sqlite_layer(&directory).await);

        for uri in ["/api/health", "/"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }
}
