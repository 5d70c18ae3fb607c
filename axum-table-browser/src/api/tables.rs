//! Table listing and schema endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use super::{error_response, ApiState};
use crate::database::traits::DatabaseProvider;
use crate::schema::TablesResponse;
use crate::Error;

/// Handler for GET /api/tables
///
/// Returns the tables currently in the database catalog.
pub async fn list_tables_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
) -> Response {
    match state.database.list_tables().await {
        Ok(tables) => (StatusCode::OK, Json(TablesResponse { tables })).into_response(),
        Err(database_error) => {
            error!("Failed to list tables: {}", database_error);
            error_response(&Error::from(database_error))
        }
    }
}

/// Handler for GET /api/tables/{name}
///
/// Returns the column schema the record editor builds its form from:
/// columns in order, their generated flags and the primary key.
pub async fn get_table_schema_handler<DB: DatabaseProvider>(
    State(state): State<ApiState<DB>>,
    Path(table_name): Path<String>,
) -> Response {
    match state.database.load_schema(&table_name).await {
        Ok(schema) => (StatusCode::OK, Json(schema)).into_response(),
        Err(database_error) => {
            error!(
                "Failed to get schema for table '{}': {}",
                table_name, database_error
            );
            error_response(&Error::from(database_error))
        }
    }
}
