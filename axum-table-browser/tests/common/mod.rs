//! Shared fixtures: an on-disk SQLite database with a handful of tables

#![allow(dead_code)]

use axum_table_browser::SqliteProvider;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tempfile::TempDir;

/// Tables, in the order the catalog lists them
pub const TABLES: [&str; 4] = ["log_entries", "order_lines", "products", "tags"];

pub struct TestDatabase {
    _directory: TempDir,
    pub options: SqliteConnectOptions,
}

impl TestDatabase {
    /// Fresh database with:
    /// - `products`: 23 rows keyed on an auto-increment `id`
    /// - `tags`: duplicate labels in the first column, keyed on `id`
    /// - `order_lines`: composite key `(order_id, line)`
    /// - `log_entries`: no primary key, no rows
    pub async fn new() -> Self {
        let directory = tempfile::tempdir().expect("create temp dir");
        let options = SqliteConnectOptions::new().filename(directory.path().join("browser.db"));

        let database = Self {
            _directory: directory,
            options,
        };

        let mut connection = database
            .options
            .clone()
            .create_if_missing(true)
            .connect()
            .await
            .expect("create database");

        for statement in [
            "CREATE TABLE products (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, qty INTEGER DEFAULT 0, note TEXT)",
            "CREATE TABLE tags (label TEXT NOT NULL, id INTEGER PRIMARY KEY)",
            "CREATE TABLE order_lines (order_id INTEGER NOT NULL, line INTEGER NOT NULL, item TEXT, PRIMARY KEY (order_id, line))",
            "CREATE TABLE log_entries (message TEXT, level TEXT)",
            "INSERT INTO tags (label, id) VALUES ('red', 1), ('red', 2), ('blue', 3)",
            "INSERT INTO order_lines (order_id, line, item) VALUES (1, 1, 'Pencil'), (1, 2, 'Paper'), (2, 1, 'Ink')",
        ] {
            sqlx::query(statement)
                .execute(&mut connection)
                .await
                .expect("create fixture");
        }

        for index in 1..=23 {
            sqlx::query("INSERT INTO products (name, qty) VALUES (?, ?)")
                .bind(format!("Product {}", index))
                .bind(index * 2)
                .execute(&mut connection)
                .await
                .expect("insert product");
        }

        connection.close().await.expect("close");
        database
    }

    pub fn provider(&self) -> SqliteProvider {
        SqliteProvider::new(self.options.clone())
    }

    pub async fn connection(&self) -> SqliteConnection {
        self.options.connect().await.expect("connect")
    }

    pub async fn execute(&self, statement: &str) {
        let mut connection = self.connection().await;
        sqlx::query(statement)
            .execute(&mut connection)
            .await
            .expect("execute statement");
        connection.close().await.expect("close");
    }

    pub async fn count(&self, table: &str) -> i64 {
        let mut connection = self.connection().await;
        let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
            .fetch_one(&mut connection)
            .await
            .expect("count rows");
        connection.close().await.expect("close");
        count
    }
}
