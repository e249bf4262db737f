use async_trait::async_trait;
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use thiserror::Error;
use tokio_postgres::{NoTls, SimpleQueryMessage};
use tracing::{debug, info, warn};

use crate::application::ports::{BatchStore, SelectedRows, StoreError};

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Invalid database connection string: {0}")]
    InvalidUrl(tokio_postgres::Error),
    #[error("Unable to open a database connection: {0}")]
    Pool(tokio_postgres::Error),
    #[error("Database is not reachable: {0}")]
    Unreachable(String),
}

/// PostgreSQL backed store holding a single pooled connection for the whole run.
pub struct PostgresBatchStore {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl PostgresBatchStore {
    pub async fn connect(url: &str) -> Result<Self, ConnectError> {
        let manager = PostgresConnectionManager::new_from_stringlike(url, NoTls)
            .map_err(ConnectError::InvalidUrl)?;
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .await
            .map_err(ConnectError::Pool)?;

        {
            let conn = pool
                .get()
                .await
                .map_err(|error| ConnectError::Unreachable(error.to_string()))?;
            conn.simple_query("SELECT 1")
                .await
                .map_err(|error| ConnectError::Unreachable(error.to_string()))?;
        }
        info!("connected to database");

        Ok(Self { pool })
    }
}

#[async_trait]
impl BatchStore for PostgresBatchStore {
    async fn select_rows(&self, sql: &str) -> Result<SelectedRows, StoreError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|error| StoreError::Connection(error.to_string()))?;
        // Simple-query protocol returns every column as text, whatever its type.
        let messages = conn
            .simple_query(sql)
            .await
            .map_err(|error| StoreError::Query(describe(&error)))?;

        let mut selected = SelectedRows::default();
        for message in messages {
            let SimpleQueryMessage::Row(row) = message else {
                continue;
            };
            if selected.columns.is_empty() {
                selected.columns = row
                    .columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect();
            }
            selected
                .rows
                .push((0..row.len()).map(|i| row.get(i).map(str::to_string)).collect());
        }
        debug!(rows = selected.rows.len(), "selector query returned");

        Ok(selected)
    }

    async fn execute_script(&self, sql: &str) -> Result<(), StoreError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|error| StoreError::Connection(error.to_string()))?;

        if let Err(error) = conn.batch_execute(sql).await {
            // Leave the pooled session outside any transaction the script opened.
            if let Err(rollback_error) = conn.batch_execute("ROLLBACK").await {
                warn!(%rollback_error, "rollback after failed script also failed");
            }
            return Err(StoreError::Query(describe(&error)));
        }
        Ok(())
    }
}

fn describe(error: &tokio_postgres::Error) -> String {
    match error.as_db_error() {
        Some(db_error) => format!("{}: {}", db_error.severity(), db_error.message()),
        None => error.to_string(),
    }
}
