use async_trait::async_trait;
use thiserror::Error;

use crate::domain::batch_outcome::{BatchOutcome, BatchStage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unable to acquire a database connection: {0}")]
    Connection(String),
    #[error("{0}")]
    Query(String),
}

/// Result set of a selector query, every value already rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl SelectedRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn select_rows(&self, sql: &str) -> Result<SelectedRows, StoreError>;

    /// Submits a multi-statement script as one round trip. The script owns its transaction.
    async fn execute_script(&self, sql: &str) -> Result<(), StoreError>;
}

pub trait RunProgress {
    fn batch_started(&mut self, _index: usize, _batch_count: usize) {}

    fn stage_started(&mut self, _index: usize, _stage: BatchStage) {}

    fn batch_finished(&mut self, _outcome: &BatchOutcome) {}
}
