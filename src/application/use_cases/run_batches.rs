use std::{io, path::PathBuf};

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    application::{
        commands::RunBatchesCommand,
        ports::{BatchStore, RunProgress, StoreError},
    },
    domain::batch_outcome::{BatchOutcome, BatchStage, RunReport},
    infrastructure::{artifact_layout::ArtifactLayout, backup_writer::write_backup},
};

#[derive(Debug, Error)]
enum BatchFailure {
    #[error("unable to read selector script {}: {source}", .path.display())]
    ReadSelector { path: PathBuf, source: io::Error },
    #[error("selector query failed: {0}")]
    Select(#[source] StoreError),
    #[error("selector returned no rows")]
    EmptySelection,
    #[error("unable to write backup {}: {source}", .path.display())]
    WriteBackup { path: PathBuf, source: csv::Error },
    #[error("unable to read update script {}: {source}", .path.display())]
    ReadUpdate { path: PathBuf, source: io::Error },
    #[error("update script failed: {0}")]
    Update(#[source] StoreError),
}

impl BatchFailure {
    fn stage(&self) -> BatchStage {
        match self {
            BatchFailure::ReadSelector { .. }
            | BatchFailure::Select(_)
            | BatchFailure::EmptySelection
            | BatchFailure::WriteBackup { .. } => BatchStage::Backup,
            BatchFailure::ReadUpdate { .. } | BatchFailure::Update(_) => BatchStage::Update,
        }
    }
}

pub struct RunBatchesUseCase<S> {
    store: S,
}

impl<S: BatchStore> RunBatchesUseCase<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Backs up then updates every batch in index order. Only setup problems
    /// return `Err`; a failing batch is recorded in the report and the run moves on.
    pub async fn execute(
        &self,
        command: &RunBatchesCommand,
        progress: &mut dyn RunProgress,
    ) -> Result<RunReport> {
        let layout = ArtifactLayout::new(&command.source_dir);
        let batch_count = layout.discover_batch_count()?;
        layout.ensure_backup_dir()?;
        info!(
            batches = batch_count,
            source = %layout.root().display(),
            "running batches"
        );

        let mut report = RunReport::default();
        for index in 0..batch_count {
            progress.batch_started(index, batch_count);

            let outcome = match self.run_batch(&layout, index, progress).await {
                Ok(backed_up_rows) => {
                    debug!(batch = index, backed_up_rows, "batch applied");
                    BatchOutcome::succeeded(index, backed_up_rows)
                }
                Err(failure) => {
                    warn!(batch = index, stage = %failure.stage(), error = %failure, "batch failed");
                    BatchOutcome::failed(index, failure.stage(), failure.to_string())
                }
            };

            progress.batch_finished(&outcome);
            report.record(outcome);
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            failed_batches = ?report.failed_indices(),
            "run finished"
        );
        Ok(report)
    }

    async fn run_batch(
        &self,
        layout: &ArtifactLayout,
        index: usize,
        progress: &mut dyn RunProgress,
    ) -> Result<usize, BatchFailure> {
        progress.stage_started(index, BatchStage::Backup);
        let backed_up_rows = self.backup_batch(layout, index).await?;

        progress.stage_started(index, BatchStage::Update);
        self.apply_update(layout, index).await?;

        Ok(backed_up_rows)
    }

    async fn backup_batch(&self, layout: &ArtifactLayout, index: usize) -> Result<usize, BatchFailure> {
        let selector_path = layout.selector_script_path(index);
        let selector = tokio::fs::read_to_string(&selector_path)
            .await
            .map_err(|source| BatchFailure::ReadSelector {
                path: selector_path.clone(),
                source,
            })?;

        let selected = self
            .store
            .select_rows(&selector)
            .await
            .map_err(BatchFailure::Select)?;
        if selected.is_empty() {
            return Err(BatchFailure::EmptySelection);
        }

        let backup_path = layout.backup_path(index);
        write_backup(&backup_path, &selected).map_err(|source| BatchFailure::WriteBackup {
            path: backup_path,
            source,
        })?;
        Ok(selected.rows.len())
    }

    async fn apply_update(&self, layout: &ArtifactLayout, index: usize) -> Result<(), BatchFailure> {
        let update_path = layout.update_script_path(index);
        let update = tokio::fs::read_to_string(&update_path)
            .await
            .map_err(|source| BatchFailure::ReadUpdate {
                path: update_path.clone(),
                source,
            })?;

        self.store
            .execute_script(&update)
            .await
            .map_err(BatchFailure::Update)
    }
}
