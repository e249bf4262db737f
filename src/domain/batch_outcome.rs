use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Backup,
    Update,
}

impl BatchStage {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStage::Backup => "backup",
            BatchStage::Update => "update",
        }
    }
}

impl fmt::Display for BatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Succeeded { backed_up_rows: usize },
    Failed { stage: BatchStage, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub index: usize,
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn succeeded(index: usize, backed_up_rows: usize) -> Self {
        Self {
            index,
            status: BatchStatus::Succeeded { backed_up_rows },
        }
    }

    pub fn failed(index: usize, stage: BatchStage, reason: impl Into<String>) -> Self {
        Self {
            index,
            status: BatchStatus::Failed {
                stage,
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, BatchStatus::Succeeded { .. })
    }
}

/// Outcome of every batch attempted by one run, in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    outcomes: Vec<BatchOutcome>,
}

impl RunReport {
    pub fn record(&mut self, outcome: BatchOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .map(|outcome| outcome.index)
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(BatchOutcome::is_success)
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchOutcome, BatchStage, RunReport};

    #[test]
    fn report_counts_and_lists_failed_batches() {
        let mut report = RunReport::default();
        report.record(BatchOutcome::succeeded(0, 2));
        report.record(BatchOutcome::failed(1, BatchStage::Backup, "selector returned no rows"));
        report.record(BatchOutcome::succeeded(2, 1));
        report.record(BatchOutcome::failed(3, BatchStage::Update, "syntax error"));

        assert_eq!(report.total(), 4);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.failed_indices(), vec![1, 3]);
        assert!(!report.is_clean());
    }

    #[test]
    fn empty_report_is_clean() {
        assert!(RunReport::default().is_clean());
    }
}
