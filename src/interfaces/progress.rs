use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    application::ports::RunProgress,
    domain::batch_outcome::{BatchOutcome, BatchStage, BatchStatus, RunReport},
};

pub const EXIT_BATCHES_FAILED: u8 = 2;

/// One spinner per batch on the terminal, replaced by a ✓ or ✘ line when the batch ends.
#[derive(Default)]
pub struct ConsoleRunProgress {
    spinner: Option<ProgressBar>,
}

impl RunProgress for ConsoleRunProgress {
    fn batch_started(&mut self, index: usize, batch_count: usize) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{prefix:.bold} {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_prefix(format!("batch {}/{batch_count}", index + 1));
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn stage_started(&mut self, _index: usize, stage: BatchStage) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(match stage {
                BatchStage::Backup => "backup data",
                BatchStage::Update => "backfill data",
            });
        }
    }

    fn batch_finished(&mut self, outcome: &BatchOutcome) {
        let Some(spinner) = self.spinner.take() else {
            return;
        };
        match &outcome.status {
            BatchStatus::Succeeded { backed_up_rows } => spinner.finish_with_message(format!(
                "{} {}",
                style("✓").green(),
                style(format!("{backed_up_rows} rows backed up and updated")).dim()
            )),
            BatchStatus::Failed { stage, reason } => spinner.abandon_with_message(format!(
                "{} {}",
                style("✘").red(),
                style(format!("{stage} error: {reason}")).red()
            )),
        }
    }
}

pub fn print_run_summary(report: &RunReport) {
    println!();
    if report.is_clean() {
        println!(
            "{} {}",
            style("All batches applied").green().bold(),
            style(format!("({} batches)", report.total())).dim()
        );
        return;
    }

    println!(
        "{} {} succeeded, {} failed",
        style("Run finished with failures:").yellow().bold(),
        report.succeeded(),
        report.failed(),
    );
    for outcome in report.outcomes() {
        if let BatchStatus::Failed { stage, reason } = &outcome.status {
            println!(
                "  {} {stage}: {reason}",
                style(format!("batch {}", outcome.index)).red()
            );
        }
    }
}

pub fn exit_status(report: &RunReport, strict: bool) -> u8 {
    if strict && !report.is_clean() {
        EXIT_BATCHES_FAILED
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{EXIT_BATCHES_FAILED, exit_status};
    use crate::domain::batch_outcome::{BatchOutcome, BatchStage, RunReport};

    fn report_with_failure() -> RunReport {
        let mut report = RunReport::default();
        report.record(BatchOutcome::succeeded(0, 3));
        report.record(BatchOutcome::failed(1, BatchStage::Update, "boom"));
        report
    }

    #[test]
    fn failures_only_change_exit_status_in_strict_mode() {
        let report = report_with_failure();

        assert_eq!(exit_status(&report, false), 0);
        assert_eq!(exit_status(&report, true), EXIT_BATCHES_FAILED);
    }

    #[test]
    fn clean_report_exits_zero_even_when_strict() {
        let mut report = RunReport::default();
        report.record(BatchOutcome::succeeded(0, 1));

        assert_eq!(exit_status(&report, true), 0);
    }
}
