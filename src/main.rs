mod application;
mod domain;
mod infrastructure;
mod interfaces;

use std::process::ExitCode;

use anyhow::{Context, Result};
use console::style;

use crate::application::use_cases::{
    generate_batched_sql::GenerateBatchedSqlUseCase, run_batches::RunBatchesUseCase,
};
use crate::infrastructure::postgres_store::PostgresBatchStore;
use crate::interfaces::{
    cli::{BatcherCommand, collect_invocation},
    logging::setup_logger,
    progress::{ConsoleRunProgress, exit_status, print_run_summary},
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let invocation = collect_invocation()?;
    setup_logger(invocation.log_level);

    match invocation.command {
        BatcherCommand::Generate(command) => {
            println!("{}", style("Batching...").cyan());
            let result = GenerateBatchedSqlUseCase.execute(command)?;

            println!(
                "{} {} ({} rows in {} batches)",
                style("Batched SQL has been saved to").green(),
                style(result.output_dir.display()).bold(),
                result.row_count,
                result.batch_count,
            );
            Ok(ExitCode::SUCCESS)
        }
        BatcherCommand::Run(command) => {
            let store = PostgresBatchStore::connect(&command.database_url)
                .await
                .context("Unable to connect to the database")?;

            let mut progress = ConsoleRunProgress::default();
            let report = RunBatchesUseCase::new(store)
                .execute(&command, &mut progress)
                .await?;

            print_run_summary(&report);
            Ok(ExitCode::from(exit_status(&report, command.strict)))
        }
    }
}
