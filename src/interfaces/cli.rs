use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use tracing::level_filters::LevelFilter;

use crate::{
    application::commands::{GenerateBatchedSqlCommand, RunBatchesCommand},
    infrastructure::sql_script::ValueMode,
};

const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_ID_COLUMN: &str = "id";
const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Parser)]
#[command(
    name = "backfill-batcher",
    version,
    about = "Turn a CSV of row updates into batched SQL and run it with a backup of every batch"
)]
struct CliArgs {
    #[arg(long, global = true, default_value = "warn", help = "Log level, RUST_LOG overrides it")]
    log_level: LevelFilter,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Generate batched SQL files from a CSV
    #[command(name = "gen")]
    Generate(GenerateArgs),
    /// Run generated SQL batches, backing up each batch first
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long, short = 's', help = "CSV file to generate batched SQL from")]
    source: PathBuf,
    #[arg(long, short = 't', help = "Table name to be backfilled")]
    table: String,
    #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, help = "Number of rows in each batch")]
    size: usize,
    #[arg(long, short = 'k', default_value = DEFAULT_ID_COLUMN)]
    id_column: String,
    #[arg(long, value_enum, default_value_t = CliValueMode::Raw)]
    value_mode: CliValueMode,
    #[arg(long, help = "Write empty cells as NULL")]
    empty_as_null: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long, short = 's', default_value = DEFAULT_OUTPUT_DIR, help = "Directory containing generated batched SQL")]
    source: PathBuf,
    #[arg(long, env = DATABASE_URL_ENV, hide_env_values = true, help = "PostgreSQL connection string")]
    url: String,
    #[arg(long, help = "Exit with code 2 when any batch failed")]
    strict: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliValueMode {
    Raw,
    Quoted,
}

impl From<CliValueMode> for ValueMode {
    fn from(value: CliValueMode) -> Self {
        match value {
            CliValueMode::Raw => ValueMode::Raw,
            CliValueMode::Quoted => ValueMode::Quoted,
        }
    }
}

#[derive(Debug)]
pub enum BatcherCommand {
    Generate(GenerateBatchedSqlCommand),
    Run(RunBatchesCommand),
}

#[derive(Debug)]
pub struct Invocation {
    pub log_level: LevelFilter,
    pub command: BatcherCommand,
}

pub fn collect_invocation() -> Result<Invocation> {
    if env::args_os().len() == 1 {
        return collect_interactive_invocation();
    }
    collect_invocation_from_args(CliArgs::parse())
}

fn collect_invocation_from_args(args: CliArgs) -> Result<Invocation> {
    let command = match args.command {
        CliCommand::Generate(generate) => {
            if generate.size == 0 {
                return Err(anyhow!("Batch size must be greater than 0"));
            }
            BatcherCommand::Generate(GenerateBatchedSqlCommand {
                source_path: generate.source,
                table: ensure_non_empty_value(generate.table, "Table name")?,
                output_dir: generate.output,
                batch_size: generate.size,
                id_column: ensure_non_empty_value(generate.id_column, "Identifier column")?,
                value_mode: generate.value_mode.into(),
                empty_as_null: generate.empty_as_null,
            })
        }
        CliCommand::Run(run) => BatcherCommand::Run(RunBatchesCommand {
            source_dir: run.source,
            database_url: ensure_non_empty_value(run.url, "Database URL")?,
            strict: run.strict,
        }),
    };

    Ok(Invocation {
        log_level: args.log_level,
        command,
    })
}

fn collect_interactive_invocation() -> Result<Invocation> {
    let theme = ColorfulTheme::default();

    println!();
    println!(
        "{}",
        style(" BACKFILL BATCHER ")
            .black()
            .on_cyan()
            .bold()
            .underlined()
    );
    println!("{}", style("Batch CSV updates and apply them with backups").dim());
    println!();

    let actions = ["Generate batched SQL from a CSV", "Run generated batches"];
    let action_index = Select::with_theme(&theme)
        .with_prompt("What do you want to do")
        .default(0)
        .items(&actions)
        .interact()?;

    let command = if action_index == 0 {
        BatcherCommand::Generate(prompt_generate_command(&theme)?)
    } else {
        BatcherCommand::Run(prompt_run_command(&theme)?)
    };

    Ok(Invocation {
        log_level: LevelFilter::WARN,
        command,
    })
}

fn prompt_generate_command(theme: &ColorfulTheme) -> Result<GenerateBatchedSqlCommand> {
    let source: String = Input::with_theme(theme)
        .with_prompt("CSV file path")
        .validate_with(|value: &String| {
            if PathBuf::from(value.trim()).is_file() {
                Ok(())
            } else {
                Err("File does not exist")
            }
        })
        .interact_text()?;

    let table: String = Input::with_theme(theme)
        .with_prompt("Table name")
        .validate_with(|value: &String| {
            if value.trim().is_empty() {
                Err("Table name must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: usize = Input::with_theme(theme)
        .with_prompt("Batch size")
        .default(DEFAULT_BATCH_SIZE)
        .validate_with(|value: &usize| {
            if *value == 0 {
                Err("Batch size must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let id_column: String = Input::with_theme(theme)
        .with_prompt("Identifier column")
        .default(DEFAULT_ID_COLUMN.to_string())
        .interact_text()?;

    let value_modes = [ValueMode::Raw, ValueMode::Quoted];
    let value_mode_items = value_modes
        .iter()
        .map(|mode| mode.as_str())
        .collect::<Vec<_>>();
    let value_mode_index = Select::with_theme(theme)
        .with_prompt("Value mode")
        .default(0)
        .items(&value_mode_items)
        .interact()?;

    let empty_as_null = Confirm::with_theme(theme)
        .with_prompt("Write empty cells as NULL?")
        .default(false)
        .interact()?;

    let output: String = Input::with_theme(theme)
        .with_prompt("Output directory (will be replaced)")
        .default(DEFAULT_OUTPUT_DIR.to_string())
        .interact_text()?;

    Ok(GenerateBatchedSqlCommand {
        source_path: PathBuf::from(source.trim()),
        table: table.trim().to_string(),
        output_dir: PathBuf::from(output.trim()),
        batch_size,
        id_column: ensure_non_empty_value(id_column.trim().to_string(), "Identifier column")?,
        value_mode: value_modes[value_mode_index],
        empty_as_null,
    })
}

fn prompt_run_command(theme: &ColorfulTheme) -> Result<RunBatchesCommand> {
    let source: String = Input::with_theme(theme)
        .with_prompt("Generated batch directory")
        .default(DEFAULT_OUTPUT_DIR.to_string())
        .interact_text()?;

    let mut url_input = Input::<String>::with_theme(theme).with_prompt("Database URL");
    if let Ok(url) = env::var(DATABASE_URL_ENV) {
        url_input = url_input.default(url).show_default(false);
    }
    let database_url = url_input.interact_text()?;

    let strict = Confirm::with_theme(theme)
        .with_prompt("Exit with an error when a batch fails?")
        .default(false)
        .interact()?;

    Ok(RunBatchesCommand {
        source_dir: PathBuf::from(source.trim()),
        database_url: ensure_non_empty_value(database_url, "Database URL")?,
        strict,
    })
}

fn ensure_non_empty_value(value: String, field_name: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(anyhow!("{field_name} must not be empty"));
    }
    Ok(value.trim().to_string())
}
