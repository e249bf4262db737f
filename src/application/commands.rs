use std::path::PathBuf;

use crate::infrastructure::sql_script::ValueMode;

#[derive(Debug)]
pub struct GenerateBatchedSqlCommand {
    pub source_path: PathBuf,
    pub table: String,
    pub output_dir: PathBuf,
    pub batch_size: usize,
    pub id_column: String,
    pub value_mode: ValueMode,
    pub empty_as_null: bool,
}

#[derive(Debug)]
pub struct GenerateBatchedSqlResult {
    pub output_dir: PathBuf,
    pub row_count: usize,
    pub batch_count: usize,
}

#[derive(Debug)]
pub struct RunBatchesCommand {
    pub source_dir: PathBuf,
    pub database_url: String,
    pub strict: bool,
}
