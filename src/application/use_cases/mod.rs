pub mod generate_batched_sql;
pub mod run_batches;
