pub mod batch_outcome;
pub mod row_batch;
pub mod source_table;
