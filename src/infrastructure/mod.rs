pub mod artifact_layout;
pub mod backup_writer;
pub mod csv_source;
pub mod postgres_store;
pub mod sql_script;
