use std::{fs::File, path::Path};

use csv::{QuoteStyle, WriterBuilder};

use crate::application::ports::SelectedRows;

/// Writes `rows` as CSV and syncs the file to disk before returning. NULL becomes an empty field.
pub fn write_backup(path: &Path, rows: &SelectedRows) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(file);

    writer.write_record(&rows.columns)?;
    for row in &rows.rows {
        writer.write_record(row.iter().map(|value| value.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;

    let file = writer
        .into_inner()
        .map_err(|error| csv::Error::from(error.into_error()))?;
    file.sync_all()?;
    Ok(())
}
