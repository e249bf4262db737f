use std::{io, path::Path};

use csv::{Reader, ReaderBuilder};
use tracing::debug;

use crate::domain::source_table::{SourceError, SourceRow, SourceTable};

pub fn read_source_table(path: &Path, id_column: &str) -> Result<SourceTable, SourceError> {
    let reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    parse_source_table(reader, id_column)
}

/// Every record must have the header's column count; the reader is not flexible.
pub fn parse_source_table<R: io::Read>(
    mut reader: Reader<R>,
    id_column: &str,
) -> Result<SourceTable, SourceError> {
    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        rows.push(SourceRow {
            line,
            values: record.iter().map(str::to_string).collect(),
        });
    }
    debug!(columns = headers.len(), rows = rows.len(), "parsed CSV source");

    SourceTable::new(headers, id_column, rows)
}
