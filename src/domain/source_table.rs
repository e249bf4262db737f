use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unable to parse CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV input has no header row")]
    MissingHeader,
    #[error("Identifier column name must not be empty")]
    EmptyIdColumnName,
    #[error("Identifier column `{0}` is not present in the CSV header")]
    MissingIdColumn(String),
    #[error("CSV header column {position} has no name")]
    EmptyColumnName { position: usize },
    #[error("Column `{0}` appears more than once in the CSV header")]
    DuplicateColumn(String),
    #[error("CSV header has no column besides `{0}`, there is nothing to update")]
    NoUpdatableColumns(String),
    #[error("Row on line {line} has an empty `{column}` value")]
    EmptyId { line: u64, column: String },
}

/// One CSV record. `values` follows the header order of its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub line: u64,
    pub values: Vec<String>,
}

/// Header plus rows of a CSV input, validated against its identifier column.
#[derive(Debug, Clone)]
pub struct SourceTable {
    headers: Vec<String>,
    id_position: usize,
    rows: Vec<SourceRow>,
}

impl SourceTable {
    pub fn new(
        headers: Vec<String>,
        id_column: &str,
        rows: Vec<SourceRow>,
    ) -> Result<Self, SourceError> {
        let id_column = id_column.trim();
        if id_column.is_empty() {
            return Err(SourceError::EmptyIdColumnName);
        }
        if headers.is_empty() || headers.iter().all(|header| header.is_empty()) {
            return Err(SourceError::MissingHeader);
        }
        // Reported position is 1-based.
        if let Some(position) = headers.iter().position(|header| header.is_empty()) {
            return Err(SourceError::EmptyColumnName {
                position: position + 1,
            });
        }

        for (position, header) in headers.iter().enumerate() {
            if headers[..position].contains(header) {
                return Err(SourceError::DuplicateColumn(header.clone()));
            }
        }

        let id_position = headers
            .iter()
            .position(|header| header == id_column)
            .ok_or_else(|| SourceError::MissingIdColumn(id_column.to_string()))?;
        if headers.len() == 1 {
            return Err(SourceError::NoUpdatableColumns(id_column.to_string()));
        }

        if let Some(row) = rows.iter().find(|row| {
            row.values
                .get(id_position)
                .is_none_or(|value| value.trim().is_empty())
        }) {
            return Err(SourceError::EmptyId {
                line: row.line,
                column: id_column.to_string(),
            });
        }

        Ok(Self {
            headers,
            id_position,
            rows,
        })
    }

    pub fn id_column(&self) -> &str {
        &self.headers[self.id_position]
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[SourceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn id_of<'a>(&self, row: &'a SourceRow) -> &'a str {
        row.values[self.id_position].trim()
    }

    /// Non-identifier `(column, value)` pairs of `row`, in header order.
    pub fn assignments<'a>(
        &'a self,
        row: &'a SourceRow,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.headers
            .iter()
            .zip(row.values.iter())
            .enumerate()
            .filter(move |(position, _)| *position != self.id_position)
            .map(|(_, (header, value))| (header.as_str(), value.as_str()))
    }
}
