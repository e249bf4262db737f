use sqlparser::{
    ast::Value,
    dialect::PostgreSqlDialect,
    parser::Parser,
    tokenizer::{Token, Tokenizer, Whitespace},
};
use thiserror::Error;

use crate::domain::source_table::{SourceRow, SourceTable};

/// How CSV cell values are written into update statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueMode {
    /// Cell text is used as a SQL expression as-is, so strings must arrive pre-quoted.
    #[default]
    Raw,
    /// Cell text is always written as a single-quoted string literal.
    Quoted,
}

impl ValueMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueMode::Raw => "raw",
            ValueMode::Quoted => "quoted",
        }
    }
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Table name must not be empty")]
    EmptyTable,
    #[error("Value {value:?} of column `{column}` on line {line} is not a single SQL expression: {reason}")]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchScripts {
    pub update: String,
    pub selector: String,
}

#[derive(Debug, Clone)]
pub struct BatchScriptRenderer {
    quoted_table: String,
    value_mode: ValueMode,
    empty_as_null: bool,
}

impl BatchScriptRenderer {
    pub fn new(table: &str, value_mode: ValueMode, empty_as_null: bool) -> Result<Self, ScriptError> {
        let table = table.trim();
        if table.is_empty() {
            return Err(ScriptError::EmptyTable);
        }

        Ok(Self {
            quoted_table: quote_table_name(table),
            value_mode,
            empty_as_null,
        })
    }

    /// Renders the update and selector scripts for `rows`, which must belong to `source`.
    pub fn render(
        &self,
        source: &SourceTable,
        rows: &[SourceRow],
    ) -> Result<BatchScripts, ScriptError> {
        let id_column = source.id_column();
        let mut update_lines = Vec::with_capacity(rows.len() + 2);
        let mut id_predicates = Vec::with_capacity(rows.len());

        update_lines.push("BEGIN;".to_string());
        for row in rows {
            let id = source.id_of(row);
            ensure_expression(id, row.line, id_column)?;

            let setters = source
                .assignments(row)
                .map(|(column, value)| {
                    self.render_value(value, row.line, column)
                        .map(|rendered| format!("{column} = {rendered}"))
                })
                .collect::<Result<Vec<_>, _>>()?;

            update_lines.push(format!(
                "UPDATE {} SET {} WHERE {id_column} = {id};",
                self.quoted_table,
                setters.join(", "),
            ));
            id_predicates.push(format!("{id_column} = {id}"));
        }
        update_lines.push("COMMIT;".to_string());

        Ok(BatchScripts {
            update: update_lines.join("\n"),
            selector: format!(
                "SELECT * FROM {} WHERE {};",
                self.quoted_table,
                id_predicates.join(" OR ")
            ),
        })
    }

    fn render_value(&self, value: &str, line: u64, column: &str) -> Result<String, ScriptError> {
        if self.empty_as_null && value.trim().is_empty() {
            return Ok("NULL".to_string());
        }

        match self.value_mode {
            ValueMode::Raw => {
                ensure_expression(value, line, column)?;
                Ok(value.trim().to_string())
            }
            ValueMode::Quoted => Ok(Value::SingleQuotedString(value.to_string()).to_string()),
        }
    }
}

fn quote_table_name(table: &str) -> String {
    table
        .split('.')
        .map(|part| format!("\"{}\"", part.trim().replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn ensure_expression(value: &str, line: u64, column: &str) -> Result<(), ScriptError> {
    parse_single_expression(value).map_err(|reason| ScriptError::InvalidValue {
        line,
        column: column.to_string(),
        value: value.to_string(),
        reason,
    })
}

fn parse_single_expression(value: &str) -> Result<(), String> {
    let dialect = PostgreSqlDialect {};
    let tokens = Tokenizer::new(&dialect, value)
        .tokenize()
        .map_err(|error| error.to_string())?;
    // A `--` comment would swallow the rest of its script line.
    if tokens.iter().any(|token| {
        matches!(
            token,
            Token::Whitespace(
                Whitespace::SingleLineComment { .. } | Whitespace::MultiLineComment(_)
            )
        )
    }) {
        return Err("comments are not allowed in a value".to_string());
    }

    let mut parser = Parser::new(&dialect).with_tokens(tokens);
    parser.parse_expr().map_err(|error| error.to_string())?;

    let trailing = parser.peek_token();
    if trailing.token != Token::EOF {
        return Err(format!("unexpected trailing input `{}`", trailing.token));
    }
    Ok(())
}
