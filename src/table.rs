//! Typed delimited-file loader.
//!
//! Parses a delimited text file into an in-memory table with explicit
//! per-column types. Types come from the caller (see `schema`); nothing is
//! inferred from the data. Rows whose field count does not match the header
//! are dropped with a warning and counted, structural tolerance the upstream
//! files are known to need. Type violations on declared columns are fatal.

use std::collections::HashMap;
use std::fs::File;

use camino::Utf8Path;
use tracing::warn;

use crate::error::DecpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
}

/// A single parsed field. Empty source fields become `Null` whatever the
/// declared type, except booleans, which have no null encoding in the
/// source files.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Null,
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Cell::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

/// How to read one source file: delimiter, optional row cap, optional
/// column projection, and the explicit type map.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub delimiter: u8,
    pub rows: Option<usize>,
    pub columns: Option<Vec<String>>,
    pub types: HashMap<String, ColumnType>,
}

#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
}

pub fn read_table(path: &Utf8Path, spec: &TableSpec) -> Result<(Table, LoadReport), DecpError> {
    let file = File::open(path).map_err(|err| DecpError::SourceUnavailable {
        path: path.to_owned(),
        message: err.to_string(),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(spec.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|err| DecpError::SourceUnavailable {
            path: path.to_owned(),
            message: format!("failed to read header: {err}"),
        })?
        .clone();

    let header_names: Vec<String> = headers
        .iter()
        .map(|name| name.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    // Resolve the projection to source column indices, preserving header order.
    let kept: Vec<(usize, String)> = match &spec.columns {
        Some(projection) => {
            for column in projection {
                if !header_names.iter().any(|name| name == column) {
                    return Err(DecpError::MissingColumn {
                        column: column.clone(),
                        path: path.to_owned(),
                    });
                }
            }
            header_names
                .iter()
                .enumerate()
                .filter(|(_, name)| projection.iter().any(|column| column == *name))
                .map(|(idx, name)| (idx, name.clone()))
                .collect()
        }
        None => header_names.iter().cloned().enumerate().collect(),
    };

    let mut rows = Vec::new();
    let mut report = LoadReport::default();

    for (idx, result) in reader.records().enumerate() {
        if let Some(cap) = spec.rows {
            if report.rows_read >= cap {
                break;
            }
        }
        // Header is line 1, data starts at line 2.
        let line = idx + 2;
        report.rows_read += 1;

        let record = match result {
            Ok(record) => record,
            Err(err) => {
                warn!("dropping unreadable row at line {line}: {err}");
                report.rows_dropped += 1;
                continue;
            }
        };

        if record.len() != header_names.len() {
            warn!(
                "dropping row at line {line}: {} fields, expected {}",
                record.len(),
                header_names.len()
            );
            report.rows_dropped += 1;
            continue;
        }

        let mut cells = Vec::with_capacity(kept.len());
        for (source_idx, name) in &kept {
            let raw = record.get(*source_idx).unwrap_or("").trim();
            let column_type = spec.types.get(name).copied().unwrap_or(ColumnType::Text);
            cells.push(parse_cell(raw, column_type, line, name)?);
        }
        rows.push(cells);
    }

    if report.rows_dropped > 0 {
        warn!(
            "{}: dropped {} of {} rows with a field-count mismatch",
            path, report.rows_dropped, report.rows_read
        );
    }

    let columns = kept.into_iter().map(|(_, name)| name).collect();
    Ok((Table { columns, rows }, report))
}

fn parse_cell(raw: &str, column_type: ColumnType, line: usize, column: &str) -> Result<Cell, DecpError> {
    match column_type {
        ColumnType::Text => {
            if raw.is_empty() {
                Ok(Cell::Null)
            } else {
                Ok(Cell::Text(raw.to_string()))
            }
        }
        ColumnType::Integer => {
            if raw.is_empty() {
                return Ok(Cell::Null);
            }
            raw.parse::<i64>()
                .map(Cell::Integer)
                .map_err(|_| DecpError::MalformedInput {
                    row: line,
                    column: column.to_string(),
                    message: format!("expected an integer, got {raw:?}"),
                })
        }
        ColumnType::Boolean => match raw {
            "true" | "True" | "TRUE" => Ok(Cell::Boolean(true)),
            "false" | "False" | "FALSE" => Ok(Cell::Boolean(false)),
            other => Err(DecpError::MalformedInput {
                row: line,
                column: column.to_string(),
                message: format!("expected a boolean literal, got {other:?}"),
            }),
        },
    }
}
