//! Reading input tables into [`InputRecord`]s.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::{QrLabelError, Result};

/// One row of an input table, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    /// Zero-based row number within the table.
    pub index: usize,
    /// Text to encode, with escaped ampersands restored.
    pub payload: String,
    /// Output file name, with any row-index placeholder filled in.
    pub label: String,
}

impl InputRecord {
    /// Builds a record from the raw fields of row `index` of `path`.
    pub fn from_row(path: &Path, index: usize, row: &StringRecord) -> Result<Self> {
        let (payload, label) = match (row.get(0), row.get(1)) {
            (Some(payload), Some(label)) => (payload, label),
            _ => {
                return Err(QrLabelError::MalformedRow {
                    path: path.to_path_buf(),
                    row: index,
                    reason: format!("expected at least 2 fields, found {}", row.len()),
                })
            }
        };

        let label = interpolate_row_index(label, index);
        if let Some(reason) = unsafe_file_name(&label) {
            return Err(QrLabelError::MalformedRow {
                path: path.to_path_buf(),
                row: index,
                reason,
            });
        }

        Ok(Self {
            index,
            payload: sanitize_payload(payload),
            label,
        })
    }
}

/// Restores `&` from the `&amp;` sequence the upstream export writes.
///
/// A single pass, so `&amp;amp;` comes out as `&amp;`.
pub fn sanitize_payload(raw: &str) -> String {
    raw.replace("&amp;", "&")
}

/// Substitutes the row index for `{}` and `{0}` placeholders in a label.
///
/// `{{` and `}}` produce literal braces. Anything else is copied as is.
pub fn interpolate_row_index(label: &str, index: usize) -> String {
    let mut out = String::with_capacity(label.len());
    let mut rest = label;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("{{") {
            out.push('{');
            rest = &rest[2..];
        } else if rest.starts_with("}}") {
            out.push('}');
            rest = &rest[2..];
        } else if rest.starts_with("{}") {
            out.push_str(&index.to_string());
            rest = &rest[2..];
        } else if rest.starts_with("{0}") {
            out.push_str(&index.to_string());
            rest = &rest[3..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

fn unsafe_file_name(label: &str) -> Option<String> {
    if label.is_empty() {
        return Some("empty output file name".to_string());
    }
    if label == "." || label == ".." {
        return Some(format!("output file name {label:?} is not a file"));
    }
    if label.contains(['/', '\\']) {
        return Some(format!("output file name {label:?} contains a path separator"));
    }
    None
}

/// Streaming reader over the rows of one table.
///
/// The table has no header; every non-blank line is a record.
pub struct TableReader {
    path: std::path::PathBuf,
    records: csv::StringRecordsIntoIter<File>,
    next_index: usize,
}

impl TableReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| QrLabelError::file_access(path, e))?;
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(b',')
            .from_reader(file);
        Ok(Self {
            path: path.to_path_buf(),
            records: reader.into_records(),
            next_index: 0,
        })
    }
}

impl Iterator for TableReader {
    type Item = Result<InputRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.records.next()?;
        let index = self.next_index;
        self.next_index += 1;

        let row = match row {
            Ok(row) => row,
            Err(e) => return Some(Err(csv_error(&self.path, index, e))),
        };
        Some(InputRecord::from_row(&self.path, index, &row))
    }
}

fn csv_error(path: &Path, index: usize, error: csv::Error) -> QrLabelError {
    let reason = error.to_string();
    match error.into_kind() {
        csv::ErrorKind::Io(io) => QrLabelError::file_access(path, io),
        _ => QrLabelError::MalformedRow {
            path: path.to_path_buf(),
            row: index,
            reason,
        },
    }
}
