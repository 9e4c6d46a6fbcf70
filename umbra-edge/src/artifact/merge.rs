//! Idempotent merge (幂等合并)
//!
//! Decides from the parsed structure of an existing artifact whether a
//! terminal's contribution is already present, and produces the bytes to
//! write when it is not. Pure; shared by the local and remote paths.

use csv::{ReaderBuilder, WriterBuilder};

use super::{ArtifactError, ArtifactResult, ArtifactSchema, Contribution, WriteDiscipline};
use crate::report::sheet::TERMINAL_ROW_LABEL;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Result of merging one contribution into an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Write `bytes` as the whole file
    Write { bytes: Vec<u8>, created: bool },
    /// Contribution already present
    AlreadyPresent,
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

fn read_rows(bytes: &[u8]) -> ArtifactResult<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(strip_bom(bytes));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }
    Ok(rows)
}

fn write_rows<'a, I>(rows: I, bom: bool) -> ArtifactResult<Vec<u8>>
where
    I: IntoIterator<Item = &'a Vec<String>>,
{
    let mut out = Vec::new();
    if bom {
        out.extend_from_slice(UTF8_BOM);
    }
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ArtifactError::io("csv buffer", e.into_error()))
}

/// A `TER_NO` cell that holds a terminal number
fn is_terminal_cell(cell: &str) -> bool {
    !cell.is_empty() && cell.bytes().all(|b| b.is_ascii_digit())
}

fn terminal_row(rows: &[Vec<String>]) -> ArtifactResult<&Vec<String>> {
    rows.first()
        .filter(|row| row.first().map(String::as_str) == Some(TERMINAL_ROW_LABEL))
        .ok_or_else(|| ArtifactError::Malformed(format!("missing {TERMINAL_ROW_LABEL} row")))
}

fn new_file(schema: &ArtifactSchema, contribution: &Contribution) -> ArtifactResult<Vec<u8>> {
    match contribution {
        Contribution::Rows { rows, .. } => {
            let header: Vec<String> = schema.header.iter().map(|h| h.to_string()).collect();
            write_rows(std::iter::once(&header).chain(rows.iter()), schema.bom)
        }
        Contribution::Column { key, values } => {
            let mut rows = vec![vec![TERMINAL_ROW_LABEL.to_string(), key.clone()]];
            for (label, value) in schema.header.iter().zip(values) {
                rows.push(vec![label.to_string(), value.clone()]);
            }
            write_rows(&rows, schema.bom)
        }
        Contribution::Whole { bytes, .. } => {
            let mut out = Vec::with_capacity(bytes.len() + UTF8_BOM.len());
            if schema.bom {
                out.extend_from_slice(UTF8_BOM);
            }
            out.extend_from_slice(bytes);
            Ok(out)
        }
    }
}

/// Append rows unless some row already ends with the key
fn merge_rows(existing: &[u8], key: &str, rows: &[Vec<String>]) -> ArtifactResult<MergeOutcome> {
    let present = read_rows(existing)?
        .iter()
        .any(|row| row.last().map(String::as_str) == Some(key));
    if present {
        return Ok(MergeOutcome::AlreadyPresent);
    }

    // Existing bytes stay untouched; new rows go after them
    let mut bytes = existing.to_vec();
    if !bytes.is_empty() && !bytes.ends_with(b"\n") {
        bytes.push(b'\n');
    }
    bytes.extend(write_rows(rows, false)?);
    Ok(MergeOutcome::Write {
        bytes,
        created: false,
    })
}

/// Fill the first value column whose `TER_NO` cell is free
fn merge_column(
    existing: &[u8],
    schema: &ArtifactSchema,
    key: &str,
    values: &[String],
) -> ArtifactResult<MergeOutcome> {
    let mut rows = read_rows(existing)?;
    let header = terminal_row(&rows)?;
    if header.iter().skip(1).any(|cell| cell == key) {
        return Ok(MergeOutcome::AlreadyPresent);
    }

    let column = header
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, cell)| !is_terminal_cell(cell))
        .map(|(i, _)| i)
        .unwrap_or(header.len());

    for (index, row) in rows.iter_mut().enumerate() {
        if row.len() <= column {
            row.resize(column + 1, String::new());
        }
        row[column] = if index == 0 {
            key.to_string()
        } else {
            let label = row[0].as_str();
            schema
                .header
                .iter()
                .position(|l| *l == label)
                .and_then(|i| values.get(i))
                .cloned()
                .unwrap_or_default()
        };
    }

    let bytes = write_rows(&rows, existing.starts_with(UTF8_BOM))?;
    Ok(MergeOutcome::Write {
        bytes,
        created: false,
    })
}

/// Merge one contribution into the current artifact bytes
///
/// `existing` is `None` when the file does not exist yet.
pub fn merge(
    existing: Option<&[u8]>,
    schema: &ArtifactSchema,
    contribution: &Contribution,
) -> ArtifactResult<MergeOutcome> {
    if contribution.discipline() != schema.discipline {
        return Err(ArtifactError::SchemaMismatch(schema.discipline));
    }

    let Some(existing) = existing.filter(|b| !strip_bom(b).is_empty()) else {
        return Ok(MergeOutcome::Write {
            bytes: new_file(schema, contribution)?,
            created: true,
        });
    };

    match contribution {
        Contribution::Rows { key, rows } => merge_rows(existing, key, rows),
        Contribution::Column { key, values } => merge_column(existing, schema, key, values),
        Contribution::Whole { .. } => {
            let bytes = new_file(schema, contribution)?;
            if bytes == existing {
                Ok(MergeOutcome::AlreadyPresent)
            } else {
                Ok(MergeOutcome::Write {
                    bytes,
                    created: false,
                })
            }
        }
    }
}

/// Recover the contribution of `key` from an artifact
pub fn extract_contribution(
    bytes: &[u8],
    schema: &ArtifactSchema,
    key: &str,
) -> ArtifactResult<Option<Contribution>> {
    match schema.discipline {
        WriteDiscipline::RowAppend => {
            let rows: Vec<Vec<String>> = read_rows(bytes)?
                .into_iter()
                .filter(|row| row.last().map(String::as_str) == Some(key))
                .collect();
            Ok((!rows.is_empty()).then(|| Contribution::Rows {
                key: key.to_string(),
                rows,
            }))
        }
        WriteDiscipline::ColumnInsert => {
            let rows = read_rows(bytes)?;
            let Some(column) = terminal_row(&rows)?.iter().skip(1).position(|c| c == key) else {
                return Ok(None);
            };
            let column = column + 1;
            let values = schema
                .header
                .iter()
                .map(|label| {
                    rows.iter()
                        .find(|row| row.first().map(String::as_str) == Some(*label))
                        .and_then(|row| row.get(column))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect();
            Ok(Some(Contribution::Column {
                key: key.to_string(),
                values,
            }))
        }
        WriteDiscipline::Replace => {
            let body = if schema.bom { strip_bom(bytes) } else { bytes };
            Ok((!body.is_empty()).then(|| Contribution::Whole {
                key: key.to_string(),
                bytes: body.to_vec(),
            }))
        }
    }
}
