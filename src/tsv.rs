//! TSV reading and writing for annotation tables.
//!
//! Input files have one header line and no index column; every cell is
//! typed through [`ColumnType::of`]. Output files start with the
//! `filename` index column.

use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::CatalogEntry;
use crate::error::DataError;
use crate::model::{ColumnType, Kind, Table};

/// Name of the index column in written TSVs.
pub const INDEX_COLUMN: &str = "filename";

/// Parse the TSV text of one movement file.
pub fn parse_tsv(text: &str, file: &str) -> Result<Table, DataError> {
    let mut lines = text
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| DataError::ParsingError(format!("{file}: empty TSV")))?;
    let columns: Vec<String> = split_line(header);
    let types: Vec<ColumnType> = columns.iter().map(|c| ColumnType::of(c)).collect();

    let mut table = Table::new(columns);
    for (n, line) in lines.enumerate() {
        let cells = split_line(line);
        if cells.len() > types.len() {
            return Err(DataError::ParsingError(format!(
                "{file}: row {} has {} cells, header has {}",
                n + 1,
                cells.len(),
                types.len()
            )));
        }
        let mut values = Vec::with_capacity(types.len());
        for (i, ty) in types.iter().enumerate() {
            let raw = cells.get(i).map(String::as_str).unwrap_or("");
            let value = ty.parse(raw).map_err(|e| {
                DataError::ParsingError(format!(
                    "{file}: row {}, column '{}': {e}",
                    n + 1,
                    table.columns[i]
                ))
            })?;
            values.push(value);
        }
        table.push_row(file, values);
    }
    Ok(table)
}

/// Read one movement's TSV from disk.
pub fn read_tsv<P: AsRef<Path>>(path: P, file: &str) -> Result<Table, DataError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| DataError::IoError(format!("failed to read '{}': {e}", path.display())))?;
    parse_tsv(&text, file)
}

/// Read `<dir>/<filename>.tsv` for every selected movement and concatenate
/// the tables in selection order.
pub fn read_tsvs<P: AsRef<Path>>(dir: P, selection: &[&CatalogEntry]) -> Result<Table, DataError> {
    let dir = dir.as_ref();
    let mut result = Table::default();
    for entry in selection {
        let path = dir.join(format!("{}.tsv", entry.filename));
        log::debug!("reading {}", path.display());
        result.extend(read_tsv(&path, &entry.filename)?);
    }
    Ok(result)
}

/// Render a table as TSV text, index column first.
pub fn to_tsv(table: &Table) -> String {
    let mut out = String::new();
    out.push_str(INDEX_COLUMN);
    for c in &table.columns {
        out.push('\t');
        out.push_str(&quote(c));
    }
    out.push('\n');
    for row in &table.rows {
        out.push_str(&quote(&row.file));
        for v in &row.values {
            out.push('\t');
            out.push_str(&quote(&v.to_string()));
        }
        out.push('\n');
    }
    out
}

/// Output file name: `<name>_<kind>.tsv`, or `<name>.tsv` for joined data.
pub fn result_file_name(name: &str, kind: Option<Kind>) -> String {
    match kind {
        Some(kind) => format!("{name}_{kind}.tsv"),
        None => format!("{name}.tsv"),
    }
}

/// Write a result table into `dir` and log a one-row preview.
pub fn store_result<P: AsRef<Path>>(
    table: &Table,
    dir: P,
    name: &str,
    kind: Option<Kind>,
) -> Result<PathBuf, DataError> {
    let path = dir.as_ref().join(result_file_name(name, kind));
    fs::write(&path, to_tsv(table))
        .map_err(|e| DataError::IoError(format!("failed to write '{}': {e}", path.display())))?;
    log::info!("PREVIEW of {}:\n{}", path.display(), preview(table));
    Ok(path)
}

fn preview(table: &Table) -> String {
    let head = Table {
        columns: table.columns.clone(),
        rows: table.rows.iter().take(1).cloned().collect(),
    };
    to_tsv(&head)
}

fn split_line(line: &str) -> Vec<String> {
    line.split('\t').map(unquote).collect()
}

fn unquote(cell: &str) -> String {
    match cell.strip_prefix('"').and_then(|c| c.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => cell.to_string(),
    }
}

fn quote(cell: &str) -> String {
    if cell.contains(['\t', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
