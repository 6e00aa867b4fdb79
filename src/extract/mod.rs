// src/extract/mod.rs
pub mod table;

pub use table::{normalize_cell, GdpTable, Preview};

use crate::error::{EtlError, Result};
use csv::ReaderBuilder;
use std::{collections::HashSet, fs::File, io::Read, path::Path};
use tracing::{debug, info};

/// Open `path` and read the whole CSV into a [`GdpTable`].
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<GdpTable> {
    let file = File::open(&path).map_err(|source| EtlError::FileAccess {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    let table = from_reader(file)?;
    info!(
        rows = table.len(),
        columns = table.width(),
        "extracted CSV"
    );
    Ok(table)
}

/// Parse CSV text from any reader. The first record is the header.
/// Short rows are padded with missing cells; long rows are rejected.
pub fn from_reader<R: Read>(reader: R) -> Result<GdpTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(EtlError::Parse("missing header row".into()));
    }

    if let Some(dup) = first_duplicate(&headers) {
        return Err(EtlError::Parse(format!("duplicate column `{}` in header", dup)));
    }

    let mut table = GdpTable::new(headers);
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() > table.width() {
            return Err(EtlError::Parse(format!(
                "line {}: expected {} fields, found {}",
                line,
                table.width(),
                record.len()
            )));
        }

        let mut row: Vec<Option<String>> = record.iter().map(normalize_cell).collect();
        if row.len() < table.width() {
            debug!(line, fields = row.len(), "padding short row");
            row.resize(table.width(), None);
        }
        table.rows.push(row);
    }

    Ok(table)
}

fn first_duplicate(headers: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(headers.len());
    headers
        .iter()
        .map(String::as_str)
        .find(|h| !seen.insert(*h))
}
