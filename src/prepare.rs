// src/prepare.rs
//
// Retype the table for loading: the key column stays text, designated
// columns become nullable floats, and every missing cell becomes a typed null.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::TargetTable;
use crate::error::{EtlError, Result};
use crate::extract::GdpTable;
use crate::schema::parse_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// A single cell ready for binding. `None` is the null marker; the variant
/// keeps the SQL type of the null.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadValue {
    Text(Option<String>),
    Number(Option<f64>),
}

impl LoadValue {
    pub fn is_null(&self) -> bool {
        matches!(self, LoadValue::Text(None) | LoadValue::Number(None))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreparedTable {
    pub columns: Vec<PreparedColumn>,
    pub rows: Vec<Vec<LoadValue>>,
}

impl PreparedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Select and retype the columns `target` loads, in CSV header order.
///
/// Designated numeric columns missing from the CSV and CSV columns the
/// target does not know are skipped with a warning. A present numeric cell
/// that does not parse is an error.
#[tracing::instrument(level = "info", skip_all, fields(table = %target.name, rows = table.len()))]
pub fn prepare(table: &GdpTable, target: &TargetTable) -> Result<PreparedTable> {
    if table.column_index(&target.key_column).is_none() {
        return Err(EtlError::MissingColumn(target.key_column.clone()));
    }

    let numeric: HashSet<&str> = target.numeric_columns.iter().map(String::as_str).collect();
    for name in &target.numeric_columns {
        if table.column_index(name).is_none() {
            warn!(column = %name, "numeric column absent from CSV; not loaded");
        }
    }

    let mut selected: Vec<(usize, PreparedColumn)> = Vec::with_capacity(table.width());
    for (idx, name) in table.headers.iter().enumerate() {
        let kind = if *name == target.key_column {
            ColumnKind::Text
        } else if numeric.contains(name.as_str()) {
            ColumnKind::Number
        } else {
            warn!(column = %name, "column not part of target table; skipped");
            continue;
        };
        selected.push((
            idx,
            PreparedColumn {
                name: name.clone(),
                kind,
            },
        ));
    }

    let mut rows = Vec::with_capacity(table.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let mut out = Vec::with_capacity(selected.len());
        for (idx, col) in &selected {
            let cell = row[*idx].as_deref();
            let value = match col.kind {
                ColumnKind::Text => LoadValue::Text(cell.map(str::to_string)),
                ColumnKind::Number => match cell {
                    None => LoadValue::Number(None),
                    Some(raw) => match parse_number(raw) {
                        Some(n) if n.is_finite() => LoadValue::Number(Some(n)),
                        _ => {
                            return Err(EtlError::Coerce {
                                row: row_idx + 1,
                                column: col.name.clone(),
                                value: raw.to_string(),
                            })
                        }
                    },
                },
            };
            out.push(value);
        }
        rows.push(out);
    }

    let nulls = rows.iter().flatten().filter(|v| v.is_null()).count();
    info!(
        columns = selected.len(),
        nulls, "prepared rows for load"
    );

    Ok(PreparedTable {
        columns: selected.into_iter().map(|(_, c)| c).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::from_reader;

    fn target() -> TargetTable {
        TargetTable::default()
    }

    #[test]
    fn missing_numbers_become_typed_nulls() -> Result<()> {
        let t = from_reader("Country,2020,2021\nFrance,100,\nFrance,100,110\n".as_bytes())?;
        let p = prepare(&t, &target())?;

        assert_eq!(p.column_names().collect::<Vec<_>>(), vec!["Country", "2020", "2021"]);
        assert_eq!(p.columns[1].kind, ColumnKind::Number);
        assert_eq!(p.len(), 2);
        assert_eq!(
            p.rows[0],
            vec![
                LoadValue::Text(Some("France".into())),
                LoadValue::Number(Some(100.0)),
                LoadValue::Number(None),
            ]
        );
        assert_eq!(p.rows[1][2], LoadValue::Number(Some(110.0)));
        Ok(())
    }

    #[test]
    fn missing_key_cell_is_null_not_empty_string() -> Result<()> {
        let t = from_reader("Country,2020\n,5\n".as_bytes())?;
        let p = prepare(&t, &target())?;
        assert_eq!(p.rows[0][0], LoadValue::Text(None));
        Ok(())
    }

    #[test]
    fn unknown_columns_are_skipped() -> Result<()> {
        let t = from_reader("Region,Country,2020,Notes\nEU,France,1,x\n".as_bytes())?;
        let p = prepare(&t, &target())?;
        assert_eq!(p.column_names().collect::<Vec<_>>(), vec!["Country", "2020"]);
        Ok(())
    }

    #[test]
    fn empty_numeric_column_is_all_null() -> Result<()> {
        let t = from_reader("Country,2020,2025\nPeru,1,\nChad,2,\n".as_bytes())?;
        let p = prepare(&t, &target())?;
        assert!(p.rows.iter().all(|r| r[2] == LoadValue::Number(None)));
        Ok(())
    }

    #[test]
    fn unparsable_number_is_coerce_error() {
        let t = from_reader("Country,2020\nPeru,1\nChad,lots\n".as_bytes()).unwrap();
        match prepare(&t, &target()) {
            Err(EtlError::Coerce { row, column, value }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "2020");
                assert_eq!(value, "lots");
            }
            other => panic!("expected coerce error, got {:?}", other),
        }
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let t = from_reader("Nation,2020\nPeru,1\n".as_bytes()).unwrap();
        assert!(matches!(
            prepare(&t, &target()),
            Err(EtlError::MissingColumn(c)) if c == "Country"
        ));
    }
}
