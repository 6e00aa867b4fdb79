// src/diagnose/mod.rs
//
// Read-only data-quality checks over a `GdpTable`. Nothing here mutates the
// table or feeds back into the load.

pub mod dates;
pub mod stats;

pub use dates::{is_date_candidate, probe, DateProbe};
pub use stats::{describe_numeric, describe_object, NumericSummary, ObjectSummary};

use crate::extract::GdpTable;
use crate::schema::{derive_columns, Column, ColumnType};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

/// Descriptive statistics section. Numeric columns win; object columns are
/// only described when there is nothing numeric.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Numeric(Vec<NumericSummary>),
    Object(Vec<ObjectSummary>),
    Empty,
}

/// Everything the checks found, in report order.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub missing: Vec<(String, usize)>,
    pub duplicate_rows: usize,
    pub columns: Vec<Column>,
    pub summary: Summary,
    /// Distinct values of each object column in first-seen order.
    pub unique_values: Vec<(String, Vec<Option<String>>)>,
    /// `Some` only when the table has an `id` column.
    pub id_unique: Option<bool>,
    /// Uniqueness of the declared key column, when present.
    pub key_unique: Option<(String, bool)>,
    pub empty_columns: Vec<String>,
    pub date_candidates: Vec<String>,
}

/// Run every check over `table`. `key_column` names the intended row
/// identifier (e.g. `Country`).
#[tracing::instrument(level = "info", skip(table), fields(rows = table.len()))]
pub fn run(table: &GdpTable, key_column: &str) -> Diagnostics {
    let columns = derive_columns(table);
    let object_columns: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.ty == ColumnType::Object)
        .map(|(i, _)| i)
        .collect();

    let missing = missing_counts(table);
    let duplicate_rows = duplicate_rows(table);
    let summary = summarize(table, &columns);

    let unique_values = object_columns
        .iter()
        .map(|&i| (table.headers[i].clone(), unique_values(table, i)))
        .collect();

    let id_unique = table.column_index("id").map(|i| is_unique(table, i));
    let key_unique = table
        .column_index(key_column)
        .map(|i| (key_column.to_string(), is_unique(table, i)));

    let empty_columns = empty_columns(table);

    let date_candidates: Vec<String> = object_columns
        .iter()
        .filter(|&&i| is_date_candidate(table.column(i)))
        .map(|&i| table.headers[i].clone())
        .collect();

    if duplicate_rows > 0 {
        warn!(duplicate_rows, "table contains duplicate rows");
    }
    if let Some((ref key, false)) = key_unique {
        warn!(column = %key, "key column has repeated values");
    }
    info!(
        duplicate_rows,
        empty_columns = empty_columns.len(),
        date_candidates = date_candidates.len(),
        "diagnostics complete"
    );

    Diagnostics {
        missing,
        duplicate_rows,
        columns,
        summary,
        unique_values,
        id_unique,
        key_unique,
        empty_columns,
        date_candidates,
    }
}

pub fn missing_counts(table: &GdpTable) -> Vec<(String, usize)> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.clone(), table.column(i).filter(Option::is_none).count()))
        .collect()
}

/// Rows identical, cell for cell, to some earlier row. The first occurrence
/// is not counted and missing equals missing.
pub fn duplicate_rows(table: &GdpTable) -> usize {
    let mut seen: HashSet<&[Option<String>]> = HashSet::with_capacity(table.len());
    table
        .rows
        .iter()
        .filter(|row| !seen.insert(row.as_slice()))
        .count()
}

pub fn unique_values(table: &GdpTable, idx: usize) -> Vec<Option<String>> {
    let mut seen = HashSet::new();
    table
        .column(idx)
        .filter(|v| seen.insert(*v))
        .map(|v| v.map(str::to_string))
        .collect()
}

/// Missing cells count as a value, so two missing cells are a repeat.
pub fn is_unique(table: &GdpTable, idx: usize) -> bool {
    let mut seen = HashSet::with_capacity(table.len());
    table.column(idx).all(|v| seen.insert(v))
}

pub fn empty_columns(table: &GdpTable) -> Vec<String> {
    table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, _)| table.column(*i).all(|v| v.is_none()))
        .map(|(_, h)| h.clone())
        .collect()
}

fn summarize(table: &GdpTable, columns: &[Column]) -> Summary {
    let numeric: Vec<NumericSummary> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.ty.is_numeric())
        .map(|(i, c)| describe_numeric(&c.name, table.column(i)))
        .collect();
    if !numeric.is_empty() {
        return Summary::Numeric(numeric);
    }

    let object: Vec<ObjectSummary> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.ty == ColumnType::Object)
        .map(|(i, c)| describe_object(&c.name, table.column(i)))
        .collect();
    if object.is_empty() {
        Summary::Empty
    } else {
        Summary::Object(object)
    }
}

fn fmt_stat(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.6}", v)
    }
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(str::len).max().unwrap_or(0)
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = name_width(self.missing.iter().map(|(n, _)| n.as_str()));

        writeln!(f, "Missing values per column:")?;
        for (name, n) in &self.missing {
            writeln!(f, "{: <w$}    {}", name, n)?;
        }
        writeln!(f)?;

        writeln!(f, "Number of duplicate rows:")?;
        writeln!(f, "{}", self.duplicate_rows)?;
        writeln!(f)?;

        writeln!(f, "Data types of each column:")?;
        for c in &self.columns {
            writeln!(f, "{: <w$}    {}", c.name, c.ty)?;
        }
        writeln!(f)?;

        writeln!(f, "Summary statistics (numerical columns):")?;
        write_summary(f, &self.summary)?;
        writeln!(f)?;

        for (name, values) in &self.unique_values {
            let rendered: Vec<String> = values
                .iter()
                .map(|v| match v {
                    Some(s) => format!("'{}'", s),
                    None => "nan".to_string(),
                })
                .collect();
            writeln!(f, "Unique values in '{}':", name)?;
            writeln!(f, "[{}]", rendered.join(", "))?;
            writeln!(f)?;
        }

        if let Some(unique) = self.id_unique {
            writeln!(f, "Unique IDs check:")?;
            writeln!(f, "{}", unique)?;
            writeln!(f)?;
        }
        if let Some((ref key, unique)) = self.key_unique {
            writeln!(f, "Unique key check ('{}'):", key)?;
            writeln!(f, "{}", unique)?;
            writeln!(f)?;
        }

        writeln!(f, "Empty columns:")?;
        let empties: Vec<String> = self.empty_columns.iter().map(|c| format!("'{}'", c)).collect();
        writeln!(f, "[{}]", empties.join(", "))?;
        writeln!(f)?;

        for name in &self.date_candidates {
            writeln!(f, "Date column '{}' successfully parsed to datetime.", name)?;
        }
        Ok(())
    }
}

fn write_summary(f: &mut fmt::Formatter<'_>, summary: &Summary) -> fmt::Result {
    match summary {
        Summary::Empty => writeln!(f, "(no columns to describe)"),
        Summary::Numeric(cols) => {
            let labels = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
            let grid = cols
                .iter()
                .map(|s| {
                    [
                        s.count as f64,
                        s.mean,
                        s.std,
                        s.min,
                        s.q25,
                        s.q50,
                        s.q75,
                        s.max,
                    ]
                    .map(fmt_stat)
                    .to_vec()
                })
                .collect();
            write_grid(f, &labels, cols.iter().map(|c| c.column.as_str()), grid)
        }
        Summary::Object(cols) => {
            let labels = ["count", "unique", "top", "freq"];
            let grid = cols
                .iter()
                .map(|s| {
                    vec![
                        s.count.to_string(),
                        s.unique.to_string(),
                        s.top.clone().unwrap_or_else(|| "NaN".to_string()),
                        s.freq.to_string(),
                    ]
                })
                .collect();
            write_grid(f, &labels, cols.iter().map(|c| c.column.as_str()), grid)
        }
    }
}

/// Statistic labels down the side, one column per described column.
/// `grid[c][r]` is the value of label `r` for column `c`.
fn write_grid<'a>(
    f: &mut fmt::Formatter<'_>,
    labels: &[&str],
    headers: impl Iterator<Item = &'a str>,
    grid: Vec<Vec<String>>,
) -> fmt::Result {
    let headers: Vec<&str> = headers.collect();
    let label_w = name_width(labels.iter().copied());
    let widths: Vec<usize> = headers
        .iter()
        .zip(&grid)
        .map(|(h, col)| col.iter().map(String::len).chain([h.len()]).max().unwrap_or(0))
        .collect();

    write!(f, "{: <label_w$}", "")?;
    for (h, w) in headers.iter().zip(&widths) {
        write!(f, "  {:>w$}", h, w = *w)?;
    }
    writeln!(f)?;
    for (r, label) in labels.iter().enumerate() {
        write!(f, "{: <label_w$}", label)?;
        for (col, w) in grid.iter().zip(&widths) {
            write!(f, "  {:>w$}", col[r], w = *w)?;
        }
        writeln!(f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::from_reader;

    fn table(csv: &str) -> GdpTable {
        from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn scenario_two_france_rows() {
        let t = table("Country,2020,2021\nFrance,100,\nFrance,100,110\n");
        let d = run(&t, "Country");

        assert_eq!(d.duplicate_rows, 0);
        assert_eq!(
            d.missing,
            vec![
                ("Country".to_string(), 0),
                ("2020".to_string(), 0),
                ("2021".to_string(), 1)
            ]
        );
        assert_eq!(d.key_unique, Some(("Country".to_string(), false)));
        assert_eq!(d.id_unique, None);
        assert_eq!(d.unique_values, vec![("Country".to_string(), vec![Some("France".to_string())])]);
        assert!(d.empty_columns.is_empty());
        assert!(d.date_candidates.is_empty());
    }

    #[test]
    fn duplicates_count_only_repeats() {
        let t = table("Country,2020\nPeru,1\nPeru,1\nChad,\nChad,\nPeru,1\nPeru,2\n");
        assert_eq!(duplicate_rows(&t), 3);
    }

    #[test]
    fn dtypes_follow_inference() {
        let t = table("Country,2020,2021,2022\nPeru,1,1.5,\nChad,2,,\n");
        let d = run(&t, "Country");
        let tys: Vec<ColumnType> = d.columns.iter().map(|c| c.ty).collect();
        assert_eq!(
            tys,
            vec![
                ColumnType::Object,
                ColumnType::Int64,
                ColumnType::Float64,
                ColumnType::Float64
            ]
        );
        assert_eq!(d.empty_columns, vec!["2022".to_string()]);
        match &d.summary {
            Summary::Numeric(cols) => {
                assert_eq!(cols.len(), 3);
                assert_eq!(cols[2].count, 0);
            }
            other => panic!("expected numeric summary, got {:?}", other),
        }
    }

    #[test]
    fn object_summary_when_nothing_numeric() {
        let t = table("Country,Region\nPeru,Americas\nChad,Africa\n");
        let d = run(&t, "Country");
        assert!(matches!(d.summary, Summary::Object(ref cols) if cols.len() == 2));
    }

    #[test]
    fn id_column_checked_when_present() {
        let t = table("id,Country\na,Peru\nb,Chad\n");
        assert_eq!(run(&t, "Country").id_unique, Some(true));

        let t = table("id,Country\na,Peru\na,Chad\n");
        assert_eq!(run(&t, "Country").id_unique, Some(false));
    }

    #[test]
    fn date_columns_are_probed() {
        let t = table("Country,Updated\nPeru,2024-01-31\nChad,not a date\n");
        let d = run(&t, "Country");
        assert_eq!(d.date_candidates, vec!["Updated".to_string()]);
    }

    #[test]
    fn unique_values_keep_first_seen_order_and_missing() {
        let t = table("Country,Note\nPeru,b\nChad,\nPeru,a\n");
        let idx = t.column_index("Note").unwrap();
        assert_eq!(
            unique_values(&t, idx),
            vec![Some("b".to_string()), None, Some("a".to_string())]
        );
    }

    #[test]
    fn report_renders_every_section() {
        let t = table("Country,2020,2021\nFrance,100,\nFrance,100,110\n");
        let report = run(&t, "Country").to_string();
        assert!(report.contains("Missing values per column:"));
        assert!(report.contains("Number of duplicate rows:\n0"));
        assert!(report.contains("Data types of each column:"));
        assert!(report.contains("Summary statistics (numerical columns):"));
        assert!(report.contains("Unique values in 'Country':\n['France']"));
        assert!(report.contains("Unique key check ('Country'):\nfalse"));
        assert!(report.contains("Empty columns:\n[]"));
        assert!(!report.contains("Unique IDs check"));
    }
}
