use std::fmt;

/// Tokens the reader treats as a missing cell, in addition to the empty string.
pub const NULL_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Returns `None` for empty cells and recognised missing-value tokens.
pub fn normalize_cell(raw: &str) -> Option<String> {
    if raw.is_empty() || NULL_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// The whole CSV held in memory, row-oriented.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GdpTable {
    /// Column names from the header row, in file order.
    pub headers: Vec<String>,
    /// One entry per data row, always `headers.len()` cells wide.
    /// `None` marks a missing value.
    pub rows: Vec<Vec<Option<String>>>,
}

impl GdpTable {
    pub fn new(headers: Vec<String>) -> Self {
        GdpTable {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of column `idx`, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(idx).and_then(|c| c.as_deref()))
    }

    /// Preview of the first `n` rows.
    pub fn head(&self, n: usize) -> Preview<'_> {
        Preview { table: self, n }
    }
}

/// Printable slice of a [`GdpTable`]; missing cells render as `NaN`.
pub struct Preview<'a> {
    table: &'a GdpTable,
    n: usize,
}

impl fmt::Display for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = &self.table.rows[..self.n.min(self.table.len())];
        let index_width = shown.len().saturating_sub(1).to_string().len();

        // column width = widest of header and shown cells
        let widths: Vec<usize> = self
            .table
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                shown
                    .iter()
                    .map(|r| r[i].as_deref().unwrap_or("NaN").len())
                    .chain(std::iter::once(h.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:index_width$}", "")?;
        for (h, w) in self.table.headers.iter().zip(&widths) {
            write!(f, "  {:>w$}", h, w = *w)?;
        }
        writeln!(f)?;
        for (idx, row) in shown.iter().enumerate() {
            write!(f, "{:<index_width$}", idx)?;
            for (cell, w) in row.iter().zip(&widths) {
                write!(f, "  {:>w$}", cell.as_deref().unwrap_or("NaN"), w = *w)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GdpTable {
        GdpTable {
            headers: vec!["Country".into(), "2020".into()],
            rows: vec![
                vec![Some("France".into()), Some("2630.3".into())],
                vec![Some("Chad".into()), None],
            ],
        }
    }

    #[test]
    fn null_tokens_become_missing() {
        assert_eq!(normalize_cell(""), None);
        assert_eq!(normalize_cell("NaN"), None);
        assert_eq!(normalize_cell("N/A"), None);
        assert_eq!(normalize_cell("0"), Some("0".to_string()));
        assert_eq!(normalize_cell(" "), Some(" ".to_string()));
    }

    #[test]
    fn column_iterates_cells() {
        let t = sample();
        let idx = t.column_index("2020").unwrap();
        let cells: Vec<_> = t.column(idx).collect();
        assert_eq!(cells, vec![Some("2630.3"), None]);
        assert_eq!(t.column_index("2099"), None);
    }

    #[test]
    fn head_renders_missing_as_nan() {
        let t = sample();
        let out = t.head(5).to_string();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Country"));
        assert!(lines[2].starts_with('1'));
        assert!(lines[2].ends_with("NaN"));

        let one = t.head(1).to_string();
        assert_eq!(one.lines().count(), 2);
    }
}
