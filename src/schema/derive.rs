use tracing::debug;

use super::{Column, ColumnType};
use crate::extract::GdpTable;

/// Infer the type of every column in `table`, in header order.
pub fn derive_columns(table: &GdpTable) -> Vec<Column> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let ty = infer_column_type(table.column(idx));
            debug!(column = %name, %ty, "derived column type");
            Column {
                name: name.clone(),
                ty,
            }
        })
        .collect()
}

/// Missing cells are ignored, except that they demote an integer column to
/// float64 and a boolean column to object. A column with no values at all is
/// float64.
pub fn infer_column_type<'a, I>(cells: I) -> ColumnType
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut seen_missing = false;
    let mut seen_value = false;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;

    for cell in cells {
        let Some(v) = cell else {
            seen_missing = true;
            continue;
        };
        seen_value = true;
        let v = v.trim();
        if all_int && v.parse::<i64>().is_err() {
            all_int = false;
        }
        if all_float && parse_number(v).is_none() {
            all_float = false;
        }
        if all_bool && !(v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")) {
            all_bool = false;
        }
        if !all_int && !all_float && !all_bool {
            return ColumnType::Object;
        }
    }

    match (seen_value, all_int, all_float, all_bool) {
        (false, ..) => ColumnType::Float64,
        (true, true, _, _) if !seen_missing => ColumnType::Int64,
        (true, _, true, _) => ColumnType::Float64,
        (true, _, _, true) if !seen_missing => ColumnType::Bool,
        _ => ColumnType::Object,
    }
}

/// Parse a cell as a float, tolerating surrounding whitespace.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}
