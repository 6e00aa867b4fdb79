use std::collections::HashMap;

use crate::schema::parse_number;

/// Summary row set for one numeric column. Undefined statistics are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summary for a text column, used when the table has no numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: usize,
}

pub fn describe_numeric<'a, I>(column: &str, cells: I) -> NumericSummary
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut values: Vec<f64> = cells.into_iter().flatten().filter_map(parse_number).collect();
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = if count == 0 {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / count as f64
    };
    let std = if count < 2 {
        f64::NAN
    } else {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    };

    NumericSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: values.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&values, 0.25),
        q50: quantile(&values, 0.50),
        q75: quantile(&values, 0.75),
        max: values.last().copied().unwrap_or(f64::NAN),
    }
}

pub fn describe_object<'a, I>(column: &str, cells: I) -> ObjectSummary
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    let mut count = 0;
    for v in cells.into_iter().flatten() {
        count += 1;
        let n = counts.entry(v).or_insert(0);
        if *n == 0 {
            order.push(v);
        }
        *n += 1;
    }

    // ties go to the value seen first
    let mut top: Option<(&str, usize)> = None;
    for v in &order {
        let n = counts[v];
        if top.map_or(true, |(_, best)| n > best) {
            top = Some((*v, n));
        }
    }

    ObjectSummary {
        column: column.to_string(),
        count,
        unique: order.len(),
        top: top.map(|(v, _)| v.to_string()),
        freq: top.map_or(0, |(_, n)| n),
    }
}

/// Linear interpolation between closest ranks over sorted `values`.
fn quantile(values: &[f64], q: f64) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => values[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn numeric_summary_matches_hand_computation() {
        let cells = [Some("1"), Some("2"), None, Some("3"), Some("4")];
        let s = describe_numeric("2020", cells.iter().copied());
        assert_eq!(s.count, 4);
        assert!(close(s.mean, 2.5));
        assert!(close(s.std, 1.2909944487358056));
        assert!(close(s.min, 1.0));
        assert!(close(s.q25, 1.75));
        assert!(close(s.q50, 2.5));
        assert!(close(s.q75, 3.25));
        assert!(close(s.max, 4.0));
    }

    #[test]
    fn single_value_has_nan_std() {
        let s = describe_numeric("x", [Some("7.5")]);
        assert_eq!(s.count, 1);
        assert!(s.std.is_nan());
        assert!(close(s.q75, 7.5));
    }

    #[test]
    fn empty_column_is_all_nan() {
        let s = describe_numeric("x", [None, None]);
        assert_eq!(s.count, 0);
        assert!(s.mean.is_nan());
        assert!(s.min.is_nan());
        assert!(s.q50.is_nan());
    }

    #[test]
    fn object_summary_picks_first_most_frequent() {
        let cells = [Some("b"), Some("a"), Some("a"), Some("b"), None];
        let s = describe_object("Country", cells.iter().copied());
        assert_eq!(s.count, 4);
        assert_eq!(s.unique, 2);
        assert_eq!(s.top.as_deref(), Some("b"));
        assert_eq!(s.freq, 2);
    }
}
