use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// month-first wins over day-first for ambiguous slashes
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
];

/// Outcome of trying to read one cell as a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateProbe {
    Parsed(NaiveDateTime),
    Unparsable,
}

impl DateProbe {
    pub fn is_parsed(&self) -> bool {
        matches!(self, DateProbe::Parsed(_))
    }
}

/// Best-effort date parse. Never fails; anything unrecognised is `Unparsable`.
pub fn probe(raw: &str) -> DateProbe {
    let v = raw.trim();
    if v.is_empty() {
        return DateProbe::Unparsable;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return DateProbe::Parsed(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(v, fmt) {
            return DateProbe::Parsed(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(v, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return DateProbe::Parsed(dt);
            }
        }
    }
    DateProbe::Unparsable
}

/// True if at least one present cell parses as a date.
pub fn is_date_candidate<'a, I>(cells: I) -> bool
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    cells.into_iter().flatten().any(|v| probe(v).is_parsed())
}
