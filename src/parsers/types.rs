use csv::StringRecord;
use std::path::Path;

use crate::error::LogError;

/// One data row of a log file
///
/// Fields stay as text; each consumer coerces the fields it needs with
/// [`Record::int`] or [`Record::float`].
#[derive(Clone, Debug, Default)]
pub struct Record(StringRecord);

impl Record {
    /// Number of fields in the row
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw text of a field
    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index)
    }

    /// Field as an integer, with `atoi`-style leniency
    ///
    /// Decimal values are truncated toward zero and anything that does not
    /// start with a number reads as 0.
    pub fn int(&self, index: usize) -> i64 {
        self.get(index).map(parse_int).unwrap_or(0)
    }

    /// Field as a float, 0.0 when missing or malformed
    pub fn float(&self, index: usize) -> f64 {
        self.get(index)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

impl From<StringRecord> for Record {
    fn from(record: StringRecord) -> Self {
        Self(record)
    }
}

impl<'a> FromIterator<&'a str> for Record {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn parse_int(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return value;
    }
    if let Ok(value) = raw.parse::<f64>() {
        if value.is_finite() {
            return value.trunc() as i64;
        }
    }

    // Leading sign and digits, like atoi
    let digits_start = usize::from(raw.starts_with(['-', '+']));
    let digits_end = raw[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw.len(), |i| i + digits_start);
    raw[..digits_end].parse().unwrap_or(0)
}

/// Parsed log file: header row plus data rows
#[derive(Clone, Debug, Default)]
pub struct Log {
    /// Header cells, including any unit suffixes
    pub header: Vec<String>,
    /// Data rows in file order
    pub records: Vec<Record>,
    /// Empty lines after the header, dropped by the tokenizer
    pub blank_lines: usize,
}

impl Log {
    /// Number of columns declared by the header
    pub fn width(&self) -> usize {
        self.header.len()
    }
}

/// Trait for log file parsers
pub trait Parseable {
    fn parse(&self, path: &Path, data: &[u8]) -> Result<Log, LogError>;
}
