//! Comma separated engine log parser
//!
//! Row 0 is the header, every following row is data. Rows are kept even when
//! their field count differs from the header so that the record validator can
//! tally them. Input is raw bytes: fields that are not valid UTF-8 are decoded
//! lossily rather than failing the file. The tokenizer drops blank lines, so
//! they are counted separately and reported as rejected rows.

use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim};
use std::path::Path;

use super::types::{Log, Parseable, Record};
use crate::error::LogError;

/// CSV log file parser
pub struct CsvLog;

impl Parseable for CsvLog {
    fn parse(&self, path: &Path, data: &[u8]) -> Result<Log, LogError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(data);

        let csv_error = |source| LogError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut row = ByteRecord::new();
        if !reader.read_byte_record(&mut row).map_err(csv_error)? {
            return Err(LogError::Empty(path.to_path_buf()));
        }
        let header: Vec<String> = row
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();

        let mut records = Vec::new();
        let mut lossy_rows = 0usize;
        for row in reader.byte_records() {
            let row = row.map_err(csv_error)?;
            if std::str::from_utf8(row.as_slice()).is_err() {
                lossy_rows += 1;
            }
            records.push(Record::from(StringRecord::from_byte_record_lossy(row)));
        }

        let blank_lines = count_blank_lines(data);

        if lossy_rows > 0 {
            tracing::warn!("{:?}: {} row(s) contained invalid UTF-8", path, lossy_rows);
        }
        tracing::debug!(
            "Parsed {:?}: {} columns, {} rows, {} blank lines",
            path,
            header.len(),
            records.len(),
            blank_lines
        );

        Ok(Log {
            header,
            records,
            blank_lines,
        })
    }
}

/// Count empty lines after the header line
///
/// The newline ending the last line does not start another one. Lines before
/// the header are skipped by the tokenizer and not counted.
fn count_blank_lines(data: &[u8]) -> usize {
    fn is_blank(line: &&[u8]) -> bool {
        line.is_empty() || *line == b"\r"
    }

    let data = data.strip_suffix(b"\n").unwrap_or(data);

    data.split(|&b| b == b'\n')
        .skip_while(is_blank)
        .skip(1)
        .filter(is_blank)
        .count()
}
