//! Error types for configuration, schema and log loading failures.
//!
//! Two classes exist. [`ConfigError`] is fatal: it means the analyzer is
//! pointed at incompatible configuration or data and the run must stop.
//! [`LogError`] covers a single unusable input file, which is reported and
//! skipped while the rest of the run continues. Row-level problems never
//! produce an error; they are tallied in the session statistics instead.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration or schema failure
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("couldn't load config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line in the configuration file is not a `KEY = value` pair
    #[error("malformed config line {line}: {text:?}")]
    Syntax { line: usize, text: String },

    /// A required option is absent
    #[error("missing required config option {0}")]
    Missing(String),

    /// An option is present but does not parse as the expected type
    #[error("config option {key} has invalid value {value:?}, expected {expected}")]
    Invalid {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// An option parsed but falls outside its validated range
    #[error("config option {key} = {value} is outside the allowed range {min}..={max}")]
    OutOfRange {
        key: String,
        value: String,
        min: String,
        max: String,
    },

    /// Two options contradict each other
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),

    /// A configured column name was not found in a log header
    #[error("couldn't find column for {key}, named {name:?}, in {file}")]
    UnresolvedColumn {
        key: String,
        name: String,
        file: String,
    },
}

/// Non-fatal failure to load a single log file
#[derive(Debug, Error)]
pub enum LogError {
    /// The file could not be read from disk
    #[error("couldn't read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV tokenizer rejected the file
    #[error("couldn't tokenize {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The file has no header row
    #[error("{0} contains no header row")]
    Empty(PathBuf),
}
