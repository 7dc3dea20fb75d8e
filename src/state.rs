//! Loaded log files.
//!
//! Reading and tokenizing is independent per file, so a batch of paths is
//! loaded in parallel. Results come back in argument order, which is the
//! order the session must accumulate them in.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LogError;
use crate::parsers::{CsvLog, Log, Parseable};

/// A log file read from disk and tokenized
#[derive(Clone, Debug)]
pub struct LoadedFile {
    /// Path the file was read from
    pub path: PathBuf,
    /// Display name for the file
    pub name: String,
    /// Parsed header and rows
    pub log: Log,
}

impl LoadedFile {
    /// Read and parse a single log file
    pub fn load(path: &Path) -> Result<Self, LogError> {
        let contents = fs::read(path).map_err(|source| LogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let log = CsvLog.parse(path, &contents)?;

        Ok(Self::new(path, log))
    }

    /// Wrap an already parsed log
    pub fn new(path: &Path, log: Log) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            path: path.to_path_buf(),
            name,
            log,
        }
    }
}

/// Load several files in parallel, preserving input order
pub fn load_files(paths: &[PathBuf]) -> Vec<Result<LoadedFile, LogError>> {
    paths.par_iter().map(|p| LoadedFile::load(p)).collect()
}
