//! Common test utilities shared across all test modules
//!
//! This module provides synthetic log and configuration builders, temporary
//! file helpers and float assertions.

#![allow(dead_code)]

use std::path::PathBuf;

/// Write a file under a per-test temporary directory and return its path
pub fn write_temp_file(test_name: &str, file_name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let dir = std::env::temp_dir().join("ecugrid_tests").join(test_name);
    std::fs::create_dir_all(&dir)
        .unwrap_or_else(|e| panic!("Failed to create temp dir '{}': {}", dir.display(), e));
    let path = dir.join(file_name);
    std::fs::write(&path, contents)
        .unwrap_or_else(|e| panic!("Failed to write temp file '{}': {}", path.display(), e));
    path
}

/// Test data generators for synthetic tests
pub mod synthetic {
    use std::path::Path;

    use ecugrid::config::Config;
    use ecugrid::parsers::{CsvLog, Parseable};
    use ecugrid::state::LoadedFile;

    /// Header carrying every logical field, with unit suffixes on some columns
    pub const HEADER: &str =
        "TIME(s),RPM(rpm),CTS(C),LBLM,RBLM,CELL,MAP(kPa),MAF(g/s),CL,BLM,WOT,KNOCK,WB(afr)";

    /// Baseline configuration: everything enabled, speed density, wideband
    const BASE_CONFIG: &[(&str, &str)] = &[
        ("MIN_TIME", "10"),
        ("MIN_TEMP", "70"),
        ("BLM_ON", "1"),
        ("N_CELLS", "4"),
        ("BLM_MIN_COUNTS", "1"),
        ("KNOCK_ON", "1"),
        ("KNOCK_MIN", "5"),
        ("SD_ENABLE", "1"),
        ("WB_ON", "1"),
        ("WB_MIN", "10"),
        ("WB_MAX", "20"),
        ("WB_COMP", "0.2"),
        ("AFR_MIN_COUNTS", "1"),
        ("COL_TIMESTAMP", "TIME"),
        ("COL_RPM", "RPM"),
        ("COL_TEMP", "CTS"),
        ("COL_LBLM", "LBLM"),
        ("COL_RBLM", "RBLM"),
        ("COL_CELL", "CELL"),
        ("COL_MAP", "MAP"),
        ("COL_MAF", "MAF"),
        ("COL_CL", "CL"),
        ("COL_BLM", "BLM"),
        ("COL_WOT", "WOT"),
        ("COL_KNOCK", "KNOCK"),
        ("COL_WB", "WB"),
    ];

    /// Configuration text with some keys overridden or added
    pub fn config_text(overrides: &[(&str, &str)]) -> String {
        let mut text = String::from("# synthetic test configuration\n");
        for (key, value) in BASE_CONFIG {
            let value = overrides
                .iter()
                .find(|(k, _)| k == key)
                .map_or(*value, |(_, v)| *v);
            text.push_str(&format!("{} = {}\n", key, value));
        }
        for (key, value) in overrides {
            if !BASE_CONFIG.iter().any(|(k, _)| k == key) {
                text.push_str(&format!("{} = {}\n", key, value));
            }
        }
        text
    }

    /// Parsed configuration with some keys overridden or added
    pub fn config(overrides: &[(&str, &str)]) -> Config {
        config_text(overrides)
            .parse()
            .unwrap_or_else(|e| panic!("Synthetic config should parse: {}", e))
    }

    /// CSV log text from the standard header and the given rows
    pub fn log_text(rows: &[&str]) -> String {
        let mut text = format!("{}\n", HEADER);
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    /// Loaded file built in memory from the standard header and rows
    pub fn loaded(name: &str, rows: &[&str]) -> LoadedFile {
        let path = Path::new(name);
        let log = CsvLog
            .parse(path, log_text(rows).as_bytes())
            .unwrap_or_else(|e| panic!("Synthetic log should parse: {}", e));
        LoadedFile::new(path, log)
    }

    // TIME,RPM,CTS,LBLM,RBLM,CELL,MAP,MAF,CL,BLM,WOT,KNOCK,WB

    /// Five-row drive: a keep-alive row, two trim rows in cell 2, one wide
    /// open throttle row and one truncated row
    pub const DRIVE: [&str; 5] = [
        "5,800,60,128,128,0,30,5,0,0,0,100,14.7",
        "20,2500,85,126,130,2,45,20,1,1,0,105,14.7",
        "21,2500,85,140,144,2,45,20,1,1,0,103,14.9",
        "22,3000,90,130,130,1,80,40,1,1,1,150,12.7",
        "23,2500,85,120,120",
    ];
}

/// Assertion helpers for common test patterns
pub mod assertions {
    /// Assert two floats are equal within a small tolerance
    pub fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "Expected {}, got {}",
            expected,
            actual
        );
    }

    /// Assert an optional mean is present and close to the expected value
    pub fn assert_mean(actual: Option<f64>, expected: f64) {
        match actual {
            Some(value) => assert_close(value, expected),
            None => panic!("Expected mean {}, got none", expected),
        }
    }
}
