//! Analyzer configuration.
//!
//! The configuration lives in a plain `KEY = value` file. [`ConfigFile`] holds
//! the raw pairs and offers validated-range accessors; [`Config`] is the typed,
//! immutable view built from it once per run. Any missing or out-of-range
//! option is a fatal [`ConfigError`].

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use strum::IntoEnumIterator;

use crate::columns::{ColumnNames, Field};
use crate::error::ConfigError;

/// Default configuration file name, looked up in the working directory first
pub const CONFIG_FILE_NAME: &str = "analyzer.conf";

static PAIR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<key>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?<value>.*)$")
        .expect("Failed to compile regex")
});

/// Raw key-value pairs from a configuration file
#[derive(Clone, Debug, Default)]
pub struct ConfigFile {
    entries: HashMap<String, String>,
}

impl ConfigFile {
    /// Load and parse a configuration file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Raw value for a key, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Required string option
    pub fn string(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Required integer option within `min..=max`
    pub fn int(&self, key: &str, min: i64, max: i64) -> Result<i64, ConfigError> {
        let raw = self.string(key)?;
        let value = parse_value::<i64>(key, raw, "an integer")?;
        check_range(key, value, min, max)
    }

    /// Optional integer option within `min..=max`, `default` when absent
    pub fn int_or(&self, key: &str, min: i64, max: i64, default: i64) -> Result<i64, ConfigError> {
        match self.get(key) {
            Some(_) => self.int(key, min, max),
            None => Ok(default),
        }
    }

    /// Optional integer option within `min..=max`
    pub fn int_opt(&self, key: &str, min: i64, max: i64) -> Result<Option<i64>, ConfigError> {
        match self.get(key) {
            Some(_) => self.int(key, min, max).map(Some),
            None => Ok(None),
        }
    }

    /// Required 0/1 switch
    pub fn flag(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.int(key, 0, 1)? == 1)
    }

    /// Optional 0/1 switch
    pub fn flag_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        Ok(self.int_or(key, 0, 1, i64::from(default))? == 1)
    }

    /// Required finite floating point option
    pub fn float(&self, key: &str) -> Result<f64, ConfigError> {
        let raw = self.string(key)?;
        let value = parse_value::<f64>(key, raw, "a number")?;
        if !value.is_finite() {
            return Err(ConfigError::Invalid {
                key: key.to_string(),
                value: raw.to_string(),
                expected: "a finite number",
            });
        }
        Ok(value)
    }

    /// Optional floating point option, `default` when absent
    pub fn float_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.get(key) {
            Some(_) => self.float(key),
            None => Ok(default),
        }
    }
}

impl FromStr for ConfigFile {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut entries = HashMap::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let captures = PAIR_REGEX.captures(line).ok_or_else(|| ConfigError::Syntax {
                line: number + 1,
                text: line.to_string(),
            })?;
            let value = unquote(captures["value"].trim());
            entries.insert(captures["key"].to_string(), value.to_string());
        }

        Ok(Self { entries })
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_value<T: FromStr>(key: &str, raw: &str, expected: &'static str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
        expected,
    })
}

fn check_range<T: PartialOrd + Display>(key: &str, value: T, min: T, max: T) -> Result<T, ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            key: key.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(value)
}

// ============================================================================
// Typed configuration
// ============================================================================

/// Fuel-trim cell analyzer settings (`BLM_ON=1`)
#[derive(Clone, Debug, Serialize)]
pub struct FuelTrimConfig {
    /// Number of trim cells reported by the ECU
    pub cells: usize,
    /// Minimum hits for a cell to be reported as reliable
    pub min_counts: u64,
}

/// What happens to a counter increment below the knock noise floor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiscardPolicy {
    /// Tallied as discarded and nothing else
    Exclusive,
    /// Tallied as discarded and still recorded as a grid event
    CountAnyway,
}

/// Lifetime of the knock counter baseline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CounterScope {
    /// The baseline carries across file boundaries
    Run,
    /// Every file starts from an unseeded baseline
    PerFile,
}

/// Knock analyzer settings (`KNOCK_ON=1`)
#[derive(Clone, Debug, Serialize)]
pub struct KnockConfig {
    /// Counter increments below this are treated as noise
    pub noise_floor: i64,
    pub discard: DiscardPolicy,
    pub counter_scope: CounterScope,
}

/// Load axis used for the part-throttle AFR grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LoadMode {
    /// Engine speed by manifold pressure
    SpeedDensity,
    /// Mass air flow
    Airflow,
}

/// Oxygen sensor feeding the AFR analyzer
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum AfrSensor {
    /// Wideband reading, compensated and range checked
    Wideband { min: f64, max: f64, compensation: f64 },
    /// Narrowband, approximated by the averaged fuel trims
    Narrowband,
}

impl AfrSensor {
    pub fn is_wideband(&self) -> bool {
        matches!(self, AfrSensor::Wideband { .. })
    }
}

/// AFR analyzer settings
#[derive(Clone, Debug, Serialize)]
pub struct AfrConfig {
    pub load_mode: LoadMode,
    pub sensor: AfrSensor,
    /// Minimum samples for a grid cell to be displayed
    pub min_counts: u64,
    /// Trim cell whose part-throttle records are excluded (decel cell)
    pub reject_cell: Option<i64>,
}

/// Complete, validated configuration for one run
#[derive(Clone, Debug, Serialize)]
pub struct Config {
    /// Records with a timestamp below this are ignored
    pub min_time: i64,
    /// Records with a coolant temperature below this are ignored
    pub min_temp: i64,
    /// Optional engine speed floor for trim and part-throttle AFR records
    pub min_speed: Option<i64>,
    pub fuel_trim: Option<FuelTrimConfig>,
    pub knock: Option<KnockConfig>,
    pub afr: AfrConfig,
    pub columns: ColumnNames,
}

impl Config {
    /// Load the typed configuration from a file on disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_file(&ConfigFile::load(path)?)?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Build the typed configuration from raw key-value pairs
    pub fn from_file(file: &ConfigFile) -> Result<Self, ConfigError> {
        let min_time = file.int("MIN_TIME", 0, 999_999)?;
        let min_temp = file.int("MIN_TEMP", -20, 99_999)?;
        let min_speed = file.int_opt("MIN_RPM", 0, 99_999)?;

        let fuel_trim = if file.flag("BLM_ON")? {
            Some(FuelTrimConfig {
                cells: file.int("N_CELLS", 1, 255)? as usize,
                min_counts: file.int("BLM_MIN_COUNTS", 1, 10_000)? as u64,
            })
        } else {
            None
        };

        let knock = if file.flag("KNOCK_ON")? {
            Some(KnockConfig {
                noise_floor: file.int("KNOCK_MIN", 1, 65_535)?,
                discard: if file.flag_or("KNOCK_DISCARD_EXCLUSIVE", true)? {
                    DiscardPolicy::Exclusive
                } else {
                    DiscardPolicy::CountAnyway
                },
                counter_scope: if file.flag_or("KNOCK_RESET_PER_FILE", false)? {
                    CounterScope::PerFile
                } else {
                    CounterScope::Run
                },
            })
        } else {
            None
        };

        let load_mode = if file.flag_or("SD_ENABLE", false)? {
            LoadMode::SpeedDensity
        } else {
            LoadMode::Airflow
        };

        let sensor = if file.flag("WB_ON")? {
            let min = file.float("WB_MIN")?;
            let max = file.float("WB_MAX")?;
            if min > max {
                return Err(ConfigError::Inconsistent(format!(
                    "WB_MIN ({}) is greater than WB_MAX ({})",
                    min, max
                )));
            }
            AfrSensor::Wideband {
                min,
                max,
                compensation: file.float_or("WB_COMP", 0.0)?,
            }
        } else {
            AfrSensor::Narrowband
        };

        let afr = AfrConfig {
            load_mode,
            sensor,
            min_counts: file.int("AFR_MIN_COUNTS", 1, 65_535)? as u64,
            reject_cell: file.int_opt("REJECT_CELL", 0, 255)?,
        };

        let mut columns = ColumnNames::default();
        for field in Field::iter() {
            if let Some(name) = file.get(field.config_key()) {
                columns.insert(field, name);
            }
        }

        Ok(Self {
            min_time,
            min_temp,
            min_speed,
            fuel_trim,
            knock,
            afr,
            columns,
        })
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::from_file(&text.parse()?)
    }
}

/// Get the per-user config directory for ecugrid
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ecugrid"))
}

/// Configuration file used when none is given explicitly
///
/// Prefers `analyzer.conf` in the working directory and falls back to the
/// per-user config directory.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    get_config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .unwrap_or(local)
}
