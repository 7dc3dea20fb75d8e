//! Per-record analyzers and the grids they accumulate into.
//!
//! Every analyzer implements [`RecordAnalyzer`]. The session binds each one
//! to a file's columns once per file, feeds it every validated row, and
//! finalizes it once after the last file:
//!
//! - [`fuel_trim`] - steady-state fuel trim statistics per ECU trim cell
//! - [`knock`] - knock events derived from the hardware knock counter
//! - [`afr`] - air-fuel ratio grids (VE or MAF, plus wideband WOT)
//!
//! Shared building blocks live in [`cells`] (running statistics) and
//! [`grid`] (axis geometry and the cell-offset mapper).

pub mod afr;
pub mod cells;
pub mod fuel_trim;
pub mod grid;
pub mod knock;

use crate::columns::{ColumnResolver, Field};
use crate::config::Config;
use crate::error::ConfigError;
use crate::parsers::Record;

/// Record validity thresholds shared by the analyzers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Minimum timestamp for a record to count
    pub min_time: i64,
    /// Minimum coolant temperature for a record to count
    pub min_temp: i64,
    /// Optional engine speed floor
    pub min_speed: Option<i64>,
}

impl Thresholds {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_time: config.min_time,
            min_temp: config.min_temp,
            min_speed: config.min_speed,
        }
    }

    /// Whether a timestamp is early enough that the record is ignored
    #[inline]
    pub fn before_start(&self, timestamp: i64) -> bool {
        timestamp < self.min_time
    }

    /// Whether the engine is still below operating temperature
    #[inline]
    pub fn too_cold(&self, temperature: f64) -> bool {
        temperature < self.min_temp as f64
    }

    /// Whether the engine speed is under the optional floor
    #[inline]
    pub fn too_slow(&self, speed: i64) -> bool {
        self.min_speed.is_some_and(|floor| speed < floor)
    }
}

/// Core trait for all per-record analyzers
pub trait RecordAnalyzer: Send {
    /// Unique identifier for this analyzer
    fn id(&self) -> &str;

    /// Human-readable analyzer name
    fn name(&self) -> &str;

    /// Fields that must be resolvable in every log file
    fn required_fields(&self) -> Vec<Field>;

    /// Resolve this analyzer's columns against a new file's header
    fn bind(&mut self, columns: &ColumnResolver) -> Result<(), ConfigError>;

    /// Called before the first record of each file
    fn begin_file(&mut self) {}

    /// Accumulate one validated record
    fn accumulate(&mut self, record: &Record);

    /// Compute averages for every populated cell
    fn finalize(&mut self);
}

/// Average of the redundant left/right trim channels
#[inline]
pub fn trim_average(left: f64, right: f64) -> f64 {
    (left + right) / 2.0
}
