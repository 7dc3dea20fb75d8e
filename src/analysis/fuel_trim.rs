//! Fuel trim (BLM) cell analysis.
//!
//! The ECU reports which of its trim cells is active on every record. Only
//! warm, closed-loop, part-throttle records with trim learning enabled are
//! accumulated; each contributes its averaged left/right trim plus the
//! speed, load and airflow it was taken at.

use serde::Serialize;

use super::cells::FloatCell;
use super::{trim_average, RecordAnalyzer, Thresholds};
use crate::columns::{ColumnResolver, Field};
use crate::config::FuelTrimConfig;
use crate::error::ConfigError;
use crate::parsers::Record;

/// Trim value of a neutral, perfectly tuned cell
pub const TRIM_NEUTRAL: f64 = 128.0;

/// Cell averages above this are tuned lean
pub const TRIM_LEAN_LIMIT: f64 = 138.0;

/// Cell averages below this are tuned rich
pub const TRIM_RICH_LIMIT: f64 = 110.0;

/// Overall averages below this mean the whole tune is rich
pub const OVERALL_RICH_LIMIT: f64 = 118.0;

/// Statistics for one ECU trim cell
#[derive(Clone, Debug, Default, Serialize)]
pub struct FuelTrimCell {
    pub hits: u64,
    pub trim: FloatCell,
    pub speed: FloatCell,
    pub load: FloatCell,
    pub airflow: FloatCell,
}

#[derive(Clone, Copy, Debug)]
struct Columns {
    timestamp: usize,
    speed: usize,
    temperature: usize,
    trim_left: usize,
    trim_right: usize,
    cell: usize,
    load: usize,
    airflow: usize,
    closed_loop: usize,
    trim_active: usize,
    full_throttle: usize,
}

/// Fuel trim cell analyzer
#[derive(Clone, Debug, Serialize)]
pub struct FuelTrimAnalyzer {
    #[serde(skip)]
    thresholds: Thresholds,
    #[serde(skip)]
    columns: Option<Columns>,
    min_counts: u64,
    cells: Vec<FuelTrimCell>,
}

impl FuelTrimAnalyzer {
    pub fn new(thresholds: Thresholds, settings: &FuelTrimConfig) -> Self {
        Self {
            thresholds,
            columns: None,
            min_counts: settings.min_counts,
            cells: vec![FuelTrimCell::default(); settings.cells],
        }
    }

    pub fn cells(&self) -> &[FuelTrimCell] {
        &self.cells
    }

    /// Minimum hits for a cell to be reported
    pub fn min_counts(&self) -> u64 {
        self.min_counts
    }

    /// Whether a cell has enough hits to be trusted
    pub fn is_reliable(&self, cell: &FuelTrimCell) -> bool {
        cell.hits > 0 && cell.hits >= self.min_counts
    }

    /// Mean trim across all reliable cells, after finalizing
    pub fn overall_average(&self) -> Option<f64> {
        let means: Vec<f64> = self
            .cells
            .iter()
            .filter(|c| self.is_reliable(c))
            .filter_map(|c| c.trim.mean())
            .collect();

        if means.is_empty() {
            None
        } else {
            Some(means.iter().sum::<f64>() / means.len() as f64)
        }
    }

    /// Trim cell index for a record that passes every gate
    fn accepted_cell(&self, record: &Record, cols: &Columns) -> Option<usize> {
        let t = &self.thresholds;
        if t.before_start(record.int(cols.timestamp)) {
            return None;
        }
        if t.too_slow(record.int(cols.speed)) {
            return None;
        }

        let cell = usize::try_from(record.int(cols.cell))
            .ok()
            .filter(|&c| c < self.cells.len())?;

        if t.too_cold(record.float(cols.temperature)) {
            return None;
        }
        if record.int(cols.closed_loop) != 1 || record.int(cols.trim_active) != 1 {
            return None;
        }
        if record.int(cols.full_throttle) == 1 {
            return None;
        }
        Some(cell)
    }
}

impl RecordAnalyzer for FuelTrimAnalyzer {
    fn id(&self) -> &str {
        "fuel_trim"
    }

    fn name(&self) -> &str {
        "Fuel Trim Cells"
    }

    fn required_fields(&self) -> Vec<Field> {
        vec![
            Field::Timestamp,
            Field::Speed,
            Field::Temperature,
            Field::TrimLeft,
            Field::TrimRight,
            Field::CellIndex,
            Field::Load,
            Field::Airflow,
            Field::ClosedLoop,
            Field::TrimActive,
            Field::FullThrottle,
        ]
    }

    fn bind(&mut self, columns: &ColumnResolver) -> Result<(), ConfigError> {
        self.columns = Some(Columns {
            timestamp: columns.resolve(Field::Timestamp)?,
            speed: columns.resolve(Field::Speed)?,
            temperature: columns.resolve(Field::Temperature)?,
            trim_left: columns.resolve(Field::TrimLeft)?,
            trim_right: columns.resolve(Field::TrimRight)?,
            cell: columns.resolve(Field::CellIndex)?,
            load: columns.resolve(Field::Load)?,
            airflow: columns.resolve(Field::Airflow)?,
            closed_loop: columns.resolve(Field::ClosedLoop)?,
            trim_active: columns.resolve(Field::TrimActive)?,
            full_throttle: columns.resolve(Field::FullThrottle)?,
        });
        Ok(())
    }

    fn accumulate(&mut self, record: &Record) {
        let Some(cols) = self.columns else {
            return;
        };
        let Some(index) = self.accepted_cell(record, &cols) else {
            return;
        };

        let cell = &mut self.cells[index];
        cell.hits += 1;
        cell.trim.record(trim_average(
            record.float(cols.trim_left),
            record.float(cols.trim_right),
        ));
        cell.speed.record(record.float(cols.speed));
        cell.load.record(record.float(cols.load));
        cell.airflow.record(record.float(cols.airflow));
    }

    fn finalize(&mut self) {
        for cell in &mut self.cells {
            cell.trim.finalize();
            cell.speed.finalize();
            cell.load.finalize();
            cell.airflow.finalize();
        }
    }
}
