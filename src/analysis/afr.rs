//! Air-fuel ratio grid analysis.
//!
//! Each warm record yields one AFR value, either a compensated wideband
//! reading or, with a narrowband sensor, the averaged fuel trims standing in
//! for it. Part-throttle records go to the VE grid (speed density) or the MAF
//! table; wideband full-throttle records go to the WOT table.

use serde::Serialize;

use super::cells::FloatCell;
use super::grid::{Grid1, Grid2, AIRFLOW_AXIS, LOAD_AXIS, SPEED_AXIS};
use super::{trim_average, RecordAnalyzer, Thresholds};
use crate::columns::{ColumnResolver, Field};
use crate::config::{AfrConfig, AfrSensor, LoadMode};
use crate::error::ConfigError;
use crate::parsers::Record;

/// Part-throttle AFR grid, one per load mode
#[derive(Clone, Debug, Serialize)]
pub enum AfrGrid {
    /// Engine speed by manifold pressure
    SpeedDensity(Grid2<FloatCell>),
    /// Mass air flow
    Airflow(Grid1<FloatCell>),
}

impl AfrGrid {
    fn new(mode: LoadMode) -> Self {
        match mode {
            LoadMode::SpeedDensity => AfrGrid::SpeedDensity(Grid2::new(SPEED_AXIS, LOAD_AXIS)),
            LoadMode::Airflow => AfrGrid::Airflow(Grid1::new(AIRFLOW_AXIS)),
        }
    }

    fn finalize(&mut self) {
        match self {
            AfrGrid::SpeedDensity(grid) => grid.iter_mut().for_each(FloatCell::finalize),
            AfrGrid::Airflow(grid) => grid.iter_mut().for_each(FloatCell::finalize),
        }
    }
}

/// Where a record ended up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AfrRoute {
    /// Failed a gate or produced an out-of-range AFR
    Rejected,
    /// Part-throttle grid
    LoadGrid,
    /// Wideband full-throttle table
    WideOpen,
    /// Full throttle with a narrowband sensor, not analyzed
    Skipped,
}

#[derive(Clone, Copy, Debug)]
enum SensorColumns {
    Wideband { reading: usize },
    Narrowband { closed_loop: usize, trim_left: usize, trim_right: usize },
}

#[derive(Clone, Copy, Debug)]
struct Columns {
    timestamp: usize,
    temperature: usize,
    full_throttle: usize,
    speed: usize,
    load: Option<usize>,
    airflow: Option<usize>,
    cell: Option<usize>,
    sensor: SensorColumns,
}

/// Compensate a wideband reading and check it against the valid range
pub fn wideband_afr(reading: f64, min: f64, max: f64, compensation: f64) -> Option<f64> {
    let afr = reading - compensation;
    if afr < min || afr > max {
        return None;
    }
    Some(afr)
}

/// Air-fuel ratio analyzer
#[derive(Clone, Debug, Serialize)]
pub struct AfrAnalyzer {
    #[serde(skip)]
    thresholds: Thresholds,
    #[serde(skip)]
    columns: Option<Columns>,
    settings: AfrConfig,
    grid: AfrGrid,
    wide_open: Option<Grid1<FloatCell>>,
}

impl AfrAnalyzer {
    pub fn new(thresholds: Thresholds, settings: &AfrConfig) -> Self {
        Self {
            thresholds,
            columns: None,
            settings: settings.clone(),
            grid: AfrGrid::new(settings.load_mode),
            wide_open: settings
                .sensor
                .is_wideband()
                .then(|| Grid1::new(SPEED_AXIS)),
        }
    }

    pub fn settings(&self) -> &AfrConfig {
        &self.settings
    }

    pub fn grid(&self) -> &AfrGrid {
        &self.grid
    }

    /// Wideband full-throttle table, present only in wideband mode
    pub fn wide_open(&self) -> Option<&Grid1<FloatCell>> {
        self.wide_open.as_ref()
    }

    /// Whether a cell has enough samples to be displayed
    pub fn is_reliable(&self, cell: &FloatCell) -> bool {
        cell.is_reliable(self.settings.min_counts)
    }

    /// AFR value for a record, if it passes the sensor gates
    fn afr_value(&self, record: &Record, cols: &Columns) -> Option<f64> {
        match (self.settings.sensor, cols.sensor) {
            (AfrSensor::Wideband { min, max, compensation }, SensorColumns::Wideband { reading }) => {
                wideband_afr(record.float(reading), min, max, compensation)
            }
            (
                AfrSensor::Narrowband,
                SensorColumns::Narrowband {
                    closed_loop,
                    trim_left,
                    trim_right,
                },
            ) => {
                if record.int(closed_loop) == 0 {
                    return None;
                }
                Some(trim_average(record.float(trim_left), record.float(trim_right)))
            }
            _ => None,
        }
    }

    /// Route one record into the grids
    pub fn route(&mut self, record: &Record) -> AfrRoute {
        let Some(cols) = self.columns else {
            return AfrRoute::Rejected;
        };
        let t = self.thresholds;
        if t.too_cold(record.float(cols.temperature)) || t.before_start(record.int(cols.timestamp)) {
            return AfrRoute::Rejected;
        }
        let Some(afr) = self.afr_value(record, &cols) else {
            return AfrRoute::Rejected;
        };

        let speed = record.float(cols.speed);

        if record.int(cols.full_throttle) == 0 {
            if t.too_slow(record.int(cols.speed)) {
                return AfrRoute::Rejected;
            }
            if let (Some(reject), Some(cell)) = (self.settings.reject_cell, cols.cell) {
                if record.int(cell) == reject {
                    return AfrRoute::Rejected;
                }
            }

            match (&mut self.grid, cols.load, cols.airflow) {
                (AfrGrid::SpeedDensity(grid), Some(load), _) => {
                    grid.cell_for(speed, record.float(load)).record(afr);
                }
                (AfrGrid::Airflow(grid), _, Some(airflow)) => {
                    grid.cell_for(record.float(airflow)).record(afr);
                }
                _ => return AfrRoute::Rejected,
            }
            return AfrRoute::LoadGrid;
        }

        match &mut self.wide_open {
            Some(table) => {
                table.cell_for(speed).record(afr);
                AfrRoute::WideOpen
            }
            None => AfrRoute::Skipped,
        }
    }
}

impl RecordAnalyzer for AfrAnalyzer {
    fn id(&self) -> &str {
        "afr"
    }

    fn name(&self) -> &str {
        "Air-Fuel Ratio"
    }

    fn required_fields(&self) -> Vec<Field> {
        let mut fields = vec![
            Field::Timestamp,
            Field::Temperature,
            Field::FullThrottle,
            Field::Speed,
        ];
        fields.push(match self.settings.load_mode {
            LoadMode::SpeedDensity => Field::Load,
            LoadMode::Airflow => Field::Airflow,
        });
        match self.settings.sensor {
            AfrSensor::Wideband { .. } => fields.push(Field::Wideband),
            AfrSensor::Narrowband => {
                fields.extend([Field::ClosedLoop, Field::TrimLeft, Field::TrimRight])
            }
        }
        if self.settings.reject_cell.is_some() {
            fields.push(Field::CellIndex);
        }
        fields
    }

    fn bind(&mut self, columns: &ColumnResolver) -> Result<(), ConfigError> {
        let sensor = match self.settings.sensor {
            AfrSensor::Wideband { .. } => SensorColumns::Wideband {
                reading: columns.resolve(Field::Wideband)?,
            },
            AfrSensor::Narrowband => SensorColumns::Narrowband {
                closed_loop: columns.resolve(Field::ClosedLoop)?,
                trim_left: columns.resolve(Field::TrimLeft)?,
                trim_right: columns.resolve(Field::TrimRight)?,
            },
        };
        let (load, airflow) = match self.settings.load_mode {
            LoadMode::SpeedDensity => (Some(columns.resolve(Field::Load)?), None),
            LoadMode::Airflow => (None, Some(columns.resolve(Field::Airflow)?)),
        };
        let cell = match self.settings.reject_cell {
            Some(_) => Some(columns.resolve(Field::CellIndex)?),
            None => None,
        };

        self.columns = Some(Columns {
            timestamp: columns.resolve(Field::Timestamp)?,
            temperature: columns.resolve(Field::Temperature)?,
            full_throttle: columns.resolve(Field::FullThrottle)?,
            speed: columns.resolve(Field::Speed)?,
            load,
            airflow,
            cell,
            sensor,
        });
        Ok(())
    }

    fn accumulate(&mut self, record: &Record) {
        self.route(record);
    }

    fn finalize(&mut self) {
        self.grid.finalize();
        if let Some(table) = &mut self.wide_open {
            table.iter_mut().for_each(FloatCell::finalize);
        }
    }
}
