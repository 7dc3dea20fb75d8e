//! Knock event analysis.
//!
//! The ECU exposes a monotonically increasing knock counter. An event is a
//! record where the counter moved forward; the increment is the event's
//! magnitude. Events are binned by engine speed and manifold pressure.
//!
//! The counter baseline starts at zero and is carried between records and,
//! unless configured otherwise, between files, so file order affects the
//! result. A log that opens past the start time with a non-zero counter
//! therefore records its first reading as one event of that magnitude.

use serde::Serialize;

use super::cells::IntCell;
use super::grid::{Grid2, LOAD_AXIS, SPEED_AXIS};
use super::{RecordAnalyzer, Thresholds};
use crate::columns::{ColumnResolver, Field};
use crate::config::{CounterScope, DiscardPolicy, KnockConfig};
use crate::error::ConfigError;
use crate::parsers::Record;

/// What a single observation did to the analyzer state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnockOutcome {
    /// Record before the start time; baseline updated only
    KeepAlive,
    /// Counter unchanged
    NoChange,
    /// Counter went backwards (rollover or ECU restart) or the step does not
    /// fit in an `i64`; implied events lost
    Resync,
    /// Increment below the noise floor, tallied as discarded only
    Discarded,
    /// Event recorded into the grid
    Event {
        speed_cell: usize,
        load_cell: usize,
        delta: i64,
        /// Increment was below the noise floor but counted anyway
        below_floor: bool,
    },
}

#[derive(Clone, Copy, Debug)]
struct Columns {
    timestamp: usize,
    counter: usize,
    speed: usize,
    load: usize,
}

/// Knock counter analyzer
#[derive(Clone, Debug, Serialize)]
pub struct KnockAnalyzer {
    #[serde(skip)]
    thresholds: Thresholds,
    #[serde(skip)]
    columns: Option<Columns>,
    noise_floor: i64,
    discard: DiscardPolicy,
    counter_scope: CounterScope,
    last_counter: i64,
    total_events: u64,
    discarded: u64,
    total_magnitude: u64,
    /// Per-cell events: count is the number of events, sum their magnitude
    grid: Grid2<IntCell>,
}

impl KnockAnalyzer {
    pub fn new(thresholds: Thresholds, settings: &KnockConfig) -> Self {
        Self {
            thresholds,
            columns: None,
            noise_floor: settings.noise_floor,
            discard: settings.discard,
            counter_scope: settings.counter_scope,
            last_counter: 0,
            total_events: 0,
            discarded: 0,
            total_magnitude: 0,
            grid: Grid2::new(SPEED_AXIS, LOAD_AXIS),
        }
    }

    /// Advance the state machine with one reading
    pub fn observe(&mut self, timestamp: i64, counter: i64, speed: f64, load: f64) -> KnockOutcome {
        if self.thresholds.before_start(timestamp) {
            self.last_counter = counter;
            return KnockOutcome::KeepAlive;
        }

        let delta = match counter.checked_sub(self.last_counter) {
            Some(0) => return KnockOutcome::NoChange,
            Some(delta) if delta > 0 => delta,
            _ => {
                self.last_counter = counter;
                return KnockOutcome::Resync;
            }
        };

        self.last_counter = counter;

        let below_floor = delta < self.noise_floor;
        if below_floor {
            self.discarded += 1;
            if self.discard == DiscardPolicy::Exclusive {
                return KnockOutcome::Discarded;
            }
        }

        let speed_cell = SPEED_AXIS.cell(speed);
        let load_cell = LOAD_AXIS.cell(load);
        self.grid.cell_for(speed, load).record(delta);
        self.total_events += 1;
        self.total_magnitude = self.total_magnitude.saturating_add(delta.unsigned_abs());

        KnockOutcome::Event {
            speed_cell,
            load_cell,
            delta,
            below_floor,
        }
    }

    /// Return the counter baseline to zero
    pub fn reset_counter(&mut self) {
        self.last_counter = 0;
    }

    pub fn last_counter(&self) -> i64 {
        self.last_counter
    }

    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn total_magnitude(&self) -> u64 {
        self.total_magnitude
    }

    pub fn noise_floor(&self) -> i64 {
        self.noise_floor
    }

    pub fn discard_policy(&self) -> DiscardPolicy {
        self.discard
    }

    pub fn grid(&self) -> &Grid2<IntCell> {
        &self.grid
    }
}

impl RecordAnalyzer for KnockAnalyzer {
    fn id(&self) -> &str {
        "knock"
    }

    fn name(&self) -> &str {
        "Knock Events"
    }

    fn required_fields(&self) -> Vec<Field> {
        vec![Field::Timestamp, Field::KnockCounter, Field::Speed, Field::Load]
    }

    fn bind(&mut self, columns: &ColumnResolver) -> Result<(), ConfigError> {
        self.columns = Some(Columns {
            timestamp: columns.resolve(Field::Timestamp)?,
            counter: columns.resolve(Field::KnockCounter)?,
            speed: columns.resolve(Field::Speed)?,
            load: columns.resolve(Field::Load)?,
        });
        Ok(())
    }

    fn begin_file(&mut self) {
        if self.counter_scope == CounterScope::PerFile {
            self.reset_counter();
        }
    }

    fn accumulate(&mut self, record: &Record) {
        let Some(cols) = self.columns else {
            return;
        };
        self.observe(
            record.int(cols.timestamp),
            record.int(cols.counter),
            record.float(cols.speed),
            record.float(cols.load),
        );
    }

    fn finalize(&mut self) {
        self.grid.iter_mut().for_each(IntCell::finalize);
    }
}
