//! Grid geometry and the cell-offset mapper.
//!
//! Axis ranges and bucket widths are fixed at build time. Each axis has
//! `range / interval` regular bins plus one terminal bin that absorbs
//! readings above the range ceiling. Mapping never fails: readings outside
//! the axis are clamped into the first or last bin.

use serde::Serialize;

/// One grid axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Axis {
    pub name: &'static str,
    pub unit: &'static str,
    pub range: u32,
    pub interval: u32,
}

impl Axis {
    /// Number of regular bins (`range / interval`)
    pub const fn bins(&self) -> usize {
        (self.range / self.interval) as usize
    }

    /// Total cells including the terminal bin
    pub const fn len(&self) -> usize {
        self.bins() + 1
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Lower edge of a bin in axis units
    pub const fn lower_edge(&self, index: usize) -> u32 {
        index as u32 * self.interval
    }

    /// Map a reading to its bin index
    ///
    /// The index is `(value / range) * (range / interval)` with integer
    /// `range / interval`, which differs from `value / interval` at bin edges
    /// when the range is not a multiple of the interval.
    pub fn cell(&self, value: f64) -> usize {
        let range = f64::from(self.range);
        if value > range {
            return self.bins();
        }
        if value.is_nan() || value < 0.0 || value < f64::from(self.interval) {
            return 0;
        }
        ((value / range) * self.bins() as f64).floor() as usize
    }
}

/// Engine speed axis
pub const SPEED_AXIS: Axis = Axis {
    name: "RPM",
    unit: "rpm",
    range: 6400,
    interval: 400,
};

/// Manifold pressure (load) axis
pub const LOAD_AXIS: Axis = Axis {
    name: "MAP",
    unit: "kPa",
    range: 100,
    interval: 10,
};

/// Mass air flow axis
pub const AIRFLOW_AXIS: Axis = Axis {
    name: "MAF",
    unit: "g/s",
    range: 256,
    interval: 8,
};

const _: () = {
    assert!(SPEED_AXIS.interval > 0 && SPEED_AXIS.interval <= SPEED_AXIS.range);
    assert!(LOAD_AXIS.interval > 0 && LOAD_AXIS.interval <= LOAD_AXIS.range);
    assert!(AIRFLOW_AXIS.interval > 0 && AIRFLOW_AXIS.interval <= AIRFLOW_AXIS.range);
};

/// Engine speed bin for a reading
pub fn speed_cell(value: f64) -> usize {
    SPEED_AXIS.cell(value)
}

/// Manifold pressure bin for a reading
pub fn load_cell(value: f64) -> usize {
    LOAD_AXIS.cell(value)
}

/// Mass air flow bin for a reading
pub fn airflow_cell(value: f64) -> usize {
    AIRFLOW_AXIS.cell(value)
}

/// One-dimensional grid of cells along an axis
#[derive(Clone, Debug, Serialize)]
pub struct Grid1<C> {
    pub axis: Axis,
    cells: Vec<C>,
}

impl<C: Default + Clone> Grid1<C> {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            cells: vec![C::default(); axis.len()],
        }
    }
}

impl<C> Grid1<C> {
    /// Cell a reading falls into
    pub fn cell_for(&mut self, value: f64) -> &mut C {
        let index = self.axis.cell(value);
        &mut self.cells[index]
    }

    pub fn get(&self, index: usize) -> Option<&C> {
        self.cells.get(index)
    }

    pub fn cells(&self) -> &[C] {
        &self.cells
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut C> {
        self.cells.iter_mut()
    }
}

/// Two-dimensional grid, rows along one axis and columns along another
#[derive(Clone, Debug, Serialize)]
pub struct Grid2<C> {
    pub rows: Axis,
    pub columns: Axis,
    /// Row-major cells
    cells: Vec<C>,
}

impl<C: Default + Clone> Grid2<C> {
    pub fn new(rows: Axis, columns: Axis) -> Self {
        Self {
            rows,
            columns,
            cells: vec![C::default(); rows.len() * columns.len()],
        }
    }
}

impl<C> Grid2<C> {
    /// Cell a pair of readings falls into
    pub fn cell_for(&mut self, row_value: f64, column_value: f64) -> &mut C {
        let index = self.rows.cell(row_value) * self.columns.len() + self.columns.cell(column_value);
        &mut self.cells[index]
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&C> {
        if column >= self.columns.len() {
            return None;
        }
        self.cells.get(row * self.columns.len() + column)
    }

    /// Iterate rows as slices
    pub fn rows(&self) -> impl Iterator<Item = &[C]> {
        self.cells.chunks(self.columns.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut C> {
        self.cells.iter_mut()
    }
}
