//! Text and JSON rendering of finalized results.
//!
//! Rendering never touches accumulation state: it only reads
//! [`AnalysisResults`]. Cells below their analyzer's minimum sample count are
//! blanked out rather than shown with an untrustworthy average.

use std::fmt::{self, Display, Formatter};

use crate::analysis::afr::{AfrAnalyzer, AfrGrid};
use crate::analysis::cells::FloatCell;
use crate::analysis::fuel_trim::{
    FuelTrimAnalyzer, OVERALL_RICH_LIMIT, TRIM_LEAN_LIMIT, TRIM_NEUTRAL, TRIM_RICH_LIMIT,
};
use crate::analysis::grid::Grid2;
use crate::analysis::knock::KnockAnalyzer;
use crate::config::AfrSensor;
use crate::session::AnalysisResults;

/// Human readable multi-section report
pub struct TextReport<'a>(pub &'a AnalysisResults);

/// Render the text report
pub fn render_text(results: &AnalysisResults) -> String {
    TextReport(results).to_string()
}

/// Render the finalized results as pretty-printed JSON
pub fn render_json(results: &AnalysisResults) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(results)
}

const COLUMN_WIDTH: usize = 6;

fn write_grid<C>(
    f: &mut Formatter<'_>,
    grid: &Grid2<C>,
    value: impl Fn(&C) -> String,
) -> fmt::Result {
    write!(f, "{:>w$}", grid.rows.name, w = COLUMN_WIDTH)?;
    for column in 0..grid.columns.len() {
        write!(f, "{:>w$}", grid.columns.lower_edge(column), w = COLUMN_WIDTH)?;
    }
    writeln!(f, "  {}", grid.columns.name)?;

    for (index, row) in grid.rows().enumerate() {
        write!(f, "{:>w$}", grid.rows.lower_edge(index), w = COLUMN_WIDTH)?;
        for cell in row {
            write!(f, "{:>w$}", value(cell), w = COLUMN_WIDTH)?;
        }
        writeln!(f)?;
    }
    Ok(())
}

fn write_range(f: &mut Formatter<'_>, label: &str, unit: &str, cell: &FloatCell) -> fmt::Result {
    writeln!(
        f,
        "\t{}: {:.1} - {:.1} {}(Avg {:.1})",
        label,
        cell.low().unwrap_or_default(),
        cell.high().unwrap_or_default(),
        unit,
        cell.mean().unwrap_or_default()
    )
}

impl TextReport<'_> {
    fn write_header(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let r = self.0;
        writeln!(f, "**** ecugrid: ECU log grid analyzer {} ****", env!("CARGO_PKG_VERSION"))?;
        writeln!(f)?;
        writeln!(f, "Global Config:")?;
        writeln!(f, "Ignoring timestamps < {}", r.config.min_time)?;
        writeln!(f, "Ignoring temperature < {}", r.config.min_temp)?;
        if let Some(speed) = r.config.min_speed {
            writeln!(f, "Ignoring engine speed < {}", speed)?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "Files processed: {}, skipped: {}",
            r.stats.files_processed, r.stats.files_skipped
        )?;
        for skipped in &r.skipped {
            writeln!(f, "  skipped {}: {}", skipped.path.display(), skipped.reason)?;
        }
        writeln!(
            f,
            "Accepted {}/{} lines.",
            r.stats.good_lines,
            r.stats.total_lines()
        )
    }

    fn write_fuel_trim(&self, f: &mut Formatter<'_>, trim: &FuelTrimAnalyzer) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "**** Fuel Trim Cell vs Trim, MAF, MAP, RPM Range/Avg ****")?;
        writeln!(f, "(Ignoring cells with hits < {})", trim.min_counts())?;

        for (index, cell) in trim.cells().iter().enumerate() {
            writeln!(f)?;
            if !trim.is_reliable(cell) {
                writeln!(f, "* Cell {} ({} Hits) - Not reliable.", index, cell.hits)?;
                continue;
            }

            writeln!(f, "* Cell {} ({} Hits)", index, cell.hits)?;
            write_range(f, "Trim", "", &cell.trim)?;
            write_range(f, "RPM", "RPM ", &cell.speed)?;
            write_range(f, "MAP", "KPA ", &cell.load)?;
            write_range(f, "MAF", "AFGS ", &cell.airflow)?;

            let average = cell.trim.mean().unwrap_or(TRIM_NEUTRAL);
            if average > TRIM_LEAN_LIMIT {
                writeln!(f, "\t!!!! This cell is tuned too lean !!!!")?;
            }
            if average < TRIM_RICH_LIMIT {
                writeln!(f, "\t!!!! This cell is tuned too rich !!!!")?;
            }
        }

        writeln!(f)?;
        match trim.overall_average() {
            Some(average) => {
                writeln!(
                    f,
                    "Overall useful trim average: {:.2} (multiplier {:.3})",
                    average,
                    average / TRIM_NEUTRAL
                )?;
                if average < OVERALL_RICH_LIMIT {
                    writeln!(f, "!!!! Overall tune too rich !!!!")?;
                }
                if average > TRIM_LEAN_LIMIT {
                    writeln!(f, "!!!! Overall tune too lean !!!!")?;
                }
            }
            None => writeln!(f, "Overall useful trim average: no reliable cells")?,
        }
        Ok(())
    }

    fn write_knock(&self, f: &mut Formatter<'_>, knock: &KnockAnalyzer) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "**** Knock Events vs RPM vs MAP ****")?;
        writeln!(f, "(Counter increments < {} ignored)", knock.noise_floor())?;
        writeln!(f, "(Cells count log records with knock, not ECM counts)")?;
        writeln!(f)?;
        write_grid(f, knock.grid(), |cell| cell.count().to_string())?;
        writeln!(
            f,
            "total events: {}  total counts: {}  discarded: {}",
            knock.total_events(),
            knock.total_magnitude(),
            knock.discarded()
        )
    }

    fn write_afr(&self, f: &mut Formatter<'_>, afr: &AfrAnalyzer) -> fmt::Result {
        let settings = afr.settings();
        let wideband = settings.sensor.is_wideband();

        match afr.grid() {
            AfrGrid::SpeedDensity(grid) => {
                writeln!(f)?;
                if wideband {
                    writeln!(f, "**** Wideband AFR Average vs RPM vs MAP ****")?;
                } else {
                    writeln!(f, "**** Narrowband Trim vs RPM vs MAP ****")?;
                }
                writeln!(f, "(Ignoring cells with counts < {})", settings.min_counts)?;
                if let AfrSensor::Wideband {
                    min,
                    max,
                    compensation,
                } = settings.sensor
                {
                    writeln!(f, "(Ignoring wideband AFR < {} and > {})", min, max)?;
                    writeln!(f, "(Subtracting compensation of {})", compensation)?;
                }
                writeln!(f)?;
                write_grid(f, grid, |cell| match cell.mean() {
                    Some(mean) if afr.is_reliable(cell) && wideband => format!("{:.1}", mean),
                    Some(mean) if afr.is_reliable(cell) => format!("{:.0}", mean),
                    _ => "....".to_string(),
                })?;
            }
            AfrGrid::Airflow(grid) => {
                writeln!(f)?;
                if wideband {
                    writeln!(f, "**** Wideband AFR Average vs MAF AFGS ****")?;
                    writeln!(f)?;
                    writeln!(f, "  MAF AFGS     AFR")?;
                } else {
                    writeln!(f, "**** Narrowband Trim vs MAF AFGS ****")?;
                    writeln!(f)?;
                    writeln!(f, "  MAF AFGS    TRIM    MULT")?;
                }
                for (index, cell) in grid.cells().iter().enumerate() {
                    write!(
                        f,
                        " {:>3} - {:>3} ",
                        grid.axis.lower_edge(index),
                        grid.axis.lower_edge(index + 1)
                    )?;
                    match cell.mean() {
                        Some(mean) if afr.is_reliable(cell) => {
                            write!(f, "  {:>6.1}", mean)?;
                            if !wideband {
                                write!(f, "   {:.3}", mean / TRIM_NEUTRAL)?;
                            }
                        }
                        _ => write!(f, "   -----")?,
                    }
                    writeln!(f)?;
                }
            }
        }

        if let Some(table) = afr.wide_open() {
            writeln!(f)?;
            writeln!(f, "**** Wideband AFR (Average) vs RPM at Wide Open Throttle ****")?;
            writeln!(f)?;
            for (index, cell) in table.cells().iter().enumerate() {
                writeln!(
                    f,
                    "RPM {:>4} - {:>4}    {:>6.1}    {} Counts",
                    table.axis.lower_edge(index),
                    table.axis.lower_edge(index + 1),
                    cell.mean().unwrap_or_default(),
                    cell.count()
                )?;
            }
        }
        Ok(())
    }
}

impl Display for TextReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let r = self.0;
        self.write_header(f)?;
        if let Some(trim) = &r.fuel_trim {
            self.write_fuel_trim(f, trim)?;
        }
        if let Some(knock) = &r.knock {
            self.write_knock(f, knock)?;
        }
        self.write_afr(f, &r.afr)
    }
}
