//! End-to-end session tests with hand-computed expectations

use crate::common::assertions::{assert_close, assert_mean};
use crate::common::synthetic::{config, loaded, DRIVE};
use ecugrid::analysis::afr::AfrGrid;
use ecugrid::analysis::cells::FloatCell;
use ecugrid::parsers::{CsvLog, Parseable};
use ecugrid::session::{AnalysisResults, AnalysisSession};
use ecugrid::state::LoadedFile;
use std::path::Path;

fn run(overrides: &[(&str, &str)], files: &[&[&str]]) -> AnalysisResults {
    let mut session = AnalysisSession::new(config(overrides)).unwrap();
    for (index, rows) in files.iter().enumerate() {
        let file = loaded(&format!("drive{}.csv", index), rows);
        session.process_file(&file).unwrap();
    }
    session.finalize()
}

fn ve_cell(results: &AnalysisResults, speed: usize, load: usize) -> FloatCell {
    match results.afr.grid() {
        AfrGrid::SpeedDensity(grid) => grid.get(speed, load).cloned().unwrap(),
        AfrGrid::Airflow(_) => panic!("Expected a speed density grid"),
    }
}

// ============================================
// Single pass
// ============================================

#[test]
fn test_drive_line_stats() {
    let results = run(&[], &[&DRIVE]);
    assert_eq!(results.stats.good_lines, 4);
    assert_eq!(results.stats.bad_lines, 1);
    assert_eq!(results.stats.files_processed, 1);
}

#[test]
fn test_drive_fuel_trim() {
    let results = run(&[], &[&DRIVE]);
    let trim = results.fuel_trim.as_ref().unwrap();

    // rows 2 and 3 land in cell 2: (126+130)/2 and (140+144)/2
    let cell = &trim.cells()[2];
    assert_eq!(cell.hits, 2);
    assert_eq!(cell.trim.low(), Some(128.0));
    assert_eq!(cell.trim.high(), Some(142.0));
    assert_mean(cell.trim.mean(), 135.0);
    assert_mean(cell.speed.mean(), 2500.0);
    assert_mean(cell.load.mean(), 45.0);

    // the wide open row and the keep-alive row contribute nothing
    assert!(trim
        .cells()
        .iter()
        .enumerate()
        .all(|(i, c)| i == 2 || c.hits == 0));
    assert_close(trim.overall_average().unwrap(), 135.0);
}

#[test]
fn test_drive_knock() {
    let results = run(&[], &[&DRIVE]);
    let knock = results.knock.as_ref().unwrap();

    assert_eq!(knock.total_events(), 2);
    assert_eq!(knock.total_magnitude(), 52);
    assert_eq!(knock.discarded(), 0);

    let first = knock.grid().get(6, 4).unwrap();
    assert_eq!((first.count(), first.sum()), (1, 5));
    let second = knock.grid().get(7, 8).unwrap();
    assert_eq!((second.count(), second.sum()), (1, 47));
}

#[test]
fn test_drive_afr() {
    let results = run(&[], &[&DRIVE]);

    // 14.7 - 0.2 and 14.9 - 0.2
    let cell = ve_cell(&results, 6, 4);
    assert_eq!(cell.count(), 2);
    assert_mean(cell.mean(), 14.6);

    let wot = results.afr.wide_open().unwrap();
    let pe = wot.get(7).unwrap();
    assert_eq!(pe.count(), 1);
    assert_mean(pe.mean(), 12.5);

    let populated = match results.afr.grid() {
        AfrGrid::SpeedDensity(grid) => grid.iter().filter(|c| c.count() > 0).count(),
        AfrGrid::Airflow(_) => 0,
    };
    assert_eq!(populated, 1);
}

#[test]
fn test_decel_cell_excluded_from_ve_grid() {
    let results = run(&[("REJECT_CELL", "2")], &[&DRIVE]);
    assert_eq!(ve_cell(&results, 6, 4).count(), 0);
    assert_eq!(results.afr.wide_open().unwrap().get(7).unwrap().count(), 1);
}

#[test]
fn test_speed_floor() {
    let results = run(&[("MIN_RPM", "2600")], &[&DRIVE]);
    assert!(results.fuel_trim.as_ref().unwrap().cells().iter().all(|c| c.hits == 0));
    assert_eq!(ve_cell(&results, 6, 4).count(), 0);
    // knock is not subject to the speed floor
    assert_eq!(results.knock.as_ref().unwrap().total_events(), 2);
}

#[test]
fn test_airflow_narrowband_mode() {
    let results = run(&[("SD_ENABLE", "0"), ("WB_ON", "0")], &[&DRIVE]);
    assert!(results.afr.wide_open().is_none());

    let AfrGrid::Airflow(grid) = results.afr.grid() else {
        panic!("Expected an airflow grid");
    };
    // MAF 20 g/s, trims averaged: 128 and 142
    let cell = grid.get(2).unwrap();
    assert_eq!(cell.count(), 2);
    assert_mean(cell.mean(), 135.0);
}

// ============================================
// Reprocessing
// ============================================

#[test]
fn test_same_file_twice_doubles_counts_keeps_means() {
    let once = run(&[], &[&DRIVE]);
    let twice = run(&[], &[&DRIVE, &DRIVE]);

    let trim_once = &once.fuel_trim.as_ref().unwrap().cells()[2];
    let trim_twice = &twice.fuel_trim.as_ref().unwrap().cells()[2];
    assert_eq!(trim_twice.hits, trim_once.hits * 2);
    assert_close(trim_twice.trim.sum(), trim_once.trim.sum() * 2.0);
    assert_close(trim_twice.trim.mean().unwrap(), trim_once.trim.mean().unwrap());

    let ve_once = ve_cell(&once, 6, 4);
    let ve_twice = ve_cell(&twice, 6, 4);
    assert_eq!(ve_twice.count(), ve_once.count() * 2);
    assert_close(ve_twice.sum(), ve_once.sum() * 2.0);
    assert_close(ve_twice.mean().unwrap(), ve_once.mean().unwrap());

    assert_eq!(twice.stats.good_lines, 8);
    assert_eq!(twice.stats.bad_lines, 2);
}

#[test]
fn test_knock_is_not_idempotent() {
    // the counter falls within the file, so a second copy starts above the
    // carried baseline instead of above zero
    const FALLING: [&str; 2] = [
        "20,2500,85,128,128,2,45,20,1,1,0,120,14.7",
        "21,2500,85,128,128,2,45,20,1,1,0,110,14.7",
    ];

    let once = run(&[], &[&FALLING]);
    let knock = once.knock.as_ref().unwrap();
    assert_eq!(knock.total_events(), 1);
    assert_eq!(knock.total_magnitude(), 120);

    let twice = run(&[], &[&FALLING, &FALLING]);
    let knock = twice.knock.as_ref().unwrap();
    assert_eq!(knock.total_events(), 2);
    assert_eq!(knock.total_magnitude(), 130);

    let per_file = run(&[("KNOCK_RESET_PER_FILE", "1")], &[&FALLING, &FALLING]);
    let knock = per_file.knock.as_ref().unwrap();
    assert_eq!(knock.total_events(), 2);
    assert_eq!(knock.total_magnitude(), 240);
}

#[test]
fn test_columns_reresolved_per_file() {
    let reordered = "WB,KNOCK,WOT,BLM,CL,MAF,MAP,CELL,RBLM,LBLM,CTS,RPM,TIME\n\
                     14.7,105,0,1,1,20,45,2,130,126,85,2500,20\n";
    let path = Path::new("reordered.csv");
    let file = LoadedFile::new(path, CsvLog.parse(path, reordered.as_bytes()).unwrap());

    let mut session = AnalysisSession::new(config(&[])).unwrap();
    session.process_file(&loaded("drive.csv", &DRIVE)).unwrap();
    session.process_file(&file).unwrap();
    let results = session.finalize();

    let cell = &results.fuel_trim.as_ref().unwrap().cells()[2];
    assert_eq!(cell.hits, 3);
    assert_eq!(ve_cell(&results, 6, 4).count(), 3);
}
