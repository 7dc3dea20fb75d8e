//! ecugrid - batch aggregation of ECU logs into tuning grids
//!
//! This library turns CSV engine-control logs into binned statistics used to
//! tune fuel and ignition calibration: fuel trim per ECU cell, knock events by
//! speed and load, and air-fuel ratio grids.
//!
//! ## Module Structure
//!
//! - [`analysis`] - Per-record analyzers, statistics cells and grid geometry
//! - [`columns`] - Logical log fields and per-file header resolution
//! - [`config`] - Key-value configuration file and the typed run config
//! - [`error`] - Fatal configuration errors and per-file load errors
//! - [`parsers`] - CSV log tokenizer and field coercion
//! - [`report`] - Text and JSON rendering of finalized results
//! - [`session`] - Run lifecycle: process files, finalize, hand back results
//! - [`state`] - Loaded log files and parallel loading
//! - [`validator`] - Row field-count validation and run statistics

pub mod analysis;
pub mod columns;
pub mod config;
pub mod error;
pub mod parsers;
pub mod report;
pub mod session;
pub mod state;
pub mod validator;
