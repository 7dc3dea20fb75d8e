pub mod csv_log;
pub mod types;

pub use csv_log::CsvLog;
pub use types::{Log, Parseable, Record};
