//! Configuration loading tests

use crate::common::synthetic::{config, config_text};
use crate::common::write_temp_file;
use ecugrid::config::{AfrSensor, Config, CounterScope, DiscardPolicy, LoadMode};
use ecugrid::error::ConfigError;

#[test]
fn test_full_config() {
    let config = config(&[]);
    assert_eq!(config.min_time, 10);
    assert_eq!(config.min_temp, 70);

    let trim = config.fuel_trim.as_ref().unwrap();
    assert_eq!(trim.cells, 4);
    assert_eq!(trim.min_counts, 1);

    let knock = config.knock.as_ref().unwrap();
    assert_eq!(knock.noise_floor, 5);
    assert_eq!(knock.discard, DiscardPolicy::Exclusive);
    assert_eq!(knock.counter_scope, CounterScope::Run);

    assert_eq!(config.afr.load_mode, LoadMode::SpeedDensity);
    assert!(config.afr.sensor.is_wideband());
    assert_eq!(config.afr.reject_cell, None);
}

#[test]
fn test_optional_knobs() {
    let config = config(&[
        ("KNOCK_DISCARD_EXCLUSIVE", "0"),
        ("KNOCK_RESET_PER_FILE", "1"),
        ("MIN_RPM", "600"),
        ("REJECT_CELL", "17"),
    ]);
    let knock = config.knock.unwrap();
    assert_eq!(knock.discard, DiscardPolicy::CountAnyway);
    assert_eq!(knock.counter_scope, CounterScope::PerFile);
    assert_eq!(config.min_speed, Some(600));
    assert_eq!(config.afr.reject_cell, Some(17));
}

#[test]
fn test_range_boundaries() {
    let accepted = [
        ("MIN_TIME", "0"),
        ("MIN_TIME", "999999"),
        ("MIN_TEMP", "-20"),
        ("N_CELLS", "255"),
        ("BLM_MIN_COUNTS", "10000"),
        ("KNOCK_MIN", "65535"),
        ("AFR_MIN_COUNTS", "65535"),
    ];
    for (key, value) in accepted {
        let text = config_text(&[(key, value)]);
        assert!(text.parse::<Config>().is_ok(), "{} = {} should be accepted", key, value);
    }

    let rejected = [
        ("MIN_TIME", "-1"),
        ("MIN_TIME", "1000000"),
        ("MIN_TEMP", "-21"),
        ("N_CELLS", "0"),
        ("N_CELLS", "256"),
        ("BLM_MIN_COUNTS", "0"),
        ("KNOCK_MIN", "0"),
        ("AFR_MIN_COUNTS", "0"),
        ("BLM_ON", "2"),
        ("SD_ENABLE", "2"),
    ];
    for (key, value) in rejected {
        let err = config_text(&[(key, value)]).parse::<Config>().unwrap_err();
        assert!(
            matches!(err, ConfigError::OutOfRange { key: ref k, .. } if k == key),
            "{} = {} should be out of range, got {}",
            key,
            value,
            err
        );
    }
}

#[test]
fn test_malformed_value() {
    let err = config_text(&[("MIN_TEMP", "warm")])
        .parse::<Config>()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
}

#[test]
fn test_disabled_analyzers_skip_their_options() {
    let text = config_text(&[("BLM_ON", "0"), ("KNOCK_ON", "0"), ("WB_ON", "0")])
        .lines()
        .filter(|l| {
            !["N_CELLS", "KNOCK_MIN", "WB_MIN", "WB_MAX", "WB_COMP"]
                .iter()
                .any(|key| l.starts_with(key))
        })
        .collect::<Vec<_>>()
        .join("\n");
    let config: Config = text.parse().unwrap();
    assert!(config.fuel_trim.is_none());
    assert!(config.knock.is_none());
    assert_eq!(config.afr.sensor, AfrSensor::Narrowband);
}

#[test]
fn test_wideband_requires_range() {
    let text = config_text(&[])
        .lines()
        .filter(|l| !l.starts_with("WB_MAX"))
        .collect::<Vec<_>>()
        .join("\n");
    let err = text.parse::<Config>().unwrap_err();
    assert!(matches!(err, ConfigError::Missing(ref key) if key == "WB_MAX"));
}

#[test]
fn test_load_from_disk() {
    let path = write_temp_file("config_load", "analyzer.conf", &config_text(&[]));
    let config = Config::load(&path).unwrap();
    assert_eq!(config.min_time, 10);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Config::load(std::path::Path::new("/nonexistent/ecugrid/analyzer.conf")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
