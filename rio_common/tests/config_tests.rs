//! Port configuration file tests.
//!
//! Loads `port.toml` documents from disk through `ConfigLoader` and checks
//! defaults, parse failures and validation of cross-entry constraints.

use rio_common::config::{ConfigError, ConfigLoader, LogLevel};
use rio_common::consts::{DEFAULT_DEBOUNCE_SAMPLES, DEFAULT_FAULT_THRESHOLD, DEFAULT_WATCHDOG_PERIOD_US};
use rio_common::port::config::PortConfig;
use rio_common::port::error::PortError;
use rio_common::port::types::{AxisBinding, Protocol};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FULL_PORT: &str = r#"
port_number = 1
protocol = "broadcast_read_write"
cycle_time_us = 500
watchdog_period_us = 20000
fault_threshold = 3

[shared]
log_level = "debug"
service_name = "rio-port-1"

[[boards]]
address = 2
description = "spare"

[[robots]]
name = "PSM1"
actuators = [
    { board = 6, axis = 0 },
    { board = 6, axis = 1 },
    { board = 7, axis = 0 },
]
brakes = [{ board = 7, axis = 3 }]

[[robots]]
name = "ECM"
actuators = [{ board = 8, axis = 0 }]

[[digital_inputs]]
name = "foot_pedal"
board = 6
bit = 3
inverted = true
debounce = 3

[[digital_outputs]]
name = "lamp"
board = 8
bit = 0
initial_value = true
"#;

fn write_port_toml(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("port.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn load_full_port_config() {
    let dir = TempDir::new().unwrap();
    let path = write_port_toml(dir.path(), FULL_PORT);

    let config = PortConfig::load(&path).expect("config should load");
    config.validate().expect("config should be valid");

    assert_eq!(config.port_number, 1);
    assert_eq!(config.protocol, Protocol::BroadcastReadWrite);
    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.robots.len(), 2);
    assert_eq!(config.robots[0].actuators[2], AxisBinding::new(7, 0));
    assert_eq!(config.robots[0].brakes, vec![AxisBinding::new(7, 3)]);
    assert!(config.robots[1].brakes.is_empty());
    assert!(config.digital_inputs[0].inverted);
    assert!(config.digital_outputs[0].initial_value);

    let boards: Vec<_> = config.referenced_boards().into_iter().collect();
    assert_eq!(boards, vec![2, 6, 7, 8]);
}

#[test]
fn minimal_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_port_toml(
        dir.path(),
        r#"
[[digital_inputs]]
name = "estop"
board = 0
bit = 1
"#,
    );

    let config = PortConfig::load(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.protocol, Protocol::Sequential);
    assert_eq!(config.watchdog_period_us, DEFAULT_WATCHDOG_PERIOD_US);
    assert_eq!(config.fault_threshold, DEFAULT_FAULT_THRESHOLD);
    assert_eq!(config.digital_inputs[0].debounce, DEFAULT_DEBOUNCE_SAMPLES);
}

#[test]
fn missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let result = PortConfig::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}

#[test]
fn malformed_toml_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_port_toml(dir.path(), "protocol = \"carrier_pigeon\"\n");
    assert!(matches!(
        PortConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn duplicate_robot_names_rejected() {
    let config = PortConfig::from_toml(
        r#"
[[robots]]
name = "arm"
actuators = [{ board = 0, axis = 0 }]

[[robots]]
name = "arm"
actuators = [{ board = 1, axis = 0 }]
"#,
    )
    .unwrap();
    assert_eq!(
        config.validate(),
        Err(PortError::DuplicateName {
            kind: "robot",
            name: "arm".to_string()
        })
    );
}

#[test]
fn shared_axis_between_robots_rejected() {
    let config = PortConfig::from_toml(
        r#"
[[robots]]
name = "left"
actuators = [{ board = 3, axis = 2 }]

[[robots]]
name = "right"
actuators = [{ board = 3, axis = 2 }]
"#,
    )
    .unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.is_config_error());
    assert!(err.to_string().contains("'left'"));
}

#[test]
fn out_of_range_values_rejected() {
    let bad_address = PortConfig::from_toml(
        r#"
[[digital_outputs]]
name = "lamp"
board = 200
bit = 0
"#,
    )
    .unwrap();
    assert_eq!(bad_address.validate(), Err(PortError::InvalidAddress(200)));

    let bad_watchdog = PortConfig::from_toml("watchdog_period_us = 0\n").unwrap();
    assert!(bad_watchdog.validate().is_err());

    let bad_bit = PortConfig::from_toml(
        r#"
[[digital_inputs]]
name = "x"
board = 0
bit = 32
"#,
    )
    .unwrap();
    assert!(bad_bit.validate().is_err());
}
