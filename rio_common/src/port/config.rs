//! Port configuration types.
//!
//! This module contains the validated description consumed by
//! `Port::configure`:
//! - `PortConfig` - Main configuration loaded from port.toml
//! - `BoardConfig` - Explicitly declared boards
//! - `RobotConfig` - Robot name, actuator and brake bindings
//! - `DigitalInputConfig` / `DigitalOutputConfig` - Named digital signals
//!
//! # TOML Example
//!
//! ```toml
//! port_number = 0
//! protocol = "broadcast_read_write"
//! watchdog_period_us = 30000
//!
//! [[robots]]
//! name = "PSM1"
//! actuators = [{ board = 6, axis = 0 }, { board = 6, axis = 1 }]
//!
//! [[digital_inputs]]
//! name = "foot_pedal"
//! board = 6
//! bit = 3
//! inverted = true
//! debounce = 3
//! ```

use crate::config::SharedConfig;
use crate::consts::{
    DEFAULT_BOARD_TIMEOUT_US, DEFAULT_CYCLE_TIME_US, DEFAULT_DEBOUNCE_SAMPLES,
    DEFAULT_FAULT_THRESHOLD, DEFAULT_WATCHDOG_PERIOD_US, DIGITAL_BITS_PER_BOARD,
    MAX_AXES_PER_BOARD, MAX_BOARDS, MAX_WATCHDOG_PERIOD_US,
};
use crate::port::error::PortError;
use crate::port::types::{AxisBinding, BitBinding, BoardAddress, Protocol};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

fn default_cycle_time_us() -> u32 {
    DEFAULT_CYCLE_TIME_US
}

fn default_watchdog_period_us() -> u32 {
    DEFAULT_WATCHDOG_PERIOD_US
}

fn default_board_timeout_us() -> u32 {
    DEFAULT_BOARD_TIMEOUT_US
}

fn default_fault_threshold() -> u32 {
    DEFAULT_FAULT_THRESHOLD
}

fn default_debounce() -> u32 {
    DEFAULT_DEBOUNCE_SAMPLES
}

/// Main configuration loaded from `port.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfig {
    /// Service name and log level.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Bus (port) number handed to the bus driver.
    #[serde(default)]
    pub port_number: u32,

    /// Transaction protocol.
    #[serde(default)]
    pub protocol: Protocol,

    /// Control cycle time in microseconds. Read plus write must fit in it.
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Hardware watchdog period in microseconds.
    #[serde(default = "default_watchdog_period_us")]
    pub watchdog_period_us: u32,

    /// Per-board transaction timeout in microseconds.
    #[serde(default = "default_board_timeout_us")]
    pub board_timeout_us: u32,

    /// Consecutive failures tolerated before a board enters the fault state.
    #[serde(default = "default_fault_threshold")]
    pub fault_threshold: u32,

    /// Boards declared explicitly. Boards referenced by robots or digital
    /// signals are added even when not listed here.
    #[serde(default)]
    pub boards: Vec<BoardConfig>,

    /// Robots on this port.
    #[serde(default)]
    pub robots: Vec<RobotConfig>,

    /// Digital inputs on this port.
    #[serde(default)]
    pub digital_inputs: Vec<DigitalInputConfig>,

    /// Digital outputs on this port.
    #[serde(default)]
    pub digital_outputs: Vec<DigitalOutputConfig>,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            port_number: 0,
            protocol: Protocol::default(),
            cycle_time_us: DEFAULT_CYCLE_TIME_US,
            watchdog_period_us: DEFAULT_WATCHDOG_PERIOD_US,
            board_timeout_us: DEFAULT_BOARD_TIMEOUT_US,
            fault_threshold: DEFAULT_FAULT_THRESHOLD,
            boards: Vec::new(),
            robots: Vec::new(),
            digital_inputs: Vec::new(),
            digital_outputs: Vec::new(),
        }
    }
}

impl PortConfig {
    /// Validate the port configuration.
    ///
    /// # Validation Rules
    /// 1. `cycle_time_us`, `board_timeout_us`, `fault_threshold` > 0
    /// 2. `0 < watchdog_period_us <= MAX_WATCHDOG_PERIOD_US`
    /// 3. Every board address < MAX_BOARDS, declared boards unique
    /// 4. Robot, digital input and digital output names unique and non-empty
    /// 5. Axis indices < MAX_AXES_PER_BOARD, bits < DIGITAL_BITS_PER_BOARD
    /// 6. No amplifier axis bound twice, no digital bit bound twice per direction
    pub fn validate(&self) -> Result<(), PortError> {
        self.shared
            .validate()
            .map_err(|e| PortError::InvalidConfig(e.to_string()))?;

        if self.cycle_time_us == 0 {
            return Err(PortError::InvalidConfig(
                "cycle_time_us must be greater than 0".to_string(),
            ));
        }
        if self.board_timeout_us == 0 {
            return Err(PortError::InvalidConfig(
                "board_timeout_us must be greater than 0".to_string(),
            ));
        }
        if self.fault_threshold == 0 {
            return Err(PortError::InvalidConfig(
                "fault_threshold must be greater than 0".to_string(),
            ));
        }
        validate_watchdog_period(self.watchdog_period_us)?;

        let mut declared = HashSet::new();
        for board in &self.boards {
            validate_address(board.address)?;
            if !declared.insert(board.address) {
                return Err(PortError::DuplicateBoard(board.address));
            }
        }

        let mut axes_in_use: HashMap<AxisBinding, &str> = HashMap::new();
        let mut robot_names = HashSet::new();
        for robot in &self.robots {
            robot.validate()?;
            if !robot_names.insert(robot.name.as_str()) {
                return Err(PortError::DuplicateName {
                    kind: "robot",
                    name: robot.name.clone(),
                });
            }
            for binding in robot.actuators.iter().chain(&robot.brakes) {
                if let Some(other) = axes_in_use.insert(*binding, &robot.name) {
                    return Err(PortError::InvalidConfig(format!(
                        "{} bound by both '{}' and '{}'",
                        binding, other, robot.name
                    )));
                }
            }
        }

        let mut di_names = HashSet::new();
        let mut di_bits = HashSet::new();
        for di in &self.digital_inputs {
            validate_signal(&di.name, di.binding())?;
            if !di_names.insert(di.name.as_str()) {
                return Err(PortError::DuplicateName {
                    kind: "digital input",
                    name: di.name.clone(),
                });
            }
            if !di_bits.insert(di.binding()) {
                return Err(PortError::InvalidConfig(format!(
                    "digital input '{}': {} already bound",
                    di.name,
                    di.binding()
                )));
            }
        }

        let mut do_names = HashSet::new();
        let mut do_bits = HashSet::new();
        for dout in &self.digital_outputs {
            validate_signal(&dout.name, dout.binding())?;
            if !do_names.insert(dout.name.as_str()) {
                return Err(PortError::DuplicateName {
                    kind: "digital output",
                    name: dout.name.clone(),
                });
            }
            if !do_bits.insert(dout.binding()) {
                return Err(PortError::InvalidConfig(format!(
                    "digital output '{}': {} already bound",
                    dout.name,
                    dout.binding()
                )));
            }
        }

        Ok(())
    }

    /// Every board address the configuration needs, in ascending order.
    pub fn referenced_boards(&self) -> BTreeSet<BoardAddress> {
        let mut boards: BTreeSet<BoardAddress> = self.boards.iter().map(|b| b.address).collect();
        for robot in &self.robots {
            boards.extend(robot.actuators.iter().chain(&robot.brakes).map(|b| b.board));
        }
        boards.extend(self.digital_inputs.iter().map(|d| d.board));
        boards.extend(self.digital_outputs.iter().map(|d| d.board));
        boards
    }
}

/// Check a board address against `MAX_BOARDS`.
pub fn validate_address(address: BoardAddress) -> Result<(), PortError> {
    if (address as usize) < MAX_BOARDS {
        Ok(())
    } else {
        Err(PortError::InvalidAddress(address))
    }
}

/// Check a watchdog period against the firmware limits.
pub fn validate_watchdog_period(period_us: u32) -> Result<(), PortError> {
    if period_us == 0 || period_us > MAX_WATCHDOG_PERIOD_US {
        return Err(PortError::InvalidConfig(format!(
            "watchdog_period_us must be in 1..={} (got {})",
            MAX_WATCHDOG_PERIOD_US, period_us
        )));
    }
    Ok(())
}

/// Check an axis binding against the board limits.
pub fn validate_axis(owner: &str, binding: AxisBinding) -> Result<(), PortError> {
    validate_address(binding.board)?;
    if binding.axis as usize >= MAX_AXES_PER_BOARD {
        return Err(PortError::InvalidConfig(format!(
            "'{}': axis {} out of range (max {})",
            owner,
            binding.axis,
            MAX_AXES_PER_BOARD - 1
        )));
    }
    Ok(())
}

/// Check a digital signal's name and bit binding against the board limits.
pub fn validate_signal(name: &str, binding: BitBinding) -> Result<(), PortError> {
    if name.is_empty() {
        return Err(PortError::InvalidConfig(
            "digital signal has empty name".to_string(),
        ));
    }
    validate_address(binding.board)?;
    if binding.bit >= DIGITAL_BITS_PER_BOARD {
        return Err(PortError::InvalidConfig(format!(
            "'{}': bit {} out of range (max {})",
            name,
            binding.bit,
            DIGITAL_BITS_PER_BOARD - 1
        )));
    }
    Ok(())
}

/// Explicitly declared board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Board address on the bus.
    pub address: BoardAddress,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

/// Robot description: ordered actuators and brakes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Robot name (unique per port).
    pub name: String,

    /// Actuators in axis order.
    pub actuators: Vec<AxisBinding>,

    /// Brakes in brake order.
    #[serde(default)]
    pub brakes: Vec<AxisBinding>,
}

impl RobotConfig {
    /// Validate one robot in isolation.
    pub fn validate(&self) -> Result<(), PortError> {
        if self.name.is_empty() {
            return Err(PortError::InvalidConfig("robot has empty name".to_string()));
        }
        if self.actuators.is_empty() {
            return Err(PortError::InvalidConfig(format!(
                "robot '{}' has no actuators",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for binding in self.actuators.iter().chain(&self.brakes) {
            validate_axis(&self.name, *binding)?;
            if !seen.insert(*binding) {
                return Err(PortError::InvalidConfig(format!(
                    "robot '{}': {} bound twice",
                    self.name, binding
                )));
            }
        }
        Ok(())
    }
}

/// Digital input description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalInputConfig {
    /// Signal name (unique among inputs).
    pub name: String,

    /// Board carrying the signal.
    pub board: BoardAddress,

    /// Bit in the board's digital input quadlet.
    pub bit: u8,

    /// Invert polarity (logical = physical XOR inverted).
    #[serde(default)]
    pub inverted: bool,

    /// Consecutive agreeing samples before the debounced value flips.
    #[serde(default = "default_debounce")]
    pub debounce: u32,
}

impl DigitalInputConfig {
    /// Board/bit binding.
    pub const fn binding(&self) -> BitBinding {
        BitBinding::new(self.board, self.bit)
    }
}

/// Digital output description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalOutputConfig {
    /// Signal name (unique among outputs).
    pub name: String,

    /// Board carrying the signal.
    pub board: BoardAddress,

    /// Bit in the board's digital output quadlet.
    pub bit: u8,

    /// Invert polarity (physical = logical XOR inverted).
    #[serde(default)]
    pub inverted: bool,

    /// Logical value before the first write.
    #[serde(default)]
    pub initial_value: bool,
}

impl DigitalOutputConfig {
    /// Board/bit binding.
    pub const fn binding(&self) -> BitBinding {
        BitBinding::new(self.board, self.bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    fn robot(name: &str, bindings: &[(u8, u8)]) -> RobotConfig {
        RobotConfig {
            name: name.to_string(),
            actuators: bindings.iter().map(|&(b, a)| AxisBinding::new(b, a)).collect(),
            brakes: Vec::new(),
        }
    }

    fn input(name: &str, board: u8, bit: u8) -> DigitalInputConfig {
        DigitalInputConfig {
            name: name.to_string(),
            board,
            bit,
            inverted: false,
            debounce: 1,
        }
    }

    #[test]
    fn test_port_config_default_is_valid() {
        let config = PortConfig::default();
        assert_eq!(config.cycle_time_us, DEFAULT_CYCLE_TIME_US);
        assert_eq!(config.protocol, Protocol::Sequential);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = PortConfig::from_toml(
            r#"
port_number = 1
protocol = "broadcast_read"
fault_threshold = 3

[[robots]]
name = "MTML"
actuators = [{ board = 0, axis = 0 }, { board = 0, axis = 1 }, { board = 1, axis = 0 }]
brakes = [{ board = 1, axis = 3 }]

[[digital_inputs]]
name = "pedal"
board = 2
bit = 5
inverted = true

[[digital_outputs]]
name = "lamp"
board = 2
bit = 0
"#,
        )
        .unwrap();

        assert_eq!(config.port_number, 1);
        assert_eq!(config.protocol, Protocol::BroadcastRead);
        assert_eq!(config.fault_threshold, 3);
        assert_eq!(config.watchdog_period_us, DEFAULT_WATCHDOG_PERIOD_US);
        assert_eq!(config.robots[0].actuators.len(), 3);
        assert_eq!(config.robots[0].brakes[0], AxisBinding::new(1, 3));
        assert_eq!(config.digital_inputs[0].debounce, DEFAULT_DEBOUNCE_SAMPLES);
        assert!(config.digital_inputs[0].inverted);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.referenced_boards().into_iter().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_validate_rejects_bad_timing() {
        let mut config = PortConfig::default();
        config.cycle_time_us = 0;
        assert!(config.validate().is_err());

        let mut config = PortConfig::default();
        config.watchdog_period_us = MAX_WATCHDOG_PERIOD_US + 1;
        assert!(config.validate().is_err());

        let mut config = PortConfig::default();
        config.fault_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_robot_names() {
        let mut config = PortConfig::default();
        config.robots.push(robot("arm", &[(0, 0)]));
        config.robots.push(robot("arm", &[(0, 1)]));
        let result = config.validate();
        assert!(matches!(result, Err(PortError::DuplicateName { kind: "robot", .. })));
    }

    #[test]
    fn test_validate_shared_axis() {
        let mut config = PortConfig::default();
        config.robots.push(robot("left", &[(0, 0)]));
        config.robots.push(robot("right", &[(0, 0)]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("left"));
    }

    #[test]
    fn test_validate_axis_and_address_range() {
        let mut config = PortConfig::default();
        config.robots.push(robot("arm", &[(0, MAX_AXES_PER_BOARD as u8)]));
        assert!(config.validate().is_err());

        let mut config = PortConfig::default();
        config.robots.push(robot("arm", &[(MAX_BOARDS as u8, 0)]));
        assert_eq!(
            config.validate(),
            Err(PortError::InvalidAddress(MAX_BOARDS as u8))
        );
    }

    #[test]
    fn test_validate_digital_signals() {
        let mut config = PortConfig::default();
        config.digital_inputs.push(input("a", 0, 1));
        config.digital_inputs.push(input("b", 0, 1));
        assert!(config.validate().is_err());

        let mut config = PortConfig::default();
        config.digital_inputs.push(input("a", 0, DIGITAL_BITS_PER_BOARD));
        assert!(config.validate().is_err());

        let mut config = PortConfig::default();
        config.digital_inputs.push(input("a", 0, 1));
        config.digital_inputs.push(input("a", 0, 2));
        assert!(matches!(
            config.validate(),
            Err(PortError::DuplicateName { kind: "digital input", .. })
        ));
    }

    #[test]
    fn test_robot_without_actuators() {
        let config = robot("empty", &[]);
        assert!(config.validate().is_err());
    }
}
