//! Prelude module for common re-exports.
//!
//! Consumers can do `use rio_common::prelude::*;` and get the most important
//! types without listing individual paths.

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::port::config::{
    BoardConfig, DigitalInputConfig, DigitalOutputConfig, PortConfig, RobotConfig,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_TIME_US, MAX_AXES_PER_BOARD, MAX_BOARDS};

// ─── Bus ────────────────────────────────────────────────────────────
pub use crate::port::bus::{Bus, BusError, BusFactory};
pub use crate::port::error::PortError;
pub use crate::port::registers::{AxisRegisters, BoardCommand, BoardSnapshot, StatusFlags};
pub use crate::port::types::{AxisBinding, BitBinding, BoardAddress, Protocol};

/// Default system cycle time as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_micros(DEFAULT_CYCLE_TIME_US as u64);
