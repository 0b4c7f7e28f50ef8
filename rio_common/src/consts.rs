//! System-wide constants for the RIO workspace.
//!
//! Single source of truth for all numeric limits and defaults.
//! Imported by all crates; limits are never redefined elsewhere.

/// Maximum number of boards addressable on one port.
pub const MAX_BOARDS: usize = 16;

/// Number of amplifier axes on one controller board.
pub const MAX_AXES_PER_BOARD: usize = 4;

/// Number of digital signal bits carried by one board's I/O quadlet.
pub const DIGITAL_BITS_PER_BOARD: u8 = 32;

/// Default control cycle time in microseconds (1 kHz = 1000 µs).
pub const DEFAULT_CYCLE_TIME_US: u32 = 1000;

/// Default hardware watchdog period in microseconds.
pub const DEFAULT_WATCHDOG_PERIOD_US: u32 = 30_000;

/// Longest watchdog period the board firmware accepts, in microseconds.
pub const MAX_WATCHDOG_PERIOD_US: u32 = 300_000;

/// Default per-board transaction timeout in microseconds.
pub const DEFAULT_BOARD_TIMEOUT_US: u32 = 500;

/// Default number of consecutive failures tolerated before a board faults.
pub const DEFAULT_FAULT_THRESHOLD: u32 = 5;

/// Default number of agreeing samples before a digital input flips.
pub const DEFAULT_DEBOUNCE_SAMPLES: u32 = 1;

/// Oldest board firmware revision that answers broadcast transactions.
pub const MIN_BROADCAST_FIRMWARE: u32 = 4;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rio/port.toml";
