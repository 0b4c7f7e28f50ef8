//! Port configuration and lookup errors.
//!
//! Configuration errors abort only the call that caused them and leave every
//! registry unchanged. Transient I/O failures are `BusError`s and never
//! surface here.

use crate::port::bus::BusError;
use crate::port::types::{BoardAddress, Protocol};
use thiserror::Error;

/// Error types for port configuration and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// A name already exists in the target registry.
    #[error("Configuration error: duplicate {kind} name '{name}'")]
    DuplicateName {
        /// Registry kind ("robot", "digital input", "digital output").
        kind: &'static str,
        /// Offending name.
        name: String,
    },

    /// A binding references a board that is not registered.
    #[error("Configuration error: {owner} references unknown board {address}")]
    UnknownBoard {
        /// Name of the robot or signal holding the binding.
        owner: String,
        /// Missing board address.
        address: BoardAddress,
    },

    /// Board address outside `[0, MAX_BOARDS)`.
    #[error("Configuration error: board address {0} out of range")]
    InvalidAddress(BoardAddress),

    /// Board already registered.
    #[error("Configuration error: board {0} already registered")]
    DuplicateBoard(BoardAddress),

    /// Board did not answer the configuration probe.
    #[error("Configuration error: board {address} not found on bus: {source}")]
    ProbeFailed {
        /// Probed address.
        address: BoardAddress,
        /// Bus failure.
        source: BusError,
    },

    /// Protocol cannot be used with the registered board set.
    #[error("Configuration error: protocol {protocol} unsupported: {reason}")]
    ProtocolUnsupported {
        /// Requested protocol.
        protocol: Protocol,
        /// Why it was refused.
        reason: String,
    },

    /// Any other invalid configuration value.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Lookup by name or index failed.
    #[error("{kind} '{key}' not found")]
    NotFound {
        /// Registry kind.
        kind: &'static str,
        /// Name or index that was looked up.
        key: String,
    },

    /// Vector argument length does not match the robot.
    #[error("size mismatch: expected {expected} values, got {got}")]
    SizeMismatch {
        /// Number of actuators or brakes.
        expected: usize,
        /// Length supplied.
        got: usize,
    },
}

impl PortError {
    /// Whether this error reports an invalid configuration (as opposed to a
    /// failed lookup or argument mismatch).
    pub const fn is_config_error(&self) -> bool {
        !matches!(self, Self::NotFound { .. } | Self::SizeMismatch { .. })
    }
}
