//! Bus trait and transient I/O error types.
//!
//! This module defines:
//! - `Bus` trait - quadlet-level access to the boards on one port
//! - `BusError` enum - per-board, per-cycle transaction failures
//! - `BroadcastFrame` - fixed-capacity buffer for broadcast transactions
//! - `WriteAcks` - per-board outcome of a broadcast write
//! - `BusFactory` type alias - factory function type

use crate::consts::MAX_BOARDS;
use crate::port::config::PortConfig;
use crate::port::registers::{READ_SLOT_QUADLETS, ReadSlot, WriteSlot};
use crate::port::types::BoardAddress;
use thiserror::Error;

/// Capacity of a broadcast frame: one read slot per addressable board.
pub const BROADCAST_FRAME_CAPACITY: usize = MAX_BOARDS * READ_SLOT_QUADLETS;

/// Quadlets of a broadcast read reply or broadcast write request.
pub type BroadcastFrame = heapless::Vec<u32, BROADCAST_FRAME_CAPACITY>;

/// Per-board acknowledgements of a broadcast write, in frame order.
pub type WriteAcks = heapless::Vec<(BoardAddress, Result<(), BusError>), MAX_BOARDS>;

/// Transient bus transaction errors.
///
/// These never abort a cycle; the port records them against the board and
/// marks its data stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// Board did not answer within its time slot.
    #[error("board {address}: transaction timed out")]
    Timeout {
        /// Board that timed out.
        address: BoardAddress,
    },

    /// Reply failed its integrity check.
    #[error("board {address}: checksum mismatch")]
    Checksum {
        /// Board whose reply was corrupt.
        address: BoardAddress,
    },

    /// Board is not present on the bus.
    #[error("board {address}: disconnected")]
    Disconnected {
        /// Board that is missing.
        address: BoardAddress,
    },

    /// Broadcast reply was short, long or out of order.
    #[error("malformed broadcast reply: expected {expected} quadlets, got {received}")]
    MalformedBroadcast {
        /// Quadlets expected for the addressed board set.
        expected: usize,
        /// Quadlets actually received.
        received: usize,
    },

    /// Broadcast transaction exceeded its budget for the whole board set.
    #[error("broadcast over budget for {boards} boards")]
    BroadcastTimeout {
        /// Boards addressed by the transaction.
        boards: usize,
    },

    /// The bus does not implement the requested transaction.
    #[error("bus does not support {0}")]
    Unsupported(&'static str),
}

/// Factory function type for creating bus instances from a port configuration.
pub type BusFactory = fn(&PortConfig) -> Box<dyn Bus>;

/// Quadlet-level access to the boards sharing one bus.
///
/// The port layer drives a `Bus` once per cycle; drivers own the frame codec
/// and the physical device.
///
/// # Timing Contracts
///
/// | Operation | Max Duration | RT Constraint |
/// |-----------|--------------|---------------|
/// | `probe_board()` | unbounded | None (configuration) |
/// | `read_board()` / `write_board()` | board timeout | **HARD** |
/// | `broadcast_read()` / `broadcast_write()` | board timeout × boards | **HARD** |
pub trait Bus: Send {
    /// Returns the driver's unique identifier (e.g., "simulation", "firewire").
    fn name(&self) -> &'static str;

    /// Query a board's firmware revision.
    ///
    /// # Errors
    /// `BusError::Disconnected` if no board answers at `address`.
    fn probe_board(&mut self, address: BoardAddress) -> Result<u32, BusError>;

    /// Read all registers of one board.
    fn read_board(&mut self, address: BoardAddress) -> Result<ReadSlot, BusError>;

    /// Write all command registers of one board.
    fn write_board(&mut self, address: BoardAddress, slot: &WriteSlot) -> Result<(), BusError>;

    /// Whether broadcast transactions are available on this bus.
    fn supports_broadcast(&self) -> bool {
        false
    }

    /// Read every addressed board in one transaction.
    ///
    /// The reply holds one read slot per board that answered, in ascending
    /// address order.
    fn broadcast_read(&mut self, _addresses: &[BoardAddress]) -> Result<BroadcastFrame, BusError> {
        Err(BusError::Unsupported("broadcast read"))
    }

    /// Write every board in one transaction.
    ///
    /// `frame` holds one write slot per board in ascending address order.
    /// The reply acknowledges each slot separately; a board with no entry
    /// did not take its slot. An `Err` fails the whole frame.
    fn broadcast_write(&mut self, _frame: &[u32]) -> Result<WriteAcks, BusError> {
        Err(BusError::Unsupported("broadcast write"))
    }
}

impl<B: Bus + ?Sized> Bus for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn probe_board(&mut self, address: BoardAddress) -> Result<u32, BusError> {
        (**self).probe_board(address)
    }

    fn read_board(&mut self, address: BoardAddress) -> Result<ReadSlot, BusError> {
        (**self).read_board(address)
    }

    fn write_board(&mut self, address: BoardAddress, slot: &WriteSlot) -> Result<(), BusError> {
        (**self).write_board(address, slot)
    }

    fn supports_broadcast(&self) -> bool {
        (**self).supports_broadcast()
    }

    fn broadcast_read(&mut self, addresses: &[BoardAddress]) -> Result<BroadcastFrame, BusError> {
        (**self).broadcast_read(addresses)
    }

    fn broadcast_write(&mut self, frame: &[u32]) -> Result<WriteAcks, BusError> {
        (**self).broadcast_write(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBus;

    impl Bus for NullBus {
        fn name(&self) -> &'static str {
            "null"
        }

        fn probe_board(&mut self, address: BoardAddress) -> Result<u32, BusError> {
            Err(BusError::Disconnected { address })
        }

        fn read_board(&mut self, address: BoardAddress) -> Result<ReadSlot, BusError> {
            Err(BusError::Timeout { address })
        }

        fn write_board(&mut self, address: BoardAddress, _slot: &WriteSlot) -> Result<(), BusError> {
            Err(BusError::Timeout { address })
        }
    }

    #[test]
    fn test_bus_error_display() {
        let err = BusError::Timeout { address: 3 };
        assert!(err.to_string().contains("board 3"));

        let err = BusError::MalformedBroadcast {
            expected: 40,
            received: 20,
        };
        assert!(err.to_string().contains("40"));

        let err = BusError::BroadcastTimeout { boards: 3 };
        assert!(err.to_string().contains("3 boards"));
    }

    #[test]
    fn test_default_broadcast_is_unsupported() {
        let mut bus: Box<dyn Bus> = Box::new(NullBus);
        assert!(!bus.supports_broadcast());
        assert_eq!(
            bus.broadcast_read(&[0, 1]),
            Err(BusError::Unsupported("broadcast read"))
        );
        assert!(bus.broadcast_write(&[]).is_err());
        assert_eq!(bus.name(), "null");
    }
}
