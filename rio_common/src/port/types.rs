//! Board addressing, signal bindings and the protocol selector.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a board on the bus, in `[0, MAX_BOARDS)`.
pub type BoardAddress = u8;

/// Binding of one actuator or brake to an amplifier axis on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisBinding {
    /// Board carrying the amplifier.
    pub board: BoardAddress,
    /// Axis index on that board (0-based).
    pub axis: u8,
}

impl AxisBinding {
    /// Create a new axis binding.
    pub const fn new(board: BoardAddress, axis: u8) -> Self {
        Self { board, axis }
    }
}

impl fmt::Display for AxisBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "board {} axis {}", self.board, self.axis)
    }
}

/// Binding of one digital signal to a bit of a board's I/O quadlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitBinding {
    /// Board carrying the signal.
    pub board: BoardAddress,
    /// Bit position in the digital I/O quadlet.
    pub bit: u8,
}

impl BitBinding {
    /// Create a new bit binding.
    pub const fn new(board: BoardAddress, bit: u8) -> Self {
        Self { board, bit }
    }

    /// Single-bit mask for this binding.
    #[inline]
    pub const fn mask(&self) -> u32 {
        1u32 << self.bit
    }
}

impl fmt::Display for BitBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "board {} bit {}", self.board, self.bit)
    }
}

/// Bus transaction protocol.
///
/// Selects how `Port::read` and `Port::write` traverse the board set. The
/// protocol is a transport detail: all four produce the same board commands
/// for the same robot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// One read and one write transaction per board.
    #[default]
    Sequential,
    /// Broadcast read, sequential writes.
    BroadcastRead,
    /// Sequential reads, broadcast write.
    BroadcastWrite,
    /// Broadcast read and broadcast write.
    BroadcastReadWrite,
}

impl Protocol {
    /// Whether reads use one broadcast transaction.
    #[inline]
    pub const fn broadcast_read(&self) -> bool {
        matches!(self, Self::BroadcastRead | Self::BroadcastReadWrite)
    }

    /// Whether writes use one broadcast transaction.
    #[inline]
    pub const fn broadcast_write(&self) -> bool {
        matches!(self, Self::BroadcastWrite | Self::BroadcastReadWrite)
    }

    /// Whether any part of the cycle uses broadcast transactions.
    #[inline]
    pub const fn uses_broadcast(&self) -> bool {
        !matches!(self, Self::Sequential)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sequential => "sequential",
            Self::BroadcastRead => "broadcast-read",
            Self::BroadcastWrite => "broadcast-write",
            Self::BroadcastReadWrite => "broadcast-read-write",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_directions() {
        assert!(!Protocol::Sequential.broadcast_read());
        assert!(!Protocol::Sequential.broadcast_write());
        assert!(Protocol::BroadcastRead.broadcast_read());
        assert!(!Protocol::BroadcastRead.broadcast_write());
        assert!(!Protocol::BroadcastWrite.broadcast_read());
        assert!(Protocol::BroadcastWrite.broadcast_write());
        assert!(Protocol::BroadcastReadWrite.broadcast_read());
        assert!(Protocol::BroadcastReadWrite.broadcast_write());
    }

    #[test]
    fn protocol_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            protocol: Protocol,
        }
        let w: Wrapper = toml::from_str("protocol = \"broadcast_read_write\"").unwrap();
        assert_eq!(w.protocol, Protocol::BroadcastReadWrite);
    }

    #[test]
    fn bit_mask() {
        assert_eq!(BitBinding::new(0, 0).mask(), 1);
        assert_eq!(BitBinding::new(3, 31).mask(), 0x8000_0000);
    }
}
