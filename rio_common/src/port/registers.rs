//! Quadlet layout of board register blocks.
//!
//! Each board answers a read with one fixed-size block of quadlets (a
//! "slot") and accepts one fixed-size block per write. Broadcast frames are
//! the concatenation of slots in ascending address order, so the same layout
//! serves both transaction styles.
//!
//! ```text
//! read slot  : header | status | digital_in | timestamp | axis0[4] .. axis3[4]
//! write slot : header | control | amp_enable | digital_out | watchdog | current[4]
//! ```
//!
//! The header quadlet carries `SLOT_MAGIC` in its upper half and the board
//! address in its low byte. A slot whose header does not match the expected
//! address is rejected as a checksum error.

use crate::consts::{DIGITAL_BITS_PER_BOARD, MAX_AXES_PER_BOARD};
use crate::port::bus::BusError;
use crate::port::types::BoardAddress;
use bitflags::bitflags;
use static_assertions::const_assert;

/// Marker in the upper 16 bits of every slot header.
pub const SLOT_MAGIC: u32 = 0xB0A4_0000;

/// Quadlets per axis in a read slot.
pub const AXIS_QUADLETS: usize = 4;

/// Quadlets preceding the axis block in a read slot.
const READ_HEADER_QUADLETS: usize = 4;

/// Quadlets preceding the current block in a write slot.
const WRITE_HEADER_QUADLETS: usize = 5;

/// Size of one board's read slot in quadlets.
pub const READ_SLOT_QUADLETS: usize = READ_HEADER_QUADLETS + MAX_AXES_PER_BOARD * AXIS_QUADLETS;

/// Size of one board's write slot in quadlets.
pub const WRITE_SLOT_QUADLETS: usize = WRITE_HEADER_QUADLETS + MAX_AXES_PER_BOARD;

const_assert!(WRITE_SLOT_QUADLETS <= READ_SLOT_QUADLETS);
const_assert!(MAX_AXES_PER_BOARD <= 8);

/// One board's raw read block.
pub type ReadSlot = [u32; READ_SLOT_QUADLETS];

/// One board's raw write block.
pub type WriteSlot = [u32; WRITE_SLOT_QUADLETS];

bitflags! {
    /// Board status quadlet bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u32 {
        /// Motor power supply is enabled.
        const POWER_ENABLED    = 0x0001;
        /// Firmware watchdog expired and cut motor power.
        const WATCHDOG_EXPIRED = 0x0002;
        /// Safety relay closed.
        const SAFETY_RELAY     = 0x0004;
        /// At least one amplifier reports a fault.
        const AMP_FAULT        = 0x0008;
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Board control quadlet bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlFlags: u32 {
        /// Request motor power.
        const POWER_ENABLE  = 0x0001;
        /// Close the safety relay.
        const SAFETY_RELAY  = 0x0002;
    }
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Raw feedback registers of one amplifier axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisRegisters {
    /// Measured motor current, raw ADC counts.
    pub motor_current: u32,
    /// Encoder position, raw counts.
    pub encoder_position: i32,
    /// Encoder velocity, raw period counts.
    pub encoder_velocity: i32,
    /// Amplifier status bits.
    pub amp_status: u32,
}

/// Decoded read slot of one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardSnapshot {
    /// Status quadlet.
    pub status: StatusFlags,
    /// Digital input levels, one bit per signal, physical polarity.
    pub digital_inputs: u32,
    /// Free-running board timestamp.
    pub timestamp: u32,
    /// Per-axis feedback.
    pub axes: [AxisRegisters; MAX_AXES_PER_BOARD],
}

impl BoardSnapshot {
    /// Feedback of one axis, `None` if the index is out of range.
    #[inline]
    pub fn axis(&self, axis: u8) -> Option<&AxisRegisters> {
        self.axes.get(axis as usize)
    }

    /// Physical level of one digital input bit, `false` if out of range.
    #[inline]
    pub const fn digital_input(&self, bit: u8) -> bool {
        bit < DIGITAL_BITS_PER_BOARD && self.digital_inputs & (1u32 << bit) != 0
    }

    /// Encode into a read slot for `address`.
    pub fn to_slot(&self, address: BoardAddress) -> ReadSlot {
        let mut slot = [0u32; READ_SLOT_QUADLETS];
        slot[0] = slot_header(address);
        slot[1] = self.status.bits();
        slot[2] = self.digital_inputs;
        slot[3] = self.timestamp;
        for (idx, axis) in self.axes.iter().enumerate() {
            let base = READ_HEADER_QUADLETS + idx * AXIS_QUADLETS;
            slot[base] = axis.motor_current;
            slot[base + 1] = axis.encoder_position as u32;
            slot[base + 2] = axis.encoder_velocity as u32;
            slot[base + 3] = axis.amp_status;
        }
        slot
    }

    /// Decode a read slot expected from `address`.
    ///
    /// # Errors
    /// `BusError::Checksum` if the slot is short or its header does not
    /// belong to `address`.
    pub fn from_slot(address: BoardAddress, slot: &[u32]) -> Result<Self, BusError> {
        if slot.len() != READ_SLOT_QUADLETS {
            return Err(BusError::Checksum { address });
        }
        check_header(address, slot[0])?;

        let mut axes = [AxisRegisters::default(); MAX_AXES_PER_BOARD];
        for (idx, axis) in axes.iter_mut().enumerate() {
            let base = READ_HEADER_QUADLETS + idx * AXIS_QUADLETS;
            *axis = AxisRegisters {
                motor_current: slot[base],
                encoder_position: slot[base + 1] as i32,
                encoder_velocity: slot[base + 2] as i32,
                amp_status: slot[base + 3],
            };
        }

        Ok(Self {
            status: StatusFlags::from_bits_retain(slot[1]),
            digital_inputs: slot[2],
            timestamp: slot[3],
            axes,
        })
    }
}

/// Decoded write slot of one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardCommand {
    /// Control quadlet.
    pub control: ControlFlags,
    /// Amplifier enables, one bit per axis.
    pub amp_enable: u8,
    /// Digital output levels, physical polarity.
    pub digital_outputs: u32,
    /// Watchdog refresh token: period in microseconds, 0 disarms.
    pub watchdog_period_us: u32,
    /// Per-axis current commands, raw DAC counts.
    pub currents: [u32; MAX_AXES_PER_BOARD],
}

impl BoardCommand {
    /// Empty command carrying only the watchdog refresh.
    pub fn with_watchdog(watchdog_period_us: u32) -> Self {
        Self {
            watchdog_period_us,
            ..Self::default()
        }
    }

    /// Set the current command and amplifier enable of one axis.
    pub fn set_axis(&mut self, axis: u8, current: u32, enable: bool) {
        if let Some(slot) = self.currents.get_mut(axis as usize) {
            *slot = current;
            if enable {
                self.amp_enable |= 1 << axis;
            } else {
                self.amp_enable &= !(1 << axis);
            }
        }
    }

    /// Whether the amplifier of `axis` is enabled.
    #[inline]
    pub const fn axis_enabled(&self, axis: u8) -> bool {
        (axis as usize) < MAX_AXES_PER_BOARD && self.amp_enable & (1 << axis) != 0
    }

    /// Drive one digital output bit. Bits out of range are ignored.
    pub fn set_digital_output(&mut self, bit: u8, level: bool) {
        if bit >= DIGITAL_BITS_PER_BOARD {
            return;
        }
        if level {
            self.digital_outputs |= 1u32 << bit;
        } else {
            self.digital_outputs &= !(1u32 << bit);
        }
    }

    /// Drop power, amplifiers and currents; keep outputs and the watchdog
    /// refresh.
    pub fn make_safe(&mut self) {
        self.control = ControlFlags::empty();
        self.amp_enable = 0;
        self.currents = [0; MAX_AXES_PER_BOARD];
    }

    /// Encode into a write slot for `address`.
    pub fn to_slot(&self, address: BoardAddress) -> WriteSlot {
        let mut slot = [0u32; WRITE_SLOT_QUADLETS];
        slot[0] = slot_header(address);
        slot[1] = self.control.bits();
        slot[2] = self.amp_enable as u32;
        slot[3] = self.digital_outputs;
        slot[4] = self.watchdog_period_us;
        slot[WRITE_HEADER_QUADLETS..].copy_from_slice(&self.currents);
        slot
    }

    /// Decode a write slot addressed to `address`.
    ///
    /// # Errors
    /// `BusError::Checksum` if the slot is short or mis-addressed.
    pub fn from_slot(address: BoardAddress, slot: &[u32]) -> Result<Self, BusError> {
        if slot.len() != WRITE_SLOT_QUADLETS {
            return Err(BusError::Checksum { address });
        }
        check_header(address, slot[0])?;

        let mut currents = [0u32; MAX_AXES_PER_BOARD];
        currents.copy_from_slice(&slot[WRITE_HEADER_QUADLETS..]);

        Ok(Self {
            control: ControlFlags::from_bits_retain(slot[1]),
            amp_enable: (slot[2] & 0xFF) as u8,
            digital_outputs: slot[3],
            watchdog_period_us: slot[4],
            currents,
        })
    }
}

/// Header quadlet for a slot belonging to `address`.
#[inline]
pub const fn slot_header(address: BoardAddress) -> u32 {
    SLOT_MAGIC | address as u32
}

/// Board address encoded in a header quadlet, if the magic matches.
#[inline]
pub const fn header_address(header: u32) -> Option<BoardAddress> {
    if header & 0xFFFF_0000 == SLOT_MAGIC {
        Some((header & 0xFF) as BoardAddress)
    } else {
        None
    }
}

fn check_header(address: BoardAddress, header: u32) -> Result<(), BusError> {
    match header_address(header) {
        Some(found) if found == address => Ok(()),
        _ => Err(BusError::Checksum { address }),
    }
}
