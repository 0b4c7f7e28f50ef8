//! Simulation bus implementation.
//!
//! The `SimulatedBus` implements the `Bus` trait over a set of
//! [`SimulatedBoard`]s so the port layer can be exercised without hardware.
//! Time only moves when [`SimulatedBus::advance`] is called, which keeps
//! watchdog behaviour deterministic in tests.

use super::board::SimulatedBoard;
use rio_common::consts::MAX_BOARDS;
use rio_common::port::bus::{BroadcastFrame, Bus, BusError, WriteAcks};
use rio_common::port::registers::{
    BoardCommand, ReadSlot, WRITE_SLOT_QUADLETS, WriteSlot, header_address,
};
use rio_common::port::types::BoardAddress;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Firmware revision given to boards created from a configuration.
pub const SIMULATED_FIRMWARE: u32 = 7;

/// Software bus with failure injection.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    boards: BTreeMap<BoardAddress, SimulatedBoard>,
    broadcast: bool,
    corrupt_broadcast: bool,
    latency: Duration,
}

impl SimulatedBus {
    /// Create an empty bus with broadcast support.
    pub fn new() -> Self {
        Self {
            boards: BTreeMap::new(),
            broadcast: true,
            corrupt_broadcast: false,
            latency: Duration::ZERO,
        }
    }

    /// Builder form of [`SimulatedBus::insert_board`].
    pub fn with_board(mut self, address: BoardAddress, firmware_version: u32) -> Self {
        self.insert_board(address, firmware_version);
        self
    }

    /// Attach a board at `address`, replacing any board already there.
    pub fn insert_board(&mut self, address: BoardAddress, firmware_version: u32) {
        debug!(
            "Simulated board {} attached (firmware {})",
            address, firmware_version
        );
        self.boards
            .insert(address, SimulatedBoard::new(firmware_version));
    }

    /// Board at `address`.
    pub fn board(&self, address: BoardAddress) -> Option<&SimulatedBoard> {
        self.boards.get(&address)
    }

    /// Mutable board at `address`.
    pub fn board_mut(&mut self, address: BoardAddress) -> Option<&mut SimulatedBoard> {
        self.boards.get_mut(&address)
    }

    /// Enable or disable broadcast transactions.
    pub fn set_broadcast_supported(&mut self, supported: bool) {
        self.broadcast = supported;
    }

    /// Truncate every broadcast read reply by one quadlet.
    pub fn set_corrupt_broadcast(&mut self, corrupt: bool) {
        self.corrupt_broadcast = corrupt;
    }

    /// Delay added to every transaction.
    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }

    /// Make reads of one board time out.
    pub fn set_fail_reads(&mut self, address: BoardAddress, fail: bool) {
        if let Some(board) = self.boards.get_mut(&address) {
            board.fail_reads = fail;
        }
    }

    /// Make writes to one board time out.
    pub fn set_fail_writes(&mut self, address: BoardAddress, fail: bool) {
        if let Some(board) = self.boards.get_mut(&address) {
            board.fail_writes = fail;
        }
    }

    /// Remove a board from the bus without forgetting its state.
    pub fn set_disconnected(&mut self, address: BoardAddress, disconnected: bool) {
        if let Some(board) = self.boards.get_mut(&address) {
            board.disconnected = disconnected;
        }
    }

    /// Set the raw encoder position and velocity of one axis.
    pub fn set_encoder(&mut self, address: BoardAddress, axis: u8, position: i32, velocity: i32) {
        if let Some(registers) = self
            .boards
            .get_mut(&address)
            .and_then(|b| b.registers_mut().axes.get_mut(axis as usize))
        {
            registers.encoder_position = position;
            registers.encoder_velocity = velocity;
        }
    }

    /// Drive one physical digital input level.
    pub fn set_digital_input(&mut self, address: BoardAddress, bit: u8, level: bool) {
        if let Some(board) = self.boards.get_mut(&address) {
            let Some(mask) = 1u32.checked_shl(bit as u32) else {
                return;
            };
            let inputs = &mut board.registers_mut().digital_inputs;
            if level {
                *inputs |= mask;
            } else {
                *inputs &= !mask;
            }
        }
    }

    /// Let simulated time pass on every board.
    pub fn advance(&mut self, dt: Duration) {
        for (&address, board) in &mut self.boards {
            board.advance(address, dt);
        }
    }

    fn wait(&self) {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
    }

    fn reachable(&mut self, address: BoardAddress) -> Result<&mut SimulatedBoard, BusError> {
        match self.boards.get_mut(&address) {
            Some(board) if !board.disconnected => Ok(board),
            _ => Err(BusError::Disconnected { address }),
        }
    }

    fn accept_write(&mut self, address: BoardAddress, slot: &[u32]) -> Result<(), BusError> {
        let board = self.reachable(address)?;
        if !board.answers_writes() {
            return Err(BusError::Timeout { address });
        }
        board.apply(BoardCommand::from_slot(address, slot)?);
        Ok(())
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimulatedBus {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn probe_board(&mut self, address: BoardAddress) -> Result<u32, BusError> {
        self.reachable(address).map(|b| b.firmware_version())
    }

    fn read_board(&mut self, address: BoardAddress) -> Result<ReadSlot, BusError> {
        self.wait();
        let board = self.reachable(address)?;
        if board.fail_reads {
            return Err(BusError::Timeout { address });
        }
        Ok(board.registers().to_slot(address))
    }

    fn write_board(&mut self, address: BoardAddress, slot: &WriteSlot) -> Result<(), BusError> {
        self.wait();
        self.accept_write(address, slot)
    }

    fn supports_broadcast(&self) -> bool {
        self.broadcast
    }

    fn broadcast_read(&mut self, addresses: &[BoardAddress]) -> Result<BroadcastFrame, BusError> {
        if !self.broadcast {
            return Err(BusError::Unsupported("broadcast read"));
        }
        self.wait();

        let mut frame = BroadcastFrame::new();
        for &address in addresses {
            // Silent boards leave no slot in the reply.
            let Some(board) = self.boards.get(&address).filter(|b| b.answers_reads()) else {
                trace!("Board {} missing from broadcast reply", address);
                continue;
            };
            frame
                .extend_from_slice(&board.registers().to_slot(address))
                .map_err(|_| BusError::MalformedBroadcast {
                    expected: frame.capacity(),
                    received: frame.len(),
                })?;
        }
        if self.corrupt_broadcast {
            frame.pop();
        }
        Ok(frame)
    }

    fn broadcast_write(&mut self, frame: &[u32]) -> Result<WriteAcks, BusError> {
        if !self.broadcast {
            return Err(BusError::Unsupported("broadcast write"));
        }
        if frame.len() % WRITE_SLOT_QUADLETS != 0
            || frame.len() > MAX_BOARDS * WRITE_SLOT_QUADLETS
        {
            return Err(BusError::MalformedBroadcast {
                expected: frame
                    .len()
                    .next_multiple_of(WRITE_SLOT_QUADLETS)
                    .min(MAX_BOARDS * WRITE_SLOT_QUADLETS),
                received: frame.len(),
            });
        }
        self.wait();

        let mut acks = WriteAcks::new();
        for slot in frame.chunks_exact(WRITE_SLOT_QUADLETS) {
            // Unattributable slots get no acknowledgement.
            let Some(address) = header_address(slot[0]) else {
                trace!("Broadcast write slot with foreign header skipped");
                continue;
            };
            let ack = self.accept_write(address, slot);
            if let Err(error) = ack {
                trace!("Board {} rejected broadcast slot: {}", address, error);
            }
            let _ = acks.push((address, ack));
        }
        Ok(acks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rio_common::port::registers::{BoardSnapshot, READ_SLOT_QUADLETS};

    fn bus() -> SimulatedBus {
        SimulatedBus::new().with_board(1, 7).with_board(2, 3)
    }

    #[test]
    fn probe_reports_firmware() {
        let mut bus = bus();
        assert_eq!(bus.probe_board(1), Ok(7));
        assert_eq!(bus.probe_board(2), Ok(3));
        assert_eq!(bus.probe_board(5), Err(BusError::Disconnected { address: 5 }));

        bus.set_disconnected(1, true);
        assert_eq!(bus.probe_board(1), Err(BusError::Disconnected { address: 1 }));
    }

    #[test]
    fn read_reflects_injected_feedback() {
        let mut bus = bus();
        bus.set_encoder(1, 2, 1234, -3);
        bus.set_digital_input(1, 5, true);

        let slot = bus.read_board(1).unwrap();
        let snapshot = BoardSnapshot::from_slot(1, &slot).unwrap();
        assert_eq!(snapshot.axes[2].encoder_position, 1234);
        assert_eq!(snapshot.axes[2].encoder_velocity, -3);
        assert!(snapshot.digital_input(5));

        bus.set_fail_reads(1, true);
        assert_eq!(bus.read_board(1), Err(BusError::Timeout { address: 1 }));
    }

    #[test]
    fn write_applies_command() {
        let mut bus = bus();
        let mut cmd = BoardCommand::with_watchdog(1000);
        cmd.set_digital_output(3, true);
        bus.write_board(2, &cmd.to_slot(2)).unwrap();
        assert_eq!(bus.board(2).unwrap().last_command(), Some(&cmd));

        // Mis-addressed slot.
        assert_eq!(
            bus.write_board(1, &cmd.to_slot(2)),
            Err(BusError::Checksum { address: 1 })
        );
    }

    #[test]
    fn broadcast_read_skips_silent_boards() {
        let mut bus = bus();
        assert_eq!(bus.broadcast_read(&[1, 2]).unwrap().len(), 2 * READ_SLOT_QUADLETS);

        bus.set_fail_reads(2, true);
        assert_eq!(bus.broadcast_read(&[1, 2]).unwrap().len(), READ_SLOT_QUADLETS);

        bus.set_fail_reads(2, false);
        bus.set_corrupt_broadcast(true);
        assert_eq!(bus.broadcast_read(&[1, 2]).unwrap().len(), 2 * READ_SLOT_QUADLETS - 1);

        bus.set_broadcast_supported(false);
        assert!(matches!(bus.broadcast_read(&[1]), Err(BusError::Unsupported(_))));
    }

    #[test]
    fn broadcast_write_applies_per_slot() {
        let mut bus = bus();
        bus.set_fail_writes(2, true);
        let cmd = BoardCommand::with_watchdog(500);
        let frame: Vec<u32> = cmd.to_slot(1).into_iter().chain(cmd.to_slot(2)).collect();

        let acks = bus.broadcast_write(&frame).unwrap();
        assert_eq!(
            acks.as_slice(),
            &[(1, Ok(())), (2, Err(BusError::Timeout { address: 2 }))]
        );
        assert_eq!(bus.board(1).unwrap().write_count(), 1);
        assert_eq!(bus.board(2).unwrap().write_count(), 0);

        bus.set_fail_writes(2, false);
        bus.set_disconnected(1, true);
        let acks = bus.broadcast_write(&frame).unwrap();
        assert_eq!(
            acks.as_slice(),
            &[(1, Err(BusError::Disconnected { address: 1 })), (2, Ok(()))]
        );
        assert_eq!(bus.board(2).unwrap().write_count(), 1);

        assert!(matches!(
            bus.broadcast_write(&frame[..frame.len() - 1]),
            Err(BusError::MalformedBroadcast { .. })
        ));
    }
}
