//! Bus transaction strategies.
//!
//! `Port` never branches on the protocol inside its cycle logic. It asks
//! [`transport_for`] for a strategy per direction and hands it the board
//! set. Both strategies honour the same contract: one result per addressed
//! board, in ascending address order.
//!
//! - [`SequentialTransport`] issues one transaction per board; a failing
//!   board affects only its own result.
//! - [`BroadcastTransport`] issues one transaction for all boards and
//!   demultiplexes the reply slot by slot. A malformed read reply fails every
//!   board rather than trusting a partial parse. A broadcast write is judged
//!   per board from the bus acknowledgements.

use rio_common::consts::MAX_BOARDS;
use rio_common::port::bus::{BroadcastFrame, Bus, BusError, WriteAcks};
use rio_common::port::registers::{BoardCommand, BoardSnapshot, READ_SLOT_QUADLETS};
use rio_common::port::types::BoardAddress;
use std::time::{Duration, Instant};
use tracing::trace;

/// Per-board read results in address order.
pub type ReadResults = heapless::Vec<(BoardAddress, Result<BoardSnapshot, BusError>), MAX_BOARDS>;

/// Per-board write results in address order.
pub type WriteResults = heapless::Vec<(BoardAddress, Result<(), BusError>), MAX_BOARDS>;

/// Per-board commands in address order.
pub type BoardCommands = heapless::Vec<(BoardAddress, BoardCommand), MAX_BOARDS>;

/// A way of moving one cycle's data across the bus.
pub trait Transport: Sync {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Read every board in `addresses` (ascending). `timeout` is the
    /// per-board budget.
    fn read(&self, bus: &mut dyn Bus, addresses: &[BoardAddress], timeout: Duration) -> ReadResults;

    /// Write every command in `commands` (ascending address).
    fn write(&self, bus: &mut dyn Bus, commands: &BoardCommands, timeout: Duration) -> WriteResults;
}

/// One transaction per board.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialTransport;

/// One transaction for the whole board set.
#[derive(Debug, Default, Clone, Copy)]
pub struct BroadcastTransport;

static SEQUENTIAL: SequentialTransport = SequentialTransport;
static BROADCAST: BroadcastTransport = BroadcastTransport;

/// Strategy for one direction of the cycle.
pub fn transport_for(broadcast: bool) -> &'static dyn Transport {
    if broadcast { &BROADCAST } else { &SEQUENTIAL }
}

impl Transport for SequentialTransport {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn read(&self, bus: &mut dyn Bus, addresses: &[BoardAddress], timeout: Duration) -> ReadResults {
        let mut results = ReadResults::new();
        for &address in addresses {
            let started = Instant::now();
            let result = bus
                .read_board(address)
                .and_then(|slot| BoardSnapshot::from_slot(address, &slot));
            let result = within_budget(result, started, timeout, address);
            // Capacity equals MAX_BOARDS and addresses are unique.
            let _ = results.push((address, result));
        }
        results
    }

    fn write(&self, bus: &mut dyn Bus, commands: &BoardCommands, timeout: Duration) -> WriteResults {
        let mut results = WriteResults::new();
        for (address, command) in commands {
            let started = Instant::now();
            let result = bus.write_board(*address, &command.to_slot(*address));
            let result = within_budget(result, started, timeout, *address);
            let _ = results.push((*address, result));
        }
        results
    }
}

impl Transport for BroadcastTransport {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn read(&self, bus: &mut dyn Bus, addresses: &[BoardAddress], timeout: Duration) -> ReadResults {
        let started = Instant::now();
        let budget = timeout * addresses.len().max(1) as u32;
        let outcome = bus
            .broadcast_read(addresses)
            .and_then(|frame| demultiplex(&frame, addresses));
        let outcome = match outcome {
            Ok(_) if started.elapsed() > budget => Err(BusError::BroadcastTimeout {
                boards: addresses.len(),
            }),
            other => other,
        };

        let mut results = ReadResults::new();
        match outcome {
            Ok(snapshots) => {
                for (address, snapshot) in addresses.iter().zip(snapshots) {
                    let _ = results.push((*address, Ok(snapshot)));
                }
            }
            Err(error) => {
                trace!("Broadcast read failed for all boards: {}", error);
                for &address in addresses {
                    let _ = results.push((address, Err(error)));
                }
            }
        }
        results
    }

    fn write(&self, bus: &mut dyn Bus, commands: &BoardCommands, timeout: Duration) -> WriteResults {
        let started = Instant::now();
        let budget = timeout * commands.len().max(1) as u32;
        let outcome = multiplex(commands).and_then(|frame| bus.broadcast_write(&frame));
        let outcome = match outcome {
            Ok(_) if started.elapsed() > budget => Err(BusError::BroadcastTimeout {
                boards: commands.len(),
            }),
            other => other,
        };

        let mut results = WriteResults::new();
        match outcome {
            Ok(acks) => {
                for (address, _) in commands {
                    let _ = results.push((*address, acknowledgement(&acks, *address)));
                }
            }
            Err(error) => {
                trace!("Broadcast write failed for all boards: {}", error);
                for (address, _) in commands {
                    let _ = results.push((*address, Err(error)));
                }
            }
        }
        results
    }
}

/// Split a broadcast read reply into per-board snapshots.
///
/// The reply must hold exactly one slot per address, in order; anything else
/// is `BusError::MalformedBroadcast`.
pub fn demultiplex(
    frame: &[u32],
    addresses: &[BoardAddress],
) -> Result<heapless::Vec<BoardSnapshot, MAX_BOARDS>, BusError> {
    let expected = addresses.len() * READ_SLOT_QUADLETS;
    let malformed = BusError::MalformedBroadcast {
        expected,
        received: frame.len(),
    };
    if frame.len() != expected {
        return Err(malformed);
    }

    let mut snapshots = heapless::Vec::new();
    for (slot, &address) in frame.chunks_exact(READ_SLOT_QUADLETS).zip(addresses) {
        let snapshot = BoardSnapshot::from_slot(address, slot).map_err(|_| malformed)?;
        snapshots.push(snapshot).map_err(|_| malformed)?;
    }
    Ok(snapshots)
}

/// Outcome of one board's slot in a broadcast write.
///
/// A board absent from `acks` never took its slot and counts as a timeout.
pub fn acknowledgement(acks: &WriteAcks, address: BoardAddress) -> Result<(), BusError> {
    acks.iter()
        .find(|(acked, _)| *acked == address)
        .map_or(Err(BusError::Timeout { address }), |(_, outcome)| *outcome)
}

/// Concatenate per-board write slots into one broadcast frame.
pub fn multiplex(commands: &BoardCommands) -> Result<BroadcastFrame, BusError> {
    let mut frame = BroadcastFrame::new();
    for (address, command) in commands {
        frame
            .extend_from_slice(&command.to_slot(*address))
            .map_err(|_| BusError::MalformedBroadcast {
                expected: frame.capacity(),
                received: frame.len(),
            })?;
    }
    Ok(frame)
}

fn within_budget<T>(
    result: Result<T, BusError>,
    started: Instant,
    timeout: Duration,
    address: BoardAddress,
) -> Result<T, BusError> {
    match result {
        Ok(_) if started.elapsed() > timeout => Err(BusError::Timeout { address }),
        other => other,
    }
}
