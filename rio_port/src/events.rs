//! Port event reporting.
//!
//! The port never writes to a fixed output channel. Everything a supervisor
//! may care about is emitted as a [`PortEvent`] into an injected
//! [`EventSink`]; the default [`TracingSink`] forwards to `tracing`.

use crate::board::FaultCause;
use rio_common::port::bus::BusError;
use rio_common::port::types::{BoardAddress, Protocol};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Cycle phase a report or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// `Port::read`
    Read,
    /// `Port::write`
    Write,
}

/// Something worth reporting upward.
#[derive(Debug, Clone, PartialEq)]
pub enum PortEvent {
    /// Board probed and registered.
    BoardAdded {
        /// Board address.
        address: BoardAddress,
        /// Reported firmware revision.
        firmware_version: u32,
    },
    /// Transient read failure on a board that is not faulted.
    ReadFailed {
        /// Board address.
        address: BoardAddress,
        /// Bus failure.
        error: BusError,
        /// Consecutive failures so far.
        consecutive: u32,
    },
    /// Transient write failure on a board that is not faulted.
    WriteFailed {
        /// Board address.
        address: BoardAddress,
        /// Bus failure.
        error: BusError,
        /// Consecutive failures so far.
        consecutive: u32,
    },
    /// Board escalated to the fault state.
    BoardFaulted {
        /// Board address.
        address: BoardAddress,
        /// Direction that exceeded the threshold.
        cause: FaultCause,
    },
    /// Fault acknowledged by the driver.
    FaultCleared {
        /// Board address.
        address: BoardAddress,
    },
    /// Transaction protocol switched.
    ProtocolChanged {
        /// Previous protocol.
        from: Protocol,
        /// New protocol.
        to: Protocol,
    },
    /// Read or write exceeded its budget.
    TimingViolation {
        /// Offending phase.
        phase: CyclePhase,
        /// Measured duration.
        elapsed: Duration,
        /// Allowed duration.
        budget: Duration,
    },
}

/// Destination for port events.
pub trait EventSink: Send {
    /// Handle one event. Called from inside `read`/`write`; must not block.
    fn emit(&mut self, event: &PortEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: &PortEvent) {
        match event {
            PortEvent::BoardAdded {
                address,
                firmware_version,
            } => info!("Board {} added (firmware {})", address, firmware_version),
            PortEvent::ReadFailed {
                address,
                error,
                consecutive,
            } => warn!(board = *address, consecutive, "Read failed: {}", error),
            PortEvent::WriteFailed {
                address,
                error,
                consecutive,
            } => warn!(board = *address, consecutive, "Write failed: {}", error),
            PortEvent::BoardFaulted { address, cause } => {
                error!(board = *address, "Board faulted after consecutive {:?} failures", cause)
            }
            PortEvent::FaultCleared { address } => info!(board = *address, "Fault cleared"),
            PortEvent::ProtocolChanged { from, to } => {
                info!("Protocol changed from {} to {}", from, to)
            }
            PortEvent::TimingViolation {
                phase,
                elapsed,
                budget,
            } => debug!(
                "Timing violation in {:?}: {}us (budget {}us)",
                phase,
                elapsed.as_micros(),
                budget.as_micros()
            ),
        }
    }
}

impl<F: FnMut(&PortEvent) + Send> EventSink for F {
    fn emit(&mut self, event: &PortEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_sink_receives_events() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: &PortEvent| seen.push(event.clone());
            sink.emit(&PortEvent::FaultCleared { address: 4 });
        }
        assert_eq!(seen, vec![PortEvent::FaultCleared { address: 4 }]);
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let mut sink = TracingSink;
        sink.emit(&PortEvent::BoardFaulted {
            address: 1,
            cause: FaultCause::Read,
        });
        sink.emit(&PortEvent::TimingViolation {
            phase: CyclePhase::Read,
            elapsed: Duration::from_micros(900),
            budget: Duration::from_micros(500),
        });
    }
}
