//! Per-board state and error bookkeeping.
//!
//! A `Board` holds the last known register snapshot of one controller board
//! plus the counters that drive fault escalation:
//!
//! - every failed read marks the snapshot stale and bumps the consecutive
//!   read-failure counter; every failed write bumps the write counter
//! - any success resets its counter
//! - a counter exceeding the fault threshold latches a fault that only
//!   [`Board::clear_fault`] removes

use rio_common::port::bus::BusError;
use rio_common::port::registers::BoardSnapshot;
use rio_common::port::types::BoardAddress;

/// Transaction direction that latched a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCause {
    /// Consecutive read failures.
    Read,
    /// Consecutive write failures.
    Write,
}

/// Read-only view of a board for supervisory introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardStatus {
    /// Board address.
    pub address: BoardAddress,
    /// Firmware revision reported at probe time.
    pub firmware_version: u32,
    /// Last read did not refresh the snapshot.
    pub stale: bool,
    /// Latched fault, if any.
    pub fault: Option<FaultCause>,
    /// Consecutive failed reads.
    pub read_failures: u32,
    /// Consecutive failed writes.
    pub write_failures: u32,
    /// Lifetime failed reads.
    pub total_read_errors: u64,
    /// Lifetime failed writes.
    pub total_write_errors: u64,
    /// Most recent bus error.
    pub last_error: Option<BusError>,
}

/// One controller board owned by the port.
#[derive(Debug, Clone)]
pub struct Board {
    address: BoardAddress,
    firmware_version: u32,
    snapshot: BoardSnapshot,
    stale: bool,
    fault: Option<FaultCause>,
    read_failures: u32,
    write_failures: u32,
    total_read_errors: u64,
    total_write_errors: u64,
    last_error: Option<BusError>,
}

impl Board {
    /// Create a board that has not been read yet (stale until first read).
    pub fn new(address: BoardAddress, firmware_version: u32) -> Self {
        Self {
            address,
            firmware_version,
            snapshot: BoardSnapshot::default(),
            stale: true,
            fault: None,
            read_failures: 0,
            write_failures: 0,
            total_read_errors: 0,
            total_write_errors: 0,
            last_error: None,
        }
    }

    /// Board address.
    #[inline]
    pub fn address(&self) -> BoardAddress {
        self.address
    }

    /// Firmware revision.
    #[inline]
    pub fn firmware_version(&self) -> u32 {
        self.firmware_version
    }

    /// Last known register snapshot.
    #[inline]
    pub fn snapshot(&self) -> &BoardSnapshot {
        &self.snapshot
    }

    /// Latched fault, if any.
    #[inline]
    pub fn fault(&self) -> Option<FaultCause> {
        self.fault
    }

    /// Whether a fault is latched.
    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// Whether bindings to this board must treat their data as stale.
    #[inline]
    pub fn data_is_stale(&self) -> bool {
        self.stale || self.fault.is_some()
    }

    /// Store a fresh snapshot.
    pub fn record_read_success(&mut self, snapshot: BoardSnapshot) {
        self.snapshot = snapshot;
        self.stale = false;
        self.read_failures = 0;
    }

    /// Record a failed read. Returns `true` if this failure latched a fault.
    pub fn record_read_failure(&mut self, error: BusError, threshold: u32) -> bool {
        self.stale = true;
        self.read_failures = self.read_failures.saturating_add(1);
        self.total_read_errors += 1;
        self.last_error = Some(error);
        self.escalate(self.read_failures, threshold, FaultCause::Read)
    }

    /// Record a successful write.
    pub fn record_write_success(&mut self) {
        self.write_failures = 0;
    }

    /// Record a failed write. Returns `true` if this failure latched a fault.
    pub fn record_write_failure(&mut self, error: BusError, threshold: u32) -> bool {
        self.write_failures = self.write_failures.saturating_add(1);
        self.total_write_errors += 1;
        self.last_error = Some(error);
        self.escalate(self.write_failures, threshold, FaultCause::Write)
    }

    /// Acknowledge and clear a latched fault. Returns the cleared cause.
    ///
    /// Counters restart from zero; the snapshot stays stale until the next
    /// successful read.
    pub fn clear_fault(&mut self) -> Option<FaultCause> {
        self.read_failures = 0;
        self.write_failures = 0;
        self.fault.take()
    }

    /// Introspection snapshot.
    pub fn status(&self) -> BoardStatus {
        BoardStatus {
            address: self.address,
            firmware_version: self.firmware_version,
            stale: self.stale,
            fault: self.fault,
            read_failures: self.read_failures,
            write_failures: self.write_failures,
            total_read_errors: self.total_read_errors,
            total_write_errors: self.total_write_errors,
            last_error: self.last_error,
        }
    }

    fn escalate(&mut self, failures: u32, threshold: u32, cause: FaultCause) -> bool {
        if self.fault.is_none() && failures > threshold {
            self.fault = Some(cause);
            true
        } else {
            false
        }
    }
}
