//! Simulated controller board.
//!
//! Emulates the register behaviour the port layer depends on:
//! - commanded currents loop back as measured currents while the amplifier
//!   is enabled and power is on
//! - encoders integrate their velocity on every [`SimulatedBoard::advance`]
//! - the firmware watchdog cuts motor power when no write arrives within
//!   the last commanded period

use rio_common::port::registers::{BoardCommand, BoardSnapshot, ControlFlags, StatusFlags};
use std::time::Duration;
use tracing::{debug, warn};

/// Register model of one board.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    firmware_version: u32,
    registers: BoardSnapshot,
    last_command: Option<BoardCommand>,
    writes: u64,
    since_refresh: Duration,
    elapsed: Duration,
    pub(super) fail_reads: bool,
    pub(super) fail_writes: bool,
    pub(super) disconnected: bool,
}

impl SimulatedBoard {
    /// Create a powered-down board.
    pub fn new(firmware_version: u32) -> Self {
        Self {
            firmware_version,
            registers: BoardSnapshot::default(),
            last_command: None,
            writes: 0,
            since_refresh: Duration::ZERO,
            elapsed: Duration::ZERO,
            fail_reads: false,
            fail_writes: false,
            disconnected: false,
        }
    }

    /// Firmware revision returned by probes.
    pub fn firmware_version(&self) -> u32 {
        self.firmware_version
    }

    /// Current register contents.
    pub fn registers(&self) -> &BoardSnapshot {
        &self.registers
    }

    /// Mutable register contents, for injecting feedback.
    pub fn registers_mut(&mut self) -> &mut BoardSnapshot {
        &mut self.registers
    }

    /// Most recently applied command.
    pub fn last_command(&self) -> Option<&BoardCommand> {
        self.last_command.as_ref()
    }

    /// Number of commands applied.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Motor power is on.
    pub fn power_enabled(&self) -> bool {
        self.registers.status.contains(StatusFlags::POWER_ENABLED)
    }

    /// The watchdog has cut power since the last powering write.
    pub fn watchdog_expired(&self) -> bool {
        self.registers.status.contains(StatusFlags::WATCHDOG_EXPIRED)
    }

    pub(super) fn answers_reads(&self) -> bool {
        !self.disconnected && !self.fail_reads
    }

    pub(super) fn answers_writes(&self) -> bool {
        !self.disconnected && !self.fail_writes
    }

    /// Apply one command as the firmware would.
    pub(super) fn apply(&mut self, command: BoardCommand) {
        self.writes += 1;
        self.since_refresh = Duration::ZERO;

        let power = command.control.contains(ControlFlags::POWER_ENABLE);
        let status = &mut self.registers.status;
        status.set(StatusFlags::POWER_ENABLED, power);
        status.set(
            StatusFlags::SAFETY_RELAY,
            command.control.contains(ControlFlags::SAFETY_RELAY),
        );
        if power {
            status.remove(StatusFlags::WATCHDOG_EXPIRED);
        }

        self.last_command = Some(command);
        self.loop_back();
    }

    /// Let simulated time pass.
    pub(super) fn advance(&mut self, address: u8, dt: Duration) {
        self.elapsed += dt;
        self.registers.timestamp = self.elapsed.as_micros() as u32;

        let seconds = dt.as_secs_f64();
        for axis in &mut self.registers.axes {
            axis.encoder_position = axis
                .encoder_position
                .wrapping_add((axis.encoder_velocity as f64 * seconds) as i32);
        }

        let period_us = self.last_command.map_or(0, |c| c.watchdog_period_us);
        if period_us == 0 || !self.power_enabled() {
            return;
        }
        self.since_refresh += dt;
        if self.since_refresh > Duration::from_micros(period_us as u64) {
            warn!(board = address, "Simulated watchdog expired after {:?}", self.since_refresh);
            self.registers.status.remove(StatusFlags::POWER_ENABLED);
            self.registers.status.insert(StatusFlags::WATCHDOG_EXPIRED);
            if let Some(command) = self.last_command.as_mut() {
                command.make_safe();
            }
            self.loop_back();
        }
    }

    fn loop_back(&mut self) {
        let powered = self.power_enabled();
        let command = self.last_command.unwrap_or_default();
        for (index, axis) in self.registers.axes.iter_mut().enumerate() {
            let enabled = powered && command.axis_enabled(index as u8);
            axis.motor_current = if enabled { command.currents[index] } else { 0 };
            axis.amp_status = enabled as u32;
        }
        debug!(
            "Simulated board loop-back: power={}, amps={:#04x}",
            powered, command.amp_enable
        );
    }
}
