//! Port: board registry and per-cycle read/write orchestration.
//!
//! The `Port` is the sole owner of every board, robot and digital signal on
//! one bus. Robots and signals reference boards by address only; the port
//! resolves those references on every cycle.
//!
//! # Cycle
//!
//! ```text
//!  driver ──read()──►  Transport::read ──► Board snapshots ──► Robots / DigitalInputs
//!  driver  (inspects and updates commands)
//!  driver ──write()─►  Robots / DigitalOutputs ──► BoardCommands + watchdog ──► Transport::write
//! ```
//!
//! Per-board failures never abort a cycle. Only configuration calls return
//! errors, and a failed configuration call leaves every registry unchanged.

use crate::board::{Board, BoardStatus, FaultCause};
use crate::digital::{DigitalInput, DigitalOutput};
use crate::events::{CyclePhase, EventSink, PortEvent, TracingSink};
use crate::registry::{Named, Registry};
use crate::robot::Robot;
use crate::transport::{BoardCommands, transport_for};
use rio_common::consts::{
    DEFAULT_BOARD_TIMEOUT_US, DEFAULT_CYCLE_TIME_US, DEFAULT_FAULT_THRESHOLD,
    DEFAULT_WATCHDOG_PERIOD_US, MAX_BOARDS, MIN_BROADCAST_FIRMWARE,
};
use rio_common::port::bus::Bus;
use rio_common::port::config::{
    PortConfig, validate_address, validate_signal, validate_watchdog_period,
};
use rio_common::port::error::PortError;
use rio_common::port::registers::{BoardCommand, ControlFlags};
use rio_common::port::types::{BoardAddress, Protocol};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of one `read()` or `write()`.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Phase this report describes.
    pub phase: CyclePhase,
    /// Boards addressed in this cycle.
    pub boards: usize,
    /// Boards whose transaction failed.
    pub failed: heapless::Vec<BoardAddress, MAX_BOARDS>,
    /// Boards that escalated to the fault state in this cycle.
    pub new_faults: heapless::Vec<BoardAddress, MAX_BOARDS>,
    /// Time spent in the phase.
    pub elapsed: Duration,
    /// Phase exceeded the cycle budget.
    pub timing_violation: bool,
}

impl CycleReport {
    fn new(phase: CyclePhase, boards: usize) -> Self {
        Self {
            phase,
            boards,
            failed: heapless::Vec::new(),
            new_faults: heapless::Vec::new(),
            elapsed: Duration::ZERO,
            timing_violation: false,
        }
    }

    /// No board failed and the budget held.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.timing_violation
    }
}

/// Timing statistics for cycle monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PortStats {
    /// Number of completed reads.
    pub read_count: u64,
    /// Number of completed writes.
    pub write_count: u64,
    /// Reads or writes that exceeded the cycle budget.
    pub timing_violations: u64,
    /// Slowest read in microseconds.
    pub max_read_time_us: u64,
    /// Slowest write in microseconds.
    pub max_write_time_us: u64,
    /// Sum of read times for average calculation.
    pub total_read_time_us: u64,
    /// Sum of write times for average calculation.
    pub total_write_time_us: u64,
}

impl PortStats {
    fn record(&mut self, phase: CyclePhase, elapsed: Duration, violation: bool) {
        let us = elapsed.as_micros() as u64;
        match phase {
            CyclePhase::Read => {
                self.read_count += 1;
                self.total_read_time_us += us;
                self.max_read_time_us = self.max_read_time_us.max(us);
            }
            CyclePhase::Write => {
                self.write_count += 1;
                self.total_write_time_us += us;
                self.max_write_time_us = self.max_write_time_us.max(us);
            }
        }
        if violation {
            self.timing_violations += 1;
        }
    }

    /// Average read time in microseconds.
    pub fn avg_read_time_us(&self) -> u64 {
        self.total_read_time_us.checked_div(self.read_count).unwrap_or(0)
    }

    /// Average write time in microseconds.
    pub fn avg_write_time_us(&self) -> u64 {
        self.total_write_time_us.checked_div(self.write_count).unwrap_or(0)
    }
}

/// One bus and everything attached to it.
pub struct Port<B: Bus> {
    port_number: u32,
    bus: B,
    boards: BTreeMap<BoardAddress, Board>,
    robots: Registry<Robot>,
    digital_inputs: Registry<DigitalInput>,
    digital_outputs: Registry<DigitalOutput>,
    protocol: Protocol,
    watchdog_period_us: u32,
    fault_threshold: u32,
    board_timeout: Duration,
    cycle_budget: Duration,
    sink: Box<dyn EventSink>,
    stats: PortStats,
}

impl<B: Bus> Port<B> {
    /// Create an empty port on `bus` with default timing and the tracing sink.
    pub fn new(port_number: u32, bus: B) -> Self {
        info!("Port {} created on {} bus", port_number, bus.name());
        Self {
            port_number,
            bus,
            boards: BTreeMap::new(),
            robots: Registry::new("robot"),
            digital_inputs: Registry::new("digital input"),
            digital_outputs: Registry::new("digital output"),
            protocol: Protocol::Sequential,
            watchdog_period_us: DEFAULT_WATCHDOG_PERIOD_US,
            fault_threshold: DEFAULT_FAULT_THRESHOLD,
            board_timeout: Duration::from_micros(DEFAULT_BOARD_TIMEOUT_US as u64),
            cycle_budget: Duration::from_micros(DEFAULT_CYCLE_TIME_US as u64),
            sink: Box::new(TracingSink),
            stats: PortStats::default(),
        }
    }

    /// Replace the event sink.
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Apply a configuration: timing, boards, protocol, robots and signals.
    ///
    /// Boards referenced by the configuration and not yet registered are
    /// probed and added. All checks run before anything is registered, so a
    /// failed call leaves the port unchanged.
    ///
    /// # Errors
    /// Any configuration error from validation, probing or the protocol
    /// check.
    pub fn configure(&mut self, config: &PortConfig) -> Result<(), PortError> {
        config.validate()?;
        info!(
            "Configuring port {}: {} robots, {} DI, {} DO, protocol {}",
            self.port_number,
            config.robots.len(),
            config.digital_inputs.len(),
            config.digital_outputs.len(),
            config.protocol
        );

        // The configuration is consistent with itself; check it against
        // what is already registered.
        let robots = config
            .robots
            .iter()
            .map(Robot::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        let inputs: Vec<_> = config
            .digital_inputs
            .iter()
            .map(DigitalInput::from_config)
            .collect();
        let outputs: Vec<_> = config
            .digital_outputs
            .iter()
            .map(DigitalOutput::from_config)
            .collect();
        for robot in &robots {
            self.check_robot(robot)?;
        }
        for input in &inputs {
            self.check_digital_input(input)?;
        }
        for output in &outputs {
            self.check_digital_output(output)?;
        }

        let mut probed = Vec::new();
        for address in config.referenced_boards() {
            if !self.boards.contains_key(&address) {
                let firmware = self.probe(address)?;
                probed.push(Board::new(address, firmware));
            }
        }
        let firmware = self
            .boards
            .values()
            .chain(&probed)
            .map(|b| (b.address(), b.firmware_version()));
        check_protocol(config.protocol, self.bus.supports_broadcast(), firmware)?;

        // Nothing below can fail.
        for board in probed {
            self.insert_board(board);
        }
        self.watchdog_period_us = config.watchdog_period_us;
        self.fault_threshold = config.fault_threshold;
        self.board_timeout = Duration::from_micros(config.board_timeout_us as u64);
        self.cycle_budget = Duration::from_micros(config.cycle_time_us as u64);
        self.switch_protocol(config.protocol);

        for robot in robots {
            self.add_robot(robot)?;
        }
        for input in inputs {
            self.add_digital_input(input)?;
        }
        for output in outputs {
            self.add_digital_output(output)?;
        }

        info!(
            "Port {} configured: {} boards, {} robots, {} DI, {} DO",
            self.port_number,
            self.boards.len(),
            self.robots.len(),
            self.digital_inputs.len(),
            self.digital_outputs.len()
        );
        Ok(())
    }

    /// Probe and register one board.
    ///
    /// # Errors
    /// `InvalidAddress`, `DuplicateBoard`, `ProbeFailed`, or
    /// `ProtocolUnsupported` if the active protocol is broadcast and the
    /// board's firmware cannot answer it.
    pub fn add_board(&mut self, address: BoardAddress) -> Result<(), PortError> {
        if self.boards.contains_key(&address) {
            return Err(PortError::DuplicateBoard(address));
        }
        let firmware = self.probe(address)?;
        check_protocol(
            self.protocol,
            self.bus.supports_broadcast(),
            std::iter::once((address, firmware)),
        )?;
        self.insert_board(Board::new(address, firmware));
        Ok(())
    }

    /// Register a robot.
    ///
    /// # Errors
    /// `DuplicateName` if the name is taken, `InvalidConfig` if an axis is
    /// already bound by another robot, `UnknownBoard` if any binding
    /// references an unregistered board. The registry is unchanged on error.
    pub fn add_robot(&mut self, robot: Robot) -> Result<(), PortError> {
        self.check_robot(&robot)?;
        for address in robot.board_addresses() {
            self.require_board(robot.name(), address)?;
        }
        debug!(
            "Adding robot '{}' ({} actuators, {} brakes)",
            robot.name(),
            robot.number_of_actuators(),
            robot.number_of_brakes()
        );
        self.robots.insert(robot)?;
        Ok(())
    }

    /// Register a digital input.
    ///
    /// # Errors
    /// `DuplicateName`, `InvalidConfig` for a bit out of range or already
    /// bound, or `UnknownBoard`; the registry is unchanged on error.
    pub fn add_digital_input(&mut self, input: DigitalInput) -> Result<(), PortError> {
        self.check_digital_input(&input)?;
        self.require_board(input.name(), input.binding().board)?;
        self.digital_inputs.insert(input)?;
        Ok(())
    }

    /// Register a digital output.
    ///
    /// # Errors
    /// `DuplicateName`, `InvalidConfig` for a bit out of range or already
    /// bound, or `UnknownBoard`; the registry is unchanged on error.
    pub fn add_digital_output(&mut self, output: DigitalOutput) -> Result<(), PortError> {
        self.check_digital_output(&output)?;
        self.require_board(output.name(), output.binding().board)?;
        self.digital_outputs.insert(output)?;
        Ok(())
    }

    /// Switch the transaction protocol for subsequent cycles.
    ///
    /// # Errors
    /// `ProtocolUnsupported` if a broadcast mode is requested and the bus or
    /// any registered board cannot serve it.
    pub fn set_protocol(&mut self, protocol: Protocol) -> Result<(), PortError> {
        let firmware = self
            .boards
            .values()
            .map(|b| (b.address(), b.firmware_version()));
        check_protocol(protocol, self.bus.supports_broadcast(), firmware)?;
        self.switch_protocol(protocol);
        Ok(())
    }

    /// Set the hardware watchdog period carried by every write.
    ///
    /// # Errors
    /// `InvalidConfig` for zero or a period above the firmware limit.
    pub fn set_watchdog_period(&mut self, period: Duration) -> Result<(), PortError> {
        let period_us = u32::try_from(period.as_micros()).unwrap_or(u32::MAX);
        validate_watchdog_period(period_us)?;
        self.watchdog_period_us = period_us;
        info!("Watchdog period set to {}us", period_us);
        Ok(())
    }

    /// Read every board and distribute the snapshots.
    pub fn read(&mut self) -> CycleReport {
        let started = Instant::now();
        let addresses = self.addresses();
        let transport = transport_for(self.protocol.broadcast_read());
        let results = transport.read(&mut self.bus, &addresses, self.board_timeout);

        let mut report = CycleReport::new(CyclePhase::Read, addresses.len());
        for (address, result) in results {
            let Some(board) = self.boards.get_mut(&address) else {
                continue;
            };
            match result {
                Ok(snapshot) => board.record_read_success(snapshot),
                Err(error) => {
                    let _ = report.failed.push(address);
                    let was_faulted = board.is_faulted();
                    let escalated = board.record_read_failure(error, self.fault_threshold);
                    if !was_faulted {
                        self.sink.emit(&PortEvent::ReadFailed {
                            address,
                            error,
                            consecutive: board.status().read_failures,
                        });
                    }
                    if escalated {
                        let _ = report.new_faults.push(address);
                        self.sink.emit(&PortEvent::BoardFaulted {
                            address,
                            cause: FaultCause::Read,
                        });
                    }
                }
            }
        }

        self.distribute();
        self.finish(report, started)
    }

    /// Gather commands from robots and outputs and write every board.
    pub fn write(&mut self) -> CycleReport {
        let started = Instant::now();
        let commands = self.assemble_commands();
        let transport = transport_for(self.protocol.broadcast_write());
        let results = transport.write(&mut self.bus, &commands, self.board_timeout);

        let mut report = CycleReport::new(CyclePhase::Write, commands.len());
        for (address, result) in results {
            let Some(board) = self.boards.get_mut(&address) else {
                continue;
            };
            match result {
                Ok(()) => board.record_write_success(),
                Err(error) => {
                    let _ = report.failed.push(address);
                    let was_faulted = board.is_faulted();
                    let escalated = board.record_write_failure(error, self.fault_threshold);
                    if !was_faulted {
                        self.sink.emit(&PortEvent::WriteFailed {
                            address,
                            error,
                            consecutive: board.status().write_failures,
                        });
                    }
                    if escalated {
                        let _ = report.new_faults.push(address);
                        self.sink.emit(&PortEvent::BoardFaulted {
                            address,
                            cause: FaultCause::Write,
                        });
                    }
                }
            }
        }

        self.finish(report, started)
    }

    /// Acknowledge a board fault.
    ///
    /// # Errors
    /// `NotFound` if no board is registered at `address`.
    pub fn clear_fault(&mut self, address: BoardAddress) -> Result<(), PortError> {
        let board = self.boards.get_mut(&address).ok_or_else(|| PortError::NotFound {
            kind: "board",
            key: address.to_string(),
        })?;
        if board.clear_fault().is_some() {
            self.sink.emit(&PortEvent::FaultCleared { address });
        }
        Ok(())
    }

    /// Acknowledge every board fault.
    pub fn clear_all_faults(&mut self) {
        for board in self.boards.values_mut() {
            if board.clear_fault().is_some() {
                self.sink.emit(&PortEvent::FaultCleared {
                    address: board.address(),
                });
            }
        }
    }

    // ─── Introspection ──────────────────────────────────────────────

    /// Bus (port) number.
    pub fn port_number(&self) -> u32 {
        self.port_number
    }

    /// Active protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Configured watchdog period.
    pub fn watchdog_period(&self) -> Duration {
        Duration::from_micros(self.watchdog_period_us as u64)
    }

    /// Consecutive failures tolerated before a board faults.
    pub fn fault_threshold(&self) -> u32 {
        self.fault_threshold
    }

    /// Timing statistics.
    pub fn stats(&self) -> &PortStats {
        &self.stats
    }

    /// Underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable underlying bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Number of registered boards.
    pub fn number_of_boards(&self) -> usize {
        self.boards.len()
    }

    /// Number of registered robots.
    pub fn number_of_robots(&self) -> usize {
        self.robots.len()
    }

    /// Number of registered digital inputs.
    pub fn number_of_digital_inputs(&self) -> usize {
        self.digital_inputs.len()
    }

    /// Number of registered digital outputs.
    pub fn number_of_digital_outputs(&self) -> usize {
        self.digital_outputs.len()
    }

    /// Registered board addresses in ascending order.
    pub fn board_addresses(&self) -> Vec<BoardAddress> {
        self.boards.keys().copied().collect()
    }

    /// Status of one board.
    pub fn board_status(&self, address: BoardAddress) -> Result<BoardStatus, PortError> {
        self.boards
            .get(&address)
            .map(Board::status)
            .ok_or_else(|| PortError::NotFound {
                kind: "board",
                key: address.to_string(),
            })
    }

    /// Status of every board in address order.
    pub fn board_statuses(&self) -> Vec<BoardStatus> {
        self.boards.values().map(Board::status).collect()
    }

    /// Addresses of boards in the fault state.
    pub fn faulted_boards(&self) -> Vec<BoardAddress> {
        self.boards
            .values()
            .filter(|b| b.is_faulted())
            .map(Board::address)
            .collect()
    }

    /// Robot by exact name.
    pub fn robot(&self, name: &str) -> Result<&Robot, PortError> {
        self.robots.get(name)
    }

    /// Mutable robot by exact name.
    pub fn robot_mut(&mut self, name: &str) -> Result<&mut Robot, PortError> {
        self.robots.get_mut(name)
    }

    /// Robot by registration order.
    pub fn robot_at(&self, index: usize) -> Result<&Robot, PortError> {
        self.robots.at(index)
    }

    /// Mutable robot by registration order.
    pub fn robot_at_mut(&mut self, index: usize) -> Result<&mut Robot, PortError> {
        self.robots.at_mut(index)
    }

    /// Robot names in registration order.
    pub fn robot_names(&self) -> Vec<String> {
        self.robots.names()
    }

    /// Actuator count of every robot, in registration order.
    pub fn actuators_per_robot(&self) -> Vec<usize> {
        self.robots.iter().map(Robot::number_of_actuators).collect()
    }

    /// Brake count of every robot, in registration order.
    pub fn brakes_per_robot(&self) -> Vec<usize> {
        self.robots.iter().map(Robot::number_of_brakes).collect()
    }

    /// Digital input by exact name.
    pub fn digital_input(&self, name: &str) -> Result<&DigitalInput, PortError> {
        self.digital_inputs.get(name)
    }

    /// Digital input by registration order.
    pub fn digital_input_at(&self, index: usize) -> Result<&DigitalInput, PortError> {
        self.digital_inputs.at(index)
    }

    /// Digital input names in registration order.
    pub fn digital_input_names(&self) -> Vec<String> {
        self.digital_inputs.names()
    }

    /// Digital output by exact name.
    pub fn digital_output(&self, name: &str) -> Result<&DigitalOutput, PortError> {
        self.digital_outputs.get(name)
    }

    /// Mutable digital output by exact name.
    pub fn digital_output_mut(&mut self, name: &str) -> Result<&mut DigitalOutput, PortError> {
        self.digital_outputs.get_mut(name)
    }

    /// Digital output by registration order.
    pub fn digital_output_at(&self, index: usize) -> Result<&DigitalOutput, PortError> {
        self.digital_outputs.at(index)
    }

    /// Digital output names in registration order.
    pub fn digital_output_names(&self) -> Vec<String> {
        self.digital_outputs.names()
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn probe(&mut self, address: BoardAddress) -> Result<u32, PortError> {
        validate_address(address)?;
        self.bus
            .probe_board(address)
            .map_err(|source| PortError::ProbeFailed { address, source })
    }

    fn insert_board(&mut self, board: Board) {
        self.sink.emit(&PortEvent::BoardAdded {
            address: board.address(),
            firmware_version: board.firmware_version(),
        });
        self.boards.insert(board.address(), board);
    }

    /// Name and axis collisions with registered robots.
    fn check_robot(&self, robot: &Robot) -> Result<(), PortError> {
        if self.robots.contains(robot.name()) {
            return Err(duplicate("robot", robot.name()));
        }
        for binding in robot.bindings() {
            if let Some(owner) = self.robots.iter().find(|r| r.bindings().any(|b| b == binding)) {
                return Err(PortError::InvalidConfig(format!(
                    "{} bound by both '{}' and '{}'",
                    binding,
                    owner.name(),
                    robot.name()
                )));
            }
        }
        Ok(())
    }

    fn check_digital_input(&self, input: &DigitalInput) -> Result<(), PortError> {
        validate_signal(input.name(), input.binding())?;
        if self.digital_inputs.contains(input.name()) {
            return Err(duplicate("digital input", input.name()));
        }
        if let Some(other) = self
            .digital_inputs
            .iter()
            .find(|di| di.binding() == input.binding())
        {
            return Err(bit_taken("digital input", input.name(), other.name()));
        }
        Ok(())
    }

    fn check_digital_output(&self, output: &DigitalOutput) -> Result<(), PortError> {
        validate_signal(output.name(), output.binding())?;
        if self.digital_outputs.contains(output.name()) {
            return Err(duplicate("digital output", output.name()));
        }
        if let Some(other) = self
            .digital_outputs
            .iter()
            .find(|dout| dout.binding() == output.binding())
        {
            return Err(bit_taken("digital output", output.name(), other.name()));
        }
        Ok(())
    }

    fn require_board(&self, owner: &str, address: BoardAddress) -> Result<(), PortError> {
        if self.boards.contains_key(&address) {
            Ok(())
        } else {
            Err(PortError::UnknownBoard {
                owner: owner.to_string(),
                address,
            })
        }
    }

    fn switch_protocol(&mut self, protocol: Protocol) {
        if protocol != self.protocol {
            self.sink.emit(&PortEvent::ProtocolChanged {
                from: self.protocol,
                to: protocol,
            });
            self.protocol = protocol;
        }
    }

    fn addresses(&self) -> heapless::Vec<BoardAddress, MAX_BOARDS> {
        let mut addresses = heapless::Vec::new();
        for &address in self.boards.keys() {
            let _ = addresses.push(address);
        }
        addresses
    }

    /// Push board snapshots into every binding.
    fn distribute(&mut self) {
        let boards = &self.boards;
        let lookup = |address: BoardAddress| boards.get(&address);

        for robot in self.robots.iter_mut() {
            for actuator in robot.actuators_mut() {
                let binding = actuator.binding();
                match lookup(binding.board) {
                    Some(board) => actuator.update(
                        board.snapshot().axis(binding.axis),
                        board.data_is_stale(),
                    ),
                    None => actuator.update(None, true),
                }
            }
            for brake in robot.brakes_mut() {
                let binding = brake.binding();
                match lookup(binding.board) {
                    Some(board) => {
                        brake.update(board.snapshot().axis(binding.axis), board.data_is_stale())
                    }
                    None => brake.update(None, true),
                }
            }
        }

        for input in self.digital_inputs.iter_mut() {
            match lookup(input.binding().board) {
                Some(board) => input.update(board.snapshot(), board.data_is_stale()),
                None => input.mark_stale(),
            }
        }

        for output in self.digital_outputs.iter_mut() {
            let stale = lookup(output.binding().board).is_none_or(Board::data_is_stale);
            output.set_stale(stale);
        }
    }

    /// Build one command per board from robots, outputs and the watchdog.
    fn assemble_commands(&self) -> BoardCommands {
        let mut by_address: [Option<BoardCommand>; MAX_BOARDS] = [None; MAX_BOARDS];
        for &address in self.boards.keys() {
            by_address[address as usize] = Some(BoardCommand::with_watchdog(self.watchdog_period_us));
        }

        for robot in self.robots.iter() {
            for actuator in robot.actuators() {
                if let Some(cmd) = by_address[actuator.binding().board as usize].as_mut() {
                    actuator.apply(cmd);
                }
            }
            for brake in robot.brakes() {
                if let Some(cmd) = by_address[brake.binding().board as usize].as_mut() {
                    brake.apply(cmd);
                }
            }
            if robot.power_requested() {
                for address in robot.board_addresses() {
                    if let Some(cmd) = by_address[address as usize].as_mut() {
                        cmd.control |= ControlFlags::POWER_ENABLE | ControlFlags::SAFETY_RELAY;
                    }
                }
            }
        }

        for output in self.digital_outputs.iter() {
            if let Some(cmd) = by_address[output.binding().board as usize].as_mut() {
                output.apply(cmd);
            }
        }

        let mut commands = BoardCommands::new();
        for board in self.boards.values() {
            if let Some(mut cmd) = by_address[board.address() as usize] {
                if board.is_faulted() {
                    cmd.make_safe();
                }
                let _ = commands.push((board.address(), cmd));
            }
        }
        commands
    }

    fn finish(&mut self, mut report: CycleReport, started: Instant) -> CycleReport {
        report.elapsed = started.elapsed();
        report.timing_violation = report.elapsed > self.cycle_budget;
        if report.timing_violation {
            self.sink.emit(&PortEvent::TimingViolation {
                phase: report.phase,
                elapsed: report.elapsed,
                budget: self.cycle_budget,
            });
        }
        self.stats
            .record(report.phase, report.elapsed, report.timing_violation);
        report
    }
}

impl<B: Bus> Drop for Port<B> {
    fn drop(&mut self) {
        debug!(
            "Port {} released: {} boards, {} robots, {} DI, {} DO",
            self.port_number,
            self.boards.len(),
            self.robots.len(),
            self.digital_inputs.len(),
            self.digital_outputs.len()
        );
    }
}

fn duplicate(kind: &'static str, name: &str) -> PortError {
    PortError::DuplicateName {
        kind,
        name: name.to_string(),
    }
}

fn bit_taken(kind: &str, name: &str, owner: &str) -> PortError {
    PortError::InvalidConfig(format!(
        "{} '{}': bit already bound by '{}'",
        kind, name, owner
    ))
}

/// Refuse broadcast protocols the bus or a board cannot serve.
fn check_protocol(
    protocol: Protocol,
    bus_supports_broadcast: bool,
    firmware: impl IntoIterator<Item = (BoardAddress, u32)>,
) -> Result<(), PortError> {
    if !protocol.uses_broadcast() {
        return Ok(());
    }
    if !bus_supports_broadcast {
        return Err(PortError::ProtocolUnsupported {
            protocol,
            reason: "bus has no broadcast transactions".to_string(),
        });
    }
    for (address, version) in firmware {
        if version < MIN_BROADCAST_FIRMWARE {
            return Err(PortError::ProtocolUnsupported {
                protocol,
                reason: format!(
                    "board {} firmware {} older than {}",
                    address, version, MIN_BROADCAST_FIRMWARE
                ),
            });
        }
    }
    Ok(())
}
