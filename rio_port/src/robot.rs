//! Robots: named, ordered collections of actuators and brakes.
//!
//! A robot never talks to the bus. `Port::read` pushes raw axis feedback
//! into its actuators and brakes; `Port::write` pulls their commands back
//! out. Actuator order defines axis numbering for every vector accessor.

use crate::registry::Named;
use rio_common::port::config::{RobotConfig, validate_axis};
use rio_common::port::error::PortError;
use rio_common::port::registers::{AxisRegisters, BoardCommand};
use rio_common::port::types::{AxisBinding, BoardAddress};
use std::collections::HashSet;

/// One controllable amplifier axis.
#[derive(Debug, Clone)]
pub struct Actuator {
    binding: AxisBinding,
    feedback: AxisRegisters,
    stale: bool,
    current_command: u32,
    amp_enabled: bool,
}

impl Actuator {
    fn new(binding: AxisBinding) -> Self {
        Self {
            binding,
            feedback: AxisRegisters::default(),
            stale: true,
            current_command: 0,
            amp_enabled: false,
        }
    }

    /// Board/axis binding.
    #[inline]
    pub fn binding(&self) -> AxisBinding {
        self.binding
    }

    /// Last known raw feedback.
    #[inline]
    pub fn feedback(&self) -> &AxisRegisters {
        &self.feedback
    }

    /// Feedback is last-known, not current.
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Pending raw current command.
    #[inline]
    pub fn current_command(&self) -> u32 {
        self.current_command
    }

    /// Set the raw current command sent on the next write.
    pub fn set_current_command(&mut self, current: u32) {
        self.current_command = current;
    }

    /// Whether the amplifier enable is requested.
    #[inline]
    pub fn amp_enabled(&self) -> bool {
        self.amp_enabled
    }

    /// Request amplifier enable or disable.
    pub fn set_amp_enabled(&mut self, enabled: bool) {
        self.amp_enabled = enabled;
    }

    pub(crate) fn update(&mut self, feedback: Option<&AxisRegisters>, stale: bool) {
        match feedback {
            Some(registers) if !stale => {
                self.feedback = *registers;
                self.stale = false;
            }
            _ => self.stale = true,
        }
    }

    pub(crate) fn apply(&self, command: &mut BoardCommand) {
        command.set_axis(self.binding.axis, self.current_command, self.amp_enabled);
    }
}

/// Brake channel: an amplifier axis driving a brake coil.
#[derive(Debug, Clone)]
pub struct Brake {
    binding: AxisBinding,
    feedback: AxisRegisters,
    stale: bool,
    release_current: u32,
    released: bool,
}

impl Brake {
    fn new(binding: AxisBinding) -> Self {
        Self {
            binding,
            feedback: AxisRegisters::default(),
            stale: true,
            release_current: 0,
            released: false,
        }
    }

    /// Board/axis binding.
    #[inline]
    pub fn binding(&self) -> AxisBinding {
        self.binding
    }

    /// Last known raw feedback (brake coil current).
    #[inline]
    pub fn feedback(&self) -> &AxisRegisters {
        &self.feedback
    }

    /// Feedback is last-known, not current.
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether the brake is commanded released.
    #[inline]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Raw coil current applied while released.
    #[inline]
    pub fn release_current(&self) -> u32 {
        self.release_current
    }

    /// Release the brake with the given raw coil current.
    pub fn release(&mut self, current: u32) {
        self.release_current = current;
        self.released = true;
    }

    /// Engage the brake (coil off).
    pub fn engage(&mut self) {
        self.released = false;
    }

    pub(crate) fn update(&mut self, feedback: Option<&AxisRegisters>, stale: bool) {
        match feedback {
            Some(registers) if !stale => {
                self.feedback = *registers;
                self.stale = false;
            }
            _ => self.stale = true,
        }
    }

    pub(crate) fn apply(&self, command: &mut BoardCommand) {
        let current = if self.released { self.release_current } else { 0 };
        command.set_axis(self.binding.axis, current, self.released);
    }
}

/// Named robot spanning one or more boards.
#[derive(Debug, Clone)]
pub struct Robot {
    name: String,
    actuators: Vec<Actuator>,
    brakes: Vec<Brake>,
    power_requested: bool,
}

impl Robot {
    /// Create a robot from ordered actuator and brake bindings.
    ///
    /// # Errors
    /// `PortError::InvalidConfig` for an empty name, no actuators, an axis
    /// out of range or a binding used twice.
    pub fn new(
        name: impl Into<String>,
        actuators: &[AxisBinding],
        brakes: &[AxisBinding],
    ) -> Result<Self, PortError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PortError::InvalidConfig("robot has empty name".to_string()));
        }
        if actuators.is_empty() {
            return Err(PortError::InvalidConfig(format!(
                "robot '{}' has no actuators",
                name
            )));
        }

        let mut seen = HashSet::new();
        for binding in actuators.iter().chain(brakes) {
            validate_axis(&name, *binding)?;
            if !seen.insert(*binding) {
                return Err(PortError::InvalidConfig(format!(
                    "robot '{}': {} bound twice",
                    name, binding
                )));
            }
        }

        Ok(Self {
            name,
            actuators: actuators.iter().copied().map(Actuator::new).collect(),
            brakes: brakes.iter().copied().map(Brake::new).collect(),
            power_requested: false,
        })
    }

    /// Create a robot from its configuration entry.
    pub fn from_config(config: &RobotConfig) -> Result<Self, PortError> {
        Self::new(config.name.clone(), &config.actuators, &config.brakes)
    }

    /// Number of actuators.
    #[inline]
    pub fn number_of_actuators(&self) -> usize {
        self.actuators.len()
    }

    /// Number of brakes.
    #[inline]
    pub fn number_of_brakes(&self) -> usize {
        self.brakes.len()
    }

    /// Actuators in axis order.
    pub fn actuators(&self) -> &[Actuator] {
        &self.actuators
    }

    /// Brakes in brake order.
    pub fn brakes(&self) -> &[Brake] {
        &self.brakes
    }

    /// Actuator by axis number.
    pub fn actuator(&self, index: usize) -> Option<&Actuator> {
        self.actuators.get(index)
    }

    /// Mutable actuator by axis number.
    pub fn actuator_mut(&mut self, index: usize) -> Option<&mut Actuator> {
        self.actuators.get_mut(index)
    }

    /// Brake by index.
    pub fn brake(&self, index: usize) -> Option<&Brake> {
        self.brakes.get(index)
    }

    /// Mutable brake by index.
    pub fn brake_mut(&mut self, index: usize) -> Option<&mut Brake> {
        self.brakes.get_mut(index)
    }

    /// Every axis binding of the robot, actuators first.
    pub fn bindings(&self) -> impl Iterator<Item = AxisBinding> + '_ {
        self.actuators
            .iter()
            .map(Actuator::binding)
            .chain(self.brakes.iter().map(Brake::binding))
    }

    /// Distinct board addresses this robot references.
    pub fn board_addresses(&self) -> impl Iterator<Item = BoardAddress> + '_ {
        let mut seen = 0u32;
        self.bindings().filter_map(move |binding| {
            let bit = 1u32 << binding.board;
            if seen & bit == 0 {
                seen |= bit;
                Some(binding.board)
            } else {
                None
            }
        })
    }

    /// Set every actuator's raw current command, in axis order.
    ///
    /// # Errors
    /// `PortError::SizeMismatch` if `currents` does not match the number of
    /// actuators; no command is changed.
    pub fn set_current_commands(&mut self, currents: &[u32]) -> Result<(), PortError> {
        check_len(self.actuators.len(), currents.len())?;
        for (actuator, &current) in self.actuators.iter_mut().zip(currents) {
            actuator.current_command = current;
        }
        Ok(())
    }

    /// Pending raw current commands, in axis order.
    pub fn current_commands(&self) -> Vec<u32> {
        self.actuators.iter().map(Actuator::current_command).collect()
    }

    /// Measured raw motor currents, in axis order.
    pub fn current_feedback(&self) -> Vec<u32> {
        self.actuators.iter().map(|a| a.feedback.motor_current).collect()
    }

    /// Raw encoder positions, in axis order.
    pub fn encoder_positions(&self) -> Vec<i32> {
        self.actuators.iter().map(|a| a.feedback.encoder_position).collect()
    }

    /// Raw encoder velocities, in axis order.
    pub fn encoder_velocities(&self) -> Vec<i32> {
        self.actuators.iter().map(|a| a.feedback.encoder_velocity).collect()
    }

    /// Release every brake with the given raw coil currents.
    ///
    /// # Errors
    /// `PortError::SizeMismatch` if `currents` does not match the number of
    /// brakes.
    pub fn set_brake_currents(&mut self, currents: &[u32]) -> Result<(), PortError> {
        check_len(self.brakes.len(), currents.len())?;
        for (brake, &current) in self.brakes.iter_mut().zip(currents) {
            brake.release(current);
        }
        Ok(())
    }

    /// Engage every brake.
    pub fn engage_brakes(&mut self) {
        self.brakes.iter_mut().for_each(Brake::engage);
    }

    /// Enable or disable every actuator amplifier.
    pub fn set_amps_enabled(&mut self, enabled: bool) {
        for actuator in &mut self.actuators {
            actuator.amp_enabled = enabled;
        }
    }

    /// Request motor power on every board this robot uses.
    pub fn enable_power(&mut self) {
        self.power_requested = true;
    }

    /// Drop the power request, disable amplifiers, zero currents and engage
    /// brakes.
    pub fn disable_power(&mut self) {
        self.power_requested = false;
        for actuator in &mut self.actuators {
            actuator.amp_enabled = false;
            actuator.current_command = 0;
        }
        self.engage_brakes();
    }

    /// Whether motor power is requested.
    #[inline]
    pub fn power_requested(&self) -> bool {
        self.power_requested
    }

    /// Whether any actuator or brake holds stale feedback.
    pub fn is_stale(&self) -> bool {
        self.actuators.iter().any(Actuator::is_stale) || self.brakes.iter().any(Brake::is_stale)
    }

    pub(crate) fn actuators_mut(&mut self) -> &mut [Actuator] {
        &mut self.actuators
    }

    pub(crate) fn brakes_mut(&mut self) -> &mut [Brake] {
        &mut self.brakes
    }
}

impl Named for Robot {
    fn name(&self) -> &str {
        &self.name
    }
}

fn check_len(expected: usize, got: usize) -> Result<(), PortError> {
    if expected == got {
        Ok(())
    } else {
        Err(PortError::SizeMismatch { expected, got })
    }
}
