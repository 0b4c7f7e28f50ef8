//! Named digital inputs and outputs bound to board bits.

use crate::registry::Named;
use rio_common::port::config::{DigitalInputConfig, DigitalOutputConfig};
use rio_common::port::registers::{BoardCommand, BoardSnapshot};
use rio_common::port::types::BitBinding;

/// Debounced digital input.
///
/// The reported value flips only after `debounce` consecutive samples at
/// the new level. A sample equal to the reported value resets the count.
/// A threshold of 0 or 1 follows the raw sample. The first fresh sample
/// initializes the value without reporting an edge.
#[derive(Debug, Clone)]
pub struct DigitalInput {
    name: String,
    binding: BitBinding,
    inverted: bool,
    debounce: u32,
    value: bool,
    raw: bool,
    pending: u32,
    primed: bool,
    rising: bool,
    falling: bool,
    stale: bool,
}

impl DigitalInput {
    /// Create an input. `debounce` is the number of agreeing samples.
    pub fn new(name: impl Into<String>, binding: BitBinding, inverted: bool, debounce: u32) -> Self {
        Self {
            name: name.into(),
            binding,
            inverted,
            debounce,
            value: false,
            raw: false,
            pending: 0,
            primed: false,
            rising: false,
            falling: false,
            stale: true,
        }
    }

    /// Create an input from its configuration entry.
    pub fn from_config(config: &DigitalInputConfig) -> Self {
        Self::new(
            config.name.clone(),
            config.binding(),
            config.inverted,
            config.debounce,
        )
    }

    /// Board/bit binding.
    #[inline]
    pub fn binding(&self) -> BitBinding {
        self.binding
    }

    /// Whether polarity is inverted.
    #[inline]
    pub fn inverted(&self) -> bool {
        self.inverted
    }

    /// Debounce threshold in samples.
    #[inline]
    pub fn debounce(&self) -> u32 {
        self.debounce
    }

    /// Debounced logical value.
    #[inline]
    pub fn value(&self) -> bool {
        self.value
    }

    /// Latest logical sample before debouncing.
    #[inline]
    pub fn raw_value(&self) -> bool {
        self.raw
    }

    /// Debounced value went low → high during the last read.
    #[inline]
    pub fn rising_edge(&self) -> bool {
        self.rising
    }

    /// Debounced value went high → low during the last read.
    #[inline]
    pub fn falling_edge(&self) -> bool {
        self.falling
    }

    /// Value is last-known, not current.
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Feed one physical sample.
    pub fn sample(&mut self, physical: bool) {
        self.stale = false;
        self.rising = false;
        self.falling = false;

        let logical = physical ^ self.inverted;
        self.raw = logical;

        if !self.primed {
            self.primed = true;
            self.value = logical;
            self.pending = 0;
            return;
        }

        if logical == self.value {
            self.pending = 0;
            return;
        }

        self.pending += 1;
        if self.pending >= self.debounce.max(1) {
            self.value = logical;
            self.pending = 0;
            self.rising = logical;
            self.falling = !logical;
        }
    }

    /// Mark the value stale without consuming a sample.
    pub fn mark_stale(&mut self) {
        self.stale = true;
        self.rising = false;
        self.falling = false;
    }

    pub(crate) fn update(&mut self, snapshot: &BoardSnapshot, stale: bool) {
        if stale {
            self.mark_stale();
        } else {
            self.sample(snapshot.digital_input(self.binding.bit));
        }
    }
}

impl Named for DigitalInput {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Digital output.
#[derive(Debug, Clone)]
pub struct DigitalOutput {
    name: String,
    binding: BitBinding,
    inverted: bool,
    value: bool,
    stale: bool,
}

impl DigitalOutput {
    /// Create an output with an initial logical value.
    pub fn new(name: impl Into<String>, binding: BitBinding, inverted: bool, initial: bool) -> Self {
        Self {
            name: name.into(),
            binding,
            inverted,
            value: initial,
            stale: true,
        }
    }

    /// Create an output from its configuration entry.
    pub fn from_config(config: &DigitalOutputConfig) -> Self {
        Self::new(
            config.name.clone(),
            config.binding(),
            config.inverted,
            config.initial_value,
        )
    }

    /// Board/bit binding.
    #[inline]
    pub fn binding(&self) -> BitBinding {
        self.binding
    }

    /// Whether polarity is inverted.
    #[inline]
    pub fn inverted(&self) -> bool {
        self.inverted
    }

    /// Logical value written on the next cycle.
    #[inline]
    pub fn value(&self) -> bool {
        self.value
    }

    /// Set the logical value.
    pub fn set_value(&mut self, value: bool) {
        self.value = value;
    }

    /// Level driven on the wire.
    #[inline]
    pub fn physical_level(&self) -> bool {
        self.value ^ self.inverted
    }

    /// Owning board is stale or faulted.
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub(crate) fn set_stale(&mut self, stale: bool) {
        self.stale = stale;
    }

    pub(crate) fn apply(&self, command: &mut BoardCommand) {
        command.set_digital_output(self.binding.bit, self.physical_level());
    }
}

impl Named for DigitalOutput {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(debounce: u32) -> DigitalInput {
        let mut di = DigitalInput::new("di", BitBinding::new(0, 2), false, debounce);
        di.sample(false);
        di
    }

    #[test]
    fn debounce_flips_after_threshold() {
        let mut di = input(3);
        di.sample(true);
        di.sample(true);
        assert!(!di.value());
        di.sample(true);
        assert!(di.value());
        assert!(di.rising_edge());

        di.sample(true);
        assert!(!di.rising_edge());
    }

    #[test]
    fn debounce_interrupted_sequence_is_ignored() {
        let mut di = input(3);
        di.sample(true);
        di.sample(true);
        di.sample(false);
        assert!(!di.value());
        di.sample(true);
        assert!(!di.value());
        assert!(di.raw_value());
    }

    #[test]
    fn zero_threshold_follows_raw() {
        let mut di = input(0);
        di.sample(true);
        assert!(di.value());
        di.sample(false);
        assert!(!di.value());
        assert!(di.falling_edge());
    }

    #[test]
    fn polarity_inversion() {
        let mut di = DigitalInput::new("pedal", BitBinding::new(0, 0), true, 1);
        di.sample(false);
        assert!(di.value());
        assert!(!di.rising_edge(), "priming sample reports no edge");

        let mut dout = DigitalOutput::new("lamp", BitBinding::new(0, 4), true, false);
        assert!(dout.physical_level());
        dout.set_value(true);
        assert!(!dout.physical_level());

        let mut cmd = BoardCommand::default();
        cmd.digital_outputs = 0xFFFF_FFFF;
        dout.apply(&mut cmd);
        assert_eq!(cmd.digital_outputs, !0x10);
    }

    #[test]
    fn stale_update_holds_value() {
        let mut di = input(1);
        let mut snap = BoardSnapshot::default();
        snap.digital_inputs = 0b100;
        di.update(&snap, false);
        assert!(di.value());
        assert!(!di.is_stale());

        di.update(&BoardSnapshot::default(), true);
        assert!(di.value());
        assert!(di.is_stale());
    }
}
