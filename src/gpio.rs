//! GPIO capability boundary so the switch never binds to one hardware crate.
//!
//! The decision engine needs exactly two digital operations. Hardware
//! backends (sysfs, a vendor HAL, a remote rig controller) implement
//! [`Gpio`]; [`MemoryGpio`] ships in-crate for dry runs and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;

/// Digital pin identifier, numbered however the host's GPIO driver numbers
/// its pins.
pub type Pin = u8;

/// Two-operation digital I/O capability.
///
/// Both calls are expected to be synchronous and non-blocking; failures are
/// absorbed by the caller (reads fall back to "not asserted", writes become
/// no-ops), so backends should report errors rather than panic.
pub trait Gpio {
    /// Sample a digital input.
    fn read(&self, pin: Pin) -> Result<bool>;
    /// Drive a digital output.
    fn write(&self, pin: Pin, level: bool) -> Result<()>;
}

/// In-memory GPIO backend for dry runs and tests.
///
/// Clones share one pin state, so a test can hold a handle to flip the
/// squelch input while the engine owns another. Every `write` call is
/// recorded in order, which is how the write-suppression contract is
/// verified.
#[derive(Debug, Clone, Default)]
pub struct MemoryGpio {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    levels: HashMap<Pin, bool>,
    writes: Vec<(Pin, bool)>,
}

impl MemoryGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an input pin's level, as the external world would.
    pub fn set_input(&self, pin: Pin, level: bool) {
        let mut state = self.lock_state();
        state.levels.insert(pin, level);
    }

    /// Current level of a pin; unset pins read low.
    pub fn level(&self, pin: Pin) -> bool {
        let state = self.lock_state();
        state.levels.get(&pin).copied().unwrap_or(false)
    }

    /// Every `write` call seen so far, in call order.
    pub fn writes(&self) -> Vec<(Pin, bool)> {
        let state = self.lock_state();
        state.writes.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Gpio for MemoryGpio {
    fn read(&self, pin: Pin) -> Result<bool> {
        Ok(self.level(pin))
    }

    fn write(&self, pin: Pin, level: bool) -> Result<()> {
        let mut state = self.lock_state();
        state.levels.insert(pin, level);
        state.writes.push((pin, level));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_pin_reads_low() {
        let gpio = MemoryGpio::new();
        assert!(!gpio.read(7).expect("read"));
    }

    #[test]
    fn clones_share_pin_state() {
        let gpio = MemoryGpio::new();
        let handle = gpio.clone();

        handle.set_input(3, true);
        assert!(gpio.read(3).expect("read"));

        gpio.write(5, true).expect("write");
        assert!(handle.level(5));
    }

    #[test]
    fn writes_are_recorded_in_order() {
        let gpio = MemoryGpio::new();
        gpio.write(2, true).expect("write");
        gpio.write(2, false).expect("write");
        gpio.write(4, true).expect("write");
        assert_eq!(gpio.writes(), vec![(2, true), (2, false), (4, true)]);
    }
}
