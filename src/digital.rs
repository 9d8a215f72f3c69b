//! Digital inputs and outputs on a port or a single pin.
//!
//! Inputs are wired active-low (pull-ups, switch to ground), so they read
//! through an inverted view: a pressed switch reads as 1.

use crate::consts::Port;
use crate::device::Mcp23s17;
use crate::error::{Error, Result};
use crate::register::RegisterView;
use crate::spi::Transport;

/// A read-only port or pin.
#[derive(Debug)]
pub struct DigitalInput<'a, T: Transport> {
    view: RegisterView<'a, T>,
}

impl<'a, T: Transport> DigitalInput<'a, T> {
    /// All eight pins of `port`.
    pub fn port(chip: &'a Mcp23s17<T>, port: Port) -> Self {
        Self {
            view: chip.port_register(port).inverted(),
        }
    }

    /// Pin `pin_num` (0-7) of `port`.
    pub fn pin(chip: &'a Mcp23s17<T>, port: Port, pin_num: u8) -> Result<Self> {
        Ok(Self {
            view: chip.port_register(port).inverted().bit(pin_num)?,
        })
    }

    pub fn value(&self) -> Result<u8> {
        self.view.get()
    }

    /// Always fails with [`Error::InputDevice`].
    pub fn set_value(&self, _value: u8) -> Result<()> {
        Err(Error::InputDevice)
    }
}

/// A writable port or pin.
#[derive(Debug)]
pub struct DigitalOutput<'a, T: Transport> {
    view: RegisterView<'a, T>,
}

impl<'a, T: Transport> DigitalOutput<'a, T> {
    /// All eight pins of `port`.
    pub fn port(chip: &'a Mcp23s17<T>, port: Port) -> Self {
        Self {
            view: chip.port_register(port),
        }
    }

    /// Pin `pin_num` (0-7) of `port`.
    pub fn pin(chip: &'a Mcp23s17<T>, port: Port, pin_num: u8) -> Result<Self> {
        Ok(Self {
            view: chip.port_register(port).bit(pin_num)?,
        })
    }

    pub fn value(&self) -> Result<u8> {
        self.view.get()
    }

    pub fn set_value(&self, value: u8) -> Result<()> {
        self.view.set(value)
    }

    pub fn turn_on(&self) -> Result<()> {
        self.view.all_high()
    }

    pub fn turn_off(&self) -> Result<()> {
        self.view.all_low()
    }

    pub fn toggle(&self) -> Result<()> {
        self.view.toggle()
    }
}
