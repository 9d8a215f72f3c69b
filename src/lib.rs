//! # mcp23s17-spi
//!
//! A Rust crate for driving Microchip MCP23S17 16-bit I/O expanders over
//! Linux `spidev`, and for turning their shared interrupt line into
//! debounced, per-pin callbacks.
//!
//! Up to four chips can share one chip select; each is selected by its
//! 2-bit hardware address (pins A0/A1, with IOCON.HAEN set).
//!
//! ## Features
//!
//! *   Register access (`read`, `write`, `read_bit`, `write_bit`, `modify`) through a
//!     [`Transport`], with [`SpiDevice`] as the real one.
//! *   Register views ([`RegisterView`]):
//!     *   Whole byte, upper/lower nibble or single bit.
//!     *   Normal or inverted polarity (active-low inputs read as 1 when pressed).
//!     *   `get`, `set`, `toggle`, `all_high`, `all_low`.
//! *   [`DigitalInput`] / [`DigitalOutput`] wrappers for ports and pins.
//! *   Interrupt line management over sysfs GPIO ([`GpioInterruptLine`]).
//! *   [`PortEventListener`]:
//!     *   Register callbacks per pin and direction (falling, rising or either).
//!     *   Per-pin debounce with a configurable settle time (default 20 ms).
//!     *   Detector and dispatcher run on their own threads.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! mcp23s17-spi = "0.1.0"
//! log = "0.4"          # Optional, for logging
//!
//! [dev-dependencies]   # For demos/tests
//! env_logger = "0.11"
//! ```
//!
//! ## Basic Usage
//!
//! ```no_run
//! use mcp23s17_spi::{iocon, DigitalOutput, Mcp23s17, Port, Register, Result, SpiConfig};
//! use std::{thread, time::Duration};
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     let chip = Mcp23s17::open(0, &SpiConfig::default())?;
//!     chip.write(
//!         Register::IoCon,
//!         iocon::BANK_OFF
//!             | iocon::INT_MIRROR_OFF
//!             | iocon::SEQOP_OFF
//!             | iocon::DISSLW_OFF
//!             | iocon::HAEN_ON
//!             | iocon::ODR_OFF
//!             | iocon::INTPOL_LOW,
//!     )?;
//!     chip.write(Register::IoDirA, 0x00)?; // port A: outputs
//!
//!     let led = DigitalOutput::pin(&chip, Port::A, 0)?;
//!     led.turn_on()?;
//!     thread::sleep(Duration::from_millis(200));
//!     led.turn_off()?;
//!
//!     // Byte, nibble and bit views
//!     let port_a = chip.register(Register::OLatA);
//!     port_a.upper_nibble().set(0b1010)?;
//!     port_a.bit(1)?.toggle()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Interrupts
//!
//! Enable interrupt-on-change on the port, bring the interrupt GPIO into
//! userspace, then register callbacks and activate a [`PortEventListener`].
//! See `demos/interrupt_listener.rs`.
//!
//! ## Hardware Setup Notes
//!
//! *   **SPI:** Must be enabled (e.g. `dtparam=spi=on` on a Raspberry Pi). The
//!     default device is `/dev/spidev0.0` at 100 kHz.
//! *   **Interrupt line:** The chip's INT output is expected on host GPIO 25
//!     and is active low, so the line is set to trigger on falling edges.
//! *   **Permissions:** The user needs access to `/dev/spidev*` and `/sys/class/gpio`.
//!
//! ## License
//!
//! GPL-3.0-or-later.

mod consts;
mod device;
mod digital;
mod error;
mod interrupt;
mod listener;
mod register;
mod spi;
mod waiter;

pub use consts::{
    iocon, Port, Register, DEFAULT_SETTLE_TIME, DEFAULT_SPI_SPEED_HZ, FILE_IO_TIMEOUT,
    GPIO_INTERRUPT_PIN, GPIO_SYSFS_ROOT, MAX_BOARDS, SPIDEV_PREFIX,
};
pub use device::{get_bit_mask, get_bit_num, HardwareAddress, Mcp23s17, TransferHook};
pub use digital::{DigitalInput, DigitalOutput};
pub use error::{Error, Result};
pub use interrupt::{Edge, GpioInterruptLine, InterruptLineConfig};
pub use listener::{
    Callback, DirectionFilter, EventDirection, EventQueue, InterruptEvent, ListenerConfig,
    ListenerState, PinRegistration, PortEventListener, QueueMessage,
};
pub use register::{Granularity, Nibble, Polarity, RegisterView};
pub use spi::{SpiConfig, SpiDevice, Transport};
