use crate::listener::ListenerState;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to an MCP23S17 or running its interrupt pipeline.
///
/// Range and input errors are raised before any transport access. Transport
/// and sysfs failures are never retried beyond the bounded polling done by
/// [`GpioInterruptLine`](crate::GpioInterruptLine).
#[derive(Error, Debug)]
pub enum Error {
    /// A bit index, pin number or hardware address is outside its valid range.
    #[error("Specified {what} ({value}) out of range (0-{max})")]
    Range {
        /// What was being validated (e.g. "bit num").
        what: &'static str,
        /// The rejected value.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },
    /// The SPI device file could not be opened.
    #[error(
        "I can't see {}. Have you enabled the SPI interface (e.g. dtparam=spi=on or raspi-config)? ({source})",
        path.display()
    )]
    Init {
        /// Device file that was tried.
        path: PathBuf,
        /// Underlying open error.
        source: std::io::Error,
    },
    /// A write was attempted on an input.
    #[error("You cannot set an input's values!")]
    InputDevice,
    /// A bounded sysfs wait ran out of time.
    #[error("Waiting too long for {}", path.display())]
    Timeout {
        /// File that never became available.
        path: PathBuf,
    },
    /// Bringing the interrupt GPIO into userspace failed.
    #[error("There was an error bringing gpio{pin} into userspace. {source}")]
    InterruptEnable {
        /// Interrupt GPIO number.
        pin: u32,
        /// The timeout that caused it.
        source: Box<Error>,
    },
    /// General I/O error from a sysfs file, the ioctl or the readiness wait.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The spidev driver rejected the device settings or a transfer.
    #[cfg(feature = "raspi")]
    #[error("SPI error: {0}")]
    Spi(#[from] rppal::spi::Error),
    /// The transport was already closed.
    #[error("SPI device is not open")]
    NotOpen,
    /// The transport returned a frame of the wrong length.
    #[error("SPI transfer returned {actual} bytes (expected {expected})")]
    TransferLength {
        /// Length that was sent.
        expected: usize,
        /// Length that came back.
        actual: usize,
    },
    /// A listener operation was called in the wrong lifecycle state.
    #[error("Cannot {operation} a port event listener that is {state:?}")]
    ListenerState {
        /// The rejected operation.
        operation: &'static str,
        /// The listener's state at the time.
        state: ListenerState,
    },
}

/// Result type alias for MCP23S17 operations.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn out_of_range(what: &'static str, value: impl Into<u32>, max: u32) -> Error {
    Error::Range {
        what,
        value: value.into(),
        max,
    }
}
