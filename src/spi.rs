//! SPI transport: one full-duplex exchange per call over `/dev/spidev<bus>.<cs>`.
//!
//! With the `raspi` feature (on by default) [`SpiDevice`] drives the kernel's
//! spidev driver through `rppal`. Without it, opening a device always fails and
//! only custom [`Transport`]s can be used.

use crate::consts;
use crate::error::{out_of_range, Error, Result};
use log::{debug, trace};
#[cfg(feature = "raspi")]
use log::warn;
#[cfg(feature = "raspi")]
use rppal::spi::{Bus, Mode, Segment, SlaveSelect, Spi};
use std::fmt;
use std::path::{Path, PathBuf};

/// A duplex byte channel to one SPI device.
///
/// Implementations are not reentrant; the `&mut self` receiver makes callers
/// serialize access to a handle.
pub trait Transport: Send {
    /// Sends `tx` and returns the bytes clocked in during the same exchange.
    /// The returned buffer has exactly `tx.len()` bytes.
    fn transfer(&mut self, tx: &[u8]) -> Result<Vec<u8>>;

    /// Releases the underlying device. Safe to call more than once.
    fn close(&mut self);
}

/// Settings used to open and clock an [`SpiDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiConfig {
    /// SPI bus, 0-6.
    pub bus: u8,
    /// Slave select line on the bus, 0-15.
    pub chip_select: u8,
    pub speed_hz: u32,
    /// Delay after the last bit before chip select is released.
    pub delay_usecs: u16,
    pub bits_per_word: u8,
    /// Deselect the device between transfers.
    pub cs_change: bool,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            bus: 0,
            chip_select: 0,
            speed_hz: consts::DEFAULT_SPI_SPEED_HZ,
            delay_usecs: 0,
            bits_per_word: consts::DEFAULT_BITS_PER_WORD,
            cs_change: false,
        }
    }
}

impl SpiConfig {
    /// Selects bus and chip select.
    pub fn with_device(mut self, bus: u8, chip_select: u8) -> Self {
        self.bus = bus;
        self.chip_select = chip_select;
        self
    }

    /// Sets the SPI clock.
    pub fn with_speed_hz(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Full path of the device file, e.g. `/dev/spidev0.0`.
    pub fn device_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}{}.{}",
            consts::SPIDEV_PREFIX,
            self.bus,
            self.chip_select
        ))
    }
}

#[cfg(feature = "raspi")]
type Handle = Spi;

/// Stands in for the spidev handle when built without `raspi`; never constructed.
#[cfg(not(feature = "raspi"))]
enum Handle {}

#[cfg(feature = "raspi")]
fn bus(number: u8) -> Result<Bus> {
    Ok(match number {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        _ => return Err(out_of_range("SPI bus", number, 6)),
    })
}

#[cfg(feature = "raspi")]
fn slave_select(number: u8) -> Result<SlaveSelect> {
    Ok(match number {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        3 => SlaveSelect::Ss3,
        4 => SlaveSelect::Ss4,
        5 => SlaveSelect::Ss5,
        6 => SlaveSelect::Ss6,
        7 => SlaveSelect::Ss7,
        8 => SlaveSelect::Ss8,
        9 => SlaveSelect::Ss9,
        10 => SlaveSelect::Ss10,
        11 => SlaveSelect::Ss11,
        12 => SlaveSelect::Ss12,
        13 => SlaveSelect::Ss13,
        14 => SlaveSelect::Ss14,
        15 => SlaveSelect::Ss15,
        _ => return Err(out_of_range("chip select", number, 15)),
    })
}

#[cfg(feature = "raspi")]
fn open_handle(config: &SpiConfig, path: &Path) -> Result<Handle> {
    let bus = bus(config.bus)?;
    let slave_select = slave_select(config.chip_select)?;
    Spi::new(bus, slave_select, config.speed_hz, Mode::Mode0).map_err(|e| match e {
        rppal::spi::Error::Io(source) => Error::Init {
            path: path.to_path_buf(),
            source,
        },
        other => Error::Spi(other),
    })
}

#[cfg(not(feature = "raspi"))]
fn open_handle(config: &SpiConfig, path: &Path) -> Result<Handle> {
    if config.bus > 6 {
        return Err(out_of_range("SPI bus", config.bus, 6));
    }
    if config.chip_select > 15 {
        return Err(out_of_range("chip select", config.chip_select, 15));
    }
    Err(Error::Init {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "built without the `raspi` feature",
        ),
    })
}

/// One `SPI_IOC_MESSAGE(1)` carrying the whole frame with the configured settings.
#[cfg(feature = "raspi")]
fn exchange(spi: &Handle, config: &SpiConfig, tx: &[u8], rx: &mut [u8]) -> Result<()> {
    let segment = Segment::with_settings(
        Some(rx),
        Some(tx),
        config.speed_hz,
        config.delay_usecs,
        config.bits_per_word,
        config.cs_change,
    );
    spi.transfer_segments(&[segment]).map_err(|e| {
        warn!("SPI transfer failed: {}", e);
        Error::from(e)
    })
}

#[cfg(not(feature = "raspi"))]
fn exchange(spi: &Handle, _config: &SpiConfig, _tx: &[u8], _rx: &mut [u8]) -> Result<()> {
    match *spi {}
}

/// An SPI device at `/dev/spidev<bus>.<chip_select>`, SPI mode 0.
pub struct SpiDevice {
    spi: Option<Handle>,
    path: PathBuf,
    config: SpiConfig,
}

impl fmt::Debug for SpiDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpiDevice")
            .field("path", &self.path)
            .field("open", &self.spi.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl SpiDevice {
    /// Opens the device named by `config`.
    pub fn open(config: &SpiConfig) -> Result<Self> {
        let path = config.device_path();
        let spi = open_handle(config, &path)?;
        debug!(
            "Opened SPI device {} at {} Hz",
            path.display(),
            config.speed_hz
        );
        Ok(Self {
            spi: Some(spi),
            path,
            config: config.clone(),
        })
    }

    /// Path of the opened device file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`close`](Transport::close) has been called.
    pub fn is_open(&self) -> bool {
        self.spi.is_some()
    }
}

impl Transport for SpiDevice {
    fn transfer(&mut self, tx: &[u8]) -> Result<Vec<u8>> {
        let spi = self.spi.as_ref().ok_or(Error::NotOpen)?;
        let mut rx = vec![0u8; tx.len()];
        trace!("SPI TX on {}: {:02X?}", self.path.display(), tx);
        exchange(spi, &self.config, tx, &mut rx)?;
        trace!("SPI RX on {}: {:02X?}", self.path.display(), rx);
        Ok(rx)
    }

    fn close(&mut self) {
        if self.spi.take().is_some() {
            debug!("Closed SPI device {}", self.path.display());
        }
    }
}
