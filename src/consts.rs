//! Register addresses, configuration bits and default settings.

use std::time::Duration;

/// Maximum number of MCP23S17 chips sharing one chip select (hardware address 0-3).
pub const MAX_BOARDS: u8 = 4;

pub(crate) const WRITE_CMD: u8 = 0;
pub(crate) const READ_CMD: u8 = 1;

/// Fixed upper nibble of every SPI control byte.
pub(crate) const CONTROL_BYTE_BASE: u8 = 0x40;

/// Length of one register transaction on the wire.
pub(crate) const FRAME_LEN: usize = 3;

// --- SPI ---
/// Device file prefix, completed with `<bus>.<chip_select>`.
pub const SPIDEV_PREFIX: &str = "/dev/spidev";
/// Default SPI clock.
pub const DEFAULT_SPI_SPEED_HZ: u32 = 100_000;
pub(crate) const DEFAULT_BITS_PER_WORD: u8 = 8;

// --- Interrupt line ---
/// GPIO of the host that the expander's INT output is wired to.
pub const GPIO_INTERRUPT_PIN: u32 = 25;
/// Root of the sysfs GPIO interface.
pub const GPIO_SYSFS_ROOT: &str = "/sys/class/gpio";
/// Max time to wait for sysfs files when enabling the interrupt line.
pub const FILE_IO_TIMEOUT: Duration = Duration::from_secs(1);
pub(crate) const FILE_IO_POLL_INTERVAL: Duration = Duration::from_millis(1);

// --- Interrupt listener ---
/// Settle time used by [`PortEventListener::register`](crate::PortEventListener::register).
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_millis(20);

/// An 8-bit register inside an MCP23S17 (IOCON.BANK = 0 addressing).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// I/O direction A
    IoDirA = 0x00,
    /// I/O direction B
    IoDirB = 0x01,
    /// Input polarity A
    IPolA = 0x02,
    /// Input polarity B
    IPolB = 0x03,
    /// Interrupt-on-change enable A
    GpIntEnA = 0x04,
    /// Interrupt-on-change enable B
    GpIntEnB = 0x05,
    /// Default compare value A (interrupts)
    DefValA = 0x06,
    /// Default compare value B (interrupts)
    DefValB = 0x07,
    /// Interrupt control A
    IntConA = 0x08,
    /// Interrupt control B
    IntConB = 0x09,
    /// I/O config (also mirrored at 0x0B)
    IoCon = 0x0A,
    /// Pull-ups A
    GpPuA = 0x0C,
    /// Pull-ups B
    GpPuB = 0x0D,
    /// Interrupt flag A (where the interrupt came from)
    IntFA = 0x0E,
    /// Interrupt flag B
    IntFB = 0x0F,
    /// Interrupt capture A (port value at interrupt time)
    IntCapA = 0x10,
    /// Interrupt capture B
    IntCapB = 0x11,
    /// Port A
    GpioA = 0x12,
    /// Port B
    GpioB = 0x13,
    /// Output latch A
    OLatA = 0x14,
    /// Output latch B
    OLatB = 0x15,
}

impl Register {
    /// The register address as sent in the second byte of a frame.
    #[inline]
    pub fn addr(self) -> u8 {
        self as u8
    }
}

/// One of the two 8-bit ports of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    A,
    B,
}

impl Port {
    /// Port value register (GPIOx).
    pub fn gpio(self) -> Register {
        match self {
            Port::A => Register::GpioA,
            Port::B => Register::GpioB,
        }
    }

    /// Interrupt-on-change enable register (GPINTENx).
    pub fn interrupt_enable(self) -> Register {
        match self {
            Port::A => Register::GpIntEnA,
            Port::B => Register::GpIntEnB,
        }
    }

    /// Interrupt flag register (INTFx).
    pub fn interrupt_flag(self) -> Register {
        match self {
            Port::A => Register::IntFA,
            Port::B => Register::IntFB,
        }
    }

    /// Interrupt capture register (INTCAPx).
    pub fn interrupt_capture(self) -> Register {
        match self {
            Port::A => Register::IntCapA,
            Port::B => Register::IntCapB,
        }
    }
}

/// IOCON configuration bits.
pub mod iocon {
    /// Addressing mode
    pub const BANK_OFF: u8 = 0x00;
    pub const BANK_ON: u8 = 0x80;
    /// Interrupt mirror (INTA | INTB)
    pub const INT_MIRROR_ON: u8 = 0x40;
    pub const INT_MIRROR_OFF: u8 = 0x00;
    /// Incrementing address pointer
    pub const SEQOP_OFF: u8 = 0x20;
    pub const SEQOP_ON: u8 = 0x00;
    /// Slew rate
    pub const DISSLW_ON: u8 = 0x10;
    pub const DISSLW_OFF: u8 = 0x00;
    /// Hardware addressing
    pub const HAEN_ON: u8 = 0x08;
    pub const HAEN_OFF: u8 = 0x00;
    /// Open drain for interrupts
    pub const ODR_ON: u8 = 0x04;
    pub const ODR_OFF: u8 = 0x00;
    /// Interrupt polarity
    pub const INTPOL_HIGH: u8 = 0x02;
    pub const INTPOL_LOW: u8 = 0x00;
}
