//! MCP23S17 register access over a [`Transport`].

use crate::consts::{self, Port, Register};
use crate::error::{out_of_range, Error, Result};
use crate::interrupt::GpioInterruptLine;
use crate::register::RegisterView;
use crate::spi::{SpiConfig, SpiDevice, Transport};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::fmt;

/// Returns a bit mask with `bit_num` set.
///
/// Fails with [`Error::Range`] for `bit_num` outside 0-7.
pub fn get_bit_mask(bit_num: u8) -> Result<u8> {
    if bit_num > 7 {
        Err(out_of_range("bit num", bit_num, 7))
    } else {
        Ok(1 << bit_num)
    }
}

/// Returns the lowest set bit of `bit_pattern`, or `None` if no bit is set.
pub fn get_bit_num(bit_pattern: u8) -> Option<u8> {
    if bit_pattern == 0 {
        None
    } else {
        Some(bit_pattern.trailing_zeros() as u8)
    }
}

/// The 2-bit hardware address (pins A0/A1) of one chip on a shared chip select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareAddress(u8);

impl HardwareAddress {
    /// Creates a new address, returning an error if it is out of range (0-3).
    pub fn new(addr: u8) -> Result<Self> {
        if addr < consts::MAX_BOARDS {
            Ok(HardwareAddress(addr))
        } else {
            Err(out_of_range(
                "hardware address",
                addr,
                u32::from(consts::MAX_BOARDS - 1),
            ))
        }
    }

    /// Returns the underlying address (0-3).
    #[inline]
    pub fn number(&self) -> u8 {
        self.0
    }

    /// The SPI control byte for a read (`1`) or write (`0`) command.
    ///
    /// ```text
    /// +--------------------+
    /// |0|1|0|0|A2|A1|A0|R/W|
    /// +--------------------+
    ///  7 6 5 4 3  2  1   0
    /// ```
    #[inline]
    pub fn control_byte(&self, read_write_cmd: u8) -> u8 {
        consts::CONTROL_BYTE_BASE | ((self.0 << 1) & 0x0E) | (read_write_cmd & 1)
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hw {}", self.0)
    }
}

/// Called with every frame just before it is sent.
pub type TransferHook = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Microchip's MCP23S17: a 16-bit I/O expander with serial interface.
///
/// Every frame, and every read-modify-write as a whole, holds the transport
/// lock, so a chip can be shared (`Arc<Mcp23s17<T>>`) between application
/// code and a [`PortEventListener`](crate::PortEventListener).
pub struct Mcp23s17<T: Transport = SpiDevice> {
    hardware_addr: HardwareAddress,
    transport: Mutex<T>,
    on_transfer: Option<TransferHook>,
}

impl<T: Transport> fmt::Debug for Mcp23s17<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mcp23s17")
            .field("hardware_addr", &self.hardware_addr)
            .finish_non_exhaustive()
    }
}

impl Mcp23s17<SpiDevice> {
    /// Opens the SPI device from `config` and addresses chip `hardware_addr` on it.
    ///
    /// The address is validated before the device file is touched.
    pub fn open(hardware_addr: u8, config: &SpiConfig) -> Result<Self> {
        let hardware_addr = HardwareAddress::new(hardware_addr)?;
        let transport = SpiDevice::open(config)?;
        Ok(Self::from_parts(hardware_addr, transport))
    }
}

impl<T: Transport> Mcp23s17<T> {
    /// Wraps an already opened transport. Fails before using it if the address is invalid.
    pub fn new(hardware_addr: u8, transport: T) -> Result<Self> {
        let hardware_addr = HardwareAddress::new(hardware_addr)?;
        Ok(Self::from_parts(hardware_addr, transport))
    }

    fn from_parts(hardware_addr: HardwareAddress, transport: T) -> Self {
        debug!("Creating MCP23S17 ({})", hardware_addr);
        Self {
            hardware_addr,
            transport: Mutex::new(transport),
            on_transfer: None,
        }
    }

    /// Installs `hook`, called with every outgoing frame (e.g. to mirror
    /// traffic to a bus analyser). Replaces any previous hook.
    pub fn with_transfer_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.on_transfer = Some(Box::new(hook));
        self
    }

    /// Gets the hardware address of this chip.
    pub fn hardware_addr(&self) -> HardwareAddress {
        self.hardware_addr
    }

    /// Closes the underlying transport. Further register access fails.
    pub fn close(&self) {
        self.transport.lock().close();
    }

    // --- Register Access ---
    fn exchange(&self, transport: &mut T, frame: [u8; consts::FRAME_LEN]) -> Result<u8> {
        if let Some(hook) = &self.on_transfer {
            hook(&frame);
        }
        let rx = transport.transfer(&frame)?;
        if rx.len() != frame.len() {
            warn!(
                "SPI transfer returned unexpected length: {} (expected {})",
                rx.len(),
                frame.len()
            );
            return Err(Error::TransferLength {
                expected: frame.len(),
                actual: rx.len(),
            });
        }
        Ok(rx[2])
    }

    fn read_locked(&self, transport: &mut T, address: Register) -> Result<u8> {
        let ctrl_byte = self.hardware_addr.control_byte(consts::READ_CMD);
        let data = self.exchange(transport, [ctrl_byte, address.addr(), 0])?;
        trace!(
            "Read {:?} (0x{:02X}) on {} = 0x{:02X}",
            address,
            address.addr(),
            self.hardware_addr,
            data
        );
        Ok(data)
    }

    fn write_locked(&self, transport: &mut T, address: Register, data: u8) -> Result<()> {
        let ctrl_byte = self.hardware_addr.control_byte(consts::WRITE_CMD);
        trace!(
            "Write {:?} (0x{:02X}) on {} = 0x{:02X}",
            address,
            address.addr(),
            self.hardware_addr,
            data
        );
        self.exchange(transport, [ctrl_byte, address.addr(), data])?;
        Ok(())
    }

    /// Returns the value of the register.
    pub fn read(&self, address: Register) -> Result<u8> {
        let mut transport = self.transport.lock();
        self.read_locked(&mut transport, address)
    }

    /// Writes `data` to the register.
    pub fn write(&self, address: Register, data: u8) -> Result<()> {
        let mut transport = self.transport.lock();
        self.write_locked(&mut transport, address, data)
    }

    /// Reads the register, applies `f` and writes the result back, holding the
    /// transport lock across both frames. Returns the written value.
    pub fn modify<F>(&self, address: Register, f: F) -> Result<u8>
    where
        F: FnOnce(u8) -> u8,
    {
        let mut transport = self.transport.lock();
        let old = self.read_locked(&mut transport, address)?;
        let new = f(old);
        self.write_locked(&mut transport, address, new)?;
        Ok(new)
    }

    /// Returns bit `bit_num` of the register (0 or 1).
    pub fn read_bit(&self, bit_num: u8, address: Register) -> Result<u8> {
        let bit_mask = get_bit_mask(bit_num)?;
        let value = self.read(address)?;
        Ok(u8::from(value & bit_mask != 0))
    }

    /// Sets (`value != 0`) or clears bit `bit_num` of the register.
    pub fn write_bit(&self, value: u8, bit_num: u8, address: Register) -> Result<()> {
        let bit_mask = get_bit_mask(bit_num)?;
        self.modify(address, |old_byte| {
            if value != 0 {
                old_byte | bit_mask
            } else {
                old_byte & !bit_mask
            }
        })?;
        Ok(())
    }

    // --- Views ---
    /// A byte view of `address` with normal polarity.
    pub fn register(&self, address: Register) -> RegisterView<'_, T> {
        RegisterView::new(address, self)
    }

    /// A byte view of the port's GPIO register.
    pub fn port_register(&self, port: Port) -> RegisterView<'_, T> {
        self.register(port.gpio())
    }

    // --- Interrupts ---
    /// Clears the port's interrupt flags by reading its capture register.
    pub fn clear_interrupts(&self, port: Port) -> Result<()> {
        self.read(port.interrupt_capture())?;
        Ok(())
    }

    /// Enables interrupt-on-change for every pin of `port` and brings the
    /// interrupt line into userspace.
    pub fn enable_interrupts(&self, port: Port, line: &GpioInterruptLine) -> Result<()> {
        debug!("Enabling interrupts on port {:?} of {}", port, self.hardware_addr);
        self.write(port.interrupt_enable(), 0xFF)?;
        line.enable()
    }

    /// Releases the interrupt line and disables interrupt-on-change for `port`.
    pub fn disable_interrupts(&self, port: Port, line: &GpioInterruptLine) -> Result<()> {
        debug!("Disabling interrupts on port {:?} of {}", port, self.hardware_addr);
        line.disable()?;
        self.write(port.interrupt_enable(), 0x00)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers reads with the register value and records every frame.
    #[derive(Default)]
    struct RecordingTransport {
        registers: [u8; 0x16],
        frames: Vec<Vec<u8>>,
    }

    impl Transport for RecordingTransport {
        fn transfer(&mut self, tx: &[u8]) -> Result<Vec<u8>> {
            self.frames.push(tx.to_vec());
            let addr = usize::from(tx[1]);
            if tx[0] & 1 == 1 {
                Ok(vec![0, 0, self.registers[addr]])
            } else {
                self.registers[addr] = tx[2];
                Ok(vec![0; 3])
            }
        }

        fn close(&mut self) {}
    }

    #[test]
    fn test_bit_mask() {
        assert_eq!(get_bit_mask(0).unwrap(), 1);
        assert_eq!(get_bit_mask(3).unwrap(), 0b1000);
        assert_eq!(get_bit_mask(7).unwrap(), 0x80);
        assert!(matches!(get_bit_mask(8), Err(Error::Range { value: 8, .. })));
    }

    #[test]
    fn test_bit_num() {
        assert_eq!(get_bit_num(0), None);
        assert_eq!(get_bit_num(0b1), Some(0));
        assert_eq!(get_bit_num(0b1000), Some(3));
        assert_eq!(get_bit_num(0b0001_1000), Some(3));
        assert_eq!(get_bit_num(0x80), Some(7));
    }

    #[test]
    fn test_control_byte() {
        let addr = HardwareAddress::new(0).unwrap();
        assert_eq!(addr.control_byte(consts::WRITE_CMD), 0x40);
        assert_eq!(addr.control_byte(consts::READ_CMD), 0x41);
        let addr = HardwareAddress::new(3).unwrap();
        assert_eq!(addr.control_byte(consts::WRITE_CMD), 0x46);
        assert_eq!(addr.control_byte(consts::READ_CMD), 0x47);
    }

    #[test]
    fn test_frames_on_the_wire() {
        let chip = Mcp23s17::new(1, RecordingTransport::default()).unwrap();
        chip.write(Register::GpioA, 0xA5).unwrap();
        assert_eq!(chip.read(Register::GpioA).unwrap(), 0xA5);
        let frames = chip.transport.lock().frames.clone();
        assert_eq!(frames, vec![vec![0x42, 0x12, 0xA5], vec![0x43, 0x12, 0x00]]);
    }

    #[test]
    fn test_transfer_hook_sees_every_frame() {
        use std::sync::Arc;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let chip = Mcp23s17::new(2, RecordingTransport::default())
            .unwrap()
            .with_transfer_hook(move |frame| sink.lock().push(frame.to_vec()));

        chip.write_bit(1, 0, Register::OLatB).unwrap();
        assert_eq!(
            *seen.lock(),
            vec![vec![0x45, 0x15, 0x00], vec![0x44, 0x15, 0x01]]
        );
        assert_eq!(*seen.lock(), chip.transport.lock().frames);
    }

    #[test]
    fn test_write_bit_is_read_modify_write() {
        let chip = Mcp23s17::new(0, RecordingTransport::default()).unwrap();
        chip.write(Register::OLatA, 0b1000_0001).unwrap();
        chip.write_bit(1, 3, Register::OLatA).unwrap();
        chip.write_bit(0, 0, Register::OLatA).unwrap();
        assert_eq!(chip.read(Register::OLatA).unwrap(), 0b1000_1000);
    }

    #[test]
    fn test_invalid_bit_touches_no_transport() {
        let chip = Mcp23s17::new(0, RecordingTransport::default()).unwrap();
        assert!(chip.write_bit(1, 9, Register::GpioB).is_err());
        assert!(chip.read_bit(8, Register::GpioB).is_err());
        assert!(chip.transport.lock().frames.is_empty());
    }

    #[test]
    fn test_short_transfer_is_an_error() {
        struct Short;
        impl Transport for Short {
            fn transfer(&mut self, _tx: &[u8]) -> Result<Vec<u8>> {
                Ok(vec![0])
            }
            fn close(&mut self) {}
        }
        let chip = Mcp23s17::new(0, Short).unwrap();
        assert!(matches!(
            chip.read(Register::GpioA),
            Err(Error::TransferLength {
                expected: 3,
                actual: 1
            })
        ));
    }
}
