//! Byte, nibble and bit views over a chip register, with optional polarity inversion.

use crate::consts::Register;
use crate::device::{get_bit_mask, Mcp23s17};
use crate::error::Result;
use crate::spi::Transport;
use log::trace;
use std::fmt;

/// Which half of a register a nibble view covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nibble {
    /// Bits 0-3
    Lower,
    /// Bits 4-7
    Upper,
}

impl Nibble {
    #[inline]
    fn shift(self) -> u8 {
        match self {
            Nibble::Lower => 0,
            Nibble::Upper => 4,
        }
    }
}

/// How much of the register a view covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Byte,
    Nibble(Nibble),
    /// A single bit, index 0-7.
    Bit(u8),
}

/// Whether stored bits are presented as-is or negated.
///
/// Inverted views present active-low inputs as active-high values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Polarity {
    #[default]
    Normal,
    Inverted,
}

/// A view on (part of) one register of an MCP23S17.
///
/// The view borrows the chip for each access and owns nothing itself.
/// Nibble writes are read-modify-write under the chip's transport lock.
pub struct RegisterView<'a, T: Transport> {
    address: Register,
    chip: &'a Mcp23s17<T>,
    granularity: Granularity,
    polarity: Polarity,
}

impl<T: Transport> fmt::Debug for RegisterView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterView")
            .field("address", &self.address)
            .field("chip", &self.chip.hardware_addr())
            .field("granularity", &self.granularity)
            .field("polarity", &self.polarity)
            .finish()
    }
}

// Derived Clone/Copy would require `T: Clone`.
impl<T: Transport> Clone for RegisterView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Transport> Copy for RegisterView<'_, T> {}

impl<'a, T: Transport> RegisterView<'a, T> {
    /// A whole-byte view with normal polarity.
    pub fn new(address: Register, chip: &'a Mcp23s17<T>) -> Self {
        Self {
            address,
            chip,
            granularity: Granularity::Byte,
            polarity: Polarity::Normal,
        }
    }

    pub fn address(&self) -> Register {
        self.address
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// The same view with inverted polarity.
    pub fn inverted(self) -> Self {
        self.with_polarity(Polarity::Inverted)
    }

    /// The same view with normal polarity.
    pub fn normal(self) -> Self {
        self.with_polarity(Polarity::Normal)
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Bits 0-3 of the register, keeping this view's polarity.
    pub fn lower_nibble(self) -> Self {
        self.nibble(Nibble::Lower)
    }

    /// Bits 4-7 of the register, keeping this view's polarity.
    pub fn upper_nibble(self) -> Self {
        self.nibble(Nibble::Upper)
    }

    pub fn nibble(mut self, nibble: Nibble) -> Self {
        self.granularity = Granularity::Nibble(nibble);
        self
    }

    /// Bit `bit_num` of the register, keeping this view's polarity.
    pub fn bit(mut self, bit_num: u8) -> Result<Self> {
        get_bit_mask(bit_num)?;
        self.granularity = Granularity::Bit(bit_num);
        Ok(self)
    }

    /// Single-bit views for every bit this view covers, lowest first.
    pub fn bits(self) -> impl Iterator<Item = RegisterView<'a, T>> {
        let range = match self.granularity {
            Granularity::Byte => 0..8,
            Granularity::Nibble(nibble) => nibble.shift()..nibble.shift() + 4,
            Granularity::Bit(n) => n..n + 1,
        };
        range.map(move |n| RegisterView {
            granularity: Granularity::Bit(n),
            ..self
        })
    }

    /// 0xFF, 0x0F or 0x01 depending on granularity.
    pub fn full_mask(&self) -> u8 {
        match self.granularity {
            Granularity::Byte => 0xFF,
            Granularity::Nibble(_) => 0x0F,
            Granularity::Bit(_) => 0x01,
        }
    }

    /// XOR mask applied to values on the way in and out.
    #[inline]
    fn polarity_mask(&self) -> u8 {
        match self.polarity {
            Polarity::Normal => 0,
            Polarity::Inverted => self.full_mask(),
        }
    }

    /// Current value, right-aligned to the view's width.
    pub fn get(&self) -> Result<u8> {
        let raw = match self.granularity {
            Granularity::Byte => self.chip.read(self.address)?,
            Granularity::Nibble(nibble) => {
                (self.chip.read(self.address)? >> nibble.shift()) & 0x0F
            }
            Granularity::Bit(n) => self.chip.read_bit(n, self.address)?,
        };
        Ok(raw ^ self.polarity_mask())
    }

    /// Stores `value`. Bits beyond the view's width are ignored; a bit view
    /// treats any non-zero value as 1.
    pub fn set(&self, value: u8) -> Result<()> {
        let inv = self.polarity_mask();
        trace!(
            "Set {:?} {:?} ({:?}) to 0x{:02X}",
            self.address,
            self.granularity,
            self.polarity,
            value
        );
        match self.granularity {
            Granularity::Byte => self.chip.write(self.address, value ^ inv),
            Granularity::Nibble(nibble) => {
                let shift = nibble.shift();
                let stored = ((value ^ inv) & 0x0F) << shift;
                self.chip
                    .modify(self.address, |old| (old & !(0x0F << shift)) | stored)?;
                Ok(())
            }
            Granularity::Bit(n) => {
                let bit = u8::from(value != 0) ^ inv;
                self.chip.write_bit(bit, n, self.address)
            }
        }
    }

    /// Flips every bit the view covers.
    pub fn toggle(&self) -> Result<()> {
        let current = self.get()?;
        self.set(current ^ self.full_mask())
    }

    pub fn all_high(&self) -> Result<()> {
        self.set(self.full_mask())
    }

    pub fn all_low(&self) -> Result<()> {
        self.set(0)
    }

    /// Alias of [`all_high`](Self::all_high), reads better on bit views.
    pub fn set_high(&self) -> Result<()> {
        self.all_high()
    }

    /// Alias of [`all_low`](Self::all_low).
    pub fn set_low(&self) -> Result<()> {
        self.all_low()
    }

    /// Bit mask of the view inside its register (bit views only).
    pub fn bit_mask(&self) -> Option<u8> {
        match self.granularity {
            Granularity::Bit(n) => get_bit_mask(n).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct Registers([u8; 0x16]);

    impl Transport for Registers {
        fn transfer(&mut self, tx: &[u8]) -> Result<Vec<u8>> {
            let addr = usize::from(tx[1]);
            if tx[0] & 1 == 1 {
                Ok(vec![0, 0, self.0[addr]])
            } else {
                self.0[addr] = tx[2];
                Ok(vec![0; 3])
            }
        }

        fn close(&mut self) {}
    }

    fn chip() -> Mcp23s17<Registers> {
        Mcp23s17::new(0, Registers::default()).unwrap()
    }

    #[test]
    fn test_inverted_byte_is_negated_on_the_wire() {
        let chip = chip();
        let view = chip.register(Register::GpioB).inverted();
        view.set(0b0000_1111).unwrap();
        assert_eq!(chip.read(Register::GpioB).unwrap(), 0b1111_0000);
        assert_eq!(view.get().unwrap(), 0b0000_1111);
    }

    #[test]
    fn test_nibbles_keep_the_other_half() {
        let chip = chip();
        chip.write(Register::OLatA, 0xA5).unwrap();
        let reg = chip.register(Register::OLatA);

        assert_eq!(reg.lower_nibble().get().unwrap(), 0x5);
        assert_eq!(reg.upper_nibble().get().unwrap(), 0xA);

        reg.upper_nibble().set(0x3).unwrap();
        assert_eq!(chip.read(Register::OLatA).unwrap(), 0x35);
        reg.lower_nibble().set(0xFC).unwrap(); // only the low 4 bits count
        assert_eq!(chip.read(Register::OLatA).unwrap(), 0x3C);
    }

    #[test]
    fn test_inverted_nibble() {
        let chip = chip();
        chip.write(Register::GpioA, 0x00).unwrap();
        let upper = chip.register(Register::GpioA).inverted().upper_nibble();
        assert_eq!(upper.get().unwrap(), 0xF);

        upper.set(0x1).unwrap();
        assert_eq!(chip.read(Register::GpioA).unwrap(), 0xE0);
        assert_eq!(upper.get().unwrap(), 0x1);
    }

    #[test]
    fn test_bit_views() {
        let chip = chip();
        let bit = chip.register(Register::GpioA).bit(6).unwrap();
        bit.set_high().unwrap();
        assert_eq!(chip.read(Register::GpioA).unwrap(), 0x40);
        assert_eq!(bit.inverted().get().unwrap(), 0);

        bit.inverted().set(1).unwrap();
        assert_eq!(chip.read(Register::GpioA).unwrap(), 0x00);
        assert!(matches!(
            chip.register(Register::GpioA).bit(8),
            Err(Error::Range {
                what: "bit num",
                value: 8,
                max: 7
            })
        ));
    }

    #[test]
    fn test_toggle() {
        let chip = chip();
        chip.write(Register::OLatB, 0b1010_0000).unwrap();
        let reg = chip.register(Register::OLatB);
        reg.toggle().unwrap();
        assert_eq!(chip.read(Register::OLatB).unwrap(), 0b0101_1111);
        reg.lower_nibble().toggle().unwrap();
        assert_eq!(chip.read(Register::OLatB).unwrap(), 0b0101_0000);
        reg.bit(7).unwrap().toggle().unwrap();
        assert_eq!(chip.read(Register::OLatB).unwrap(), 0b1101_0000);
    }

    #[test]
    fn test_bits_of_a_nibble() {
        let chip = chip();
        let bits: Vec<_> = chip
            .register(Register::GpioA)
            .inverted()
            .upper_nibble()
            .bits()
            .collect();
        assert_eq!(bits.len(), 4);
        assert_eq!(bits[0].granularity(), Granularity::Bit(4));
        assert_eq!(bits[3].bit_mask(), Some(0x80));
        assert!(bits.iter().all(|b| b.polarity() == Polarity::Inverted));
    }
}
