//! Register-level bus access.
//!
//! The driver only needs four primitives from the bus: single and block
//! register reads and writes. [`RegisterPort`] captures them so the rest of the
//! crate is independent of the transport; [`I2cPort`] is the implementation
//! for `embedded-hal` I2C buses.

use embedded_hal::i2c::I2c;

/// Default 7-bit I2C address of the RX-8010.
pub const DEFAULT_ADDRESS: u8 = 0x32;

/// Largest number of data bytes sent in one I2C write frame.
const BLOCK_MAX: usize = 7;

/// Byte-oriented register access to the RTC.
pub trait RegisterPort {
    /// Transport error.
    type Error: core::fmt::Debug;

    /// Reads one register.
    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error>;

    /// Reads `buf.len()` consecutive registers starting at `reg`.
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes one register.
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error>;

    /// Writes consecutive registers starting at `reg`.
    fn write_registers(&mut self, reg: u8, values: &[u8]) -> Result<(), Self::Error>;
}

impl<T: RegisterPort + ?Sized> RegisterPort for &mut T {
    type Error = T::Error;

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        T::read_register(self, reg)
    }

    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::read_registers(self, reg, buf)
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        T::write_register(self, reg, value)
    }

    fn write_registers(&mut self, reg: u8, values: &[u8]) -> Result<(), Self::Error> {
        T::write_registers(self, reg, values)
    }
}

/// [`RegisterPort`] over an `embedded-hal` I2C bus.
///
/// Reads send the register address and then read with a repeated start;
/// writes send the address followed by the data in one frame. The RX-8010
/// auto-increments the register address on block transfers.
pub struct I2cPort<I2C: I2c> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cPort<I2C> {
    /// Creates a port for the device at `address`.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus implementation
    /// * `address` - The 7-bit I2C address (normally [`DEFAULT_ADDRESS`])
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterPort for I2cPort<I2C> {
    type Error = I2C::Error;

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        let mut data = [0];
        self.i2c.write_read(self.address, &[reg], &mut data)?;
        Ok(data[0])
    }

    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &[reg], buf)
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[reg, value])
    }

    fn write_registers(&mut self, reg: u8, values: &[u8]) -> Result<(), Self::Error> {
        // Longer blocks go out as consecutive frames at increasing addresses
        let mut start = reg;
        for chunk in values.chunks(BLOCK_MAX) {
            let mut frame = [0u8; BLOCK_MAX + 1];
            frame[0] = start;
            frame[1..=chunk.len()].copy_from_slice(chunk);
            self.i2c.write(self.address, &frame[..=chunk.len()])?;
            start = start.wrapping_add(chunk.len() as u8);
        }
        Ok(())
    }
}
