//! Device control commands.
//!
//! Numeric command codes follow the Linux RTC ioctl numbering so that code
//! ported from a character-device interface can pass them through unchanged.

use crate::{RegisterPort, RtcDevice, Rx8010Error};

/// Reads the voltage-low (oscillation stop) indicator.
pub const RTC_VL_READ: u32 = 0x8004_7013;
/// Clears the voltage-low indicator.
pub const RTC_VL_CLR: u32 = 0x0000_7014;

/// Commands understood by [`RtcDevice::ioctl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Returns 1 if VLF is set, 0 otherwise
    VoltageLowRead,
    /// Clears VLF
    VoltageLowClear,
}

impl TryFrom<u32> for Command {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            RTC_VL_READ => Ok(Command::VoltageLowRead),
            RTC_VL_CLR => Ok(Command::VoltageLowClear),
            _ => Err(code),
        }
    }
}

impl From<Command> for u32 {
    fn from(command: Command) -> Self {
        match command {
            Command::VoltageLowRead => RTC_VL_READ,
            Command::VoltageLowClear => RTC_VL_CLR,
        }
    }
}

impl<P: RegisterPort> RtcDevice<P> {
    /// Executes a command given by its numeric code.
    ///
    /// Unknown codes are rejected with [`Rx8010Error::UnsupportedCommand`]
    /// before any bus traffic.
    pub fn ioctl(&mut self, code: u32) -> Result<u32, Rx8010Error<P::Error>> {
        let command = Command::try_from(code)
            .map_err(Rx8010Error::UnsupportedCommand)?;
        self.command(command)
    }

    /// Executes a command.
    pub fn command(&mut self, command: Command) -> Result<u32, Rx8010Error<P::Error>> {
        let mut flag = self.flag()?;
        match command {
            Command::VoltageLowRead => Ok(u32::from(flag.voltage_low())),
            Command::VoltageLowClear => {
                flag.set_voltage_low(false);
                self.set_flag(flag)?;
                Ok(0)
            }
        }
    }
}
