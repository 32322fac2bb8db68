//! A platform-agnostic driver for the Epson RX-8010 SJ real-time clock.
//!
//! The driver keeps the date and time, a single day-of-month alarm and the
//! three interrupt sources of the chip (alarm, fixed-cycle timer and time
//! update), and reports oscillation stops through the VLF flag.
//!
//! # Layers
//!
//! - [`RegisterPort`] is the byte-level bus access; [`I2cPort`] implements it
//!   for `embedded-hal` I2C buses.
//! - [`RtcDevice`] is the driver proper. It owns the port and the cached
//!   Control register and has no interior locking: every method takes
//!   `&mut self`.
//! - With the `std` feature (on by default), [`Rx8010`] wraps a device in a
//!   mutex and runs the interrupt pipeline on a worker thread. The interrupt
//!   callback only masks the line and queues work, see [`InterruptHandle`].
//!
//! # Example
//!
//! ```rust,ignore
//! use rx8010::{Config, I2cPort, RtcDevice, DEFAULT_ADDRESS};
//!
//! let port = I2cPort::new(i2c, DEFAULT_ADDRESS);
//! let (mut rtc, was_reset) = RtcDevice::start(port, Config::default())?;
//! let now = rtc.time()?;
//! ```
//!
//! # Features
//!
//! - `std`: threaded interrupt worker ([`Rx8010`])
//! - `log` / `defmt`: driver logging through the respective crate

#![no_std]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

pub mod alarm;
pub mod command;
pub mod datetime;
pub mod pipeline;
pub mod port;
pub mod registers;

#[cfg(test)]
mod testing;

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        pub mod worker;
        pub use worker::{InterruptHandle, Rx8010};
    }
}

pub use alarm::{AlarmSpec, AlarmState};
pub use command::{Command, RTC_VL_CLR, RTC_VL_READ};
pub use datetime::{decode, encode, CalendarTime, InvalidTimeValue};
pub use pipeline::{InterruptLine, PipelineState, RtcEvent};
pub use port::{I2cPort, RegisterPort, DEFAULT_ADDRESS};
pub use registers::*;

use datetime::RawDateTime;

/// Driver configuration applied by [`RtcDevice::initialize`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Whether the INT pin is wired to an interrupt line. Without one the
    /// alarm API reports [`Rx8010Error::AlarmUnsupported`].
    pub interrupt_line: bool,
    /// FOUT pin frequency
    pub clock_output: ClockOutput,
    /// Source clock of the fixed-cycle timer
    pub timer_clock: TimerClock,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interrupt_line: true,
            clock_output: ClockOutput::Off,
            timer_clock: TimerClock::Hz1,
        }
    }
}

/// Settings of the fixed-cycle timer, see [`RtcDevice::set_periodic_timer`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriodicTimer {
    /// Clock decrementing the counter
    pub clock: TimerClock,
    /// Counter preset, the timer fires every `count` clock periods
    pub count: u16,
}

/// Errors reported by the driver.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rx8010Error<E> {
    /// The bus transfer failed
    Transport(E),
    /// The calendar fields read or supplied are not a valid date/time
    InvalidTimeValue,
    /// The alarm API was used on a device without an interrupt line
    AlarmUnsupported,
    /// [`RtcDevice::ioctl`] got a command code it does not know
    UnsupportedCommand(u32),
}

impl<E> From<E> for Rx8010Error<E> {
    fn from(e: E) -> Self {
        Rx8010Error::Transport(e)
    }
}

/// RX-8010 real-time clock driver.
///
/// Owns the register port, a copy of the last Control value written to the
/// chip and the one-way shutdown flag used by the interrupt pipeline.
pub struct RtcDevice<P: RegisterPort> {
    port: P,
    config: Config,
    control: Control,
    shutdown: bool,
    // VLF seen by `initialize`, not yet reported as an event
    clock_unreliable: bool,
}

// Register access implementations
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<P: RegisterPort> RtcDevice<P> {
            $(
                paste::paste! {
                    #[doc = concat!("Reads the ", stringify!($name), " register.")]
                    pub fn $name(&mut self) -> Result<$typ, Rx8010Error<P::Error>> {
                        Ok(<$typ>::from(self.port.read_register($regaddr.into())?))
                    }

                    #[doc = concat!("Writes the ", stringify!($name), " register.")]
                    pub fn [<set_ $name>](
                        &mut self,
                        value: $typ,
                    ) -> Result<(), Rx8010Error<P::Error>> {
                        self.port.write_register($regaddr.into(), value.into())?;
                        Ok(())
                    }
                }
            )+
        }
    }
}

impl_register_access!(
    (extension, RegAddr::Extension, Extension),
    (flag, RegAddr::Flag, Flag)
);

impl<P: RegisterPort> RtcDevice<P> {
    /// Creates a driver instance. No bus traffic happens until the first call.
    ///
    /// The Control cache starts cleared; call [`RtcDevice::initialize`] to load
    /// it from the chip.
    pub fn new(port: P, config: Config) -> Self {
        Self {
            port,
            config,
            control: Control::default(),
            shutdown: false,
            clock_unreliable: false,
        }
    }

    /// Creates the driver, initialises the chip and resets the calendar to
    /// [`CalendarTime::EPOCH`] when the oscillator stopped.
    ///
    /// # Returns
    /// * `Ok((device, true))` when the clock had to be reset
    /// * `Ok((device, false))` when the stored time is trustworthy
    /// * `Err(Rx8010Error)` on error
    pub fn start(port: P, config: Config) -> Result<(Self, bool), Rx8010Error<P::Error>> {
        let mut device = Self::new(port, config);
        let needs_reset = device.initialize()?;
        if needs_reset {
            info!("rx8010: bad conditions detected, resetting date");
            device.set_time(&CalendarTime::EPOCH)?;
        }
        Ok((device, needs_reset))
    }

    /// Gives the register port back.
    pub fn release(self) -> P {
        self.port
    }

    /// The configuration the device was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Last Control value written to the chip.
    pub fn cached_control(&self) -> Control {
        self.control
    }

    /// Brings the chip into a known state.
    ///
    /// Programs the reserved registers, disables the fixed-cycle timer and
    /// applies the configured clock output, then inspects the Flag register.
    /// Pending event flags are cleared together with the Control register.
    /// A stopped oscillator is also remembered until it is reported, see
    /// [`RtcDevice::take_clock_unreliable`].
    ///
    /// # Returns
    /// * `Ok(true)` if the oscillator stopped and the calendar must be reset
    /// * `Ok(false)` otherwise
    /// * `Err(Rx8010Error)` on error
    pub fn initialize(&mut self) -> Result<bool, Rx8010Error<P::Error>> {
        self.port.write_register(RegAddr::Reserved17.into(), 0xD8)?;
        self.port.write_register(RegAddr::Reserved30.into(), 0x00)?;
        self.port.write_register(RegAddr::Reserved31.into(), 0x08)?;

        let (mut ext, flag, mut control) = self.status_registers()?;
        debug!(
            "rx8010: ext={:?} flag={:?} control={:?}",
            ext, flag, control
        );

        ext.set_timer_enable(false);
        ext.set_clock_output(self.config.clock_output);
        ext.set_timer_clock(self.config.timer_clock);
        self.set_extension(ext)?;

        control.set_test(false);
        control.set_reserved(0);
        self.control = control;

        let needs_reset = flag.voltage_low();
        if needs_reset {
            warn!("rx8010: VLF flag set, you may have to re-adjust the clock");
            self.clock_unreliable = true;
        }
        if flag.alarm() {
            warn!("rx8010: alarm was detected");
        }
        if flag.timer() {
            warn!("rx8010: periodic timer was detected");
        }
        if flag.update() {
            warn!("rx8010: update timer was detected");
        }

        if needs_reset || flag.any_event() {
            self.set_flag(Flag::default())?;
            self.write_control(Control::default())?;
        }
        Ok(needs_reset)
    }

    /// Returns whether [`RtcDevice::initialize`] found the oscillator stopped
    /// and no [`RtcEvent::ClockUnreliable`] was raised for it yet. Resets the
    /// notice.
    pub fn take_clock_unreliable(&mut self) -> bool {
        core::mem::take(&mut self.clock_unreliable)
    }

    /// Reads the current date and time.
    ///
    /// # Returns
    /// * `Ok(CalendarTime)` - The current date and time
    /// * `Err(Rx8010Error::InvalidTimeValue)` if the registers hold no valid date
    /// * `Err(Rx8010Error::Transport)` on bus error
    pub fn time(&mut self) -> Result<CalendarTime, Rx8010Error<P::Error>> {
        let mut data = [0; 7];
        self.port
            .read_registers(RegAddr::Seconds.into(), &mut data)?;
        debug!("rx8010: read time registers {:?}", data);
        RawDateTime::from(data)
            .into_calendar()
            .map_err(|InvalidTimeValue| Rx8010Error::InvalidTimeValue)
    }

    /// Sets the date and time.
    ///
    /// The clock is halted with the STOP bit while the calendar registers are
    /// written and restarted afterwards, also when the calendar write failed.
    /// If both fail, the calendar write error is returned.
    pub fn set_time(&mut self, time: &CalendarTime) -> Result<(), Rx8010Error<P::Error>> {
        time.validate()
            .map_err(|InvalidTimeValue| Rx8010Error::InvalidTimeValue)?;
        let data: [u8; 7] = (&RawDateTime::from_calendar(time)).into();

        self.update_stop(true)?;
        let written = self
            .port
            .write_registers(RegAddr::Seconds.into(), &data)
            .map_err(Rx8010Error::from);
        if written.is_err() {
            error!("rx8010: failed to write time registers");
        }
        let restarted = self.update_stop(false);
        written.and(restarted)
    }

    /// Reads the Extension, Flag and Control registers in one transfer.
    pub fn status_registers(
        &mut self,
    ) -> Result<(Extension, Flag, Control), Rx8010Error<P::Error>> {
        let mut data = [0; 3];
        self.port
            .read_registers(RegAddr::Extension.into(), &mut data)?;
        Ok((
            Extension::from(data[0]),
            Flag::from(data[1]),
            Control::from(data[2]),
        ))
    }

    /// Writes the Extension, Flag and Control registers in one transfer.
    pub fn set_status_registers(
        &mut self,
        ext: Extension,
        flag: Flag,
        control: Control,
    ) -> Result<(), Rx8010Error<P::Error>> {
        self.port.write_registers(
            RegAddr::Extension.into(),
            &[ext.into(), flag.into(), control.into()],
        )?;
        self.control = control;
        Ok(())
    }

    /// Reads the Control register from the chip. The cache is left alone.
    pub fn control(&mut self) -> Result<Control, Rx8010Error<P::Error>> {
        let value = self.port.read_register(RegAddr::Control.into())?;
        Ok(Control::from(value))
    }

    /// Writes the Control register and updates the cache.
    pub fn set_control(&mut self, control: Control) -> Result<(), Rx8010Error<P::Error>> {
        self.write_control(control)
    }

    /// Enables or disables the time-update interrupt.
    ///
    /// A stale UF flag is cleared first. Control is only written when UIE
    /// actually changes.
    pub fn set_update_interrupt(
        &mut self,
        enabled: bool,
        select: UpdateSelect,
    ) -> Result<(), Rx8010Error<P::Error>> {
        let mut ext = self.extension()?;
        if ext.update_select() != select {
            ext.set_update_select(select);
            self.set_extension(ext)?;
        }

        let mut flag = self.flag()?;
        flag.set_update(false);
        self.set_flag(flag)?;

        let mut control = self.control;
        control.set_update_interrupt_enable(enabled);
        if control != self.control {
            self.write_control(control)?;
        }
        Ok(())
    }

    /// Programs the fixed-cycle timer, or stops it with `None`.
    ///
    /// The timer and its interrupt are always disabled before the counter is
    /// touched.
    pub fn set_periodic_timer(
        &mut self,
        timer: Option<PeriodicTimer>,
    ) -> Result<(), Rx8010Error<P::Error>> {
        let mut ext = self.extension()?;
        ext.set_timer_enable(false);
        self.set_extension(ext)?;

        let mut control = self.control;
        control.set_timer_interrupt_enable(false);
        if control != self.control {
            self.write_control(control)?;
        }

        let Some(timer) = timer else {
            return Ok(());
        };
        debug!("rx8010: periodic timer {:?}", timer);

        self.port
            .write_registers(RegAddr::TimerCounter0.into(), &timer.count.to_le_bytes())?;

        let mut flag = self.flag()?;
        flag.set_timer(false);
        self.set_flag(flag)?;

        ext.set_timer_clock(timer.clock);
        ext.set_timer_enable(true);
        self.set_extension(ext)?;

        control.set_timer_stop(false);
        control.set_timer_interrupt_enable(true);
        self.write_control(control)
    }

    fn update_stop(&mut self, stop: bool) -> Result<(), Rx8010Error<P::Error>> {
        let mut control = self.control()?;
        control.set_stop(stop);
        self.write_control(control)
    }

    // The cache only changes once the chip accepted the value
    fn write_control(&mut self, control: Control) -> Result<(), Rx8010Error<P::Error>> {
        self.port
            .write_register(RegAddr::Control.into(), control.into())?;
        self.control = control;
        Ok(())
    }
}
