//! Register definitions and bitfield structures for the RX-8010 RTC.
//!
//! This module contains the register map, the bitfield views of the clock,
//! alarm and status registers, and the small enums stored in multi-bit fields.
//! None of the types here perform bus I/O: callers read a byte, mutate the
//! view, then write the byte back.

use bitfield::bitfield;

/// Register addresses for the RX-8010 RTC.
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59)
    Seconds = 0x10,
    /// Minutes register (0-59)
    Minutes = 0x11,
    /// Hours register (0-23, 24-hour only)
    Hours = 0x12,
    /// Weekday register (0-6)
    Weekday = 0x13,
    /// Day of month register (1-31)
    Day = 0x14,
    /// Month register (1-12)
    Month = 0x15,
    /// Year register (0-99)
    Year = 0x16,
    /// Reserved, must be initialised to 0xD8
    Reserved17 = 0x17,
    /// Alarm minutes register
    AlarmMinutes = 0x18,
    /// Alarm hours register
    AlarmHours = 0x19,
    /// Alarm weekday/day-of-month register
    AlarmDay = 0x1A,
    /// Timer counter, low byte
    TimerCounter0 = 0x1B,
    /// Timer counter, high byte
    TimerCounter1 = 0x1C,
    /// Extension register
    Extension = 0x1D,
    /// Flag register
    Flag = 0x1E,
    /// Control register
    Control = 0x1F,
    /// Reserved, must be initialised to 0x00
    Reserved30 = 0x30,
    /// Reserved, must be initialised to 0x08
    Reserved31 = 0x31,
}

impl From<RegAddr> for u8 {
    fn from(v: RegAddr) -> Self {
        v as u8
    }
}

/// Frequency of the FOUT clock output pin (FSEL1..0).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockOutput {
    /// Output disabled (high impedance)
    Off = 0b00,
    /// 1 Hz output
    Hz1 = 0b01,
    /// 1.024 kHz output
    Hz1024 = 0b10,
    /// 32.768 kHz output
    Hz32768 = 0b11,
}
impl From<u8> for ClockOutput {
    /// Creates a `ClockOutput` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value does not fit in two bits.
    fn from(v: u8) -> Self {
        match v {
            0b00 => ClockOutput::Off,
            0b01 => ClockOutput::Hz1,
            0b10 => ClockOutput::Hz1024,
            0b11 => ClockOutput::Hz32768,
            _ => panic!("Invalid value for ClockOutput: {}", v),
        }
    }
}
impl From<ClockOutput> for u8 {
    fn from(v: ClockOutput) -> Self {
        v as u8
    }
}

/// Source clock of the fixed-cycle timer (TSEL2..0).
///
/// Only the documented settings are modelled; the raw field is available
/// through [`Extension::timer_clock_select`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerClock {
    /// 4096 Hz
    Hz4096 = 0b000,
    /// 64 Hz
    Hz64 = 0b001,
    /// 1 Hz
    Hz1 = 0b010,
    /// Once per minute
    PerMinute = 0b011,
    /// Once per hour
    PerHour = 0b100,
}
impl From<TimerClock> for u8 {
    fn from(v: TimerClock) -> Self {
        v as u8
    }
}
impl TryFrom<u8> for TimerClock {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0b000 => Ok(TimerClock::Hz4096),
            0b001 => Ok(TimerClock::Hz64),
            0b010 => Ok(TimerClock::Hz1),
            0b011 => Ok(TimerClock::PerMinute),
            0b100 => Ok(TimerClock::PerHour),
            other => Err(other),
        }
    }
}

/// Alarm match mode (WADA bit).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmMode {
    /// The alarm day register holds a weekday bitmap
    Week = 0,
    /// The alarm day register holds a day of month
    Day = 1,
}
impl From<u8> for AlarmMode {
    /// Creates an `AlarmMode` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => AlarmMode::Week,
            1 => AlarmMode::Day,
            _ => panic!("Invalid value for AlarmMode: {}", v),
        }
    }
}
impl From<AlarmMode> for u8 {
    fn from(v: AlarmMode) -> Self {
        v as u8
    }
}

/// Period of the time-update interrupt (USEL bit).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateSelect {
    /// Update event every second
    Second = 0,
    /// Update event every minute
    Minute = 1,
}
impl From<u8> for UpdateSelect {
    /// Creates an `UpdateSelect` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => UpdateSelect::Second,
            1 => UpdateSelect::Minute,
            _ => panic!("Invalid value for UpdateSelect: {}", v),
        }
    }
}
impl From<UpdateSelect> for u8 {
    fn from(v: UpdateSelect) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Seconds register (0-59) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    /// Tens place of seconds (0-5)
    pub ten_seconds, set_ten_seconds: 6, 4;
    /// Ones place of seconds (0-9)
    pub seconds, set_seconds: 3, 0;
}
from_register_u8!(Seconds);

bitfield! {
    /// Minutes register (0-59) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Minutes(u8);
    impl Debug;
    /// Tens place of minutes (0-5)
    pub ten_minutes, set_ten_minutes: 6, 4;
    /// Ones place of minutes (0-9)
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(Minutes);

bitfield! {
    /// Hours register (0-23). The RX-8010 has no 12-hour mode.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Tens place of hours (0-2)
    pub ten_hours, set_ten_hours: 5, 4;
    /// Ones place of hours (0-9)
    pub hours, set_hours: 3, 0;
}
from_register_u8!(Hours);

bitfield! {
    /// Weekday register (0-6).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Weekday(u8);
    impl Debug;
    pub ten_weekday, set_ten_weekday: 6, 4;
    pub weekday, set_weekday: 3, 0;
}
from_register_u8!(Weekday);

bitfield! {
    /// Day of month register (1-31) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Day(u8);
    impl Debug;
    /// Tens place of the day (0-3)
    pub ten_day, set_ten_day: 5, 4;
    /// Ones place of the day (0-9)
    pub day, set_day: 3, 0;
}
from_register_u8!(Day);

bitfield! {
    /// Month register (1-12) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Month(u8);
    impl Debug;
    /// Tens place of month (0-1)
    pub ten_month, set_ten_month: 4, 4;
    /// Ones place of month (0-9)
    pub month, set_month: 3, 0;
}
from_register_u8!(Month);

bitfield! {
    /// Year register (0-99) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Year(u8);
    impl Debug;
    /// Tens place of year (0-9)
    pub ten_year, set_ten_year: 7, 4;
    /// Ones place of year (0-9)
    pub year, set_year: 3, 0;
}
from_register_u8!(Year);

bitfield! {
    /// Alarm minutes register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmMinutes(u8);
    impl Debug;
    /// AE bit: when set the minutes are ignored by the alarm comparator
    pub ignore, set_ignore: 7;
    pub ten_minutes, set_ten_minutes: 6, 4;
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(AlarmMinutes);

bitfield! {
    /// Alarm hours register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmHours(u8);
    impl Debug;
    /// AE bit: when set the hours are ignored by the alarm comparator
    pub ignore, set_ignore: 7;
    pub ten_hours, set_ten_hours: 5, 4;
    pub hours, set_hours: 3, 0;
}
from_register_u8!(AlarmHours);

bitfield! {
    /// Alarm weekday/day-of-month register, interpreted as day of month.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmDay(u8);
    impl Debug;
    /// AE bit: when set the day is ignored by the alarm comparator
    pub ignore, set_ignore: 7;
    pub ten_day, set_ten_day: 5, 4;
    pub day, set_day: 3, 0;
}
from_register_u8!(AlarmDay);

bitfield! {
    /// Extension register (0x1D).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Extension(u8);
    impl Debug;
    /// FOUT frequency selection (FSEL1..0)
    pub from into ClockOutput, clock_output, set_clock_output: 7, 6;
    /// Update interrupt period (USEL)
    pub from into UpdateSelect, update_select, set_update_select: 5, 5;
    /// Fixed-cycle timer enable (TE)
    pub timer_enable, set_timer_enable: 4;
    /// Alarm week/day selection (WADA)
    pub from into AlarmMode, alarm_mode, set_alarm_mode: 3, 3;
    /// Raw timer source clock (TSEL2..0), see [`TimerClock`]
    pub timer_clock_select, set_timer_clock_select: 2, 0;
}
from_register_u8!(Extension);

impl Extension {
    /// Decodes the timer source clock, `None` for reserved settings.
    pub fn timer_clock(&self) -> Option<TimerClock> {
        TimerClock::try_from(self.timer_clock_select()).ok()
    }

    pub fn set_timer_clock(&mut self, clock: TimerClock) {
        self.set_timer_clock_select(clock.into());
    }
}

bitfield! {
    /// Flag register (0x1E). Bits are sticky and cleared by writing 0.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Flag(u8);
    impl Debug;
    /// Update flag (UF)
    pub update, set_update: 5;
    /// Fixed-cycle timer flag (TF)
    pub timer, set_timer: 4;
    /// Alarm flag (AF)
    pub alarm, set_alarm: 3;
    /// Voltage-low / oscillation-stop flag (VLF)
    pub voltage_low, set_voltage_low: 1;
}
from_register_u8!(Flag);

impl Flag {
    /// Mask of the UF bit.
    pub const UPDATE: u8 = 1 << 5;
    /// Mask of the TF bit.
    pub const TIMER: u8 = 1 << 4;
    /// Mask of the AF bit.
    pub const ALARM: u8 = 1 << 3;
    /// Mask of the VLF bit.
    pub const VOLTAGE_LOW: u8 = 1 << 1;

    /// True if any of the event flags (AF, TF, UF) is set.
    pub fn any_event(&self) -> bool {
        self.0 & (Self::UPDATE | Self::TIMER | Self::ALARM) != 0
    }
}

bitfield! {
    /// Control register (0x1F).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control(u8);
    impl Debug;
    /// Test mode, must be kept at 0
    pub test, set_test: 7;
    /// Clock/calendar stop (STOP)
    pub stop, set_stop: 6;
    /// Update interrupt enable (UIE)
    pub update_interrupt_enable, set_update_interrupt_enable: 5;
    /// Fixed-cycle timer interrupt enable (TIE)
    pub timer_interrupt_enable, set_timer_interrupt_enable: 4;
    /// Alarm interrupt enable (AIE)
    pub alarm_interrupt_enable, set_alarm_interrupt_enable: 3;
    /// Fixed-cycle timer stop (TSTP)
    pub timer_stop, set_timer_stop: 2;
    pub reserved, set_reserved: 1, 0;
}
from_register_u8!(Control);

#[cfg(feature = "defmt")]
impl defmt::Format for Flag {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Flag(");
        let mut first = true;
        for (set, name) in [
            (self.voltage_low(), "VLF"),
            (self.alarm(), "AF"),
            (self.timer(), "TF"),
            (self.update(), "UF"),
        ] {
            if !set {
                continue;
            }
            if !first {
                defmt::write!(f, ", ");
            }
            defmt::write!(f, "{=str}", name);
            first = false;
        }
        if first {
            defmt::write!(f, "clear");
        }
        defmt::write!(f, ")");
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Control {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Control({=u8:#04x})", self.0);
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Extension {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Extension({=u8:#04x})", self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_addresses_match_datasheet() {
        assert_eq!(u8::from(RegAddr::Seconds), 0x10);
        assert_eq!(u8::from(RegAddr::Year), 0x16);
        assert_eq!(u8::from(RegAddr::AlarmMinutes), 0x18);
        assert_eq!(u8::from(RegAddr::AlarmDay), 0x1A);
        assert_eq!(u8::from(RegAddr::Extension), 0x1D);
        assert_eq!(u8::from(RegAddr::Flag), 0x1E);
        assert_eq!(u8::from(RegAddr::Control), 0x1F);
    }

    #[test]
    fn test_flag_register_bits() {
        let flag = Flag::from(0x3A);
        assert!(flag.voltage_low());
        assert!(flag.alarm());
        assert!(flag.timer());
        assert!(flag.update());
        assert!(flag.any_event());

        let flag = Flag::from(0x02);
        assert!(flag.voltage_low());
        assert!(!flag.any_event());

        let mut flag = Flag::default();
        flag.set_alarm(true);
        assert_eq!(u8::from(flag), Flag::ALARM);
        flag.set_timer(true);
        flag.set_update(true);
        assert_eq!(u8::from(flag), 0x38);
        flag.set_alarm(false);
        assert_eq!(u8::from(flag), 0x30);
    }

    #[test]
    fn test_control_register_bits() {
        let control = Control::from(0xFC);
        assert!(control.test());
        assert!(control.stop());
        assert!(control.update_interrupt_enable());
        assert!(control.timer_interrupt_enable());
        assert!(control.alarm_interrupt_enable());
        assert!(control.timer_stop());
        assert_eq!(control.reserved(), 0);

        let mut control = Control::default();
        control.set_alarm_interrupt_enable(true);
        assert_eq!(u8::from(control), 0x08);
        control.set_stop(true);
        assert_eq!(u8::from(control), 0x48);
        control.set_stop(false);
        control.set_test(true);
        assert_eq!(u8::from(control), 0x88);
    }

    #[test]
    fn test_extension_register_fields() {
        let mut ext = Extension::from(0x00);
        ext.set_alarm_mode(AlarmMode::Day);
        assert_eq!(u8::from(ext), 0x08);
        ext.set_timer_enable(true);
        assert_eq!(u8::from(ext), 0x18);
        ext.set_clock_output(ClockOutput::Hz32768);
        assert_eq!(u8::from(ext), 0xD8);
        ext.set_timer_clock(TimerClock::Hz1);
        assert_eq!(u8::from(ext), 0xDA);
        ext.set_update_select(UpdateSelect::Minute);
        assert_eq!(u8::from(ext), 0xFA);

        assert_eq!(ext.clock_output(), ClockOutput::Hz32768);
        assert_eq!(ext.alarm_mode(), AlarmMode::Day);
        assert_eq!(ext.timer_clock(), Some(TimerClock::Hz1));
        assert_eq!(ext.update_select(), UpdateSelect::Minute);
    }

    #[test]
    fn test_reserved_timer_clock_is_not_decoded() {
        let ext = Extension::from(0x07);
        assert_eq!(ext.timer_clock_select(), 7);
        assert_eq!(ext.timer_clock(), None);
    }

    #[test]
    fn test_time_register_views() {
        let hours = Hours::from(0x23);
        assert_eq!(hours.ten_hours(), 2);
        assert_eq!(hours.hours(), 3);

        let month = Month::from(0x12);
        assert_eq!(month.ten_month(), 1);
        assert_eq!(month.month(), 2);

        let day = Day::from(0x31);
        assert_eq!(day.ten_day(), 3);
        assert_eq!(day.day(), 1);

        let year = Year::from(0x99);
        assert_eq!(year.ten_year(), 9);
        assert_eq!(year.year(), 9);
    }

    #[test]
    fn test_alarm_register_views() {
        let day = AlarmDay::from(0x80);
        assert!(day.ignore());
        assert_eq!(day.ten_day(), 0);
        assert_eq!(day.day(), 0);

        let hours = AlarmHours::from(0x17);
        assert!(!hours.ignore());
        assert_eq!(hours.ten_hours(), 1);
        assert_eq!(hours.hours(), 7);

        let mut minutes = AlarmMinutes::default();
        minutes.set_ten_minutes(4);
        minutes.set_minutes(5);
        assert_eq!(u8::from(minutes), 0x45);
    }

    #[test]
    #[should_panic(expected = "Invalid value for AlarmMode: 2")]
    fn test_invalid_alarm_mode_conversion() {
        let _ = AlarmMode::from(2);
    }
}
