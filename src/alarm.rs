//! Day-of-month alarm of the RX-8010.
//!
//! The chip compares minute, hour and week/day-of-month against the alarm
//! registers (0x18-0x1A). This driver always runs the comparator in
//! day-of-month mode; a day of 0 sets the AE bit of the day register so the
//! alarm fires every day at the given time. Minutes and hours are always
//! compared. The alarm has one minute precision.
//!
//! All operations need an interrupt line (see [`Config::interrupt_line`](crate::Config))
//! and fail with [`Rx8010Error::AlarmUnsupported`] otherwise.

use crate::{
    datetime::{from_bcd, make_bcd},
    AlarmDay, AlarmHours, AlarmMinutes, AlarmMode, InvalidTimeValue, RegAddr, RegisterPort,
    RtcDevice, Rx8010Error,
};

/// Alarm settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmSpec {
    /// Minute (0-59)
    pub minute: u8,
    /// Hour (0-23)
    pub hour: u8,
    /// Day of month (1-31), or 0 for every day
    pub day: u8,
    /// Alarm interrupt enabled
    pub enabled: bool,
}

impl AlarmSpec {
    /// Checks the field ranges.
    pub fn validate(&self) -> Result<(), InvalidTimeValue> {
        if self.minute > 59 || self.hour > 23 || self.day > 31 {
            return Err(InvalidTimeValue);
        }
        Ok(())
    }
}

/// Alarm settings as read back from the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmState {
    pub alarm: AlarmSpec,
    /// The alarm fired and is still enabled
    pub pending: bool,
}

/// Register image of the alarm block.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RawAlarm {
    minutes: AlarmMinutes,
    hours: AlarmHours,
    day: AlarmDay,
}

impl RawAlarm {
    fn from_spec(spec: &AlarmSpec) -> Self {
        let mut minutes = AlarmMinutes::default();
        let (ones, tens) = make_bcd(spec.minute);
        minutes.set_minutes(ones);
        minutes.set_ten_minutes(tens);

        let mut hours = AlarmHours::default();
        let (ones, tens) = make_bcd(spec.hour);
        hours.set_hours(ones);
        hours.set_ten_hours(tens);

        let mut day = AlarmDay::default();
        if spec.day == 0 {
            // There is no day 0, ignore the field instead
            day.set_ignore(true);
        } else {
            let (ones, tens) = make_bcd(spec.day);
            day.set_day(ones);
            day.set_ten_day(tens);
        }

        Self {
            minutes,
            hours,
            day,
        }
    }

    fn minute(&self) -> u8 {
        from_bcd(self.minutes.ten_minutes(), self.minutes.minutes())
    }

    fn hour(&self) -> u8 {
        from_bcd(self.hours.ten_hours(), self.hours.hours())
    }

    fn day(&self) -> u8 {
        if self.day.ignore() {
            0
        } else {
            from_bcd(self.day.ten_day(), self.day.day())
        }
    }
}

impl From<[u8; 3]> for RawAlarm {
    fn from(data: [u8; 3]) -> Self {
        Self {
            minutes: AlarmMinutes::from(data[0]),
            hours: AlarmHours::from(data[1]),
            day: AlarmDay::from(data[2]),
        }
    }
}

impl<P: RegisterPort> RtcDevice<P> {
    fn check_alarm_support(&self) -> Result<(), Rx8010Error<P::Error>> {
        if self.config.interrupt_line {
            Ok(())
        } else {
            Err(Rx8010Error::AlarmUnsupported)
        }
    }

    /// Whether the alarm interrupt is enabled, according to the Control cache.
    pub fn alarm_enabled(&self) -> bool {
        self.control.alarm_interrupt_enable()
    }

    /// Reads the alarm settings.
    ///
    /// `enabled` comes from the Control cache. `pending` is set when the AF
    /// flag is raised while the alarm is enabled.
    pub fn read_alarm(&mut self) -> Result<AlarmState, Rx8010Error<P::Error>> {
        self.check_alarm_support()?;

        let mut data = [0; 3];
        self.port
            .read_registers(RegAddr::AlarmMinutes.into(), &mut data)?;
        debug!("rx8010: alarm registers {:?}", data);
        let raw = RawAlarm::from(data);

        let (_, flag, _) = self.status_registers()?;

        let enabled = self.alarm_enabled();
        Ok(AlarmState {
            alarm: AlarmSpec {
                minute: raw.minute(),
                hour: raw.hour(),
                day: raw.day(),
                enabled,
            },
            pending: flag.alarm() && enabled,
        })
    }

    /// Programs the alarm.
    ///
    /// The alarm interrupt is masked while the registers change and the AF
    /// flag is cleared before it is unmasked again. A bus error aborts the
    /// sequence; registers already written keep their new values.
    pub fn set_alarm(&mut self, alarm: &AlarmSpec) -> Result<(), Rx8010Error<P::Error>> {
        self.check_alarm_support()?;
        alarm
            .validate()
            .map_err(|InvalidTimeValue| Rx8010Error::InvalidTimeValue)?;

        let raw = RawAlarm::from_spec(alarm);
        debug!(
            "rx8010: set alarm {}m {}h {}md enabled={}",
            alarm.minute, alarm.hour, alarm.day, alarm.enabled
        );

        if self.alarm_enabled() {
            let mut control = self.control;
            control.set_alarm_interrupt_enable(false);
            self.write_control(control)?;
        }

        self.port.write_registers(
            RegAddr::AlarmMinutes.into(),
            &[raw.minutes.into(), raw.hours.into()],
        )?;

        let mut ext = self.extension()?;
        ext.set_alarm_mode(AlarmMode::Day);
        self.set_extension(ext)?;

        self.port
            .write_register(RegAddr::AlarmDay.into(), raw.day.into())?;

        let mut flag = self.flag()?;
        flag.set_alarm(false);
        self.set_flag(flag)?;

        if alarm.enabled {
            let mut control = self.control;
            control.set_alarm_interrupt_enable(true);
            self.write_control(control)?;
        }
        Ok(())
    }

    /// Enables or disables the alarm interrupt.
    ///
    /// The AF flag is always cleared. Control is only written when AIE
    /// actually changes.
    pub fn set_alarm_enabled(&mut self, enabled: bool) -> Result<(), Rx8010Error<P::Error>> {
        self.check_alarm_support()?;

        let mut control = self.control;
        control.set_alarm_interrupt_enable(enabled);

        let mut flag = self.flag()?;
        flag.set_alarm(false);
        self.set_flag(flag)?;

        if control != self.control {
            self.write_control(control)?;
        }
        Ok(())
    }
}
