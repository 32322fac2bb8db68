//! Calendar time and register conversion utilities for the RX-8010 RTC.
//!
//! The RX-8010 stores the clock in 7 consecutive BCD registers starting at
//! 0x10: seconds, minutes, hours, weekday, day of month, month and a two-digit
//! year. This module converts that register image to and from
//! [`CalendarTime`].
//!
//! # Year pivot
//!
//! The year register only holds two digits. Values below 70 are read as
//! 2000-2069 and the rest as 1970-1999. Writing keeps the year modulo 100.
//!
//! The hardware considers every year divisible by four a leap year, so its
//! calendar goes wrong on 2100-02-29. Nothing here corrects for that.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::{Day, Hours, Minutes, Month, Seconds, Weekday, Year};

/// Two-digit years below this value belong to the 21st century.
const YEAR_PIVOT: u8 = 70;

/// The decoded or supplied calendar fields do not form a valid date/time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidTimeValue;

/// Wall-clock date and time as kept by the RTC (24-hour, one-second
/// resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarTime {
    /// Seconds (0-59)
    pub second: u8,
    /// Minutes (0-59)
    pub minute: u8,
    /// Hours (0-23)
    pub hour: u8,
    /// Day of month (1-31)
    pub day: u8,
    /// Month (1-12)
    pub month: u8,
    /// Full Gregorian year, 1970-2069 when read back from the device
    pub year: u16,
    /// Day of week (0-6, Sunday = 0)
    pub weekday: u8,
}

impl CalendarTime {
    /// 1970-01-01 00:00:00, a Thursday. Used when the clock must be reset.
    pub const EPOCH: CalendarTime = CalendarTime {
        second: 0,
        minute: 0,
        hour: 0,
        day: 1,
        month: 1,
        year: 1970,
        weekday: 4,
    };

    /// Month counted from 0 (January = 0).
    pub fn month0(&self) -> u8 {
        self.month.saturating_sub(1)
    }

    /// Years elapsed since 1900.
    pub fn years_since_1900(&self) -> i32 {
        i32::from(self.year) - 1900
    }

    /// Checks that the fields form a real date and time of day.
    ///
    /// The weekday is only range-checked, it is not derived from the date.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTimeValue`] for out-of-range fields or impossible
    /// dates such as April 31st.
    pub fn validate(&self) -> Result<(), InvalidTimeValue> {
        if self.weekday > 6 {
            return Err(InvalidTimeValue);
        }
        self.to_naive().map(|_| ())
    }

    fn to_naive(self) -> Result<NaiveDateTime, InvalidTimeValue> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
        .and_then(|d| {
            d.and_hms_opt(
                u32::from(self.hour),
                u32::from(self.minute),
                u32::from(self.second),
            )
        })
        .ok_or(InvalidTimeValue)
    }
}

impl TryFrom<CalendarTime> for NaiveDateTime {
    type Error = InvalidTimeValue;

    fn try_from(t: CalendarTime) -> Result<Self, Self::Error> {
        t.to_naive()
    }
}

impl From<&NaiveDateTime> for CalendarTime {
    fn from(dt: &NaiveDateTime) -> Self {
        // Every field of a NaiveDateTime is in range for the narrower types,
        // except the year which is clamped into u16.
        CalendarTime {
            second: dt.second() as u8,
            minute: dt.minute() as u8,
            hour: dt.hour() as u8,
            day: dt.day() as u8,
            month: dt.month() as u8,
            year: u16::try_from(dt.year().max(0)).unwrap_or(u16::MAX),
            weekday: dt.weekday().num_days_from_sunday() as u8,
        }
    }
}

/// Internal representation of the RX-8010 clock registers.
///
/// Models the 7 registers at 0x10-0x16 with the typed bitfield wrappers, the
/// same way they are transferred on the bus.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct RawDateTime {
    seconds: Seconds,
    minutes: Minutes,
    hours: Hours,
    weekday: Weekday,
    day: Day,
    month: Month,
    year: Year,
}

/// Splits a value into its BCD (ones, tens) digits.
///
/// Values above 99 do not fit in one BCD byte; the tens digit then spills
/// into the high nibble and gets truncated by the register field.
pub(crate) fn make_bcd(value: u8) -> (u8, u8) {
    (value % 10, value / 10)
}

/// Combines BCD tens and ones digits into a binary value.
pub(crate) fn from_bcd(tens: u8, ones: u8) -> u8 {
    tens.wrapping_mul(10).wrapping_add(ones)
}

impl RawDateTime {
    /// Encodes calendar fields into the register image.
    ///
    /// No validation happens here; callers check the time beforehand.
    pub(crate) fn from_calendar(time: &CalendarTime) -> Self {
        let seconds = {
            let (ones, tens) = make_bcd(time.second);
            let mut value = Seconds::default();
            value.set_seconds(ones);
            value.set_ten_seconds(tens);
            value
        };
        let minutes = {
            let (ones, tens) = make_bcd(time.minute);
            let mut value = Minutes::default();
            value.set_minutes(ones);
            value.set_ten_minutes(tens);
            value
        };
        let hours = {
            let (ones, tens) = make_bcd(time.hour);
            let mut value = Hours::default();
            value.set_hours(ones);
            value.set_ten_hours(tens);
            value
        };
        let weekday = {
            let (ones, tens) = make_bcd(time.weekday);
            let mut value = Weekday::default();
            value.set_weekday(ones);
            value.set_ten_weekday(tens);
            value
        };
        let day = {
            let (ones, tens) = make_bcd(time.day);
            let mut value = Day::default();
            value.set_day(ones);
            value.set_ten_day(tens);
            value
        };
        let month = {
            let (ones, tens) = make_bcd(time.month);
            let mut value = Month::default();
            value.set_month(ones);
            value.set_ten_month(tens);
            value
        };
        let year = {
            // Only the two low digits are stored, the century comes from the pivot
            let (ones, tens) = make_bcd((time.year % 100) as u8);
            let mut value = Year::default();
            value.set_year(ones);
            value.set_ten_year(tens);
            value
        };

        let raw = RawDateTime {
            seconds,
            minutes,
            hours,
            weekday,
            day,
            month,
            year,
        };
        debug!("rx8010: encoded {:?}", <[u8; 7]>::from(&raw));
        raw
    }

    /// Decodes the register image, rejecting impossible dates.
    pub(crate) fn into_calendar(self) -> Result<CalendarTime, InvalidTimeValue> {
        let second = from_bcd(self.seconds.ten_seconds(), self.seconds.seconds());
        let minute = from_bcd(self.minutes.ten_minutes(), self.minutes.minutes());
        let hour = from_bcd(self.hours.ten_hours(), self.hours.hours());
        let weekday = from_bcd(self.weekday.ten_weekday(), self.weekday.weekday());
        let day = from_bcd(self.day.ten_day(), self.day.day());
        let month = from_bcd(self.month.ten_month(), self.month.month());
        let year = from_bcd(self.year.ten_year(), self.year.year());
        let year = if year < YEAR_PIVOT {
            2000 + u16::from(year)
        } else {
            1900 + u16::from(year)
        };

        debug!(
            "rx8010: decoded {}s {}m {}h {}md {}mo {}y wd{}",
            second, minute, hour, day, month, year, weekday
        );

        let time = CalendarTime {
            second,
            minute,
            hour,
            day,
            month,
            year,
            weekday,
        };
        // Weekday is reported as stored; only the date itself is validated
        time.to_naive()?;
        Ok(time)
    }
}

impl From<[u8; 7]> for RawDateTime {
    fn from(data: [u8; 7]) -> Self {
        RawDateTime {
            seconds: Seconds::from(data[0]),
            minutes: Minutes::from(data[1]),
            hours: Hours::from(data[2]),
            weekday: Weekday::from(data[3]),
            day: Day::from(data[4]),
            month: Month::from(data[5]),
            year: Year::from(data[6]),
        }
    }
}

impl From<&RawDateTime> for [u8; 7] {
    fn from(dt: &RawDateTime) -> [u8; 7] {
        [
            dt.seconds.into(),
            dt.minutes.into(),
            dt.hours.into(),
            dt.weekday.into(),
            dt.day.into(),
            dt.month.into(),
            dt.year.into(),
        ]
    }
}

/// Decodes the 7-byte clock register image.
///
/// # Errors
///
/// Returns [`InvalidTimeValue`] when the registers do not hold a valid date.
pub fn decode(registers: [u8; 7]) -> Result<CalendarTime, InvalidTimeValue> {
    RawDateTime::from(registers).into_calendar()
}

/// Encodes calendar fields into the 7-byte clock register image.
pub fn encode(time: &CalendarTime) -> [u8; 7] {
    (&RawDateTime::from_calendar(time)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> CalendarTime {
        let naive = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
            .unwrap()
            .and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))
            .unwrap();
        CalendarTime::from(&naive)
    }

    #[test]
    fn test_make_bcd() {
        assert_eq!(make_bcd(0), (0, 0));
        assert_eq!(make_bcd(9), (9, 0));
        assert_eq!(make_bcd(10), (0, 1));
        assert_eq!(make_bcd(45), (5, 4));
        assert_eq!(make_bcd(99), (9, 9));
        assert_eq!(from_bcd(4, 5), 45);
    }

    #[test]
    fn test_decode_reference_registers() {
        let t = decode([0x30, 0x15, 0x12, 0x03, 0x25, 0x09, 0x23]).unwrap();
        assert_eq!(t.year, 2023);
        assert_eq!(t.month, 9);
        assert_eq!(t.day, 25);
        assert_eq!(t.hour, 12);
        assert_eq!(t.minute, 15);
        assert_eq!(t.second, 30);
        assert_eq!(t.weekday, 3);
        assert_eq!(t.month0(), 8);
        assert_eq!(t.years_since_1900(), 123);
    }

    #[test]
    fn test_decode_masks_reserved_bits() {
        // Bit 7 of seconds/minutes, bits 7..6 of hours/day, bits 7..5 of month
        let t = decode([0xB0, 0x95, 0xD2, 0x83, 0xE5, 0xE9, 0x23]).unwrap();
        assert_eq!(t.second, 30);
        assert_eq!(t.minute, 15);
        assert_eq!(t.hour, 12);
        assert_eq!(t.weekday, 3);
        assert_eq!(t.day, 25);
        assert_eq!(t.month, 9);
    }

    #[test]
    fn test_decode_year_pivot() {
        let t = decode([0x00, 0x00, 0x00, 0x04, 0x01, 0x01, 0x70]).unwrap();
        assert_eq!(t.year, 1970);
        let t = decode([0x00, 0x00, 0x00, 0x04, 0x01, 0x01, 0x99]).unwrap();
        assert_eq!(t.year, 1999);
        let t = decode([0x00, 0x00, 0x00, 0x04, 0x01, 0x01, 0x00]).unwrap();
        assert_eq!(t.year, 2000);
        let t = decode([0x00, 0x00, 0x00, 0x04, 0x01, 0x01, 0x69]).unwrap();
        assert_eq!(t.year, 2069);
    }

    #[test]
    fn test_decode_rejects_invalid_dates() {
        // September 31st
        assert_eq!(
            decode([0x00, 0x00, 0x00, 0x00, 0x31, 0x09, 0x23]),
            Err(InvalidTimeValue)
        );
        // February 29th in a non-leap year
        assert_eq!(
            decode([0x00, 0x00, 0x00, 0x00, 0x29, 0x02, 0x23]),
            Err(InvalidTimeValue)
        );
        // Month 13
        assert_eq!(
            decode([0x00, 0x00, 0x00, 0x00, 0x01, 0x13, 0x23]),
            Err(InvalidTimeValue)
        );
        // Month 0
        assert_eq!(
            decode([0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x23]),
            Err(InvalidTimeValue)
        );
        // Hour 24
        assert_eq!(
            decode([0x00, 0x00, 0x24, 0x00, 0x01, 0x01, 0x23]),
            Err(InvalidTimeValue)
        );
        // Non-BCD seconds
        assert_eq!(
            decode([0x6A, 0x00, 0x00, 0x00, 0x01, 0x01, 0x23]),
            Err(InvalidTimeValue)
        );
    }

    #[test]
    fn test_decode_accepts_leap_day() {
        let t = decode([0x00, 0x00, 0x00, 0x04, 0x29, 0x02, 0x24]).unwrap();
        assert_eq!((t.year, t.month, t.day), (2024, 2, 29));
    }

    #[test]
    fn test_encode_reference_time() {
        let t = CalendarTime {
            second: 30,
            minute: 15,
            hour: 12,
            day: 25,
            month: 9,
            year: 2023,
            weekday: 3,
        };
        assert_eq!(encode(&t), [0x30, 0x15, 0x12, 0x03, 0x25, 0x09, 0x23]);
    }

    #[test]
    fn test_encode_keeps_year_modulo_100() {
        let t = time(1985, 6, 15, 23, 59, 59);
        assert_eq!(encode(&t), [0x59, 0x59, 0x23, 0x06, 0x15, 0x06, 0x85]);
        let t = time(2100, 3, 1, 0, 0, 0);
        assert_eq!(encode(&t)[6], 0x00);
    }

    #[test]
    fn test_round_trip_inside_pivot_window() {
        let last = NaiveDate::from_ymd_opt(2069, 12, 31).unwrap();
        let mut date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let mut days = 0;
        loop {
            for (hour, minute, second) in [(0, 0, 0), (12, 30, 45), (23, 59, 59)] {
                let t = CalendarTime::from(&date.and_hms_opt(hour, minute, second).unwrap());
                assert_eq!(decode(encode(&t)).unwrap(), t, "{:?}", date);
            }
            days += 1;
            if date == last {
                break;
            }
            date = date.succ_opt().unwrap();
        }
        // 1970 through 2069, 25 leap years
        assert_eq!(days, 100 * 365 + 25);
    }

    #[test]
    fn test_round_trip_outside_pivot_window_wraps() {
        let t = time(2070, 5, 5, 5, 5, 5);
        let back = decode(encode(&t)).unwrap();
        assert_eq!(back.year, 1970);
        assert_eq!((back.month, back.day, back.hour), (5, 5, 5));
    }

    #[test]
    fn test_validate() {
        assert!(time(2024, 3, 14, 15, 30, 0).validate().is_ok());
        let mut t = time(2024, 4, 30, 0, 0, 0);
        t.day = 31;
        assert_eq!(t.validate(), Err(InvalidTimeValue));
        let mut t = time(2024, 4, 30, 0, 0, 0);
        t.minute = 60;
        assert_eq!(t.validate(), Err(InvalidTimeValue));
        let mut t = time(2024, 4, 30, 0, 0, 0);
        t.weekday = 7;
        assert_eq!(t.validate(), Err(InvalidTimeValue));
    }

    #[test]
    fn test_chrono_conversions() {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(6, 7, 8)
            .unwrap();
        let t = CalendarTime::from(&naive);
        assert_eq!(t.weekday, 0); // Sunday
        assert_eq!(NaiveDateTime::try_from(t).unwrap(), naive);

        let bad = CalendarTime {
            day: 30,
            month: 2,
            ..t
        };
        assert_eq!(NaiveDateTime::try_from(bad), Err(InvalidTimeValue));
    }

    #[test]
    fn test_epoch_is_valid() {
        assert!(CalendarTime::EPOCH.validate().is_ok());
        assert_eq!(
            encode(&CalendarTime::EPOCH),
            [0x00, 0x00, 0x00, 0x04, 0x01, 0x01, 0x70]
        );
    }
}
