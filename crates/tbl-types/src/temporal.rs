use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{DataType, TypeError};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;
const DAYS_FROM_CE_TO_EPOCH: i32 = 719_163;
/// 1970-01-05 was the first Monday after the epoch.
const FIRST_MONDAY: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
}

impl TimeUnit {
    #[must_use]
    pub const fn per_second(self) -> i64 {
        match self {
            Self::Nanoseconds => NANOS_PER_SECOND,
            Self::Microseconds => 1_000_000,
            Self::Milliseconds => 1_000,
        }
    }

    #[must_use]
    pub const fn nanos_per_unit(self) -> i64 {
        NANOS_PER_SECOND / self.per_second()
    }

    #[must_use]
    pub const fn per_day(self) -> i64 {
        self.per_second() * 86_400
    }

    #[must_use]
    pub fn finer(self, other: Self) -> Self {
        if self.per_second() >= other.per_second() {
            self
        } else {
            other
        }
    }

    /// Re-express `value` in `target` units. Coarsening floors toward negative
    /// infinity; refining fails on overflow.
    #[must_use]
    pub fn convert(self, value: i64, target: Self) -> Option<i64> {
        let (from, to) = (self.per_second(), target.per_second());
        if from == to {
            Some(value)
        } else if to > from {
            value.checked_mul(to / from)
        } else {
            Some(value.div_euclid(from / to))
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
        })
    }
}

#[must_use]
pub fn date_to_naive(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(DAYS_FROM_CE_TO_EPOCH)?)
}

#[must_use]
pub fn naive_to_date(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - DAYS_FROM_CE_TO_EPOCH
}

#[must_use]
pub fn datetime_to_naive(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let per_second = unit.per_second();
    let seconds = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * unit.nanos_per_unit();
    DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?).map(|ts| ts.naive_utc())
}

#[must_use]
pub fn naive_to_datetime(ts: NaiveDateTime, unit: TimeUnit) -> Option<i64> {
    let utc = ts.and_utc();
    let seconds = utc.timestamp().checked_mul(unit.per_second())?;
    let sub = i64::from(ts.nanosecond()) / unit.nanos_per_unit();
    seconds.checked_add(sub)
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        date.checked_add_months(Months::new(magnitude))
    } else {
        date.checked_sub_months(Months::new(magnitude))
    }
}

/// A calendar-aware span: months (also quarters and years), weeks, days and
/// a fixed nanosecond part. `"i"` durations count rows or integer steps and
/// only apply to integer index columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Duration {
    months: i64,
    weeks: i64,
    days: i64,
    nanos: i64,
    parsed_int: bool,
}

impl Duration {
    /// Parse strings such as `"1h30m"`, `"2w"`, `"-1mo"` or `"3i"`.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidDuration(format!("{text:?}: {reason}"));

        let trimmed = text.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if body.is_empty() {
            return Err(invalid("empty duration"));
        }

        let mut out = Self::default();
        let mut saw_fixed = false;
        let mut chars = body.char_indices().peekable();
        while let Some(&(start, ch)) = chars.peek() {
            if !ch.is_ascii_digit() {
                return Err(invalid("expected a number"));
            }
            let mut end = start;
            while let Some(&(idx, c)) = chars.peek()
                && c.is_ascii_digit()
            {
                end = idx + 1;
                chars.next();
            }
            let amount: i64 = body[start..end]
                .parse()
                .map_err(|_| invalid("number out of range"))?;

            let unit_start = end;
            let mut unit_end = end;
            while let Some(&(idx, c)) = chars.peek()
                && c.is_ascii_alphabetic()
            {
                unit_end = idx + 1;
                chars.next();
            }
            let scaled = |factor: i64| {
                amount
                    .checked_mul(factor)
                    .ok_or_else(|| invalid("number out of range"))
            };
            match &body[unit_start..unit_end] {
                "ns" => out.nanos += scaled(1)?,
                "us" => out.nanos += scaled(1_000)?,
                "ms" => out.nanos += scaled(1_000_000)?,
                "s" => out.nanos += scaled(NANOS_PER_SECOND)?,
                "m" => out.nanos += scaled(60 * NANOS_PER_SECOND)?,
                "h" => out.nanos += scaled(3_600 * NANOS_PER_SECOND)?,
                "d" => out.days += amount,
                "w" => out.weeks += amount,
                "mo" => out.months += amount,
                "q" => out.months += scaled(3)?,
                "y" => out.months += scaled(12)?,
                "i" => {
                    out.nanos += amount;
                    out.parsed_int = true;
                }
                "" => return Err(invalid("missing unit")),
                other => return Err(invalid(&format!("unknown unit {other:?}"))),
            }
            if !matches!(&body[unit_start..unit_end], "i") {
                saw_fixed = true;
            }
        }

        if out.parsed_int && saw_fixed {
            return Err(invalid("index durations cannot be combined with time units"));
        }
        Ok(if negative { out.negate() } else { out })
    }

    #[must_use]
    pub fn from_nanos(nanos: i64) -> Self {
        Self {
            nanos,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_days(days: i64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_months(months: i64) -> Self {
        Self {
            months,
            ..Self::default()
        }
    }

    /// An integer-step duration for integer index columns.
    #[must_use]
    pub fn from_index(steps: i64) -> Self {
        Self {
            nanos: steps,
            parsed_int: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn months(&self) -> i64 {
        self.months
    }

    #[must_use]
    pub fn weeks(&self) -> i64 {
        self.weeks
    }

    #[must_use]
    pub fn days(&self) -> i64 {
        self.days
    }

    #[must_use]
    pub fn nanos(&self) -> i64 {
        self.nanos
    }

    #[must_use]
    pub fn is_index(&self) -> bool {
        self.parsed_int
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.weeks == 0 && self.days == 0 && self.nanos == 0
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.months < 0 || self.weeks < 0 || self.days < 0 || self.nanos < 0
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            months: -self.months,
            weeks: -self.weeks,
            days: -self.days,
            nanos: -self.nanos,
            parsed_int: self.parsed_int,
        }
    }

    fn fixed_nanos(&self) -> i128 {
        i128::from(self.weeks) * 7 * i128::from(NANOS_PER_DAY)
            + i128::from(self.days) * i128::from(NANOS_PER_DAY)
            + i128::from(self.nanos)
    }

    /// Length in physical units of `dtype`, when the duration has no calendar
    /// month component.
    pub fn to_physical(&self, dtype: &DataType) -> Result<i64, TypeError> {
        if self.months != 0 {
            return Err(TypeError::InvalidDuration(format!(
                "{self} has a calendar component and no fixed length"
            )));
        }
        let out = match dtype {
            DataType::Date => self.fixed_nanos() / i128::from(NANOS_PER_DAY),
            DataType::Datetime(unit) => self.fixed_nanos() / i128::from(unit.nanos_per_unit()),
            int if int.is_integer() => {
                if self.weeks != 0 || self.days != 0 {
                    return Err(self.unsupported(dtype));
                }
                i128::from(self.nanos)
            }
            _ => return Err(self.unsupported(dtype)),
        };
        i64::try_from(out).map_err(|_| TypeError::InvalidDuration(format!("{self} overflows")))
    }

    fn unsupported(&self, dtype: &DataType) -> TypeError {
        TypeError::InvalidDuration(format!("{self} cannot be applied to {dtype}"))
    }

    fn check_kind(&self, dtype: &DataType) -> Result<(), TypeError> {
        match (dtype.is_integer(), self.parsed_int || self.is_zero()) {
            (true, true) | (false, false) => Ok(()),
            (false, true) if !self.parsed_int => Ok(()),
            _ => Err(self.unsupported(dtype)),
        }
    }

    /// Add this duration to a physical value of `dtype`. Month arithmetic
    /// clamps to the last day of the target month.
    pub fn add_to(&self, value: i64, dtype: &DataType) -> Result<i64, TypeError> {
        self.check_kind(dtype)?;
        let overflow = || TypeError::InvalidDuration(format!("adding {self} overflows"));

        let shifted = if self.months == 0 {
            value
        } else {
            match dtype {
                DataType::Date => {
                    let date = i32::try_from(value)
                        .ok()
                        .and_then(date_to_naive)
                        .and_then(|d| shift_months(d, self.months))
                        .ok_or_else(overflow)?;
                    i64::from(naive_to_date(date))
                }
                DataType::Datetime(unit) => datetime_to_naive(value, *unit)
                    .and_then(|ts| {
                        let date = shift_months(ts.date(), self.months)?;
                        naive_to_datetime(date.and_time(ts.time()), *unit)
                    })
                    .ok_or_else(overflow)?,
                _ => return Err(self.unsupported(dtype)),
            }
        };

        let fixed = Self {
            months: 0,
            ..*self
        }
        .to_physical(dtype)?;
        shifted.checked_add(fixed).ok_or_else(overflow)
    }

    /// Floor a physical value of `dtype` to the start of the window of this
    /// size containing it. Weekly windows start on Monday.
    pub fn truncate(&self, value: i64, dtype: &DataType) -> Result<i64, TypeError> {
        self.check_kind(dtype)?;
        if self.is_negative() || self.is_zero() {
            return Err(TypeError::InvalidDuration(format!(
                "{self} must be positive to define windows"
            )));
        }

        if self.months != 0 {
            if self.weeks != 0 || self.days != 0 || self.nanos != 0 {
                return Err(TypeError::InvalidDuration(format!(
                    "{self} mixes calendar months with fixed units"
                )));
            }
            let date = match dtype {
                DataType::Date => i32::try_from(value).ok().and_then(date_to_naive),
                DataType::Datetime(unit) => datetime_to_naive(value, *unit).map(|ts| ts.date()),
                _ => None,
            }
            .ok_or_else(|| self.unsupported(dtype))?;
            let total = i64::from(date.year()) * 12 + i64::from(date.month0());
            let floored = total - total.rem_euclid(self.months);
            let first = i32::try_from(floored.div_euclid(12))
                .ok()
                .and_then(|year| {
                    let month = u32::try_from(floored.rem_euclid(12)).ok()? + 1;
                    NaiveDate::from_ymd_opt(year, month, 1)
                })
                .ok_or_else(|| self.unsupported(dtype))?;
            return match dtype {
                DataType::Date => Ok(i64::from(naive_to_date(first))),
                DataType::Datetime(unit) => first
                    .and_hms_opt(0, 0, 0)
                    .and_then(|ts| naive_to_datetime(ts, *unit))
                    .ok_or_else(|| self.unsupported(dtype)),
                _ => Err(self.unsupported(dtype)),
            };
        }

        let every = self.to_physical(dtype)?;
        if every <= 0 {
            return Err(TypeError::InvalidDuration(format!(
                "{self} is shorter than one {dtype} unit"
            )));
        }
        let origin = if self.weeks != 0 && self.days == 0 && self.nanos == 0 {
            match dtype {
                DataType::Date => FIRST_MONDAY,
                DataType::Datetime(unit) => FIRST_MONDAY * unit.per_day(),
                _ => 0,
            }
        } else {
            0
        };
        Ok(value - (value - origin).rem_euclid(every))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str(if self.parsed_int { "0i" } else { "0ns" });
        }
        if self.parsed_int {
            return write!(f, "{}i", self.nanos);
        }
        if self.months != 0 {
            write!(f, "{}mo", self.months)?;
        }
        if self.weeks != 0 {
            write!(f, "{}w", self.weeks)?;
        }
        if self.days != 0 {
            write!(f, "{}d", self.days)?;
        }
        if self.nanos != 0 {
            write!(f, "{}ns", self.nanos)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Duration {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Duration, TimeUnit, date_to_naive, naive_to_date, naive_to_datetime};
    use crate::{DataType, TypeError};

    fn day(y: i32, m: u32, d: u32) -> i64 {
        i64::from(naive_to_date(
            NaiveDate::from_ymd_opt(y, m, d).expect("valid date"),
        ))
    }

    #[test]
    fn parses_combined_units() {
        let d = Duration::parse("1w2d3h").expect("parse");
        assert_eq!(d.weeks(), 1);
        assert_eq!(d.days(), 2);
        assert_eq!(d.nanos(), 3 * 3_600 * 1_000_000_000);

        let q = Duration::parse("1y1q").expect("parse");
        assert_eq!(q.months(), 15);

        let neg = Duration::parse("-2mo").expect("parse");
        assert_eq!(neg.months(), -2);
        assert!(neg.is_negative());
    }

    #[test]
    fn index_duration_cannot_mix_units() {
        let steps = Duration::parse("3i").expect("parse");
        assert!(steps.is_index());
        assert_eq!(steps.nanos(), 3);
        assert!(matches!(
            Duration::parse("1i2h"),
            Err(TypeError::InvalidDuration(_))
        ));
    }

    #[test]
    fn rejects_malformed_strings() {
        for bad in ["", "-", "h", "10", "3x", "1d-2h"] {
            assert!(Duration::parse(bad).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn month_addition_clamps_to_month_end() {
        let jan31 = day(2024, 1, 31);
        let out = Duration::parse("1mo")
            .expect("parse")
            .add_to(jan31, &DataType::Date)
            .expect("add");
        assert_eq!(out, day(2024, 2, 29));
    }

    #[test]
    fn fixed_addition_on_datetime_uses_physical_unit() {
        let out = Duration::parse("1h")
            .expect("parse")
            .add_to(0, &DataType::Datetime(TimeUnit::Milliseconds))
            .expect("add");
        assert_eq!(out, 3_600_000);
    }

    #[test]
    fn truncates_months_and_quarters() {
        let may17 = day(2023, 5, 17);
        let month = Duration::parse("1mo").expect("parse");
        assert_eq!(
            month.truncate(may17, &DataType::Date).expect("truncate"),
            day(2023, 5, 1)
        );
        let quarter = Duration::parse("1q").expect("parse");
        assert_eq!(
            quarter.truncate(may17, &DataType::Date).expect("truncate"),
            day(2023, 4, 1)
        );
    }

    #[test]
    fn weekly_windows_start_on_monday() {
        // 2024-01-10 is a Wednesday.
        let wed = day(2024, 1, 10);
        let week = Duration::parse("1w").expect("parse");
        let start = week.truncate(wed, &DataType::Date).expect("truncate");
        assert_eq!(start, day(2024, 1, 8));
        assert_eq!(
            date_to_naive(i32::try_from(start).expect("fits")).map(|d| d.format("%a").to_string()),
            Some("Mon".to_owned())
        );
    }

    #[test]
    fn fixed_truncation_floors_negative_values() {
        let unit = TimeUnit::Microseconds;
        let ts = naive_to_datetime(
            NaiveDate::from_ymd_opt(1969, 12, 31)
                .and_then(|d| d.and_hms_opt(23, 30, 0))
                .expect("valid"),
            unit,
        )
        .expect("in range");
        let hour = Duration::parse("1h").expect("parse");
        assert_eq!(
            hour.truncate(ts, &DataType::Datetime(unit)).expect("truncate"),
            -3_600_000_000
        );
    }

    #[test]
    fn index_durations_apply_only_to_integers() {
        let steps = Duration::from_index(2);
        assert_eq!(steps.truncate(7, &DataType::Int64).expect("truncate"), 6);
        assert!(steps.add_to(1, &DataType::Date).is_err());
        assert!(Duration::parse("1d").expect("parse").add_to(1, &DataType::Int32).is_err());
    }

    #[test]
    fn unit_conversion_floors_when_coarsening() {
        assert_eq!(
            TimeUnit::Nanoseconds.convert(-1, TimeUnit::Milliseconds),
            Some(-1)
        );
        assert_eq!(
            TimeUnit::Milliseconds.convert(5, TimeUnit::Microseconds),
            Some(5_000)
        );
    }
}
