use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid XMP date '{0}'")]
pub struct DateParseError(pub String);

/// Offset from UTC in minutes, positive east of Greenwich.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TzOffset(pub i16);

/// An XMP date value (ISO 8601 subset, components after the year optional).
///
/// Missing components read as zero, the same way XMP toolkits report them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmpDateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
    pub offset: Option<TzOffset>,
}

impl XmpDateTime {
    /// Compares year through second only.
    ///
    /// Sub-second and timezone fields are ignored, so `10:00:00+02:00` and
    /// `10:00:00Z` compare equal even though they are different instants.
    pub fn same_to_the_second(&self, other: &XmpDateTime) -> bool {
        (
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        ) == (
            other.year,
            other.month,
            other.day,
            other.hour,
            other.minute,
            other.second,
        )
    }
}

fn number<T: FromStr>(field: &str, max_digits: usize, raw: &str) -> Result<T, DateParseError> {
    if field.is_empty() || field.len() > max_digits || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateParseError(raw.to_string()));
    }
    field.parse().map_err(|_| DateParseError(raw.to_string()))
}

fn in_range<T: PartialOrd>(value: T, min: T, max: T, raw: &str) -> Result<T, DateParseError> {
    if value < min || value > max {
        return Err(DateParseError(raw.to_string()));
    }
    Ok(value)
}

fn parse_offset(tz: &str, raw: &str) -> Result<TzOffset, DateParseError> {
    if tz == "Z" {
        return Ok(TzOffset(0));
    }
    let sign: i16 = match tz.as_bytes().first() {
        Some(b'+') => 1,
        Some(b'-') => -1,
        _ => return Err(DateParseError(raw.to_string())),
    };
    let body = &tz[1..];
    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) => (h, m),
        None if body.len() == 4 => body.split_at(2),
        None => (body, "0"),
    };
    let hours: i16 = in_range(number(hours, 2, raw)?, 0, 23, raw)?;
    let minutes: i16 = in_range(number(minutes, 2, raw)?, 0, 59, raw)?;
    Ok(TzOffset(sign * (hours * 60 + minutes)))
}

impl FromStr for XmpDateTime {
    type Err = DateParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        let mut dt = XmpDateTime::default();

        let (date, time) = match s.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (s, None),
        };

        let mut parts = date.split('-');
        dt.year = number(parts.next().unwrap_or(""), 4, raw)?;
        if let Some(month) = parts.next() {
            dt.month = in_range(number(month, 2, raw)?, 1, 12, raw)?;
        }
        if let Some(day) = parts.next() {
            if dt.month == 0 {
                return Err(DateParseError(raw.to_string()));
            }
            dt.day = in_range(number(day, 2, raw)?, 1, 31, raw)?;
        }
        if parts.next().is_some() {
            return Err(DateParseError(raw.to_string()));
        }

        let Some(time) = time else {
            return Ok(dt);
        };
        if dt.day == 0 {
            return Err(DateParseError(raw.to_string()));
        }

        let (clock, tz) = match time.find(['Z', '+', '-']) {
            Some(i) => (&time[..i], Some(&time[i..])),
            None => (time, None),
        };

        let mut fields = clock.split(':');
        dt.hour = in_range(number(fields.next().unwrap_or(""), 2, raw)?, 0, 23, raw)?;
        dt.minute = in_range(
            number(fields.next().ok_or_else(|| DateParseError(raw.to_string()))?, 2, raw)?,
            0,
            59,
            raw,
        )?;
        if let Some(seconds) = fields.next() {
            let (whole, fraction) = match seconds.split_once('.') {
                Some((w, f)) => (w, Some(f)),
                None => (seconds, None),
            };
            // 60 allows for leap seconds
            dt.second = in_range(number(whole, 2, raw)?, 0, 60, raw)?;
            if let Some(fraction) = fraction {
                let digits: String = fraction.chars().take(9).collect();
                let value: u32 = number(&digits, 9, raw)?;
                dt.nanosecond = value * 10u32.pow(9 - digits.len() as u32);
            }
        }
        if fields.next().is_some() {
            return Err(DateParseError(raw.to_string()));
        }

        if let Some(tz) = tz {
            dt.offset = Some(parse_offset(tz, raw)?);
        }

        Ok(dt)
    }
}
