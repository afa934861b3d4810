//! Range-checked scalar wrappers and the lossless numeric formatter.

use std::fmt;
use std::str::FromStr;

use crate::error::{GpxError, Result};

/// Longitude in decimal degrees, -180.0 inclusive to 180.0 exclusive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Longitude(f64);

impl Longitude {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && (-180.0..180.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(GpxError::OutOfRange {
                what: "longitude",
                value,
            })
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Longitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Latitude in decimal degrees, -90.0 to 90.0 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Latitude(f64);

impl Latitude {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && (-90.0..=90.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(GpxError::OutOfRange {
                what: "latitude",
                value,
            })
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Latitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bearing or variation in degrees, 0.0 inclusive to 360.0 exclusive.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct Degrees(f64);

impl Degrees {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && (0.0..360.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(GpxError::OutOfRange {
                what: "degrees",
                value,
            })
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A DGPS reference station identifier, 0 to 1023.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DgpsStation(u16);

impl DgpsStation {
    pub fn new(value: u16) -> Result<Self> {
        if value < 1024 {
            Ok(Self(value))
        } else {
            Err(GpxError::OutOfRange {
                what: "dgps station id",
                value: f64::from(value),
            })
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for DgpsStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The offset suffix a gYear may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearOffset {
    Utc,
    /// Minutes east of UTC, as in `+05:30` = 330.
    Minutes(i16),
}

/// A copyright year: an xsd:gYear with an optional UTC offset suffix
/// (`Z` or `+HH:MM`/`-HH:MM`). Parses and re-formats exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Year {
    pub year: i32,
    pub offset: Option<YearOffset>,
}

impl Year {
    pub fn new(year: i32) -> Self {
        Self { year, offset: None }
    }
}

impl FromStr for Year {
    type Err = GpxError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || GpxError::InvalidValue {
            element: "year",
            value: s.to_string(),
            reason: "expected a gYear with optional offset",
        };
        if s.is_empty() {
            return Err(bad());
        }
        // A sign at position 0 belongs to the year itself, so search for the
        // offset separator from position 1 on.
        let (digits, offset) = if let Some(rest) = s.strip_suffix('Z') {
            (rest, Some(YearOffset::Utc))
        } else if let Some(pos) = s[1..].find(['+', '-']).map(|i| i + 1) {
            let (digits, off) = s.split_at(pos);
            let minutes = parse_offset(off).ok_or_else(bad)?;
            (digits, Some(YearOffset::Minutes(minutes)))
        } else {
            (s, None)
        };
        let (negative, digits) = match digits.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, digits),
        };
        if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let year: i32 = digits.parse().map_err(|_| bad())?;
        Ok(Self {
            year: if negative { -year } else { year },
            offset,
        })
    }
}

fn parse_offset(s: &str) -> Option<i16> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1i16, &s[1..]),
        b'-' => (-1i16, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i16 = hours.parse().ok()?;
    let minutes: i16 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year < 0 {
            write!(f, "-{:04}", -self.year)?;
        } else {
            write!(f, "{:04}", self.year)?;
        }
        match self.offset {
            None => Ok(()),
            Some(YearOffset::Utc) => f.write_str("Z"),
            Some(YearOffset::Minutes(m)) => {
                let sign = if m < 0 { '-' } else { '+' };
                let m = m.unsigned_abs();
                write!(f, "{sign}{:02}:{:02}", m / 60, m % 60)
            }
        }
    }
}

/// GPS fix quality, with the literal tokens the format mandates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fix {
    None,
    TwoD,
    ThreeD,
    Dgps,
    Pps,
}

impl Fix {
    pub fn token(self) -> &'static str {
        match self {
            Fix::None => "none",
            Fix::TwoD => "2d",
            Fix::ThreeD => "3d",
            Fix::Dgps => "dgps",
            Fix::Pps => "pps",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Fix::None),
            "2d" => Some(Fix::TwoD),
            "3d" => Some(Fix::ThreeD),
            "dgps" => Some(Fix::Dgps),
            "pps" => Some(Fix::Pps),
            _ => None,
        }
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Round-trip-safe decimal rendering of a finite double.
///
/// The shortest round-trip form may legally use exponent notation for values
/// very close to zero, which the GPX numeric grammar forbids. When that
/// happens, fall back to fixed significant-digit renderings, widening from 15
/// to 17 digits until the candidate parses back to the exact input.
pub fn format_f64(value: f64) -> String {
    let shortest = value.to_string();
    if !shortest.contains(['e', 'E']) {
        return shortest;
    }
    for significant in 15..=17 {
        let candidate = format_fixed(value, significant);
        if candidate.parse::<f64>() == Ok(value) {
            return candidate;
        }
    }
    format_fixed(value, 17)
}

fn format_fixed(value: f64, significant: i32) -> String {
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (significant - 1 - magnitude).max(0) as usize;
    let mut s = format!("{value:.decimals$}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longitude_bounds() {
        assert!(Longitude::new(-180.0).is_ok());
        assert!(Longitude::new(179.999999).is_ok());
        assert!(Longitude::new(0.0).is_ok());
        assert!(Longitude::new(180.0).is_err());
        assert!(Longitude::new(-180.0001).is_err());
        assert!(Longitude::new(f64::NAN).is_err());
        assert!(Longitude::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_latitude_bounds() {
        assert!(Latitude::new(-90.0).is_ok());
        assert!(Latitude::new(90.0).is_ok());
        assert!(Latitude::new(90.0001).is_err());
        assert!(Latitude::new(-90.0001).is_err());
        assert!(Latitude::new(f64::NAN).is_err());
    }

    #[test]
    fn test_degrees_bounds() {
        assert!(Degrees::new(0.0).is_ok());
        assert!(Degrees::new(359.999).is_ok());
        assert!(Degrees::new(360.0).is_err());
        assert!(Degrees::new(-0.001).is_err());
    }

    #[test]
    fn test_station_bounds() {
        assert!(DgpsStation::new(0).is_ok());
        assert!(DgpsStation::new(1023).is_ok());
        assert!(DgpsStation::new(1024).is_err());
    }

    #[test]
    fn test_stored_value_equals_input() {
        assert_eq!(Longitude::new(139.6503).unwrap().get(), 139.6503);
        assert_eq!(Latitude::new(-35.6762).unwrap().get(), -35.6762);
        assert_eq!(Degrees::new(123.4).unwrap().get(), 123.4);
        assert_eq!(DgpsStation::new(42).unwrap().get(), 42);
    }

    #[test]
    fn test_ordering_delegates_to_primitive() {
        assert!(Latitude::new(1.0).unwrap() < Latitude::new(2.0).unwrap());
        assert!(DgpsStation::new(1).unwrap() < DgpsStation::new(2).unwrap());
    }

    #[test]
    fn test_year_plain() {
        let y: Year = "2024".parse().unwrap();
        assert_eq!(y.year, 2024);
        assert_eq!(y.offset, None);
        assert_eq!(y.to_string(), "2024");
    }

    #[test]
    fn test_year_utc() {
        let y: Year = "2024Z".parse().unwrap();
        assert_eq!(y.offset, Some(YearOffset::Utc));
        assert_eq!(y.to_string(), "2024Z");
    }

    #[test]
    fn test_year_offset() {
        let y: Year = "2024+05:30".parse().unwrap();
        assert_eq!(y.offset, Some(YearOffset::Minutes(330)));
        assert_eq!(y.to_string(), "2024+05:30");

        let y: Year = "1999-08:00".parse().unwrap();
        assert_eq!(y.offset, Some(YearOffset::Minutes(-480)));
        assert_eq!(y.to_string(), "1999-08:00");
    }

    #[test]
    fn test_year_negative() {
        let y: Year = "-0044".parse().unwrap();
        assert_eq!(y.year, -44);
        assert_eq!(y.to_string(), "-0044");
    }

    #[test]
    fn test_year_rejects_garbage() {
        assert!("".parse::<Year>().is_err());
        assert!("24".parse::<Year>().is_err());
        assert!("twenty".parse::<Year>().is_err());
        assert!("2024+5:00".parse::<Year>().is_err());
        assert!("2024+25:00".parse::<Year>().is_err());
    }

    #[test]
    fn test_fix_tokens() {
        for fix in [Fix::None, Fix::TwoD, Fix::ThreeD, Fix::Dgps, Fix::Pps] {
            assert_eq!(Fix::from_token(fix.token()), Some(fix));
        }
        assert_eq!(Fix::from_token("2D"), None);
        assert_eq!(Fix::from_token(""), None);
    }

    #[test]
    fn test_format_f64_plain() {
        assert_eq!(format_f64(0.0), "0");
        assert_eq!(format_f64(0.00001), "0.00001");
        assert_eq!(format_f64(-123.456), "-123.456");
        assert_eq!(format_f64(180.0), "180");
    }

    #[test]
    fn test_format_f64_no_exponent_ever() {
        for v in [
            f64::MIN_POSITIVE,
            -f64::MIN_POSITIVE,
            5e-324,
            -5e-324,
            1e300,
            1.7976931348623157e308,
            1e-200,
        ] {
            let s = format_f64(v);
            assert!(!s.contains(['e', 'E']), "exponent leaked: {s}");
            assert_eq!(s.parse::<f64>().unwrap(), v, "not exact: {s}");
        }
    }

    #[test]
    fn test_format_f64_exact_round_trip() {
        for v in [
            0.1,
            1.0 / 3.0,
            139.65034999999999,
            -0.000123456789012345,
            f64::EPSILON,
        ] {
            let s = format_f64(v);
            assert_eq!(s.parse::<f64>().unwrap(), v);
        }
    }
}
