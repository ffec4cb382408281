//! Pressure stall information from `/proc/pressure/{cpu,memory,io}`.
//!
//! Each file holds a `some` line and, except for `cpu` on older kernels, a `full` line:
//!
//! ```text
//! some avg10=0.12 avg60=0.05 avg300=0.01 total=123456
//! full avg10=0.00 avg60=0.00 avg300=0.00 total=0
//! ```

use std::io::BufRead;

use super::StatParseError;
use super::parser::parse_decimal;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PressureLine {
    pub avg10: f64,
    pub avg60: f64,
    pub avg300: f64,
    /// Accumulated stall time in microseconds.
    pub total_us: u64,
}

impl PressureLine {
    fn parse<'a>(fields: impl Iterator<Item = &'a str>, lineno: usize) -> Result<Self, StatParseError> {
        let mut line = PressureLine::default();
        for field in fields {
            let Some((key, value)) = field.split_once('=') else {
                continue;
            };
            match key {
                "avg10" => line.avg10 = parse_decimal(value, lineno)?,
                "avg60" => line.avg60 = parse_decimal(value, lineno)?,
                "avg300" => line.avg300 = parse_decimal(value, lineno)?,
                "total" => {
                    line.total_us =
                        value
                            .parse()
                            .map_err(|source| StatParseError::InvalidKeyValue {
                                key: key.to_string(),
                                value: value.to_string(),
                                line: lineno,
                                source,
                            })?;
                }
                _ => {}
            }
        }
        Ok(line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pressure {
    pub some: PressureLine,
    /// `None` when the file has no `full` line.
    pub full: Option<PressureLine>,
}

impl Pressure {
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut pressure = Pressure::default();
        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("some") => pressure.some = PressureLine::parse(fields, lineno)?,
                Some("full") => pressure.full = Some(PressureLine::parse(fields, lineno)?),
                _ => {}
            }
            line.clear();
        }
        Ok(pressure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procfs::error::extract_stat_parse_error;

    #[test]
    fn test_some_and_full() {
        let data = "\
some avg10=1.50 avg60=0.75 avg300=0.10 total=123456
full avg10=0.50 avg60=0.25 avg300=0.00 total=654
";
        let pressure = Pressure::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(pressure.some.avg10, 1.5);
        assert_eq!(pressure.some.avg300, 0.1);
        assert_eq!(pressure.some.total_us, 123_456);
        let full = pressure.full.unwrap();
        assert_eq!(full.avg60, 0.25);
        assert_eq!(full.total_us, 654);
    }

    #[test]
    fn test_some_only() {
        let data = "some avg10=0.00 avg60=0.00 avg300=0.00 total=42\n";
        let pressure = Pressure::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(pressure.some.total_us, 42);
        assert_eq!(pressure.full, None);
    }

    #[test]
    fn test_bad_average() {
        let data = "some avg10=abc avg60=0.00 avg300=0.00 total=42\n";
        let err = Pressure::from_reader(&mut data.as_bytes()).unwrap_err();
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::InvalidDecimal { line: 1, .. }
        ));
    }
}
