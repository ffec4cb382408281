use std::io::BufRead;

use super::parser::{first_line, parse_decimal};
use super::{SingleLineStat, StatParseError};

/// The three run-queue averages at the start of `/proc/loadavg`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadAvg {
    pub load_1min: f64,
    pub load_5min: f64,
    pub load_15min: f64,
}

impl SingleLineStat for LoadAvg {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = first_line(buf)?;
        let mut fields = line.split_whitespace();
        let mut next = |field: &'static str| -> Result<f64, StatParseError> {
            let value = fields
                .next()
                .ok_or(StatParseError::MissingField { field, line: 1 })?;
            parse_decimal(value, 1)
        };

        Ok(LoadAvg {
            load_1min: next("load_1min")?,
            load_5min: next("load_5min")?,
            load_15min: next("load_15min")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procfs::error::extract_stat_parse_error;

    #[test]
    fn test_parse_loadavg() {
        let load = LoadAvg::from_reader(&mut "0.52 0.58 0.59 2/1234 56789\n".as_bytes()).unwrap();
        assert_eq!(
            load,
            LoadAvg {
                load_1min: 0.52,
                load_5min: 0.58,
                load_15min: 0.59,
            }
        );
    }

    #[test]
    fn test_truncated_loadavg() {
        let err = LoadAvg::from_reader(&mut "0.52 0.58\n".as_bytes()).unwrap_err();
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::MissingField {
                field: "load_15min",
                ..
            }
        ));
    }

    #[test]
    fn test_garbage_loadavg() {
        let err = LoadAvg::from_reader(&mut "high 0.58 0.59\n".as_bytes()).unwrap_err();
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::InvalidDecimal { .. }
        ));
    }
}
