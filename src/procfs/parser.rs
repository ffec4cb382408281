//! Generic line parsers shared by the procfs and cgroup readers.
//!
//! - [`KeyValueStat`]: tables such as `/proc/meminfo`, `/proc/<pid>/status` or cgroup
//!   `*.stat` files, where each line carries one or more key/value pairs.
//! - [`SingleLineStat`]: one-line files such as `/proc/loadavg`, `cpu.max` or `pids.current`.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::LazyLock;
//! use service_probe::procfs::KeyValueStat;
//!
//! #[derive(Default)]
//! struct Swap {
//!     total: u64,
//!     free: u64,
//! }
//!
//! static HANDLERS: LazyLock<HashMap<&'static str, fn(&mut Swap, u64)>> = LazyLock::new(|| {
//!     let mut map: HashMap<&'static str, fn(&mut Swap, u64)> = HashMap::new();
//!     map.insert("SwapTotal:", |s, v| s.total = v);
//!     map.insert("SwapFree:", |s, v| s.free = v);
//!     map
//! });
//!
//! impl KeyValueStat for Swap {
//!     const SPLIT_CHAR: Option<char> = None;
//!     const SKIP_LINES: usize = 0;
//!     const SKIP_VALUES: usize = 0;
//!     const ALLOW_DUPLICATE_KEYS: bool = false;
//!     const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;
//!
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
//!         &HANDLERS
//!     }
//! }
//!
//! let swap = Swap::from_reader(&mut "SwapTotal: 8 kB\nSwapFree: 2 kB\n".as_bytes()).unwrap();
//! assert_eq!((swap.total, swap.free), (8, 2));
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

/// A key/value table parsed line by line.
///
/// Implementors list the keys they care about together with a setter; every other key is
/// handed to [`KeyValueStat::on_unknown_key`], which ignores it by default.
pub trait KeyValueStat: Default
where
    Self: 'static,
{
    /// `Some(c)` for `key<c>value` tokens (`rbps=1024`), `None` for whitespace separated
    /// key and value (`MemTotal: 1024 kB`).
    const SPLIT_CHAR: Option<char>;

    /// Header lines to skip before parsing begins.
    const SKIP_LINES: usize;

    /// Whitespace separated tokens to skip at the start of every line.
    const SKIP_VALUES: usize;

    /// Whether a key may appear more than once. When `false`, a repeated key is an error and
    /// parsing stops early once every known key has been seen.
    const ALLOW_DUPLICATE_KEYS: bool;

    /// Whether a line may carry several pairs, or only its first one is read.
    const ALLOW_MULTIPLE_KV_PER_LINE: bool;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)>;

    /// # Errors
    ///
    /// The reader's I/O errors, and [`StatParseError`] (as `InvalidData`) for a value that is
    /// not an unsigned integer or a disallowed duplicate key.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let field_count = handlers.len();
        let mut seen_keys = HashSet::with_capacity(field_count);

        let mut line = String::new();
        let mut lineno = 0;
        for _ in 0..Self::SKIP_LINES {
            buf.read_line(&mut line)?;
            line.clear();
        }

        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            Self::parse_line(&mut stat, &line, lineno, handlers, &mut seen_keys)?;
            if !Self::ALLOW_DUPLICATE_KEYS && seen_keys.len() == field_count {
                break;
            }

            line.clear();
        }

        Ok(stat)
    }

    fn parse_line(
        stat: &mut Self,
        line: &str,
        lineno: usize,
        handlers: &HashMap<&'static str, fn(&mut Self, u64)>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        let mut parts = line.split_whitespace().skip(Self::SKIP_VALUES);

        if let Some(split_char) = Self::SPLIT_CHAR {
            for part in parts {
                if let Some((key, val)) = part.split_once(split_char) {
                    Self::parse_and_set(key, val, stat, lineno, handlers, seen_keys)?;
                }
                if !Self::ALLOW_MULTIPLE_KV_PER_LINE {
                    break;
                }
            }
        } else {
            while let (Some(key), Some(val)) = (parts.next(), parts.next()) {
                Self::parse_and_set(key, val, stat, lineno, handlers, seen_keys)?;
                if !Self::ALLOW_MULTIPLE_KV_PER_LINE {
                    break;
                }
            }
        }
        Ok(())
    }

    fn parse_and_set(
        key: &str,
        val: &str,
        stat: &mut Self,
        lineno: usize,
        handlers: &HashMap<&'static str, fn(&mut Self, u64)>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        let Some((k, handler)) = handlers.get_key_value(key) else {
            return Self::on_unknown_key(key, val, lineno);
        };

        let parsed = val
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_string(),
                value: val.to_string(),
                line: lineno,
                source,
            })?;
        if !Self::ALLOW_DUPLICATE_KEYS && !seen_keys.insert(k) {
            return Err(StatParseError::DuplicateField {
                field: key.to_string(),
                line: lineno,
            }
            .into());
        }
        handler(stat, parsed);
        Ok(())
    }

    #[inline]
    fn on_unknown_key(_key: &str, _val: &str, _lineno: usize) -> std::io::Result<()> {
        Ok(())
    }
}

/// A statistic that fits on one line.
pub trait SingleLineStat: Sized + Default {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self>;
}

/// Reads the first line of `buf`, without its line terminator.
pub(crate) fn first_line<R: BufRead>(buf: &mut R) -> std::io::Result<String> {
    let mut line = String::new();
    buf.read_line(&mut line)?;
    Ok(line.trim_end().to_owned())
}

/// `"max"` as `None`, anything else as an unsigned integer.
pub(crate) fn parse_max(value: &str, lineno: usize) -> Result<Option<u64>, StatParseError> {
    if value == "max" {
        return Ok(None);
    }
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|source| StatParseError::InvalidValue {
            value: value.to_string(),
            line: lineno,
            source,
        })
}

pub(crate) fn parse_decimal(value: &str, lineno: usize) -> Result<f64, StatParseError> {
    value
        .parse::<f64>()
        .map_err(|source| StatParseError::InvalidDecimal {
            value: value.to_string(),
            line: lineno,
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::procfs::error::extract_stat_parse_error;

    #[derive(Debug, Default, PartialEq)]
    struct Limits {
        rbps: u64,
        wbps: u64,
    }

    static LIMIT_SETTERS: LazyLock<HashMap<&'static str, fn(&mut Limits, u64)>> =
        LazyLock::new(|| {
            let mut m: HashMap<&'static str, fn(&mut Limits, u64)> = HashMap::new();
            m.insert("rbps", |s, v| s.rbps = v);
            m.insert("wbps", |s, v| s.wbps = v);
            m
        });

    impl KeyValueStat for Limits {
        const SPLIT_CHAR: Option<char> = Some('=');
        const SKIP_LINES: usize = 0;
        const SKIP_VALUES: usize = 1;
        const ALLOW_DUPLICATE_KEYS: bool = true;
        const ALLOW_MULTIPLE_KV_PER_LINE: bool = true;

        fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
            &LIMIT_SETTERS
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Table {
        total: u64,
        free: u64,
    }

    static TABLE_SETTERS: LazyLock<HashMap<&'static str, fn(&mut Table, u64)>> =
        LazyLock::new(|| {
            let mut m: HashMap<&'static str, fn(&mut Table, u64)> = HashMap::new();
            m.insert("Total:", |s, v| s.total = v);
            m.insert("Free:", |s, v| s.free = v);
            m
        });

    impl KeyValueStat for Table {
        const SPLIT_CHAR: Option<char> = None;
        const SKIP_LINES: usize = 1;
        const SKIP_VALUES: usize = 0;
        const ALLOW_DUPLICATE_KEYS: bool = false;
        const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

        fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
            &TABLE_SETTERS
        }
    }

    #[test]
    fn test_split_pairs_skip_leading_values() {
        let data = "8:0 rbps=100 wbps=200 riops=max\n";
        let stat = Limits::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat, Limits { rbps: 100, wbps: 200 });
    }

    #[test]
    fn test_flat_pairs_with_header_and_units() {
        let data = "header line\nTotal: 10 kB\nOther: 5 kB\nFree: 4 kB\n";
        let stat = Table::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat, Table { total: 10, free: 4 });
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let data = "header\nTotal: 10\nTotal: 11\n";
        let err = Table::from_reader(&mut data.as_bytes()).unwrap_err();
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::DuplicateField { line: 2, .. }
        ));
    }

    #[test]
    fn test_invalid_value_rejected() {
        let data = "header\nTotal: lots\n";
        let err = Table::from_reader(&mut data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::InvalidKeyValue { line: 1, .. }
        ));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(first_line(&mut "42\nrest".as_bytes()).unwrap(), "42");
        assert_eq!(parse_max("max", 1).unwrap(), None);
        assert_eq!(parse_max("7", 1).unwrap(), Some(7));
        assert!(parse_max("-1", 1).is_err());
        assert_eq!(parse_decimal("0.25", 1).unwrap(), 0.25);
        assert!(parse_decimal("x", 1).is_err());
    }
}
