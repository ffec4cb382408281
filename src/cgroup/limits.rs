//! Single-value cgroup v2 interface files: `cpu.max`, `memory.max`, `pids.max`, `io.max`,
//! `memory.current` and `pids.current`.

use std::io::BufRead;

use crate::procfs::{SingleLineStat, StatParseError, first_line, parse_max};

const DEFAULT_PERIOD: u64 = 100_000;

/// `cpu.max`: `<quota> <period>` in microseconds, quota `max` for none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuLimit {
    /// `None` when the quota is `max`.
    pub quota: Option<u64>,
    /// Defaults to 100ms when the file omits it.
    pub period: u64,
}

impl Default for CpuLimit {
    fn default() -> Self {
        Self {
            quota: None,
            period: DEFAULT_PERIOD,
        }
    }
}

impl SingleLineStat for CpuLimit {
    /// Lenient: an unreadable quota counts as no quota, an unreadable period as the default.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = first_line(buf)?;
        let mut parts = line.split_whitespace();
        let quota_str = parts.next().unwrap_or("max");
        let period = parts
            .next()
            .and_then(|p| p.parse::<u64>().ok())
            .unwrap_or(DEFAULT_PERIOD);

        let quota = if quota_str == "max" {
            None
        } else {
            quota_str.parse::<u64>().ok()
        };

        Ok(CpuLimit { quota, period })
    }
}

/// A `*.max` file holding a number or `max`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Limit {
    /// `None` represents `max`, meaning no limit is set.
    pub value: Option<u64>,
}

impl SingleLineStat for Limit {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = first_line(buf)?;
        Ok(Limit {
            value: parse_max(line.trim(), 1)?,
        })
    }
}

/// A `*.current` file holding one counter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Current {
    pub value: u64,
}

impl SingleLineStat for Current {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = first_line(buf)?;
        let line = line.trim();
        let value = line
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidValue {
                value: line.to_string(),
                line: 1,
                source,
            })?;
        Ok(Current { value })
    }
}

/// `io.max`: one `MAJ:MIN rbps=.. wbps=.. riops=.. wiops=..` line per throttled device.
///
/// When several devices are throttled, the most restrictive byte rate wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IoLimit {
    pub read_bps: Option<u64>,
    pub write_bps: Option<u64>,
}

fn tighter(current: Option<u64>, candidate: Option<u64>) -> Option<u64> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

impl IoLimit {
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut limit = IoLimit::default();
        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            for part in line.split_whitespace().skip(1) {
                match part.split_once('=') {
                    Some(("rbps", value)) => {
                        limit.read_bps = tighter(limit.read_bps, parse_max(value, lineno)?);
                    }
                    Some(("wbps", value)) => {
                        limit.write_bps = tighter(limit.write_bps, parse_max(value, lineno)?);
                    }
                    _ => {}
                }
            }
            line.clear();
        }
        Ok(limit)
    }
}
