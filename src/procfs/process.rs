//! `/proc/<pid>/stat` and `/proc/<pid>/status`.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::LazyLock;

use super::parser::first_line;
use super::{KeyValueStat, SingleLineStat, StatParseError};

/// Fields of `/proc/<pid>/stat` used by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessStat {
    pub comm: String,
    /// Single-letter scheduler state (`R`, `S`, `D`, ...).
    pub state: char,
    /// User time in clock ticks.
    pub utime: u64,
    /// System time in clock ticks.
    pub stime: u64,
    pub num_threads: u32,
}

impl ProcessStat {
    /// Numeric state code understood by the process builders.
    pub fn state_code(&self) -> u8 {
        match self.state {
            'R' => 1,
            'S' => 2,
            'D' => 3,
            'T' | 't' => 4,
            'Z' => 5,
            'I' => 6,
            'X' | 'x' => 7,
            _ => 0,
        }
    }
}

impl SingleLineStat for ProcessStat {
    /// The command name may itself contain spaces and parentheses, so everything up to the
    /// last `)` belongs to it.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = first_line(buf)?;
        let (open, close) = match (line.find('('), line.rfind(')')) {
            (Some(open), Some(close)) if open < close => (open, close),
            _ => {
                return Err(StatParseError::MissingField {
                    field: "comm",
                    line: 1,
                }
                .into());
            }
        };

        let comm = line[open + 1..close].to_owned();
        let fields: Vec<&str> = line[close + 1..].split_whitespace().collect();
        let field = |index: usize, name: &'static str| -> Result<u64, StatParseError> {
            let value = fields
                .get(index)
                .ok_or(StatParseError::MissingField { field: name, line: 1 })?;
            value.parse().map_err(|source| StatParseError::InvalidKeyValue {
                key: name.to_string(),
                value: value.to_string(),
                line: 1,
                source,
            })
        };

        let state = fields
            .first()
            .and_then(|state| state.chars().next())
            .ok_or(StatParseError::MissingField {
                field: "state",
                line: 1,
            })?;

        Ok(ProcessStat {
            comm,
            state,
            utime: field(11, "utime")?,
            stime: field(12, "stime")?,
            num_threads: u32::try_from(field(17, "num_threads")?).unwrap_or(u32::MAX),
        })
    }
}

/// Memory figures from `/proc/<pid>/status`, converted from kB to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessStatus {
    pub vm_size: u64,
    pub vm_rss: u64,
}

type Setter = fn(&mut ProcessStatus, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(2);

    m.insert("VmSize:", |s, v| s.vm_size = v.saturating_mul(1024));
    m.insert("VmRSS:", |s, v| s.vm_rss = v.saturating_mul(1024));

    m
});

impl KeyValueStat for ProcessStatus {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_LINES: usize = 0;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}
