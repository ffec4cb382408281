//! `/proc/stat` and `/proc/cpuinfo`.

use std::io::BufRead;

use super::StatParseError;

/// Jiffies of the aggregate `cpu` line of `/proc/stat`, accumulated since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

const CPU_FIELDS: [&str; 8] = [
    "user", "nice", "system", "idle", "iowait", "irq", "softirq", "steal",
];

impl CpuTimes {
    /// Parses the first line starting with `cpu ` (the sum over all cores).
    ///
    /// # Errors
    ///
    /// [`StatParseError::MissingField`] when there is no aggregate line or it has fewer than
    /// eight counters.
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            if let Some(rest) = line.strip_prefix("cpu ") {
                return Self::from_fields(rest, lineno);
            }
            line.clear();
        }
        Err(StatParseError::MissingField {
            field: "cpu",
            line: lineno,
        }
        .into())
    }

    fn from_fields(rest: &str, lineno: usize) -> std::io::Result<Self> {
        let mut values = [0u64; 8];
        let mut fields = rest.split_whitespace();
        for (slot, name) in values.iter_mut().zip(CPU_FIELDS) {
            let field = fields.next().ok_or(StatParseError::MissingField {
                field: name,
                line: lineno,
            })?;
            *slot = field
                .parse()
                .map_err(|source| StatParseError::InvalidKeyValue {
                    key: name.to_string(),
                    value: field.to_string(),
                    line: lineno,
                    source,
                })?;
        }
        let [user, nice, system, idle, iowait, irq, softirq, steal] = values;
        Ok(Self {
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
        })
    }

    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    fn percent(&self, part: u64) -> f64 {
        match self.total() {
            0 => 0.0,
            total => part as f64 / total as f64 * 100.0,
        }
    }

    /// User time including niced processes.
    pub fn user_percent(&self) -> f64 {
        self.percent(self.user + self.nice)
    }

    /// Kernel time including interrupt handling.
    pub fn system_percent(&self) -> f64 {
        self.percent(self.system + self.irq + self.softirq)
    }

    pub fn idle_percent(&self) -> f64 {
        self.percent(self.idle)
    }

    pub fn iowait_percent(&self) -> f64 {
        self.percent(self.iowait)
    }

    pub fn steal_percent(&self) -> f64 {
        self.percent(self.steal)
    }
}

/// Logical core count and clock from `/proc/cpuinfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuInfo {
    pub cores: u32,
    /// Last `cpu MHz` value seen; 0 on architectures that do not report it.
    pub frequency_mhz: u64,
}

impl CpuInfo {
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut info = CpuInfo::default();
        let mut line = String::new();
        while buf.read_line(&mut line)? != 0 {
            if let Some((key, value)) = line.split_once(':') {
                match key.trim() {
                    "processor" => info.cores += 1,
                    "cpu MHz" => {
                        if let Ok(mhz) = value.trim().parse::<f64>() {
                            info.frequency_mhz = mhz as u64;
                        }
                    }
                    _ => {}
                }
            }
            line.clear();
        }
        Ok(info)
    }
}
