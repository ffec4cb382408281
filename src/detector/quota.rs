//! Resource ceilings and their current consumption for one process.

/// Value used by the kernel and by this crate for "no limit".
pub const UNLIMITED: u64 = u64::MAX;

pub const QUOTA_FLAG_CPU: u32 = 1 << 0;
pub const QUOTA_FLAG_MEMORY: u32 = 1 << 1;
pub const QUOTA_FLAG_PIDS: u32 = 1 << 2;
pub const QUOTA_FLAG_NOFILE: u32 = 1 << 3;
pub const QUOTA_FLAG_CPU_TIME: u32 = 1 << 4;
pub const QUOTA_FLAG_DATA: u32 = 1 << 5;
pub const QUOTA_FLAG_IO_READ: u32 = 1 << 6;
pub const QUOTA_FLAG_IO_WRITE: u32 = 1 << 7;

/// Limits applying to a process.
///
/// A field is only meaningful when its `QUOTA_FLAG_*` bit is set in [`QuotaLimits::flags`].
/// An unset flag, a zero value and [`UNLIMITED`] all mean "no limit".
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct QuotaLimits {
    pub cpu_quota_us: u64,
    pub cpu_period_us: u64,
    pub memory_limit_bytes: u64,
    pub pids_limit: u64,
    pub nofile_limit: u64,
    pub cpu_time_limit_secs: u64,
    pub data_limit_bytes: u64,
    pub io_read_bps: u64,
    pub io_write_bps: u64,
    pub flags: u32,
}

impl QuotaLimits {
    fn limited(&self, flag: u32, value: u64) -> bool {
        self.flags & flag != 0 && value > 0 && value != UNLIMITED
    }

    pub fn has_cpu_limit(&self) -> bool {
        self.limited(QUOTA_FLAG_CPU, self.cpu_quota_us)
    }

    pub fn has_memory_limit(&self) -> bool {
        self.limited(QUOTA_FLAG_MEMORY, self.memory_limit_bytes)
    }

    pub fn has_pids_limit(&self) -> bool {
        self.limited(QUOTA_FLAG_PIDS, self.pids_limit)
    }

    pub fn has_nofile_limit(&self) -> bool {
        self.limited(QUOTA_FLAG_NOFILE, self.nofile_limit)
    }

    pub fn has_cpu_time_limit(&self) -> bool {
        self.limited(QUOTA_FLAG_CPU_TIME, self.cpu_time_limit_secs)
    }

    pub fn has_data_limit(&self) -> bool {
        self.limited(QUOTA_FLAG_DATA, self.data_limit_bytes)
    }

    pub fn has_io_read_limit(&self) -> bool {
        self.limited(QUOTA_FLAG_IO_READ, self.io_read_bps)
    }

    pub fn has_io_write_limit(&self) -> bool {
        self.limited(QUOTA_FLAG_IO_WRITE, self.io_write_bps)
    }

    /// CPU ceiling as a percentage of one core; 0 without a CPU limit.
    pub fn cpu_limit_percent(&self) -> f64 {
        if !self.has_cpu_limit() || self.cpu_period_us == 0 {
            return 0.0;
        }
        self.cpu_quota_us as f64 / self.cpu_period_us as f64 * 100.0
    }
}

/// Current consumption measured against the limits.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct QuotaUsage {
    pub memory_bytes: u64,
    /// 0 when there is no limit.
    pub memory_limit_bytes: u64,
    pub pids_current: u64,
    pub pids_limit: u64,
    pub cpu_percent: f64,
    pub cpu_limit_percent: f64,
}

impl QuotaUsage {
    pub fn memory_usage_percent(&self) -> f64 {
        if self.memory_limit_bytes == 0 || self.memory_limit_bytes == UNLIMITED {
            return 0.0;
        }
        self.memory_bytes as f64 / self.memory_limit_bytes as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_distinct_bits() {
        let flags = [
            QUOTA_FLAG_CPU,
            QUOTA_FLAG_MEMORY,
            QUOTA_FLAG_PIDS,
            QUOTA_FLAG_NOFILE,
            QUOTA_FLAG_CPU_TIME,
            QUOTA_FLAG_DATA,
            QUOTA_FLAG_IO_READ,
            QUOTA_FLAG_IO_WRITE,
        ];
        let mut seen = 0u32;
        for flag in flags {
            assert_eq!(flag.count_ones(), 1);
            assert_eq!(seen & flag, 0);
            seen |= flag;
        }
        assert_eq!(seen, 0xff);
    }

    #[test]
    fn test_cpu_limit_requires_flag() {
        let limits = QuotaLimits {
            cpu_quota_us: 100_000,
            ..Default::default()
        };
        assert!(!limits.has_cpu_limit());
        assert_eq!(limits.cpu_limit_percent(), 0.0);
    }

    #[test]
    fn test_cpu_limit_percent() {
        let limits = QuotaLimits {
            flags: QUOTA_FLAG_CPU,
            cpu_quota_us: 50_000,
            cpu_period_us: 100_000,
            ..Default::default()
        };
        assert!(limits.has_cpu_limit());
        assert!((limits.cpu_limit_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unlimited_and_zero_mean_no_limit() {
        let limits = QuotaLimits {
            flags: QUOTA_FLAG_CPU | QUOTA_FLAG_MEMORY | QUOTA_FLAG_PIDS,
            cpu_quota_us: UNLIMITED,
            cpu_period_us: 100_000,
            memory_limit_bytes: 0,
            pids_limit: UNLIMITED,
            ..Default::default()
        };
        assert!(!limits.has_cpu_limit());
        assert!(!limits.has_memory_limit());
        assert!(!limits.has_pids_limit());
        assert_eq!(limits.cpu_limit_percent(), 0.0);
    }

    #[test]
    fn test_zero_period() {
        let limits = QuotaLimits {
            flags: QUOTA_FLAG_CPU,
            cpu_quota_us: 50_000,
            ..Default::default()
        };
        assert_eq!(limits.cpu_limit_percent(), 0.0);
    }

    #[test]
    fn test_memory_usage_percent() {
        let usage = QuotaUsage {
            memory_bytes: 256,
            memory_limit_bytes: 1024,
            ..Default::default()
        };
        assert_eq!(usage.memory_usage_percent(), 25.0);

        let unlimited = QuotaUsage {
            memory_bytes: 256,
            memory_limit_bytes: UNLIMITED,
            ..Default::default()
        };
        assert_eq!(unlimited.memory_usage_percent(), 0.0);
        assert_eq!(QuotaUsage::default().memory_usage_percent(), 0.0);
    }
}
