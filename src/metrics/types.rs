//! Public metrics records.
//!
//! Every record is created fresh per call and owned by the caller; nothing here borrows
//! from engine storage.

use std::time::{Duration, SystemTime};

/// Percentage above which a 10-second pressure average counts as contention.
const PRESSURE_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SystemCpu {
    pub user_percent: f64,
    pub system_percent: f64,
    pub idle_percent: f64,
    pub iowait_percent: f64,
    pub steal_percent: f64,
    /// `100 - idle_percent`, never negative.
    pub usage_percent: f64,
    pub cores: u32,
    pub frequency_mhz: u64,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProcessState {
    Unknown = 0,
    Running = 1,
    Sleeping = 2,
    DiskSleep = 3,
    Stopped = 4,
    Zombie = 5,
    Idle = 6,
    Dead = 7,
}

static PROCESS_STATES: [(ProcessState, &str); 8] = [
    (ProcessState::Unknown, "unknown"),
    (ProcessState::Running, "running"),
    (ProcessState::Sleeping, "sleeping"),
    (ProcessState::DiskSleep, "disk-sleep"),
    (ProcessState::Stopped, "stopped"),
    (ProcessState::Zombie, "zombie"),
    (ProcessState::Idle, "idle"),
    (ProcessState::Dead, "dead"),
];

impl ProcessState {
    pub fn from_raw(raw: u8) -> Self {
        PROCESS_STATES
            .iter()
            .find(|(state, _)| *state as u8 == raw)
            .map_or(ProcessState::Unknown, |(state, _)| *state)
    }

    pub fn as_str(self) -> &'static str {
        PROCESS_STATES
            .iter()
            .find(|(state, _)| *state == self)
            .map_or("unknown", |(_, name)| name)
    }

    /// Maps the one-letter state code of `/proc/<pid>/stat`.
    pub fn from_proc_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::DiskSleep,
            'T' | 't' => ProcessState::Stopped,
            'Z' => ProcessState::Zombie,
            'I' => ProcessState::Idle,
            'X' | 'x' => ProcessState::Dead,
            _ => ProcessState::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Zombie | ProcessState::Dead)
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for ProcessState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProcessCpu {
    pub pid: i32,
    pub usage_percent: f64,
    pub threads: u32,
    pub state: ProcessState,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SystemMemory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub cached: u64,
    pub buffers: u64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
    pub usage_percent: f64,
    pub timestamp: SystemTime,
}

impl SystemMemory {
    pub fn swap_usage_percent(&self) -> f64 {
        if self.swap_total == 0 {
            return 0.0;
        }
        self.swap_used as f64 / self.swap_total as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProcessMemory {
    pub pid: i32,
    pub rss: u64,
    pub vms: u64,
    pub usage_percent: f64,
    pub open_fds: u32,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LoadAverage {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    pub timestamp: SystemTime,
}

impl LoadAverage {
    /// Compares the 1-minute average with the core count; a non-positive count is treated
    /// as one core.
    pub fn is_overloaded(&self, cores: i32) -> bool {
        let cores = cores.max(1);
        self.load1 > f64::from(cores)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CpuPressure {
    pub some_avg10: f64,
    pub some_avg60: f64,
    pub some_avg300: f64,
    /// Total stall time in microseconds.
    pub some_total: u64,
    pub timestamp: SystemTime,
}

impl CpuPressure {
    pub fn is_under_pressure(&self) -> bool {
        self.some_avg10 > PRESSURE_THRESHOLD
    }
}

/// Memory or I/O pressure: both the `some` and `full` stall lines.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Pressure {
    pub some_avg10: f64,
    pub some_avg60: f64,
    pub some_avg300: f64,
    pub some_total: u64,
    pub full_avg10: f64,
    pub full_avg60: f64,
    pub full_avg300: f64,
    pub full_total: u64,
    pub timestamp: SystemTime,
}

impl Pressure {
    pub fn is_under_pressure(&self) -> bool {
        self.some_avg10 > PRESSURE_THRESHOLD || self.full_avg10 > PRESSURE_THRESHOLD
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AllPressure {
    pub cpu: CpuPressure,
    pub memory: Pressure,
    pub io: Pressure,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IoStats {
    pub read_ops: u64,
    pub read_bytes: u64,
    pub write_ops: u64,
    pub write_bytes: u64,
    pub timestamp: SystemTime,
}

impl IoStats {
    pub fn total_bytes(&self) -> u64 {
        self.read_bytes.saturating_add(self.write_bytes)
    }

    pub fn total_ops(&self) -> u64 {
        self.read_ops.saturating_add(self.write_ops)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Partition {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DiskUsage {
    pub path: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: f64,
    pub inodes_total: u64,
    pub inodes_used: u64,
    pub inodes_free: u64,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DiskIoStats {
    pub device: String,
    pub read_count: u64,
    pub read_bytes: u64,
    pub read_time: Duration,
    pub write_count: u64,
    pub write_bytes: u64,
    pub write_time: Duration,
    pub io_in_progress: u64,
    pub io_time: Duration,
    pub weighted_io_time: Duration,
    pub timestamp: SystemTime,
}

impl DiskIoStats {
    pub fn total_operations(&self) -> u64 {
        self.read_count.saturating_add(self.write_count)
    }

    pub fn total_bytes(&self) -> u64 {
        self.read_bytes.saturating_add(self.write_bytes)
    }

    pub fn total_time(&self) -> Duration {
        self.read_time.saturating_add(self.write_time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NetInterface {
    pub name: String,
    pub mac_address: String,
    pub mtu: u32,
    pub is_up: bool,
    pub is_loopback: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NetStats {
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_drops: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_drops: u64,
    pub timestamp: SystemTime,
}

impl NetStats {
    pub fn total_bytes(&self) -> u64 {
        self.rx_bytes.saturating_add(self.tx_bytes)
    }

    pub fn total_packets(&self) -> u64 {
        self.rx_packets.saturating_add(self.tx_packets)
    }

    pub fn total_errors(&self) -> u64 {
        self.rx_errors.saturating_add(self.tx_errors)
    }

    pub fn total_drops(&self) -> u64 {
        self.rx_drops.saturating_add(self.tx_drops)
    }
}

/// Transfer rates derived from two [`NetStats`] samples of the same interface.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Bandwidth {
    pub interface: String,
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
    pub rx_packets_per_sec: f64,
    pub tx_packets_per_sec: f64,
    pub period: Duration,
    pub timestamp: SystemTime,
}

impl Bandwidth {
    /// Computes rates between `prev` and `curr`.
    ///
    /// If `curr` is not later than `prev` every rate is zero. Counters that went backwards
    /// (interface reset) also yield zero rather than wrapping.
    pub fn calculate(prev: &NetStats, curr: &NetStats) -> Self {
        let period = curr
            .timestamp
            .duration_since(prev.timestamp)
            .unwrap_or(Duration::ZERO);

        if period.is_zero() {
            return Self {
                interface: curr.interface.clone(),
                rx_bytes_per_sec: 0.0,
                tx_bytes_per_sec: 0.0,
                rx_packets_per_sec: 0.0,
                tx_packets_per_sec: 0.0,
                period,
                timestamp: curr.timestamp,
            };
        }

        let secs = period.as_secs_f64();
        let rate = |prev: u64, curr: u64| curr.saturating_sub(prev) as f64 / secs;
        Self {
            interface: curr.interface.clone(),
            rx_bytes_per_sec: rate(prev.rx_bytes, curr.rx_bytes),
            tx_bytes_per_sec: rate(prev.tx_bytes, curr.tx_bytes),
            rx_packets_per_sec: rate(prev.rx_packets, curr.rx_packets),
            tx_packets_per_sec: rate(prev.tx_packets, curr.tx_packets),
            period,
            timestamp: curr.timestamp,
        }
    }

    pub fn total_bytes_per_sec(&self) -> f64 {
        self.rx_bytes_per_sec + self.tx_bytes_per_sec
    }

    pub fn total_packets_per_sec(&self) -> f64 {
        self.rx_packets_per_sec + self.tx_packets_per_sec
    }

    pub fn rx_bits_per_sec(&self) -> f64 {
        self.rx_bytes_per_sec * 8.0
    }

    pub fn tx_bits_per_sec(&self) -> f64 {
        self.tx_bytes_per_sec * 8.0
    }
}

/// Everything the engine returns from its one-shot collection call.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AllMetrics {
    pub cpu: SystemCpu,
    pub memory: SystemMemory,
    pub load: LoadAverage,
    pub io_stats: IoStats,
    /// `None` when the platform reports no pressure stall information.
    pub pressure: Option<AllPressure>,
    pub partitions: Vec<Partition>,
    pub disk_usage: Vec<DiskUsage>,
    pub disk_io: Vec<DiskIoStats>,
    pub net_interfaces: Vec<NetInterface>,
    pub net_stats: Vec<NetStats>,
    pub timestamp: SystemTime,
}
