//! Raw snapshot records exchanged across the engine port.
//!
//! These mirror the fixed-size buffers of a native engine: string fields may carry a NUL
//! terminator followed by garbage, enumerations travel as their numeric codes, and the
//! aggregate snapshot reports item counts separately from the backing buffers. Nothing in
//! here is trusted by the builders.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCpu {
    pub user_percent: f64,
    pub system_percent: f64,
    pub idle_percent: f64,
    pub iowait_percent: f64,
    pub steal_percent: f64,
    pub cores: u32,
    pub frequency_mhz: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMemory {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
    pub cached_bytes: u64,
    pub buffers_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLoad {
    pub load_1min: f64,
    pub load_5min: f64,
    pub load_15min: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProcess {
    pub pid: i32,
    pub cpu_percent: f64,
    pub memory_rss_bytes: u64,
    pub memory_vms_bytes: u64,
    pub memory_percent: f64,
    pub num_threads: u32,
    pub num_fds: u32,
    pub read_bytes_per_sec: u64,
    pub write_bytes_per_sec: u64,
    pub state: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCpuPressure {
    pub some_avg10: f64,
    pub some_avg60: f64,
    pub some_avg300: f64,
    pub some_total_us: u64,
}

/// Pressure stall record with both `some` and `full` lines (memory, I/O).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPressure {
    pub some_avg10: f64,
    pub some_avg60: f64,
    pub some_avg300: f64,
    pub some_total_us: u64,
    pub full_avg10: f64,
    pub full_avg60: f64,
    pub full_avg300: f64,
    pub full_total_us: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAllPressure {
    pub cpu: RawCpuPressure,
    pub memory: RawPressure,
    pub io: RawPressure,
    /// `false` when the platform has no pressure stall information.
    pub available: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawIoStats {
    pub read_ops: u64,
    pub read_bytes: u64,
    pub write_ops: u64,
    pub write_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPartition {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    /// Comma separated mount options.
    pub options: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDiskUsage {
    pub path: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f64,
    pub inodes_total: u64,
    pub inodes_used: u64,
    pub inodes_free: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDiskIo {
    pub device: String,
    pub reads_completed: u64,
    pub sectors_read: u64,
    pub read_time_ms: u64,
    pub writes_completed: u64,
    pub sectors_written: u64,
    pub write_time_ms: u64,
    pub io_in_progress: u64,
    pub io_time_ms: u64,
    pub weighted_io_time_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNetInterface {
    pub name: String,
    pub mac_address: String,
    pub mtu: u32,
    pub is_up: bool,
    pub is_loopback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNetStats {
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_drops: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_drops: u64,
}

/// One row of the TCP or UDP socket table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInetSocket {
    pub family: u8,
    pub local_addr: String,
    pub local_port: u16,
    pub remote_addr: String,
    pub remote_port: u16,
    pub state: u8,
    pub pid: i32,
    pub process_name: String,
    pub inode: u64,
    pub rx_queue: u32,
    pub tx_queue: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawUnixSocket {
    pub path: String,
    pub socket_type: String,
    pub state: u8,
    pub pid: i32,
    pub process_name: String,
    pub inode: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTcpStats {
    pub established: u32,
    pub syn_sent: u32,
    pub syn_recv: u32,
    pub fin_wait1: u32,
    pub fin_wait2: u32,
    pub time_wait: u32,
    pub close: u32,
    pub close_wait: u32,
    pub last_ack: u32,
    pub listen: u32,
    pub closing: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuotaLimits {
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

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuotaUsage {
    pub memory_bytes: u64,
    pub memory_limit_bytes: u64,
    pub pids_current: u64,
    pub pids_limit: u64,
    pub cpu_percent: f64,
    pub cpu_limit_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawContainerInfo {
    pub is_containerized: bool,
    pub runtime: u8,
    pub container_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAvailableRuntime {
    pub runtime: u8,
    pub socket_path: String,
    pub version: String,
    pub is_running: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRuntimeInfo {
    pub is_containerized: bool,
    pub container_runtime: u8,
    pub orchestrator: u8,
    pub container_id: String,
    pub workload_id: String,
    pub workload_name: String,
    pub namespace: String,
    pub available_count: u32,
    pub available_runtimes: Vec<RawAvailableRuntime>,
}

/// One-shot snapshot of every system-wide family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAllMetrics {
    pub cpu: RawCpu,
    pub memory: RawMemory,
    pub load: RawLoad,
    pub io_stats: RawIoStats,
    pub pressure: RawAllPressure,
    /// Collection time in microseconds since the Unix epoch.
    pub timestamp_us: u64,
    pub partition_count: u32,
    pub disk_usage_count: u32,
    pub disk_io_count: u32,
    pub net_interface_count: u32,
    pub net_stats_count: u32,
    pub partitions: Vec<RawPartition>,
    pub disk_usage: Vec<RawDiskUsage>,
    pub disk_io: Vec<RawDiskIo>,
    pub net_interfaces: Vec<RawNetInterface>,
    pub net_stats: Vec<RawNetStats>,
}
