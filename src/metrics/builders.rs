//! Conversions from raw engine records into the public metrics records.
//!
//! Every function here is total: no I/O, no errors, no panics on malformed input. String
//! fields are cut at the first NUL, and aggregate counts are clamped to the number of items
//! actually present.

use std::time::{Duration, SystemTime};

use super::connections::{AddressFamily, SocketState, TcpConnection, TcpStats, UdpConnection, UnixSocket};
use super::types::*;
use crate::engine::raw::*;

/// Sector size the kernel uses when reporting block device counters.
const SECTOR_SIZE: u64 = 512;

/// Returns the part of a fixed-buffer string before its first NUL.
pub fn c_string(raw: &str) -> String {
    match raw.find('\0') {
        Some(end) => raw[..end].to_owned(),
        None => raw.to_owned(),
    }
}

/// Converts a microsecond Unix timestamp into a [`SystemTime`].
pub fn timestamp_from_micros(micros: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_micros(micros)
}

pub fn build_system_cpu(raw: &RawCpu, timestamp: SystemTime) -> SystemCpu {
    SystemCpu {
        user_percent: raw.user_percent,
        system_percent: raw.system_percent,
        idle_percent: raw.idle_percent,
        iowait_percent: raw.iowait_percent,
        steal_percent: raw.steal_percent,
        usage_percent: (100.0 - raw.idle_percent).max(0.0),
        cores: raw.cores,
        frequency_mhz: raw.frequency_mhz,
        timestamp,
    }
}

pub fn build_process_cpu(raw: &RawProcess, timestamp: SystemTime) -> ProcessCpu {
    ProcessCpu {
        pid: raw.pid,
        usage_percent: raw.cpu_percent,
        threads: raw.num_threads,
        state: ProcessState::from_raw(raw.state),
        timestamp,
    }
}

pub fn build_system_memory(raw: &RawMemory, timestamp: SystemTime) -> SystemMemory {
    let usage_percent = if raw.total_bytes == 0 {
        0.0
    } else {
        raw.used_bytes as f64 / raw.total_bytes as f64 * 100.0
    };

    SystemMemory {
        total: raw.total_bytes,
        available: raw.available_bytes,
        used: raw.used_bytes,
        // Memory obtainable without swapping, not MemFree.
        free: raw.available_bytes,
        cached: raw.cached_bytes,
        buffers: raw.buffers_bytes,
        swap_total: raw.swap_total_bytes,
        swap_used: raw.swap_used_bytes,
        swap_free: raw.swap_total_bytes.saturating_sub(raw.swap_used_bytes),
        usage_percent,
        timestamp,
    }
}

pub fn build_process_memory(raw: &RawProcess, timestamp: SystemTime) -> ProcessMemory {
    ProcessMemory {
        pid: raw.pid,
        rss: raw.memory_rss_bytes,
        vms: raw.memory_vms_bytes,
        usage_percent: raw.memory_percent,
        open_fds: raw.num_fds,
        timestamp,
    }
}

pub fn build_load_average(raw: &RawLoad, timestamp: SystemTime) -> LoadAverage {
    LoadAverage {
        load1: raw.load_1min,
        load5: raw.load_5min,
        load15: raw.load_15min,
        timestamp,
    }
}

pub fn build_cpu_pressure(raw: &RawCpuPressure, timestamp: SystemTime) -> CpuPressure {
    CpuPressure {
        some_avg10: raw.some_avg10,
        some_avg60: raw.some_avg60,
        some_avg300: raw.some_avg300,
        some_total: raw.some_total_us,
        timestamp,
    }
}

pub fn build_pressure(raw: &RawPressure, timestamp: SystemTime) -> Pressure {
    Pressure {
        some_avg10: raw.some_avg10,
        some_avg60: raw.some_avg60,
        some_avg300: raw.some_avg300,
        some_total: raw.some_total_us,
        full_avg10: raw.full_avg10,
        full_avg60: raw.full_avg60,
        full_avg300: raw.full_avg300,
        full_total: raw.full_total_us,
        timestamp,
    }
}

/// Returns `None` when the engine flags pressure data as unavailable.
pub fn build_all_pressure(raw: &RawAllPressure, timestamp: SystemTime) -> Option<AllPressure> {
    if !raw.available {
        return None;
    }
    Some(AllPressure {
        cpu: build_cpu_pressure(&raw.cpu, timestamp),
        memory: build_pressure(&raw.memory, timestamp),
        io: build_pressure(&raw.io, timestamp),
    })
}

pub fn build_io_stats(raw: &RawIoStats, timestamp: SystemTime) -> IoStats {
    IoStats {
        read_ops: raw.read_ops,
        read_bytes: raw.read_bytes,
        write_ops: raw.write_ops,
        write_bytes: raw.write_bytes,
        timestamp,
    }
}

pub fn build_partition(raw: &RawPartition) -> Partition {
    let options = c_string(&raw.options);
    Partition {
        device: c_string(&raw.device),
        mount_point: c_string(&raw.mount_point),
        fs_type: c_string(&raw.fs_type),
        options: options
            .split(',')
            .filter(|opt| !opt.is_empty())
            .map(str::to_owned)
            .collect(),
    }
}

pub fn build_disk_usage(raw: &RawDiskUsage, timestamp: SystemTime) -> DiskUsage {
    DiskUsage {
        path: c_string(&raw.path),
        total: raw.total_bytes,
        used: raw.used_bytes,
        free: raw.free_bytes,
        used_percent: raw.used_percent,
        inodes_total: raw.inodes_total,
        inodes_used: raw.inodes_used,
        inodes_free: raw.inodes_free,
        timestamp,
    }
}

pub fn build_disk_io(raw: &RawDiskIo, timestamp: SystemTime) -> DiskIoStats {
    DiskIoStats {
        device: c_string(&raw.device),
        read_count: raw.reads_completed,
        read_bytes: raw.sectors_read.saturating_mul(SECTOR_SIZE),
        read_time: Duration::from_millis(raw.read_time_ms),
        write_count: raw.writes_completed,
        write_bytes: raw.sectors_written.saturating_mul(SECTOR_SIZE),
        write_time: Duration::from_millis(raw.write_time_ms),
        io_in_progress: raw.io_in_progress,
        io_time: Duration::from_millis(raw.io_time_ms),
        weighted_io_time: Duration::from_millis(raw.weighted_io_time_ms),
        timestamp,
    }
}

pub fn build_net_interface(raw: &RawNetInterface) -> NetInterface {
    NetInterface {
        name: c_string(&raw.name),
        mac_address: c_string(&raw.mac_address),
        mtu: raw.mtu,
        is_up: raw.is_up,
        is_loopback: raw.is_loopback,
    }
}

pub fn build_net_stats(raw: &RawNetStats, timestamp: SystemTime) -> NetStats {
    NetStats {
        interface: c_string(&raw.interface),
        rx_bytes: raw.rx_bytes,
        rx_packets: raw.rx_packets,
        rx_errors: raw.rx_errors,
        rx_drops: raw.rx_drops,
        tx_bytes: raw.tx_bytes,
        tx_packets: raw.tx_packets,
        tx_errors: raw.tx_errors,
        tx_drops: raw.tx_drops,
        timestamp,
    }
}

pub fn build_tcp_connection(raw: &RawInetSocket) -> TcpConnection {
    TcpConnection {
        family: AddressFamily::from_raw(raw.family),
        local_addr: c_string(&raw.local_addr),
        local_port: raw.local_port,
        remote_addr: c_string(&raw.remote_addr),
        remote_port: raw.remote_port,
        state: SocketState::from_raw(raw.state),
        pid: raw.pid,
        process_name: c_string(&raw.process_name),
        inode: raw.inode,
        rx_queue: raw.rx_queue,
        tx_queue: raw.tx_queue,
    }
}

pub fn build_udp_connection(raw: &RawInetSocket) -> UdpConnection {
    UdpConnection {
        family: AddressFamily::from_raw(raw.family),
        local_addr: c_string(&raw.local_addr),
        local_port: raw.local_port,
        remote_addr: c_string(&raw.remote_addr),
        remote_port: raw.remote_port,
        state: SocketState::from_raw(raw.state),
        pid: raw.pid,
        process_name: c_string(&raw.process_name),
        inode: raw.inode,
        rx_queue: raw.rx_queue,
        tx_queue: raw.tx_queue,
    }
}

pub fn build_unix_socket(raw: &RawUnixSocket) -> UnixSocket {
    UnixSocket {
        path: c_string(&raw.path),
        socket_type: c_string(&raw.socket_type),
        state: SocketState::from_raw(raw.state),
        pid: raw.pid,
        process_name: c_string(&raw.process_name),
        inode: raw.inode,
    }
}

pub fn build_tcp_stats(raw: &RawTcpStats) -> TcpStats {
    TcpStats {
        established: raw.established,
        syn_sent: raw.syn_sent,
        syn_recv: raw.syn_recv,
        fin_wait1: raw.fin_wait1,
        fin_wait2: raw.fin_wait2,
        time_wait: raw.time_wait,
        close: raw.close,
        close_wait: raw.close_wait,
        last_ack: raw.last_ack,
        listen: raw.listen,
        closing: raw.closing,
    }
}

/// Takes at most `count` items from `items`, whichever is shorter.
fn clamped<T>(items: &[T], count: u32) -> &[T] {
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    &items[..count.min(items.len())]
}

/// Composes every family of the one-shot snapshot.
pub fn build_all_metrics(raw: &RawAllMetrics) -> AllMetrics {
    let timestamp = timestamp_from_micros(raw.timestamp_us);

    AllMetrics {
        cpu: build_system_cpu(&raw.cpu, timestamp),
        memory: build_system_memory(&raw.memory, timestamp),
        load: build_load_average(&raw.load, timestamp),
        io_stats: build_io_stats(&raw.io_stats, timestamp),
        pressure: build_all_pressure(&raw.pressure, timestamp),
        partitions: clamped(&raw.partitions, raw.partition_count)
            .iter()
            .map(build_partition)
            .collect(),
        disk_usage: clamped(&raw.disk_usage, raw.disk_usage_count)
            .iter()
            .map(|usage| build_disk_usage(usage, timestamp))
            .collect(),
        disk_io: clamped(&raw.disk_io, raw.disk_io_count)
            .iter()
            .map(|io| build_disk_io(io, timestamp))
            .collect(),
        net_interfaces: clamped(&raw.net_interfaces, raw.net_interface_count)
            .iter()
            .map(build_net_interface)
            .collect(),
        net_stats: clamped(&raw.net_stats, raw.net_stats_count)
            .iter()
            .map(|stats| build_net_stats(stats, timestamp))
            .collect(),
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn test_c_string_cuts_at_nul() {
        assert_eq!(c_string("eth0\0garbage"), "eth0");
        assert_eq!(c_string("\0"), "");
        assert_eq!(c_string("plain"), "plain");
    }

    #[test]
    fn test_cpu_usage_is_inverse_of_idle() {
        let raw = RawCpu {
            user_percent: 20.0,
            system_percent: 5.0,
            idle_percent: 75.0,
            cores: 8,
            ..Default::default()
        };
        let cpu = build_system_cpu(&raw, now());
        assert_eq!(cpu.usage_percent, 25.0);
        assert_eq!(cpu.cores, 8);
    }

    #[test]
    fn test_cpu_usage_never_negative() {
        let raw = RawCpu {
            idle_percent: 100.5,
            ..Default::default()
        };
        assert_eq!(build_system_cpu(&raw, now()).usage_percent, 0.0);
    }

    #[test]
    fn test_memory_derivations() {
        let raw = RawMemory {
            total_bytes: 1000,
            available_bytes: 600,
            used_bytes: 250,
            swap_total_bytes: 100,
            swap_used_bytes: 30,
            ..Default::default()
        };
        let mem = build_system_memory(&raw, now());
        assert_eq!(mem.swap_free, 70);
        assert_eq!(mem.free, 600);
        assert_eq!(mem.usage_percent, 25.0);
    }

    #[test]
    fn test_memory_zero_total_and_swap_underflow() {
        let raw = RawMemory {
            swap_total_bytes: 10,
            swap_used_bytes: 20,
            ..Default::default()
        };
        let mem = build_system_memory(&raw, now());
        assert_eq!(mem.usage_percent, 0.0);
        assert_eq!(mem.swap_free, 0);
    }

    #[test]
    fn test_process_builders() {
        let raw = RawProcess {
            pid: 42,
            cpu_percent: 12.5,
            memory_rss_bytes: 4096,
            memory_vms_bytes: 8192,
            memory_percent: 1.5,
            num_threads: 3,
            num_fds: 9,
            state: ProcessState::Sleeping as u8,
            ..Default::default()
        };
        let cpu = build_process_cpu(&raw, now());
        assert_eq!(cpu.pid, 42);
        assert_eq!(cpu.threads, 3);
        assert_eq!(cpu.state, ProcessState::Sleeping);

        let mem = build_process_memory(&raw, now());
        assert_eq!(mem.rss, 4096);
        assert_eq!(mem.open_fds, 9);
    }

    #[test]
    fn test_partition_options() {
        let raw = RawPartition {
            device: "/dev/sda1\0xx".to_owned(),
            mount_point: "/".to_owned(),
            fs_type: "ext4".to_owned(),
            options: "rw,relatime".to_owned(),
        };
        let part = build_partition(&raw);
        assert_eq!(part.device, "/dev/sda1");
        assert_eq!(part.options, vec!["rw", "relatime"]);

        let empty = build_partition(&RawPartition::default());
        assert!(empty.options.is_empty());
    }

    #[test]
    fn test_disk_io_units() {
        let raw = RawDiskIo {
            device: "sda".to_owned(),
            reads_completed: 10,
            sectors_read: 4,
            read_time_ms: 1500,
            writes_completed: 2,
            sectors_written: 8,
            write_time_ms: 20,
            ..Default::default()
        };
        let io = build_disk_io(&raw, now());
        assert_eq!(io.read_bytes, 2048);
        assert_eq!(io.write_bytes, 4096);
        assert_eq!(io.read_time, Duration::from_millis(1500));
    }

    #[test]
    fn test_connection_builders() {
        let raw = RawInetSocket {
            family: 6,
            local_addr: "::1".to_owned(),
            local_port: 8080,
            state: 10,
            pid: -1,
            ..Default::default()
        };
        let conn = build_tcp_connection(&raw);
        assert_eq!(conn.family, AddressFamily::IPv6);
        assert_eq!(conn.state, SocketState::Listen);

        let odd = RawInetSocket {
            family: 9,
            state: 77,
            ..Default::default()
        };
        let conn = build_udp_connection(&odd);
        assert_eq!(conn.family, AddressFamily::Unknown);
        assert_eq!(conn.state, SocketState::Unknown);

        let unix = build_unix_socket(&RawUnixSocket {
            path: "/run/app.sock\0".to_owned(),
            socket_type: "stream".to_owned(),
            state: 1,
            ..Default::default()
        });
        assert_eq!(unix.path, "/run/app.sock");
        assert_eq!(unix.state, SocketState::Established);
    }

    #[test]
    fn test_all_pressure_unavailable_is_none() {
        let raw = RawAllPressure {
            available: false,
            ..Default::default()
        };
        assert_eq!(build_all_pressure(&raw, now()), None);

        let raw = RawAllPressure {
            available: true,
            ..Default::default()
        };
        assert!(build_all_pressure(&raw, now()).is_some());
    }

    #[test]
    fn test_all_metrics_empty() {
        let all = build_all_metrics(&RawAllMetrics::default());
        assert!(all.partitions.is_empty());
        assert!(all.disk_usage.is_empty());
        assert!(all.disk_io.is_empty());
        assert!(all.net_interfaces.is_empty());
        assert!(all.net_stats.is_empty());
        assert_eq!(all.pressure, None);
        assert_eq!(all.timestamp, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_all_metrics_clamps_counts() {
        let raw = RawAllMetrics {
            timestamp_us: 2_000_000,
            partition_count: 5,
            partitions: vec![RawPartition::default(); 2],
            net_stats_count: 1,
            net_stats: vec![RawNetStats::default(); 3],
            ..Default::default()
        };
        let all = build_all_metrics(&raw);
        assert_eq!(all.partitions.len(), 2);
        assert_eq!(all.net_stats.len(), 1);
        assert_eq!(
            all.timestamp,
            SystemTime::UNIX_EPOCH + Duration::from_secs(2)
        );
    }
}
