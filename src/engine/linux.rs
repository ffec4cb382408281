//! The engine shipped for Linux: everything is read from procfs, sysfs and the cgroup v2
//! hierarchy beneath a configurable root.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use super::raw::*;
use super::{Engine, EngineList, EngineStatus};
use crate::cgroup::{self, Cgroup};
use crate::detector::{self, QUOTA_FLAG_CPU, QUOTA_FLAG_CPU_TIME, QUOTA_FLAG_DATA};
use crate::detector::{QUOTA_FLAG_IO_READ, QUOTA_FLAG_IO_WRITE, QUOTA_FLAG_MEMORY};
use crate::detector::{QUOTA_FLAG_NOFILE, QUOTA_FLAG_PIDS, UNLIMITED};
use crate::environment::{self, Environment};
use crate::mountinfo;
use crate::procfs::{
    self, CpuInfo, CpuTimes, DiskStat, FsUsage, InetSocket, InterfaceInfo, InterfaceStat,
    LoadAvg, MemInfo, Pressure, ProcFs, ProcessStat, ProcessStatus, ResourceLimits,
    SocketOwners, UnixSocketEntry,
};

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Proc(#[from] procfs::Error),
    #[error(transparent)]
    Mounts(#[from] mountinfo::Error),
    #[error("invalid pid {0}")]
    InvalidPid(i32),
    #[error("empty path")]
    EmptyPath,
}

impl Error {
    fn status(&self) -> EngineStatus {
        let kind = match self {
            Error::Proc(err) => err.kind(),
            Error::Mounts(err) => err.kind(),
            Error::InvalidPid(_) | Error::EmptyPath => std::io::ErrorKind::InvalidInput,
        };
        EngineStatus::from_kind(kind, self.to_string())
    }
}

type Result<T> = std::result::Result<T, Error>;

fn report<T>(call: &str, result: Result<T>, out: &mut T) -> EngineStatus {
    match result {
        Ok(value) => {
            *out = value;
            EngineStatus::ok()
        }
        Err(err) => {
            log::debug!("{call} failed: {err}");
            err.status()
        }
    }
}

fn report_list<T>(call: &str, result: Result<Vec<T>>, out: &mut EngineList<T>) -> EngineStatus {
    match result {
        Ok(items) => {
            out.populate(items);
            EngineStatus::ok()
        }
        Err(err) => {
            log::debug!("{call} failed: {err}");
            err.status()
        }
    }
}

/// Socket protocol tables under `/proc/net`.
#[derive(Debug, Clone, Copy)]
enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    fn table(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// Reads procfs, sysfs and cgroupfs beneath a root directory.
#[derive(Debug, Clone)]
pub struct LinuxEngine {
    procfs: ProcFs,
    env: Environment,
}

impl LinuxEngine {
    /// An engine inspecting the system whose root filesystem is mounted at `root`, using the
    /// environment variables of this process for runtime detection.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_environment(Environment::from_process(ProcFs::new(root)))
    }

    pub fn with_environment(env: Environment) -> Self {
        Self {
            procfs: env.procfs().clone(),
            env,
        }
    }

    /// Pid 0 stands for the calling process.
    fn resolve_pid(pid: i32) -> Result<u32> {
        match pid {
            0 => Ok(std::process::id()),
            pid if pid > 0 => Ok(pid.unsigned_abs()),
            pid => Err(Error::InvalidPid(pid)),
        }
    }

    fn cpu(&self) -> Result<RawCpu> {
        let times = self.procfs.parse("/proc/stat", CpuTimes::from_reader)?;
        let info = self
            .procfs
            .parse("/proc/cpuinfo", CpuInfo::from_reader)
            .unwrap_or_else(|err| {
                log::debug!("{err}");
                CpuInfo::default()
            });

        let cores = if info.cores > 0 {
            info.cores
        } else {
            self.procfs
                .lines("/proc/stat")
                .iter()
                .filter(|line| {
                    line.strip_prefix("cpu")
                        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
                })
                .count() as u32
        };

        Ok(RawCpu {
            user_percent: times.user_percent(),
            system_percent: times.system_percent(),
            idle_percent: times.idle_percent(),
            iowait_percent: times.iowait_percent(),
            steal_percent: times.steal_percent(),
            cores,
            frequency_mhz: info.frequency_mhz,
        })
    }

    fn meminfo(&self) -> Result<MemInfo> {
        Ok(self.procfs.key_value::<MemInfo>("/proc/meminfo")?)
    }

    fn memory(&self) -> Result<RawMemory> {
        let mem = self.meminfo()?;
        Ok(RawMemory {
            total_bytes: mem.mem_total,
            available_bytes: mem.mem_available,
            used_bytes: mem.used(),
            cached_bytes: mem.cached,
            buffers_bytes: mem.buffers,
            swap_total_bytes: mem.swap_total,
            swap_used_bytes: mem.swap_used(),
        })
    }

    fn load(&self) -> Result<RawLoad> {
        let load = self.procfs.single_line::<LoadAvg>("/proc/loadavg")?;
        Ok(RawLoad {
            load_1min: load.load_1min,
            load_5min: load.load_5min,
            load_15min: load.load_15min,
        })
    }

    fn process(&self, pid: i32) -> Result<RawProcess> {
        let pid = Self::resolve_pid(pid)?;
        let stat = self
            .procfs
            .single_line::<ProcessStat>(format!("/proc/{pid}/stat"))?;
        let status = self
            .procfs
            .key_value::<ProcessStatus>(format!("/proc/{pid}/status"))?;
        // Other users' descriptor tables are not listable without privileges.
        let num_fds = self
            .procfs
            .list_dir(format!("/proc/{pid}/fd"))
            .map_or(0, |fds| fds.len() as u32);
        let memory_percent = match self.meminfo() {
            Ok(mem) if mem.mem_total > 0 => status.vm_rss as f64 / mem.mem_total as f64 * 100.0,
            _ => 0.0,
        };

        Ok(RawProcess {
            pid: pid as i32,
            cpu_percent: 0.0,
            memory_rss_bytes: status.vm_rss,
            memory_vms_bytes: status.vm_size,
            memory_percent,
            num_threads: stat.num_threads,
            num_fds,
            read_bytes_per_sec: 0,
            write_bytes_per_sec: 0,
            state: stat.state_code(),
        })
    }

    /// A kernel without PSI support has no `/proc/pressure`.
    fn pressure(&self, resource: &str) -> Result<Pressure> {
        let path = format!("/proc/pressure/{resource}");
        if !self.procfs.exists(&path) {
            return Err(procfs::Error::Unsupported {
                path: self.procfs.path(&path),
            }
            .into());
        }
        Ok(self.procfs.parse(&path, Pressure::from_reader)?)
    }

    fn cpu_pressure(&self) -> Result<RawCpuPressure> {
        let pressure = self.pressure("cpu")?;
        Ok(RawCpuPressure {
            some_avg10: pressure.some.avg10,
            some_avg60: pressure.some.avg60,
            some_avg300: pressure.some.avg300,
            some_total_us: pressure.some.total_us,
        })
    }

    fn full_pressure(&self, resource: &str) -> Result<RawPressure> {
        let pressure = self.pressure(resource)?;
        let full = pressure.full.unwrap_or_default();
        Ok(RawPressure {
            some_avg10: pressure.some.avg10,
            some_avg60: pressure.some.avg60,
            some_avg300: pressure.some.avg300,
            some_total_us: pressure.some.total_us,
            full_avg10: full.avg10,
            full_avg60: full.avg60,
            full_avg300: full.avg300,
            full_total_us: full.total_us,
        })
    }

    fn all_pressure(&self) -> RawAllPressure {
        match (
            self.cpu_pressure(),
            self.full_pressure("memory"),
            self.full_pressure("io"),
        ) {
            (Ok(cpu), Ok(memory), Ok(io)) => RawAllPressure {
                cpu,
                memory,
                io,
                available: true,
            },
            _ => RawAllPressure::default(),
        }
    }

    fn disk_stats(&self) -> Result<Vec<DiskStat>> {
        Ok(self.procfs.parse("/proc/diskstats", DiskStat::list_from_reader)?)
    }

    /// Totals over whole disks only, so that partitions are not counted twice.
    fn io_stats(&self) -> Result<RawIoStats> {
        let stats = self
            .disk_stats()?
            .into_iter()
            .filter(DiskStat::is_whole_disk)
            .fold(RawIoStats::default(), |mut acc, disk| {
                acc.read_ops += disk.reads_completed;
                acc.read_bytes += disk.read_bytes();
                acc.write_ops += disk.writes_completed;
                acc.write_bytes += disk.write_bytes();
                acc
            });
        Ok(stats)
    }

    fn partitions(&self) -> Result<Vec<RawPartition>> {
        let partitions = mountinfo::list_partitions(self.procfs.path("/proc/self/mountinfo"))?;
        Ok(partitions
            .into_iter()
            .map(|partition| RawPartition {
                device: partition.device,
                mount_point: partition.mount_point,
                fs_type: partition.fs_type,
                options: partition.options,
            })
            .collect())
    }

    fn disk_usage(&self, path: &str) -> Result<RawDiskUsage> {
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }
        let usage = FsUsage::of(&self.procfs.path(path))?;
        Ok(RawDiskUsage {
            path: path.to_owned(),
            total_bytes: usage.total_bytes,
            used_bytes: usage.used_bytes,
            free_bytes: usage.free_bytes,
            used_percent: usage.used_percent,
            inodes_total: usage.inodes_total,
            inodes_used: usage.inodes_used,
            inodes_free: usage.inodes_free,
        })
    }

    fn disk_io(&self) -> Result<Vec<RawDiskIo>> {
        Ok(self
            .disk_stats()?
            .into_iter()
            .map(|disk| RawDiskIo {
                device: disk.device,
                reads_completed: disk.reads_completed,
                sectors_read: disk.sectors_read,
                read_time_ms: disk.read_time_ms,
                writes_completed: disk.writes_completed,
                sectors_written: disk.sectors_written,
                write_time_ms: disk.write_time_ms,
                io_in_progress: disk.io_in_progress,
                io_time_ms: disk.io_time_ms,
                weighted_io_time_ms: disk.weighted_io_time_ms,
            })
            .collect())
    }

    fn net_interfaces(&self) -> Result<Vec<RawNetInterface>> {
        let names = self.procfs.list_dir("/sys/class/net")?;
        Ok(names
            .iter()
            .map(|name| {
                let dir = self.procfs.path(format!("/sys/class/net/{name}"));
                let info = InterfaceInfo::from_sysfs(name, &dir);
                RawNetInterface {
                    name: info.name,
                    mac_address: info.mac_address,
                    mtu: info.mtu,
                    is_up: info.is_up,
                    is_loopback: info.is_loopback,
                }
            })
            .collect())
    }

    fn all_net_stats(&self) -> Result<Vec<RawNetStats>> {
        let stats = self
            .procfs
            .parse("/proc/net/dev", InterfaceStat::list_from_reader)?;
        Ok(stats
            .into_iter()
            .map(|stat| RawNetStats {
                interface: stat.interface,
                rx_bytes: stat.rx_bytes,
                rx_packets: stat.rx_packets,
                rx_errors: stat.rx_errs,
                rx_drops: stat.rx_drop,
                tx_bytes: stat.tx_bytes,
                tx_packets: stat.tx_packets,
                tx_errors: stat.tx_errs,
                tx_drops: stat.tx_drop,
            })
            .collect())
    }

    fn net_stats(&self, interface: &str) -> Result<RawNetStats> {
        self.all_net_stats()?
            .into_iter()
            .find(|stat| stat.interface == interface)
            .ok_or_else(|| {
                procfs::Error::NoSuchEntry {
                    name: interface.to_owned(),
                    path: self.procfs.path("/proc/net/dev"),
                }
                .into()
            })
    }

    /// Rows of the IPv4 table followed by the IPv6 table. The IPv6 table is skipped when the
    /// kernel has IPv6 disabled.
    fn inet_rows(&self, protocol: Protocol) -> Result<Vec<InetSocket>> {
        let table = protocol.table();
        let mut rows = self.procfs.parse(format!("/proc/net/{table}"), |buf| {
            InetSocket::list_from_reader(buf, false)
        })?;

        let v6 = format!("/proc/net/{table}6");
        if self.procfs.exists(&v6) {
            rows.extend(
                self.procfs
                    .parse(&v6, |buf| InetSocket::list_from_reader(buf, true))?,
            );
        }
        Ok(rows)
    }

    fn owners(&self) -> SocketOwners {
        SocketOwners::scan(&self.procfs.proc_dir())
    }

    fn inet_sockets(&self, protocol: Protocol) -> Result<Vec<RawInetSocket>> {
        let rows = self.inet_rows(protocol)?;
        let owners = self.owners();
        Ok(rows
            .into_iter()
            .map(|row| {
                let owner = owners.get(row.inode);
                RawInetSocket {
                    family: if row.ipv6 { 6 } else { 4 },
                    local_addr: row.local_addr,
                    local_port: row.local_port,
                    remote_addr: row.remote_addr,
                    remote_port: row.remote_port,
                    state: row.state,
                    pid: owner.map_or(-1, |owner| owner.pid),
                    process_name: owner.map(|owner| owner.name.clone()).unwrap_or_default(),
                    inode: row.inode,
                    rx_queue: row.rx_queue,
                    tx_queue: row.tx_queue,
                }
            })
            .collect())
    }

    fn unix_sockets(&self) -> Result<Vec<RawUnixSocket>> {
        let entries = self
            .procfs
            .parse("/proc/net/unix", UnixSocketEntry::list_from_reader)?;
        let owners = self.owners();
        Ok(entries
            .into_iter()
            .map(|entry| {
                let owner = owners.get(entry.inode);
                RawUnixSocket {
                    path: entry.path,
                    socket_type: entry.socket_type.to_owned(),
                    state: entry.state,
                    pid: owner.map_or(-1, |owner| owner.pid),
                    process_name: owner.map(|owner| owner.name.clone()).unwrap_or_default(),
                    inode: entry.inode,
                }
            })
            .collect())
    }

    fn tcp_stats(&self) -> Result<RawTcpStats> {
        let mut stats = RawTcpStats::default();
        for row in self.inet_rows(Protocol::Tcp)? {
            let counter = match row.state {
                1 => &mut stats.established,
                2 => &mut stats.syn_sent,
                3 => &mut stats.syn_recv,
                4 => &mut stats.fin_wait1,
                5 => &mut stats.fin_wait2,
                6 => &mut stats.time_wait,
                7 => &mut stats.close,
                8 => &mut stats.close_wait,
                9 => &mut stats.last_ack,
                10 => &mut stats.listen,
                11 => &mut stats.closing,
                _ => continue,
            };
            *counter += 1;
        }
        Ok(stats)
    }

    fn port_owner(&self, port: u16, tcp: bool) -> Result<i32> {
        let protocol = if tcp { Protocol::Tcp } else { Protocol::Udp };
        let rows = self.inet_rows(protocol)?;
        let owners = self.owners();
        Ok(rows
            .iter()
            .filter(|row| row.local_port == port)
            .find_map(|row| owners.get(row.inode).filter(|owner| owner.pid > 0))
            .map_or(-1, |owner| owner.pid))
    }

    fn resource_limits(&self, pid: u32) -> ResourceLimits {
        match self
            .procfs
            .parse(format!("/proc/{pid}/limits"), ResourceLimits::from_reader)
        {
            Ok(limits) => limits,
            Err(err) if pid == std::process::id() => {
                log::debug!("{err}, asking getrlimit instead");
                ResourceLimits::current()
            }
            Err(err) => {
                log::debug!("{err}");
                ResourceLimits::default()
            }
        }
    }

    fn quota(&self, pid: i32) -> Result<(Cgroup, RawQuotaLimits)> {
        let pid = Self::resolve_pid(pid)?;
        let cgroup = Cgroup::of_process(&self.procfs, pid)?;
        let mut limits = RawQuotaLimits::default();

        if let Some(cpu) = cgroup.cpu_limit() {
            limits.flags |= QUOTA_FLAG_CPU;
            limits.cpu_quota_us = cpu.quota.unwrap_or(UNLIMITED);
            limits.cpu_period_us = cpu.period;
        }
        if let Some(memory) = cgroup.memory_limit() {
            limits.flags |= QUOTA_FLAG_MEMORY;
            limits.memory_limit_bytes = memory.value.unwrap_or(UNLIMITED);
        }
        if let Some(pids) = cgroup.pids_limit() {
            limits.flags |= QUOTA_FLAG_PIDS;
            limits.pids_limit = pids.value.unwrap_or(UNLIMITED);
        }
        if let Some(io) = cgroup.io_limit() {
            if let Some(read_bps) = io.read_bps {
                limits.flags |= QUOTA_FLAG_IO_READ;
                limits.io_read_bps = read_bps;
            }
            if let Some(write_bps) = io.write_bps {
                limits.flags |= QUOTA_FLAG_IO_WRITE;
                limits.io_write_bps = write_bps;
            }
        }

        let rlimits = self.resource_limits(pid);
        if let Some(nofile) = rlimits.open_files {
            limits.flags |= QUOTA_FLAG_NOFILE;
            limits.nofile_limit = nofile;
        }
        if let Some(cpu_time) = rlimits.cpu_time_secs {
            limits.flags |= QUOTA_FLAG_CPU_TIME;
            limits.cpu_time_limit_secs = cpu_time;
        }
        if let Some(data) = rlimits.data_bytes {
            limits.flags |= QUOTA_FLAG_DATA;
            limits.data_limit_bytes = data;
        }
        if limits.flags & QUOTA_FLAG_PIDS == 0
            && let Some(processes) = rlimits.processes
        {
            limits.flags |= QUOTA_FLAG_PIDS;
            limits.pids_limit = processes;
        }

        Ok((cgroup, limits))
    }

    /// CPU usage needs two samples, so `cpu_percent` is always 0 here.
    fn quota_usage(&self, pid: i32) -> Result<RawQuotaUsage> {
        let (cgroup, limits) = self.quota(pid)?;
        Ok(RawQuotaUsage {
            memory_bytes: cgroup.memory_current().unwrap_or(0),
            memory_limit_bytes: limits.memory_limit_bytes,
            pids_current: cgroup.pids_current().unwrap_or(0),
            pids_limit: limits.pids_limit,
            cpu_percent: 0.0,
            cpu_limit_percent: detector::build_quota_limits(&limits).cpu_limit_percent(),
        })
    }

    fn container(&self) -> RawContainerInfo {
        let detection = environment::detect_container(&self.env);
        RawContainerInfo {
            is_containerized: detection.is_containerized,
            runtime: detection.runtime as u8,
            container_id: detection.container_id.unwrap_or_default(),
        }
    }

    fn runtime(&self) -> RawRuntimeInfo {
        let detection = environment::detect_runtime(&self.env);
        let available_runtimes: Vec<RawAvailableRuntime> = detection
            .available
            .into_iter()
            .map(|available| RawAvailableRuntime {
                runtime: available.runtime as u8,
                socket_path: available.socket_path,
                version: available.version,
                is_running: available.is_running,
            })
            .collect();

        let mut info = RawRuntimeInfo {
            available_count: available_runtimes.len() as u32,
            available_runtimes,
            ..Default::default()
        };
        if let Some(inside) = detection.inside {
            info.is_containerized = true;
            info.container_runtime = inside.runtime as u8;
            info.orchestrator = inside.orchestrator as u8;
            info.container_id = inside.container_id.unwrap_or_default();
            info.workload_id = inside.workload_id.unwrap_or_default();
            info.workload_name = inside.workload_name.unwrap_or_default();
            info.namespace = inside.namespace.unwrap_or_default();
        }
        info
    }

    /// Everything system-wide in one pass. CPU, memory and load are required; every other
    /// family is left empty when it cannot be read.
    fn all(&self) -> Result<RawAllMetrics> {
        let cpu = self.cpu()?;
        let memory = self.memory()?;
        let load = self.load()?;

        fn or_empty<T: Default>(family: &str, result: Result<T>) -> T {
            result.unwrap_or_else(|err| {
                log::debug!("Skipping {family}: {err}");
                T::default()
            })
        }

        let partitions = or_empty("partitions", self.partitions());
        let disk_usage: Vec<RawDiskUsage> = partitions
            .iter()
            .filter_map(|partition| self.disk_usage(&partition.mount_point).ok())
            .collect();
        let disk_io = or_empty("disk io", self.disk_io());
        let net_interfaces = or_empty("net interfaces", self.net_interfaces());
        let net_stats = or_empty("net stats", self.all_net_stats());

        let timestamp_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_micros() as u64);

        Ok(RawAllMetrics {
            cpu,
            memory,
            load,
            io_stats: or_empty("io stats", self.io_stats()),
            pressure: self.all_pressure(),
            timestamp_us,
            partition_count: partitions.len() as u32,
            disk_usage_count: disk_usage.len() as u32,
            disk_io_count: disk_io.len() as u32,
            net_interface_count: net_interfaces.len() as u32,
            net_stats_count: net_stats.len() as u32,
            partitions,
            disk_usage,
            disk_io,
            net_interfaces,
            net_stats,
        })
    }
}

impl Engine for LinuxEngine {
    fn init(&self) -> EngineStatus {
        let stat = self.procfs.path("/proc/stat");
        if !stat.exists() {
            return EngineStatus::failure(
                super::codes::NOT_SUPPORTED,
                format!("procfs is not mounted: `{}` is missing", stat.display()),
            );
        }
        log::info!(
            "Linux engine initialized on root `{}`",
            self.procfs.root().display()
        );
        EngineStatus::ok()
    }

    fn shutdown(&self) {
        log::debug!("Linux engine shut down");
    }

    fn platform(&self) -> &'static str {
        "linux"
    }

    fn quota_supported(&self) -> bool {
        cgroup::mount_point(&self.procfs)
            .join("cgroup.controllers")
            .exists()
    }

    fn collect_cpu(&self, out: &mut RawCpu) -> EngineStatus {
        report("collect_cpu", self.cpu(), out)
    }

    fn collect_memory(&self, out: &mut RawMemory) -> EngineStatus {
        report("collect_memory", self.memory(), out)
    }

    fn collect_load(&self, out: &mut RawLoad) -> EngineStatus {
        report("collect_load", self.load(), out)
    }

    fn collect_process(&self, pid: i32, out: &mut RawProcess) -> EngineStatus {
        report("collect_process", self.process(pid), out)
    }

    fn collect_cpu_pressure(&self, out: &mut RawCpuPressure) -> EngineStatus {
        report("collect_cpu_pressure", self.cpu_pressure(), out)
    }

    fn collect_memory_pressure(&self, out: &mut RawPressure) -> EngineStatus {
        report("collect_memory_pressure", self.full_pressure("memory"), out)
    }

    fn collect_io_pressure(&self, out: &mut RawPressure) -> EngineStatus {
        report("collect_io_pressure", self.full_pressure("io"), out)
    }

    fn collect_io_stats(&self, out: &mut RawIoStats) -> EngineStatus {
        report("collect_io_stats", self.io_stats(), out)
    }

    fn list_partitions(&self, out: &mut EngineList<RawPartition>) -> EngineStatus {
        report_list("list_partitions", self.partitions(), out)
    }

    fn collect_disk_usage(&self, path: &str, out: &mut RawDiskUsage) -> EngineStatus {
        report("collect_disk_usage", self.disk_usage(path), out)
    }

    fn collect_disk_io(&self, out: &mut EngineList<RawDiskIo>) -> EngineStatus {
        report_list("collect_disk_io", self.disk_io(), out)
    }

    fn list_net_interfaces(&self, out: &mut EngineList<RawNetInterface>) -> EngineStatus {
        report_list("list_net_interfaces", self.net_interfaces(), out)
    }

    fn collect_net_stats(&self, interface: &str, out: &mut RawNetStats) -> EngineStatus {
        report("collect_net_stats", self.net_stats(interface), out)
    }

    fn collect_all_net_stats(&self, out: &mut EngineList<RawNetStats>) -> EngineStatus {
        report_list("collect_all_net_stats", self.all_net_stats(), out)
    }

    fn collect_tcp(&self, out: &mut EngineList<RawInetSocket>) -> EngineStatus {
        report_list("collect_tcp", self.inet_sockets(Protocol::Tcp), out)
    }

    fn collect_udp(&self, out: &mut EngineList<RawInetSocket>) -> EngineStatus {
        report_list("collect_udp", self.inet_sockets(Protocol::Udp), out)
    }

    fn collect_unix(&self, out: &mut EngineList<RawUnixSocket>) -> EngineStatus {
        report_list("collect_unix", self.unix_sockets(), out)
    }

    fn collect_tcp_stats(&self, out: &mut RawTcpStats) -> EngineStatus {
        report("collect_tcp_stats", self.tcp_stats(), out)
    }

    fn find_process_by_port(&self, port: u16, tcp: bool, out: &mut i32) -> EngineStatus {
        report("find_process_by_port", self.port_owner(port, tcp), out)
    }

    fn read_quota_limits(&self, pid: i32, out: &mut RawQuotaLimits) -> EngineStatus {
        report(
            "read_quota_limits",
            self.quota(pid).map(|(_, limits)| limits),
            out,
        )
    }

    fn read_quota_usage(&self, pid: i32, out: &mut RawQuotaUsage) -> EngineStatus {
        report("read_quota_usage", self.quota_usage(pid), out)
    }

    fn detect_container(&self, out: &mut RawContainerInfo) -> EngineStatus {
        *out = self.container();
        EngineStatus::ok()
    }

    fn detect_runtime(&self, out: &mut RawRuntimeInfo) -> EngineStatus {
        *out = self.runtime();
        EngineStatus::ok()
    }

    fn is_containerized(&self) -> bool {
        environment::detect_inside(&self.env).is_some()
    }

    fn collect_all(&self, out: &mut RawAllMetrics) -> EngineStatus {
        report("collect_all", self.all(), out)
    }
}
