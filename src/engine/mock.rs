use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use super::raw::*;
use super::{Engine, EngineList, EngineStatus};

/// Programmable engine used by the tests of everything layered on the port.
///
/// Every call is counted by name, any call can be made to fail with a chosen status, and
/// populated lists are tracked so a test can assert that each one was freed.
#[derive(Default)]
pub(crate) struct MockEngine {
    pub cpu: RawCpu,
    pub memory: RawMemory,
    pub load: RawLoad,
    pub process: RawProcess,
    pub cpu_pressure: RawCpuPressure,
    pub memory_pressure: RawPressure,
    pub io_pressure: RawPressure,
    pub io_stats: RawIoStats,
    pub partitions: Vec<RawPartition>,
    pub disk_usage: HashMap<String, RawDiskUsage>,
    pub disk_io: Vec<RawDiskIo>,
    pub interfaces: Vec<RawNetInterface>,
    pub net_stats: Vec<RawNetStats>,
    pub tcp: Vec<RawInetSocket>,
    pub udp: Vec<RawInetSocket>,
    pub unix: Vec<RawUnixSocket>,
    pub tcp_stats: RawTcpStats,
    pub port_owner: i32,
    pub quota_limits: RawQuotaLimits,
    pub quota_usage: RawQuotaUsage,
    pub container: RawContainerInfo,
    pub runtime: RawRuntimeInfo,
    pub containerized: bool,
    pub all: RawAllMetrics,
    pub(crate) failures: Mutex<HashMap<&'static str, EngineStatus>>,
    pub(crate) calls: Mutex<HashMap<&'static str, usize>>,
    pub(crate) outstanding: AtomicIsize,
    pub(crate) shutdowns: AtomicUsize,
}

impl MockEngine {
    pub fn fail(&self, call: &'static str, status: EngineStatus) {
        self.failures.lock().unwrap().insert(call, status);
    }

    pub fn calls(&self, call: &str) -> usize {
        self.calls.lock().unwrap().get(call).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Lists handed out and not yet freed.
    pub fn outstanding(&self) -> isize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn enter(&self, call: &'static str) -> Option<EngineStatus> {
        *self.calls.lock().unwrap().entry(call).or_default() += 1;
        self.failures.lock().unwrap().get(call).cloned()
    }

    fn fill<T: Clone>(
        &self,
        call: &'static str,
        out: &mut EngineList<T>,
        items: &[T],
    ) -> EngineStatus {
        if let Some(status) = self.enter(call) {
            return status;
        }
        out.populate(items.to_vec());
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        EngineStatus::ok()
    }

    fn drain<T>(&self, list: &mut EngineList<T>) {
        if list.is_populated() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
        list.release();
    }

    fn copy<T: Clone>(&self, call: &'static str, out: &mut T, value: &T) -> EngineStatus {
        if let Some(status) = self.enter(call) {
            return status;
        }
        *out = value.clone();
        EngineStatus::ok()
    }
}

impl Engine for MockEngine {
    fn init(&self) -> EngineStatus {
        self.enter("init").unwrap_or_else(EngineStatus::ok)
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn platform(&self) -> &'static str {
        "mock"
    }

    fn quota_supported(&self) -> bool {
        true
    }

    fn collect_cpu(&self, out: &mut RawCpu) -> EngineStatus {
        self.copy("collect_cpu", out, &self.cpu)
    }

    fn collect_memory(&self, out: &mut RawMemory) -> EngineStatus {
        self.copy("collect_memory", out, &self.memory)
    }

    fn collect_load(&self, out: &mut RawLoad) -> EngineStatus {
        self.copy("collect_load", out, &self.load)
    }

    fn collect_process(&self, pid: i32, out: &mut RawProcess) -> EngineStatus {
        let status = self.copy("collect_process", out, &self.process);
        if status.success {
            out.pid = pid;
        }
        status
    }

    fn collect_cpu_pressure(&self, out: &mut RawCpuPressure) -> EngineStatus {
        self.copy("collect_cpu_pressure", out, &self.cpu_pressure)
    }

    fn collect_memory_pressure(&self, out: &mut RawPressure) -> EngineStatus {
        self.copy("collect_memory_pressure", out, &self.memory_pressure)
    }

    fn collect_io_pressure(&self, out: &mut RawPressure) -> EngineStatus {
        self.copy("collect_io_pressure", out, &self.io_pressure)
    }

    fn collect_io_stats(&self, out: &mut RawIoStats) -> EngineStatus {
        self.copy("collect_io_stats", out, &self.io_stats)
    }

    fn list_partitions(&self, out: &mut EngineList<RawPartition>) -> EngineStatus {
        self.fill("list_partitions", out, &self.partitions)
    }

    fn free_partitions(&self, list: &mut EngineList<RawPartition>) {
        self.drain(list);
    }

    fn collect_disk_usage(&self, path: &str, out: &mut RawDiskUsage) -> EngineStatus {
        if let Some(status) = self.enter("collect_disk_usage") {
            return status;
        }
        match self.disk_usage.get(path) {
            Some(usage) => {
                *out = usage.clone();
                EngineStatus::ok()
            }
            None => EngineStatus::failure(super::codes::NOT_FOUND, path),
        }
    }

    fn collect_disk_io(&self, out: &mut EngineList<RawDiskIo>) -> EngineStatus {
        self.fill("collect_disk_io", out, &self.disk_io)
    }

    fn free_disk_io(&self, list: &mut EngineList<RawDiskIo>) {
        self.drain(list);
    }

    fn list_net_interfaces(&self, out: &mut EngineList<RawNetInterface>) -> EngineStatus {
        self.fill("list_net_interfaces", out, &self.interfaces)
    }

    fn free_net_interfaces(&self, list: &mut EngineList<RawNetInterface>) {
        self.drain(list);
    }

    fn collect_net_stats(&self, interface: &str, out: &mut RawNetStats) -> EngineStatus {
        if let Some(status) = self.enter("collect_net_stats") {
            return status;
        }
        match self.net_stats.iter().find(|s| s.interface == interface) {
            Some(stats) => {
                *out = stats.clone();
                EngineStatus::ok()
            }
            None => EngineStatus::failure(super::codes::NOT_FOUND, interface),
        }
    }

    fn collect_all_net_stats(&self, out: &mut EngineList<RawNetStats>) -> EngineStatus {
        self.fill("collect_all_net_stats", out, &self.net_stats)
    }

    fn free_net_stats(&self, list: &mut EngineList<RawNetStats>) {
        self.drain(list);
    }

    fn collect_tcp(&self, out: &mut EngineList<RawInetSocket>) -> EngineStatus {
        self.fill("collect_tcp", out, &self.tcp)
    }

    fn free_tcp(&self, list: &mut EngineList<RawInetSocket>) {
        self.drain(list);
    }

    fn collect_udp(&self, out: &mut EngineList<RawInetSocket>) -> EngineStatus {
        self.fill("collect_udp", out, &self.udp)
    }

    fn free_udp(&self, list: &mut EngineList<RawInetSocket>) {
        self.drain(list);
    }

    fn collect_unix(&self, out: &mut EngineList<RawUnixSocket>) -> EngineStatus {
        self.fill("collect_unix", out, &self.unix)
    }

    fn free_unix(&self, list: &mut EngineList<RawUnixSocket>) {
        self.drain(list);
    }

    fn collect_tcp_stats(&self, out: &mut RawTcpStats) -> EngineStatus {
        self.copy("collect_tcp_stats", out, &self.tcp_stats)
    }

    fn find_process_by_port(&self, _port: u16, _tcp: bool, out: &mut i32) -> EngineStatus {
        self.copy("find_process_by_port", out, &self.port_owner)
    }

    fn read_quota_limits(&self, _pid: i32, out: &mut RawQuotaLimits) -> EngineStatus {
        self.copy("read_quota_limits", out, &self.quota_limits)
    }

    fn read_quota_usage(&self, _pid: i32, out: &mut RawQuotaUsage) -> EngineStatus {
        self.copy("read_quota_usage", out, &self.quota_usage)
    }

    fn detect_container(&self, out: &mut RawContainerInfo) -> EngineStatus {
        self.copy("detect_container", out, &self.container)
    }

    fn detect_runtime(&self, out: &mut RawRuntimeInfo) -> EngineStatus {
        self.copy("detect_runtime", out, &self.runtime)
    }

    fn is_containerized(&self) -> bool {
        *self.calls.lock().unwrap().entry("is_containerized").or_default() += 1;
        self.containerized
    }

    fn collect_all(&self, out: &mut RawAllMetrics) -> EngineStatus {
        self.copy("collect_all", out, &self.all)
    }
}
