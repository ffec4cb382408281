//! The port to the metrics engine.
//!
//! The engine is the component that actually samples the operating system. Everything above
//! this module talks to it only through [`Engine`]: every call fills a caller-provided raw
//! record and answers with an [`EngineStatus`]; every list the engine populates must be handed
//! back through the matching `free_*` call once its contents have been copied out.

mod linux;
#[cfg(test)]
pub(crate) mod mock;
pub mod raw;

pub use linux::LinuxEngine;

use raw::*;

/// Result codes reported by the engine.
pub mod codes {
    pub const OK: i32 = 0;
    pub const NOT_SUPPORTED: i32 = 1;
    pub const PERMISSION: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const INVALID_PARAM: i32 = 4;
    pub const IO: i32 = 5;
    pub const INTERNAL: i32 = 99;
}

/// The `(success, code, message)` triple every engine call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub success: bool,
    pub code: i32,
    pub message: String,
}

impl EngineStatus {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: codes::OK,
            message: String::new(),
        }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
        }
    }

    /// Maps an I/O error kind onto the closed code set.
    pub fn from_kind(kind: std::io::ErrorKind, message: impl Into<String>) -> Self {
        let code = match kind {
            std::io::ErrorKind::NotFound => codes::NOT_FOUND,
            std::io::ErrorKind::PermissionDenied => codes::PERMISSION,
            std::io::ErrorKind::InvalidInput => codes::INVALID_PARAM,
            std::io::ErrorKind::Unsupported => codes::NOT_SUPPORTED,
            _ => codes::IO,
        };
        Self::failure(code, message)
    }

    pub fn from_io(err: &std::io::Error) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

/// A list whose storage belongs to the engine until it is released through the paired
/// `free_*` call.
#[derive(Debug)]
pub struct EngineList<T> {
    items: Vec<T>,
    populated: bool,
}

impl<T> Default for EngineList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            populated: false,
        }
    }
}

impl<T> EngineList<T> {
    /// Hands a freshly collected buffer to the list. Called by engine implementations.
    pub fn populate(&mut self, items: Vec<T>) {
        self.items = items;
        self.populated = true;
    }

    /// Drops the buffer. Called by engine implementations from their `free_*` methods.
    pub fn release(&mut self) {
        self.items = Vec::new();
        self.populated = false;
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

/// The engine contract.
///
/// Implementations must be safe to call concurrently for read-only queries. `init` and
/// `shutdown` are only ever called under the lifecycle lock.
pub trait Engine: Send + Sync {
    fn init(&self) -> EngineStatus;
    fn shutdown(&self);

    /// Short platform identifier such as `"linux"`.
    fn platform(&self) -> &'static str;
    fn quota_supported(&self) -> bool;

    fn collect_cpu(&self, out: &mut RawCpu) -> EngineStatus;
    fn collect_memory(&self, out: &mut RawMemory) -> EngineStatus;
    fn collect_load(&self, out: &mut RawLoad) -> EngineStatus;
    fn collect_process(&self, pid: i32, out: &mut RawProcess) -> EngineStatus;
    fn collect_cpu_pressure(&self, out: &mut RawCpuPressure) -> EngineStatus;
    fn collect_memory_pressure(&self, out: &mut RawPressure) -> EngineStatus;
    fn collect_io_pressure(&self, out: &mut RawPressure) -> EngineStatus;
    fn collect_io_stats(&self, out: &mut RawIoStats) -> EngineStatus;

    fn list_partitions(&self, out: &mut EngineList<RawPartition>) -> EngineStatus;
    fn free_partitions(&self, list: &mut EngineList<RawPartition>) {
        list.release();
    }
    fn collect_disk_usage(&self, path: &str, out: &mut RawDiskUsage) -> EngineStatus;
    fn collect_disk_io(&self, out: &mut EngineList<RawDiskIo>) -> EngineStatus;
    fn free_disk_io(&self, list: &mut EngineList<RawDiskIo>) {
        list.release();
    }

    fn list_net_interfaces(&self, out: &mut EngineList<RawNetInterface>) -> EngineStatus;
    fn free_net_interfaces(&self, list: &mut EngineList<RawNetInterface>) {
        list.release();
    }
    fn collect_net_stats(&self, interface: &str, out: &mut RawNetStats) -> EngineStatus;
    fn collect_all_net_stats(&self, out: &mut EngineList<RawNetStats>) -> EngineStatus;
    fn free_net_stats(&self, list: &mut EngineList<RawNetStats>) {
        list.release();
    }

    fn collect_tcp(&self, out: &mut EngineList<RawInetSocket>) -> EngineStatus;
    fn free_tcp(&self, list: &mut EngineList<RawInetSocket>) {
        list.release();
    }
    fn collect_udp(&self, out: &mut EngineList<RawInetSocket>) -> EngineStatus;
    fn free_udp(&self, list: &mut EngineList<RawInetSocket>) {
        list.release();
    }
    fn collect_unix(&self, out: &mut EngineList<RawUnixSocket>) -> EngineStatus;
    fn free_unix(&self, list: &mut EngineList<RawUnixSocket>) {
        list.release();
    }
    fn collect_tcp_stats(&self, out: &mut RawTcpStats) -> EngineStatus;
    /// Writes the owning pid, or `-1` when no process owns the port.
    fn find_process_by_port(&self, port: u16, tcp: bool, out: &mut i32) -> EngineStatus;

    fn read_quota_limits(&self, pid: i32, out: &mut RawQuotaLimits) -> EngineStatus;
    fn read_quota_usage(&self, pid: i32, out: &mut RawQuotaUsage) -> EngineStatus;
    fn detect_container(&self, out: &mut RawContainerInfo) -> EngineStatus;
    fn detect_runtime(&self, out: &mut RawRuntimeInfo) -> EngineStatus;
    /// Cheap containment check that skips runtime enumeration.
    fn is_containerized(&self) -> bool;

    fn collect_all(&self, out: &mut RawAllMetrics) -> EngineStatus;
}
