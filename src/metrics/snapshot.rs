//! One-shot snapshot of everything the crate can report about the host.

use std::time::SystemTime;

use super::{
    Collector, CpuPressure, DiskIoStats, DiskUsage, IoStats, LoadAverage, NetInterface, NetStats,
    Partition, Pressure, ProcessCpu, ProcessMemory, SystemCpu, SystemMemory, TcpConnection,
    TcpStats,
};
use crate::context::Context;
use crate::detector::{ContainerInfo, Detector, QuotaLimits, QuotaUsage, RuntimeInfo};
use crate::error::{Error, Result, ResultOkLogExt};

/// CPU and memory figures of the collecting process itself.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProcessSnapshot {
    pub pid: i32,
    pub cpu: ProcessCpu,
    pub memory: ProcessMemory,
}

/// Aggregate host snapshot. Every family is collected on its own; a family that fails or is
/// not supported on this platform is `None` and does not fail the snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AllSystemMetrics {
    pub timestamp: SystemTime,
    pub platform: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<SystemCpu>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_pressure: Option<CpuPressure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<SystemMemory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_pressure: Option<Pressure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadAverage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub io: Option<IoStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_pressure: Option<Pressure>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<Vec<Partition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_usage: Option<Vec<DiskUsage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_io: Option<Vec<DiskIoStats>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_interfaces: Option<Vec<NetInterface>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_stats: Option<Vec<NetStats>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessSnapshot>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_stats: Option<TcpStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listening_ports: Option<Vec<TcpConnection>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_limits: Option<QuotaLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_usage: Option<QuotaUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeInfo>,
}

/// Pressure stall information is missing on older kernels; that is not worth a warning.
fn optional<T>(result: Result<T>) -> Option<T> {
    match result {
        Err(Error::NotSupported) => None,
        other => other.ok_log(),
    }
}

fn hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok_log()
        .and_then(|name| name.into_string().ok())
}

/// Collects every family independently into one [`AllSystemMetrics`].
///
/// # Errors
///
/// Fails only if `ctx` is already done or the engine is not initialized; individual family
/// failures become `None`.
pub fn collect_system_snapshot(
    ctx: &Context,
    collector: &Collector,
    detector: &Detector,
) -> Result<AllSystemMetrics> {
    let lifecycle = collector.lifecycle();
    lifecycle.validate(ctx)?;

    let pid = i32::try_from(std::process::id()).unwrap_or(i32::MAX);
    let process = match (
        collector.cpu().collect_process(ctx, pid).ok_log(),
        collector.memory().collect_process(ctx, pid).ok_log(),
    ) {
        (Some(cpu), Some(memory)) => Some(ProcessSnapshot { pid, cpu, memory }),
        _ => None,
    };

    let (quota_limits, quota_usage) = if detector.quota_supported() {
        (
            optional(detector.read_quota_limits(ctx, pid)),
            optional(detector.read_quota_usage(ctx, pid)),
        )
    } else {
        (None, None)
    };

    Ok(AllSystemMetrics {
        timestamp: SystemTime::now(),
        platform: lifecycle.platform(),
        hostname: hostname(),
        cpu: collector.cpu().collect_system(ctx).ok_log(),
        cpu_pressure: optional(collector.cpu().collect_pressure(ctx)),
        memory: collector.memory().collect_system(ctx).ok_log(),
        memory_pressure: optional(collector.memory().collect_pressure(ctx)),
        load: collector.cpu().collect_load_average(ctx).ok_log(),
        io: collector.io().collect_stats(ctx).ok_log(),
        io_pressure: optional(collector.io().collect_pressure(ctx)),
        partitions: collector.disk().list_partitions(ctx).ok_log(),
        disk_usage: collector.disk().collect_all_usage(ctx).ok_log(),
        disk_io: collector.disk().collect_io(ctx).ok_log(),
        net_interfaces: collector.network().list_interfaces(ctx).ok_log(),
        net_stats: collector.network().collect_all_stats(ctx).ok_log(),
        process,
        tcp_stats: optional(collector.connections().collect_tcp_stats(ctx)),
        listening_ports: optional(collector.connections().collect_listening_ports(ctx)),
        quota_limits,
        quota_usage,
        container: optional(detector.detect_container(ctx)),
        runtime: optional(detector.detect_runtime(ctx)),
    })
}
