//! Quota, container and runtime detection through the engine port.

mod quota;
mod runtime;

use std::sync::Arc;

pub use quota::*;
pub use runtime::*;

use crate::context::Context;
use crate::engine::raw::{
    RawAvailableRuntime, RawContainerInfo, RawQuotaLimits, RawQuotaUsage, RawRuntimeInfo,
};
use crate::error::{self, Result};
use crate::lifecycle::Lifecycle;
use crate::metrics::builders::c_string;

pub fn build_quota_limits(raw: &RawQuotaLimits) -> QuotaLimits {
    QuotaLimits {
        cpu_quota_us: raw.cpu_quota_us,
        cpu_period_us: raw.cpu_period_us,
        memory_limit_bytes: raw.memory_limit_bytes,
        pids_limit: raw.pids_limit,
        nofile_limit: raw.nofile_limit,
        cpu_time_limit_secs: raw.cpu_time_limit_secs,
        data_limit_bytes: raw.data_limit_bytes,
        io_read_bps: raw.io_read_bps,
        io_write_bps: raw.io_write_bps,
        flags: raw.flags,
    }
}

pub fn build_quota_usage(raw: &RawQuotaUsage) -> QuotaUsage {
    QuotaUsage {
        memory_bytes: raw.memory_bytes,
        memory_limit_bytes: raw.memory_limit_bytes,
        pids_current: raw.pids_current,
        pids_limit: raw.pids_limit,
        cpu_percent: raw.cpu_percent,
        cpu_limit_percent: raw.cpu_limit_percent,
    }
}

pub fn build_container_info(raw: &RawContainerInfo) -> ContainerInfo {
    ContainerInfo {
        is_containerized: raw.is_containerized,
        runtime: ContainerRuntime::from_raw(raw.runtime),
        container_id: c_string(&raw.container_id),
    }
}

fn build_available_runtime(raw: &RawAvailableRuntime) -> AvailableRuntime {
    AvailableRuntime {
        runtime: RuntimeType::from_raw(raw.runtime),
        socket_path: c_string(&raw.socket_path),
        version: c_string(&raw.version),
        is_running: raw.is_running,
    }
}

pub fn build_runtime_info(raw: &RawRuntimeInfo) -> RuntimeInfo {
    let count = usize::try_from(raw.available_count).unwrap_or(usize::MAX);
    let available = &raw.available_runtimes[..count.min(raw.available_runtimes.len())];

    RuntimeInfo {
        is_containerized: raw.is_containerized,
        container_runtime: RuntimeType::from_raw(raw.container_runtime),
        orchestrator: RuntimeType::from_raw(raw.orchestrator),
        container_id: c_string(&raw.container_id),
        workload_id: c_string(&raw.workload_id),
        workload_name: c_string(&raw.workload_name),
        namespace: c_string(&raw.namespace),
        available_runtimes: available.iter().map(build_available_runtime).collect(),
    }
}

/// Engine-backed detection of resource limits and execution environment.
#[derive(Debug, Clone)]
pub struct Detector {
    lifecycle: Arc<Lifecycle>,
}

impl Detector {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    /// Whether the platform can report quotas at all.
    pub fn quota_supported(&self) -> bool {
        self.lifecycle.quota_supported()
    }

    pub fn read_quota_limits(&self, ctx: &Context, pid: i32) -> Result<QuotaLimits> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawQuotaLimits::default();
        error::translate(&engine.read_quota_limits(pid, &mut raw))?;
        Ok(build_quota_limits(&raw))
    }

    pub fn read_quota_usage(&self, ctx: &Context, pid: i32) -> Result<QuotaUsage> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawQuotaUsage::default();
        error::translate(&engine.read_quota_usage(pid, &mut raw))?;
        Ok(build_quota_usage(&raw))
    }

    pub fn detect_container(&self, ctx: &Context) -> Result<ContainerInfo> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawContainerInfo::default();
        error::translate(&engine.detect_container(&mut raw))?;
        Ok(build_container_info(&raw))
    }

    /// Full detection, including every runtime reachable on the host.
    pub fn detect_runtime(&self, ctx: &Context) -> Result<RuntimeInfo> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawRuntimeInfo::default();
        error::translate(&engine.detect_runtime(&mut raw))?;
        Ok(build_runtime_info(&raw))
    }

    /// Containment check only; skips runtime enumeration.
    pub fn is_containerized(&self) -> Result<bool> {
        Ok(self.lifecycle.engine()?.is_containerized())
    }

    /// `"none"` outside a container, the runtime name otherwise.
    pub fn runtime_name(&self, ctx: &Context) -> Result<&'static str> {
        let engine = self.lifecycle.validate(ctx)?;
        if !engine.is_containerized() {
            return Ok(RuntimeType::None.as_str());
        }
        Ok(self.detect_runtime(ctx)?.runtime_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;
    use crate::engine::{EngineStatus, codes};
    use crate::error::Error;

    fn detector(engine: MockEngine) -> (Arc<MockEngine>, Detector) {
        let engine = Arc::new(engine);
        let lifecycle = Arc::new(Lifecycle::new(engine.clone()));
        lifecycle.init().unwrap();
        (engine, Detector::new(lifecycle))
    }

    #[test]
    fn test_uninitialized_detector() {
        let engine = Arc::new(MockEngine::default());
        let detector = Detector::new(Arc::new(Lifecycle::new(engine.clone())));
        let ctx = Context::background();
        assert_eq!(detector.read_quota_limits(&ctx, 1), Err(Error::NotInitialized));
        assert_eq!(detector.read_quota_usage(&ctx, 1), Err(Error::NotInitialized));
        assert_eq!(detector.detect_container(&ctx), Err(Error::NotInitialized));
        assert_eq!(detector.detect_runtime(&ctx), Err(Error::NotInitialized));
        assert_eq!(detector.is_containerized(), Err(Error::NotInitialized));
        assert_eq!(engine.total_calls(), 0);
    }

    #[test]
    fn test_read_quota_limits() {
        let (_engine, detector) = detector(MockEngine {
            quota_limits: RawQuotaLimits {
                cpu_quota_us: 200_000,
                cpu_period_us: 100_000,
                memory_limit_bytes: 512 << 20,
                flags: QUOTA_FLAG_CPU | QUOTA_FLAG_MEMORY,
                ..Default::default()
            },
            ..Default::default()
        });
        let limits = detector
            .read_quota_limits(&Context::background(), 1)
            .unwrap();
        assert!(limits.has_cpu_limit());
        assert!(limits.has_memory_limit());
        assert_eq!(limits.cpu_limit_percent(), 200.0);
    }

    #[test]
    fn test_quota_not_supported() {
        let (engine, detector) = detector(MockEngine::default());
        engine.fail(
            "read_quota_usage",
            EngineStatus::failure(codes::NOT_SUPPORTED, "no cgroup v2"),
        );
        assert_eq!(
            detector.read_quota_usage(&Context::background(), 1),
            Err(Error::NotSupported)
        );
    }

    #[test]
    fn test_detect_container() {
        let (_engine, detector) = detector(MockEngine {
            container: RawContainerInfo {
                is_containerized: true,
                runtime: ContainerRuntime::Docker as u8,
                container_id: "abc123\0\0".to_owned(),
            },
            ..Default::default()
        });
        let info = detector.detect_container(&Context::background()).unwrap();
        assert!(info.is_containerized);
        assert_eq!(info.runtime, ContainerRuntime::Docker);
        assert_eq!(info.container_id, "abc123");
    }

    #[test]
    fn test_detect_runtime_clamps_available() {
        let (_engine, detector) = detector(MockEngine {
            runtime: RawRuntimeInfo {
                is_containerized: true,
                container_runtime: RuntimeType::Containerd as u8,
                orchestrator: RuntimeType::Kubernetes as u8,
                namespace: "default".to_owned(),
                available_count: 4,
                available_runtimes: vec![RawAvailableRuntime {
                    runtime: RuntimeType::Docker as u8,
                    socket_path: "/var/run/docker.sock".to_owned(),
                    is_running: true,
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        });
        let info = detector.detect_runtime(&Context::background()).unwrap();
        assert_eq!(info.container_runtime, RuntimeType::Containerd);
        assert!(info.orchestrator.is_orchestrator());
        assert_eq!(info.available_runtimes.len(), 1);
        assert_eq!(info.available_runtimes[0].runtime, RuntimeType::Docker);
    }

    #[test]
    fn test_runtime_name_fast_path() {
        let (engine, detector) = detector(MockEngine::default());
        assert_eq!(detector.runtime_name(&Context::background()), Ok("none"));
        assert_eq!(engine.calls("detect_runtime"), 0);
    }

    #[test]
    fn test_runtime_name_containerized() {
        let (_engine, detector) = detector(MockEngine {
            containerized: true,
            runtime: RawRuntimeInfo {
                is_containerized: true,
                container_runtime: RuntimeType::Podman as u8,
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(detector.is_containerized(), Ok(true));
        assert_eq!(detector.runtime_name(&Context::background()), Ok("podman"));
    }
}
