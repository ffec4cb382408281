//! Metrics collection on top of the engine port.
//!
//! [`Collector`] hands out one sub-collector per family. Every sub-collector method checks
//! the caller's [`Context`], then the engine lifecycle, then calls the engine, translates its
//! status, and copies the raw result into caller-owned records before any engine list is
//! freed.

pub mod builders;
mod connections;
mod cpu;
mod disk;
mod io;
mod memory;
mod network;
pub mod snapshot;
mod types;

use std::sync::Arc;

pub use connections::{
    AddressFamily, ConnectionCollector, NOT_FOUND_PID, ProcessConnections, SocketState,
    TcpConnection, TcpStats, UdpConnection, UnixSocket,
};
pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use io::IoCollector;
pub use memory::MemoryCollector;
pub use network::NetworkCollector;
pub use types::*;

use crate::context::Context;
use crate::engine::raw::RawAllMetrics;
use crate::engine::{EngineList, EngineStatus};
use crate::error::{self, Result};
use crate::lifecycle::Lifecycle;

/// Runs one engine listing call and copies its rows out.
///
/// The list is handed back through `free` whenever the engine populated it, including when
/// the status reports a failure.
pub(crate) fn collect_list<T, U>(
    collect: impl FnOnce(&mut EngineList<T>) -> EngineStatus,
    free: impl FnOnce(&mut EngineList<T>),
    build: impl FnMut(&T) -> U,
) -> Result<Vec<U>> {
    let mut list = EngineList::default();
    let status = collect(&mut list);
    let built = error::translate(&status).map(|()| list.as_slice().iter().map(build).collect());
    if list.is_populated() {
        free(&mut list);
    }
    built
}

/// Entry point for every metrics family.
#[derive(Debug, Clone)]
pub struct Collector {
    lifecycle: Arc<Lifecycle>,
    cpu: CpuCollector,
    memory: MemoryCollector,
    disk: DiskCollector,
    network: NetworkCollector,
    io: IoCollector,
    connections: ConnectionCollector,
}

impl Collector {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            cpu: CpuCollector::new(Arc::clone(&lifecycle)),
            memory: MemoryCollector::new(Arc::clone(&lifecycle)),
            disk: DiskCollector::new(Arc::clone(&lifecycle)),
            network: NetworkCollector::new(Arc::clone(&lifecycle)),
            io: IoCollector::new(Arc::clone(&lifecycle)),
            connections: ConnectionCollector::new(Arc::clone(&lifecycle)),
            lifecycle,
        }
    }

    pub fn cpu(&self) -> &CpuCollector {
        &self.cpu
    }

    pub fn memory(&self) -> &MemoryCollector {
        &self.memory
    }

    pub fn disk(&self) -> &DiskCollector {
        &self.disk
    }

    pub fn network(&self) -> &NetworkCollector {
        &self.network
    }

    pub fn io(&self) -> &IoCollector {
        &self.io
    }

    pub fn connections(&self) -> &ConnectionCollector {
        &self.connections
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Collects every system-wide family in a single engine call.
    pub fn collect_all(&self, ctx: &Context) -> Result<AllMetrics> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawAllMetrics::default();
        error::translate(&engine.collect_all(&mut raw))?;
        Ok(builders::build_all_metrics(&raw))
    }
}
