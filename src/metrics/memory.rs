use std::sync::Arc;
use std::time::SystemTime;

use super::builders::{build_pressure, build_process_memory, build_system_memory};
use super::types::{Pressure, ProcessMemory, SystemMemory};
use crate::context::Context;
use crate::engine::raw::{RawMemory, RawPressure, RawProcess};
use crate::error::{self, Error, Result};
use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone)]
pub struct MemoryCollector {
    lifecycle: Arc<Lifecycle>,
}

impl MemoryCollector {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    pub fn collect_system(&self, ctx: &Context) -> Result<SystemMemory> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawMemory::default();
        error::translate(&engine.collect_memory(&mut raw))?;
        Ok(build_system_memory(&raw, SystemTime::now()))
    }

    pub fn collect_process(&self, ctx: &Context, pid: i32) -> Result<ProcessMemory> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawProcess::default();
        error::translate(&engine.collect_process(pid, &mut raw))?;
        Ok(build_process_memory(&raw, SystemTime::now()))
    }

    /// # Errors
    ///
    /// Always fails, see [`super::CpuCollector::collect_all_processes`].
    pub fn collect_all_processes(&self, ctx: &Context) -> Result<Vec<ProcessMemory>> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        Err(Error::NotSupported)
    }

    pub fn collect_pressure(&self, ctx: &Context) -> Result<Pressure> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawPressure::default();
        error::translate(&engine.collect_memory_pressure(&mut raw))?;
        Ok(build_pressure(&raw, SystemTime::now()))
    }
}
