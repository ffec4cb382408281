use std::sync::Arc;
use std::time::SystemTime;

use super::builders::{build_cpu_pressure, build_load_average, build_process_cpu, build_system_cpu};
use super::types::{CpuPressure, LoadAverage, ProcessCpu, SystemCpu};
use crate::context::Context;
use crate::engine::raw::{RawCpu, RawCpuPressure, RawLoad, RawProcess};
use crate::error::{self, Error, Result};
use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone)]
pub struct CpuCollector {
    lifecycle: Arc<Lifecycle>,
}

impl CpuCollector {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    pub fn collect_system(&self, ctx: &Context) -> Result<SystemCpu> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawCpu::default();
        error::translate(&engine.collect_cpu(&mut raw))?;
        Ok(build_system_cpu(&raw, SystemTime::now()))
    }

    pub fn collect_process(&self, ctx: &Context, pid: i32) -> Result<ProcessCpu> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawProcess::default();
        error::translate(&engine.collect_process(pid, &mut raw))?;
        Ok(build_process_cpu(&raw, SystemTime::now()))
    }

    /// Enumerating every process is not offered by the engine.
    ///
    /// # Errors
    ///
    /// Always fails: with the context error if `ctx` is done, otherwise
    /// [`Error::NotSupported`].
    pub fn collect_all_processes(&self, ctx: &Context) -> Result<Vec<ProcessCpu>> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        Err(Error::NotSupported)
    }

    pub fn collect_load_average(&self, ctx: &Context) -> Result<LoadAverage> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawLoad::default();
        error::translate(&engine.collect_load(&mut raw))?;
        Ok(build_load_average(&raw, SystemTime::now()))
    }

    pub fn collect_pressure(&self, ctx: &Context) -> Result<CpuPressure> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawCpuPressure::default();
        error::translate(&engine.collect_cpu_pressure(&mut raw))?;
        Ok(build_cpu_pressure(&raw, SystemTime::now()))
    }
}
