use std::sync::Arc;
use std::time::SystemTime;

use super::builders::{build_disk_io, build_disk_usage, build_partition};
use super::collect_list;
use super::types::{DiskIoStats, DiskUsage, Partition};
use crate::context::Context;
use crate::engine::raw::RawDiskUsage;
use crate::error::{self, Error, Result};
use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone)]
pub struct DiskCollector {
    lifecycle: Arc<Lifecycle>,
}

impl DiskCollector {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    pub fn list_partitions(&self, ctx: &Context) -> Result<Vec<Partition>> {
        let engine = self.lifecycle.validate(ctx)?;
        collect_list(
            |list| engine.list_partitions(list),
            |list| engine.free_partitions(list),
            build_partition,
        )
    }

    pub fn collect_usage(&self, ctx: &Context, path: &str) -> Result<DiskUsage> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawDiskUsage::default();
        error::translate(&engine.collect_disk_usage(path, &mut raw))?;
        Ok(build_disk_usage(&raw, SystemTime::now()))
    }

    /// Usage of every mounted partition. Partitions whose usage cannot be read (stale
    /// network mounts, permission-restricted mount points) are left out.
    pub fn collect_all_usage(&self, ctx: &Context) -> Result<Vec<DiskUsage>> {
        let partitions = self.list_partitions(ctx)?;
        let mut usages = Vec::with_capacity(partitions.len());
        for partition in &partitions {
            match self.collect_usage(ctx, &partition.mount_point) {
                Ok(usage) => usages.push(usage),
                Err(err @ (Error::Cancelled | Error::DeadlineExceeded)) => return Err(err),
                Err(err) => {
                    log::trace!("skipping usage of {}: {err}", partition.mount_point);
                }
            }
        }
        Ok(usages)
    }

    pub fn collect_io(&self, ctx: &Context) -> Result<Vec<DiskIoStats>> {
        let engine = self.lifecycle.validate(ctx)?;
        let now = SystemTime::now();
        collect_list(
            |list| engine.collect_disk_io(list),
            |list| engine.free_disk_io(list),
            |raw| build_disk_io(raw, now),
        )
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the engine reports no device called `device`.
    pub fn collect_device_io(&self, ctx: &Context, device: &str) -> Result<DiskIoStats> {
        self.collect_io(ctx)?
            .into_iter()
            .find(|io| io.device == device)
            .ok_or(Error::NotFound)
    }
}
