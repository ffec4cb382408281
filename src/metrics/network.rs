use std::sync::Arc;
use std::time::SystemTime;

use super::builders::{build_net_interface, build_net_stats};
use super::collect_list;
use super::types::{NetInterface, NetStats};
use crate::context::Context;
use crate::engine::raw::RawNetStats;
use crate::error::{self, Result};
use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone)]
pub struct NetworkCollector {
    lifecycle: Arc<Lifecycle>,
}

impl NetworkCollector {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    pub fn list_interfaces(&self, ctx: &Context) -> Result<Vec<NetInterface>> {
        let engine = self.lifecycle.validate(ctx)?;
        collect_list(
            |list| engine.list_net_interfaces(list),
            |list| engine.free_net_interfaces(list),
            build_net_interface,
        )
    }

    pub fn collect_stats(&self, ctx: &Context, interface: &str) -> Result<NetStats> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawNetStats::default();
        error::translate(&engine.collect_net_stats(interface, &mut raw))?;
        Ok(build_net_stats(&raw, SystemTime::now()))
    }

    pub fn collect_all_stats(&self, ctx: &Context) -> Result<Vec<NetStats>> {
        let engine = self.lifecycle.validate(ctx)?;
        let now = SystemTime::now();
        collect_list(
            |list| engine.collect_all_net_stats(list),
            |list| engine.free_net_stats(list),
            |raw| build_net_stats(raw, now),
        )
    }
}
