use std::sync::Arc;
use std::time::SystemTime;

use super::builders::{build_io_stats, build_pressure};
use super::types::{IoStats, Pressure};
use crate::context::Context;
use crate::engine::raw::{RawIoStats, RawPressure};
use crate::error::{self, Result};
use crate::lifecycle::Lifecycle;

/// System-wide block I/O totals and I/O pressure.
#[derive(Debug, Clone)]
pub struct IoCollector {
    lifecycle: Arc<Lifecycle>,
}

impl IoCollector {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    pub fn collect_stats(&self, ctx: &Context) -> Result<IoStats> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawIoStats::default();
        error::translate(&engine.collect_io_stats(&mut raw))?;
        Ok(build_io_stats(&raw, SystemTime::now()))
    }

    pub fn collect_pressure(&self, ctx: &Context) -> Result<Pressure> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawPressure::default();
        error::translate(&engine.collect_io_pressure(&mut raw))?;
        Ok(build_pressure(&raw, SystemTime::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;

    #[test]
    fn test_collect_stats_and_pressure() {
        let engine = Arc::new(MockEngine {
            io_stats: RawIoStats {
                read_ops: 5,
                read_bytes: 500,
                write_ops: 7,
                write_bytes: 700,
            },
            io_pressure: RawPressure {
                full_avg10: 12.0,
                ..Default::default()
            },
            ..Default::default()
        });
        let lifecycle = Arc::new(Lifecycle::new(engine));
        lifecycle.init().unwrap();
        let io = IoCollector::new(lifecycle);
        let ctx = Context::background();

        let stats = io.collect_stats(&ctx).unwrap();
        assert_eq!(stats.total_ops(), 12);
        assert_eq!(stats.total_bytes(), 1200);
        assert!(io.collect_pressure(&ctx).unwrap().is_under_pressure());
    }
}
