//! Service Probe: protocol health checks and host/container metrics behind one contract.
//!
//! This library provides active probers (TCP, UDP, HTTP, gRPC, exec, ICMP), a metrics
//! façade over a pluggable collection engine, container/runtime detection and resource quota
//! inspection. The engine shipped for Linux reads procfs, sysfs and cgroup v2 beneath a
//! configurable root, so the library also works from inside a container with the host root
//! mounted.

use std::sync::Arc;
use std::time::Duration;

use config::Config;
use context::Context;
use detector::Detector;
use engine::LinuxEngine;
use health::{Factory, Target};
use lifecycle::Lifecycle;
use metrics::Collector;

pub mod cgroup;
pub mod config;
pub mod context;
pub mod detector;
pub mod engine;
pub mod environment;
pub mod error;
pub mod fsutil;
pub mod health;
pub mod lifecycle;
pub mod metrics;
pub mod mountinfo;
pub mod procfs;

/// Runs the `service-probe` binary.
///
/// Without arguments, initializes the Linux engine beneath the configured root, prints one
/// JSON snapshot of the whole system and shuts the engine down again. With
/// `probe <kind> <address> [args...]`, runs one prober and prints its JSON result.
///
/// # Errors
///
/// Possible errors include:
/// - The engine failing to initialize (e.g., procfs not mounted beneath the root).
/// - An unknown prober kind or malformed arguments.
/// - A failed probe.
pub async fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    match args.as_slice() {
        [] => snapshot(&config).await,
        [command, kind, address, rest @ ..] if command == "probe" => {
            probe(&config, kind, address, rest).await
        }
        _ => Err("usage: service-probe [probe <kind> <address> [args...]]".into()),
    }
}

async fn snapshot(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    log::debug!("Final rootfs: {}", config.rootfs.display());
    let engine = Arc::new(LinuxEngine::new(&config.rootfs));
    let lifecycle = Arc::new(Lifecycle::new(engine));
    lifecycle.init()?;

    let snapshot = {
        let lifecycle = Arc::clone(&lifecycle);
        tokio::task::spawn_blocking(move || {
            let before = std::time::Instant::now();
            let collector = Collector::new(Arc::clone(&lifecycle));
            let detector = Detector::new(lifecycle);
            let snapshot = metrics::snapshot::collect_system_snapshot(
                &Context::background(),
                &collector,
                &detector,
            );
            log::trace!(
                "collect_system_snapshot() took {} nanoseconds",
                before.elapsed().as_nanos()
            );
            snapshot
        })
        .await
    };
    lifecycle.shutdown();

    let snapshot = snapshot??;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn probe(
    config: &Config,
    kind: &str,
    address: &str,
    rest: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let factory = Factory::new(config.default_timeout);
    let prober = factory.create(kind, Duration::ZERO)?;
    let target = match kind {
        "udp" => Target::udp(address),
        "http" => Target::http(address),
        "grpc" => Target::grpc(address),
        "icmp" => Target::icmp(address),
        "exec" => Target::exec(address, rest.iter().cloned()),
        _ => Target::tcp(address),
    };

    let result = prober.probe(&Context::background(), &target).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.success {
        Ok(())
    } else {
        Err(format!("{kind} probe of `{address}` failed").into())
    }
}
