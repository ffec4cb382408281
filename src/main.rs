/// Entry point for the Service Probe tool.
///
/// Prints a JSON snapshot of the host (CPU, memory, disks, network, connections, quotas and
/// container runtime), or runs a single health probe.
///
/// # Errors
///
/// Returns an error if the engine fails to initialize, the arguments are malformed, or the
/// requested probe fails.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug ROOTFS_MOUNT_PATH=/rootfs cargo run
/// cargo run -- probe http 127.0.0.1:8080
/// cargo run -- probe exec /bin/true
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    service_probe::run(std::env::args().skip(1).collect()).await
}
