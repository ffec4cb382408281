//! Container runtimes reachable from this host through their API sockets.

use std::collections::HashSet;
use std::os::unix::net::UnixStream;
use std::path::Path;

use super::Environment;
use crate::detector::RuntimeType;

/// Well-known API socket locations, in order of preference per runtime.
const SOCKET_PATHS: &[(&str, RuntimeType)] = &[
    ("/var/run/docker.sock", RuntimeType::Docker),
    ("/run/docker.sock", RuntimeType::Docker),
    ("/var/run/podman/podman.sock", RuntimeType::Podman),
    ("/run/podman/podman.sock", RuntimeType::Podman),
    ("/var/run/containerd/containerd.sock", RuntimeType::Containerd),
    ("/run/containerd/containerd.sock", RuntimeType::Containerd),
    ("/var/run/crio/crio.sock", RuntimeType::CriO),
    ("/run/crio/crio.sock", RuntimeType::CriO),
    ("/var/lib/lxd/unix.socket", RuntimeType::Lxd),
    ("/var/snap/lxd/common/lxd/unix.socket", RuntimeType::Lxd),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableRuntime {
    pub runtime: RuntimeType,
    pub socket_path: String,
    /// Empty when the version is not determinable without speaking the runtime's API.
    pub version: String,
    /// Whether the socket accepted a connection.
    pub is_running: bool,
}

fn probe_socket(path: &Path) -> bool {
    match UnixStream::connect(path) {
        Ok(_) => true,
        Err(err) => {
            log::debug!("Runtime socket {} is not accepting: {err}", path.display());
            false
        }
    }
}

fn candidate(runtime: RuntimeType, path: &Path) -> Option<AvailableRuntime> {
    path.exists().then(|| AvailableRuntime {
        runtime,
        socket_path: path.display().to_string(),
        version: String::new(),
        is_running: probe_socket(path),
    })
}

/// Lists every runtime with an existing API socket, keeping the first socket per runtime.
pub fn available_runtimes(env: &Environment) -> Vec<AvailableRuntime> {
    let mut available: Vec<AvailableRuntime> = SOCKET_PATHS
        .iter()
        .filter_map(|(path, runtime)| candidate(*runtime, &env.path(path)))
        .collect();

    // Rootless podman lives under the invoking user's runtime dir.
    if let Some(xdg_runtime) = env.var("XDG_RUNTIME_DIR") {
        let path = Path::new(xdg_runtime).join("podman/podman.sock");
        available.extend(candidate(RuntimeType::Podman, &path));
    }

    let mut seen = HashSet::new();
    available.retain(|runtime| seen.insert(runtime.runtime));
    available
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixListener;

    use super::*;
    use crate::environment::testing::{env, write};

    #[test]
    fn test_no_sockets() {
        let dir = tempfile::tempdir().unwrap();
        assert!(available_runtimes(&env(dir.path(), &[])).is_empty());
    }

    #[test]
    fn test_live_and_stale_sockets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("run")).unwrap();
        let _listener = UnixListener::bind(dir.path().join("run/docker.sock")).unwrap();
        // A plain file where the socket should be: present but not accepting.
        write(dir.path(), "/run/crio/crio.sock", "");

        let available = available_runtimes(&env(dir.path(), &[]));
        assert_eq!(available.len(), 2);

        assert_eq!(available[0].runtime, RuntimeType::Docker);
        assert!(available[0].is_running);
        assert_eq!(
            available[0].socket_path,
            dir.path().join("run/docker.sock").display().to_string()
        );

        assert_eq!(available[1].runtime, RuntimeType::CriO);
        assert!(!available[1].is_running);
    }

    #[test]
    fn test_deduplicated_by_runtime() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "/var/run/podman/podman.sock", "");
        let xdg = dir.path().join("user");
        write(&xdg, "/podman/podman.sock", "");

        let available = available_runtimes(&env(
            dir.path(),
            &[("XDG_RUNTIME_DIR", xdg.to_str().unwrap())],
        ));
        assert_eq!(available.len(), 1);
        assert_eq!(
            available[0].socket_path,
            dir.path().join("var/run/podman/podman.sock").display().to_string()
        );
    }
}
