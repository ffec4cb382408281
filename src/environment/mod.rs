//! Execution environment detection.
//!
//! Determines whether the program runs inside a container, which runtime and orchestrator
//! manage it, and which container runtimes are reachable on the host. All probes are
//! best-effort: an unreadable file or a missing variable is simply "no evidence".
mod available;
mod checks;
mod detect;
mod inside;

use std::collections::HashMap;
use std::path::PathBuf;

pub use available::{AvailableRuntime, available_runtimes};
pub use checks::{
    extract_container_id, extract_pod_uid, is_kubernetes_cgroup, is_non_empty_hex_string,
    matches_container_cgroup,
};
pub use detect::{ContainerDetection, RuntimeDetection, detect_container, detect_runtime};
pub use inside::{Inside, detect_inside};

use crate::fsutil;
use crate::procfs::ProcFs;

/// The evidence detection works from: the filesystem beneath a root plus a set of environment
/// variables.
#[derive(Debug, Clone)]
pub struct Environment {
    procfs: ProcFs,
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn new(procfs: ProcFs, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            procfs,
            vars: vars.into_iter().collect(),
        }
    }

    /// Uses the variables of the running process.
    pub fn from_process(procfs: ProcFs) -> Self {
        Self::new(procfs, std::env::vars())
    }

    pub fn procfs(&self) -> &ProcFs {
        &self.procfs
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.var(name).is_some()
    }

    pub fn path(&self, path: &str) -> PathBuf {
        self.procfs.path(path)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.procfs.exists(path)
    }

    pub fn read_trimmed(&self, path: &str) -> Option<String> {
        fsutil::read_trimmed(self.procfs.path(path))
    }

    /// Contents of `/proc/self/cgroup`, empty when unreadable.
    pub fn self_cgroup(&self) -> String {
        self.procfs
            .read_to_string("/proc/self/cgroup")
            .unwrap_or_default()
    }

    /// The `container=` marker, taken from our own variables or from the environment of
    /// pid 1, where systemd-nspawn and LXC place it.
    pub fn container_marker(&self) -> Option<String> {
        if let Some(value) = self.var("container") {
            return Some(value.to_owned());
        }
        let environ = std::fs::read(self.procfs.path("/proc/1/environ")).ok()?;
        environ
            .split(|&b| b == 0)
            .find_map(|entry| entry.strip_prefix(b"container="))
            .map(|value| String::from_utf8_lossy(value).into_owned())
    }
}
