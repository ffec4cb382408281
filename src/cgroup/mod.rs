//! cgroup v2 resource limits and current consumption of a process.
//!
//! A process's cgroup is the `0::<path>` entry of `/proc/<pid>/cgroup`, resolved beneath the
//! cgroup2 mount point listed in `/proc/self/mountinfo`. Every interface file is optional: a
//! controller that is not enabled for the cgroup simply has no file, which reads as "no limit".

mod limits;

use std::io::BufRead;
use std::path::{Path, PathBuf};

pub use limits::{CpuLimit, Current, IoLimit, Limit};

use crate::fsutil;
use crate::mountinfo;
use crate::procfs::{self, ProcFs, SingleLineStat};

const DEFAULT_MOUNT_POINT: &str = "/sys/fs/cgroup";

/// Extracts the unified hierarchy path from `/proc/<pid>/cgroup`.
///
/// Returns `None` on a pure cgroup v1 host, where no `0::` entry exists.
pub fn unified_path_from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    while buf.read_line(&mut line)? != 0 {
        if let Some(path) = line.trim_end().strip_prefix("0::") {
            return Ok(Some(path.to_owned()));
        }
        line.clear();
    }
    Ok(None)
}

/// The cgroup2 mount point beneath the root of `procfs`, falling back to `/sys/fs/cgroup`.
pub fn mount_point(procfs: &ProcFs) -> PathBuf {
    match mountinfo::detect_cgroup2_mount_point(procfs.path("/proc/self/mountinfo")) {
        Ok(mount) => procfs.path(mount),
        Err(err) => {
            log::debug!("Falling back to {DEFAULT_MOUNT_POINT}: {err}");
            procfs.path(DEFAULT_MOUNT_POINT)
        }
    }
}

/// One cgroup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cgroup {
    dir: PathBuf,
}

impl Cgroup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolves the cgroup `pid` belongs to.
    ///
    /// # Errors
    ///
    /// Fails when `/proc/<pid>/cgroup` cannot be read, most commonly because the process does
    /// not exist. A path that does not exist beneath the mount resolves to the root cgroup.
    pub fn of_process(procfs: &ProcFs, pid: u32) -> procfs::Result<Self> {
        let relative = procfs.parse(format!("/proc/{pid}/cgroup"), |buf| {
            unified_path_from_reader(buf)
        })?;
        let mount = mount_point(procfs);

        let dir = match relative {
            Some(relative) => {
                let dir = mount.join(relative.trim_start_matches('/'));
                if dir.is_dir() {
                    dir
                } else {
                    log::debug!(
                        "cgroup directory {} of pid {pid} is not visible, using the root cgroup",
                        dir.display()
                    );
                    mount
                }
            }
            None => mount,
        };

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: SingleLineStat>(&self, name: &str) -> Option<T> {
        self.read_with(name, |buf| T::from_reader(buf))
    }

    fn read_with<T>(
        &self,
        name: &str,
        parse: impl FnOnce(&mut std::io::BufReader<std::fs::File>) -> std::io::Result<T>,
    ) -> Option<T> {
        let path = self.dir.join(name);
        let mut reader = match fsutil::open_file_reader(&path) {
            Ok(reader) => reader,
            Err(err) => {
                log::trace!("{err}");
                return None;
            }
        };
        match parse(&mut reader) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("Ignoring unparsable {}: {err}", path.display());
                None
            }
        }
    }

    pub fn cpu_limit(&self) -> Option<CpuLimit> {
        self.read("cpu.max")
    }

    pub fn memory_limit(&self) -> Option<Limit> {
        self.read("memory.max")
    }

    pub fn pids_limit(&self) -> Option<Limit> {
        self.read("pids.max")
    }

    pub fn io_limit(&self) -> Option<IoLimit> {
        self.read_with("io.max", |buf| IoLimit::from_reader(buf))
    }

    pub fn memory_current(&self) -> Option<u64> {
        self.read::<Current>("memory.current").map(|c| c.value)
    }

    pub fn pids_current(&self) -> Option<u64> {
        self.read::<Current>("pids.current").map(|c| c.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_unified_path() {
        let data = "12:pids:/user.slice\n0::/system.slice/nginx.service\n";
        let path = unified_path_from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(path.as_deref(), Some("/system.slice/nginx.service"));

        let v1_only = "4:memory:/docker/abc\n";
        assert_eq!(unified_path_from_reader(&mut v1_only.as_bytes()).unwrap(), None);
    }

    #[test]
    fn test_of_process_resolves_under_mount() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "proc/self/mountinfo",
            "30 23 0:26 / /sys/fs/cgroup rw,nosuid - cgroup2 cgroup2 rw\n",
        );
        write(root, "proc/42/cgroup", "0::/system.slice/app.service\n");
        write(root, "sys/fs/cgroup/system.slice/app.service/memory.max", "1048576\n");
        write(root, "sys/fs/cgroup/system.slice/app.service/memory.current", "4096\n");
        write(root, "sys/fs/cgroup/system.slice/app.service/cpu.max", "20000 100000\n");
        write(root, "sys/fs/cgroup/system.slice/app.service/pids.max", "max\n");

        let procfs = ProcFs::new(root);
        let cgroup = Cgroup::of_process(&procfs, 42).unwrap();
        assert_eq!(
            cgroup.dir(),
            root.join("sys/fs/cgroup/system.slice/app.service")
        );
        assert_eq!(cgroup.memory_limit(), Some(Limit { value: Some(1_048_576) }));
        assert_eq!(cgroup.memory_current(), Some(4096));
        assert_eq!(cgroup.cpu_limit().unwrap().quota, Some(20000));
        assert_eq!(cgroup.pids_limit(), Some(Limit { value: None }));
        assert_eq!(cgroup.pids_current(), None);
        assert_eq!(cgroup.io_limit(), None);
    }

    #[test]
    fn test_of_process_falls_back_to_root_cgroup() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "proc/7/cgroup", "0::/gone.scope\n");
        write(root, "sys/fs/cgroup/memory.max", "max\n");

        let cgroup = Cgroup::of_process(&ProcFs::new(root), 7).unwrap();
        assert_eq!(cgroup.dir(), root.join("sys/fs/cgroup"));
        assert_eq!(cgroup.memory_limit(), Some(Limit { value: None }));
    }

    #[test]
    fn test_of_missing_process() {
        let dir = tempfile::tempdir().unwrap();
        let err = Cgroup::of_process(&ProcFs::new(dir.path()), 999).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_garbage_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "memory.current", "lots\n");
        let cgroup = Cgroup::new(dir.path());
        assert_eq!(cgroup.memory_current(), None);
    }
}
