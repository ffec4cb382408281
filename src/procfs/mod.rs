//! Readers for the Linux `/proc` and `/sys` pseudo filesystems.
//!
//! Every path is resolved beneath a configurable root, so that the engine can inspect a host
//! whose root filesystem is mounted somewhere else (`ROOTFS_MOUNT_PATH`) and tests can point
//! it at a fake tree.

mod cpu;
mod disk;
pub(crate) mod error;
mod limits;
mod loadavg;
mod memory;
mod net;
mod parser;
mod pressure;
mod process;
mod sockets;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub use cpu::{CpuInfo, CpuTimes};
pub use disk::{DiskStat, FsUsage};
pub use error::{Error, Result, StatParseError};
pub use limits::ResourceLimits;
pub use loadavg::LoadAvg;
pub use memory::MemInfo;
pub use net::{InterfaceInfo, InterfaceStat};
pub use parser::{KeyValueStat, SingleLineStat};
pub(crate) use parser::{first_line, parse_max};
pub use pressure::{Pressure, PressureLine};
pub use process::{ProcessStat, ProcessStatus};
pub use sockets::{InetSocket, SocketOwner, SocketOwners, UnixSocketEntry};

use crate::fsutil;

/// A view of `/proc` and `/sys` beneath `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/")
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `path` re-rooted beneath the configured root. Absolute and relative inputs are
    /// treated alike.
    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }

    pub fn proc_dir(&self) -> PathBuf {
        self.path("proc")
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<BufReader<File>> {
        Ok(fsutil::open_file_reader(self.path(path))?)
    }

    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String> {
        Ok(fsutil::read_to_string(self.path(path))?)
    }

    /// Opens `path` and hands it to `parse`, attaching the path to any failure.
    pub fn parse<T>(
        &self,
        path: impl AsRef<Path>,
        parse: impl FnOnce(&mut BufReader<File>) -> std::io::Result<T>,
    ) -> Result<T> {
        let path = self.path(path);
        let mut reader = fsutil::open_file_reader(&path)?;
        parse(&mut reader).map_err(|source| Error::Parse { path, source })
    }

    pub fn key_value<T: KeyValueStat>(&self, path: impl AsRef<Path>) -> Result<T> {
        self.parse(path, |buf| T::from_reader(buf))
    }

    pub fn single_line<T: SingleLineStat>(&self, path: impl AsRef<Path>) -> Result<T> {
        self.parse(path, |buf| T::from_reader(buf))
    }

    /// Names of the entries of a directory, sorted.
    pub fn list_dir(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = self.path(path);
        let entries = std::fs::read_dir(&path).map_err(|source| Error::ReadDir {
            path: path.clone(),
            source,
        })?;
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.path(path).exists()
    }

    /// Reads every line of a file; a missing or unreadable file yields no lines.
    pub fn lines(&self, path: impl AsRef<Path>) -> Vec<String> {
        match self.open(path) {
            Ok(reader) => reader.lines().map_while(std::result::Result::ok).collect(),
            Err(err) => {
                log::trace!("{err}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_is_rerooted() {
        let procfs = ProcFs::new("/host");
        assert_eq!(procfs.path("/proc/stat"), PathBuf::from("/host/proc/stat"));
        assert_eq!(procfs.path("proc/stat"), PathBuf::from("/host/proc/stat"));
        assert_eq!(ProcFs::default().path("/proc"), PathBuf::from("/proc"));
    }

    #[test]
    fn test_parse_attaches_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("proc")).unwrap();
        std::fs::write(dir.path().join("proc/loadavg"), "x y z\n").unwrap();
        let procfs = ProcFs::new(dir.path());

        let err = procfs.single_line::<LoadAvg>("/proc/loadavg").unwrap_err();
        match &err {
            Error::Parse { path, .. } => assert_eq!(path, &dir.path().join("proc/loadavg")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

        let err = procfs.single_line::<LoadAvg>("/proc/missing").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_list_dir_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sys/class/net/eth0")).unwrap();
        std::fs::create_dir_all(dir.path().join("sys/class/net/lo")).unwrap();
        std::fs::write(dir.path().join("cgroup"), "0::/a\n0::/b\n").unwrap();
        let procfs = ProcFs::new(dir.path());

        assert_eq!(
            procfs.list_dir("/sys/class/net").unwrap(),
            vec!["eth0".to_owned(), "lo".to_owned()]
        );
        assert_eq!(procfs.lines("/cgroup"), vec!["0::/a", "0::/b"]);
        assert!(procfs.lines("/absent").is_empty());
        assert!(procfs.exists("/cgroup"));
    }
}
