use crate::fsutil;

use super::parser::{parse_mount_info_line, unescape};
use super::{Error, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Filesystem types that never back user data and are left out of partition listings.
const PSEUDO_FS_TYPES: &[&str] = &[
    "proc",
    "sysfs",
    "devtmpfs",
    "devpts",
    "cgroup",
    "cgroup2",
    "securityfs",
    "debugfs",
    "tracefs",
    "configfs",
    "fusectl",
    "mqueue",
    "hugetlbfs",
    "pstore",
    "bpf",
    "autofs",
];

pub fn is_pseudo_fs(fs_type: &str) -> bool {
    PSEUDO_FS_TYPES.contains(&fs_type)
}

/// A mounted filesystem worth reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    /// Comma separated per-mount options.
    pub options: String,
}

/// Detects the cgroup v2 mount point by parsing a Linux `mountinfo` file.
///
/// If multiple `cgroup2` entries exist, the first one is returned.
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
/// - [`Error::MissingCgroup2Mount`] if no `cgroup2` mount is found.
///
/// # Example
///
/// ```no_run
/// use service_probe::mountinfo::detect_cgroup2_mount_point;
///
/// let root = detect_cgroup2_mount_point("/proc/self/mountinfo").unwrap();
/// println!("cgroup2 root: {}", root.display());
/// ```
pub fn detect_cgroup2_mount_point(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    detect_cgroup2_mount_point_from_reader(buf, path)
}

fn detect_cgroup2_mount_point_from_reader<R: BufRead>(reader: R, origin: &Path) -> Result<PathBuf> {
    let mut mount_point = None;
    for_each_mount(reader, origin, |mount_info| {
        if mount_info.fs_type == "cgroup2" {
            log::debug!(
                "Found `cgroup2` mount point with root `{}`: {}",
                mount_info.root,
                mount_info.mount_point
            );
            mount_point = Some(PathBuf::from(unescape(mount_info.mount_point).as_ref()));
            return false;
        }
        true
    })?;

    mount_point.ok_or_else(|| Error::MissingCgroup2Mount {
        path: origin.to_path_buf(),
    })
}

/// Lists real filesystems from a `mountinfo` file, in mount order.
pub fn list_partitions(path: impl AsRef<Path>) -> Result<Vec<Partition>> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    list_partitions_from_reader(buf, path)
}

fn list_partitions_from_reader<R: BufRead>(reader: R, origin: &Path) -> Result<Vec<Partition>> {
    let mut partitions = Vec::new();
    for_each_mount(reader, origin, |mount_info| {
        if !is_pseudo_fs(mount_info.fs_type) {
            partitions.push(Partition {
                device: unescape(mount_info.source).into_owned(),
                mount_point: unescape(mount_info.mount_point).into_owned(),
                fs_type: mount_info.fs_type.to_owned(),
                options: mount_info.mount_options.to_owned(),
            });
        }
        true
    })?;
    Ok(partitions)
}

/// Feeds every parsed line to `visit` until it returns `false`.
fn for_each_mount<R: BufRead>(
    mut reader: R,
    origin: &Path,
    mut visit: impl FnMut(super::MountInfo<'_>) -> bool,
) -> Result<()> {
    let mut line = String::with_capacity(256);

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        let mount_info = parse_mount_info_line(line.as_str()).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        if !visit(mount_info) {
            break;
        }

        line.clear();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MOUNTINFO: &str = "\
22 28 0:21 / /proc rw,nosuid,nodev,noexec,relatime shared:12 - proc proc rw
23 28 0:22 / /sys rw,nosuid,nodev,noexec,relatime shared:2 - sysfs sysfs rw
28 1 259:2 / / rw,relatime shared:1 - ext4 /dev/nvme0n1p2 rw
30 23 0:26 / /sys/fs/cgroup rw,nosuid,nodev,noexec,relatime shared:4 - cgroup2 cgroup2 rw,nsdelegate
45 28 259:1 / /boot/efi rw,relatime shared:29 - vfat /dev/nvme0n1p1 rw,fmask=0077
51 28 8:17 / /mnt/backup\\040disk rw,noatime shared:31 - xfs /dev/sdb1 rw
";

    fn new_cursor_from_contents(contents: &str) -> Cursor<Vec<u8>> {
        Cursor::new(contents.as_bytes().to_vec())
    }

    #[test]
    fn test_detect_cgroup2_mount() {
        let mount =
            detect_cgroup2_mount_point_from_reader(new_cursor_from_contents(MOUNTINFO), Path::new("/dummy"))
                .unwrap();
        assert_eq!(mount, PathBuf::from("/sys/fs/cgroup"));
    }

    #[test]
    fn test_detect_first_of_multiple_cgroup2_mounts() {
        let input = "\
43 35 0:39 / /sys/fs/cgroup rw,nosuid - cgroup2 cgroup rw
42 35 0:39 / /ignored rw,nosuid - cgroup2 cgroup rw
";
        let mount =
            detect_cgroup2_mount_point_from_reader(new_cursor_from_contents(input), Path::new("/dummy"))
                .unwrap();
        assert_eq!(mount, PathBuf::from("/sys/fs/cgroup"));
    }

    #[test]
    fn test_detect_missing_cgroup2_mount() {
        let input = "25 1 0:24 / /proc rw,relatime - proc proc rw\n";
        let path = Path::new("/dummy");

        let err = detect_cgroup2_mount_point_from_reader(new_cursor_from_contents(input), path)
            .unwrap_err();
        match err {
            Error::MissingCgroup2Mount { path: err_path } => assert_eq!(err_path, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_detect_invalid_line() {
        let path = Path::new("/dummy");
        let err = detect_cgroup2_mount_point_from_reader(
            new_cursor_from_contents("invalid mountinfo line"),
            path,
        )
        .unwrap_err();
        match err {
            Error::Parse { path: err_path, .. } => assert_eq!(err_path, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_detect_from_tempfile() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "42 35 0:39 / /sys/fs/cgroup rw,nosuid,nodev,noexec,relatime - cgroup2 cgroup rw"
        )
        .unwrap();

        let mount = detect_cgroup2_mount_point(tmp.path()).unwrap();
        assert_eq!(mount, PathBuf::from("/sys/fs/cgroup"));
    }

    #[test]
    fn test_list_partitions_skips_pseudo_filesystems() {
        let partitions =
            list_partitions_from_reader(new_cursor_from_contents(MOUNTINFO), Path::new("/dummy"))
                .unwrap();
        let mounts: Vec<&str> = partitions.iter().map(|p| p.mount_point.as_str()).collect();
        assert_eq!(mounts, vec!["/", "/boot/efi", "/mnt/backup disk"]);

        assert_eq!(
            partitions[0],
            Partition {
                device: "/dev/nvme0n1p2".to_owned(),
                mount_point: "/".to_owned(),
                fs_type: "ext4".to_owned(),
                options: "rw,relatime".to_owned(),
            }
        );
    }

    #[test]
    fn test_list_partitions_missing_file() {
        let err = list_partitions("/definitely/not/here/mountinfo").unwrap_err();
        assert!(matches!(err, Error::FileOpen(_)));
    }

    #[test]
    fn test_pseudo_fs() {
        assert!(is_pseudo_fs("cgroup2"));
        assert!(is_pseudo_fs("autofs"));
        assert!(!is_pseudo_fs("ext4"));
        assert!(!is_pseudo_fs("tmpfs"));
    }
}
