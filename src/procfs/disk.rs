//! `/proc/diskstats` and filesystem usage.

use std::io::BufRead;
use std::path::Path;

use nix::sys::statvfs::statvfs;

use super::{Error, Result};

const SECTOR_BYTES: u64 = 512;

/// Counters of one block device, as reported in `/proc/diskstats`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiskStat {
    pub device: String,
    pub reads_completed: u64,
    pub sectors_read: u64,
    pub read_time_ms: u64,
    pub writes_completed: u64,
    pub sectors_written: u64,
    pub write_time_ms: u64,
    pub io_in_progress: u64,
    pub io_time_ms: u64,
    pub weighted_io_time_ms: u64,
}

/// Parses the counters following `major minor name`.
///
/// Returns `None` if the line has fewer than the eleven classic counters.
fn stat_from_fields<'a>(device: &str, mut fields: impl Iterator<Item = &'a str>) -> Option<DiskStat> {
    let mut next = || fields.next().map(|f| f.parse::<u64>().unwrap_or(0));
    let reads_completed = next()?;
    let _reads_merged = next()?;
    let sectors_read = next()?;
    let read_time_ms = next()?;
    let writes_completed = next()?;
    let _writes_merged = next()?;
    let sectors_written = next()?;
    let write_time_ms = next()?;
    let io_in_progress = next()?;
    let io_time_ms = next()?;
    let weighted_io_time_ms = next()?;

    Some(DiskStat {
        device: device.to_owned(),
        reads_completed,
        sectors_read,
        read_time_ms,
        writes_completed,
        sectors_written,
        write_time_ms,
        io_in_progress,
        io_time_ms,
        weighted_io_time_ms,
    })
}

impl DiskStat {
    /// Every device listed in a `/proc/diskstats`-style buffer. Malformed lines are skipped.
    pub fn list_from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Vec<Self>> {
        let mut stats = Vec::new();
        let mut line = String::new();
        while buf.read_line(&mut line)? != 0 {
            let mut fields = line.split_whitespace();
            let device = fields.nth(2);
            match device.and_then(|device| stat_from_fields(device, fields)) {
                Some(stat) => stats.push(stat),
                None => log::trace!("skipping diskstats line: {}", line.trim_end()),
            }
            line.clear();
        }
        Ok(stats)
    }

    pub fn read_bytes(&self) -> u64 {
        self.sectors_read.saturating_mul(SECTOR_BYTES)
    }

    pub fn write_bytes(&self) -> u64 {
        self.sectors_written.saturating_mul(SECTOR_BYTES)
    }

    /// Whether this row counts towards system-wide I/O totals: whole physical devices only,
    /// so that partitions and stacked or memory-backed devices are not counted twice.
    pub fn is_whole_disk(&self) -> bool {
        !is_virtual_device(&self.device) && !is_partition(&self.device)
    }
}

fn is_virtual_device(name: &str) -> bool {
    ["loop", "ram", "dm-", "zram"]
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

fn is_partition(name: &str) -> bool {
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        // nvme0n1p2, mmcblk0p1
        return name.rsplit_once('p').is_some_and(|(head, tail)| {
            !tail.is_empty()
                && tail.bytes().all(|b| b.is_ascii_digit())
                && head.ends_with(|c: char| c.is_ascii_digit())
        });
    }
    if ["sd", "vd", "hd", "xvd"]
        .iter()
        .any(|prefix| name.starts_with(prefix))
    {
        return name.ends_with(|c: char| c.is_ascii_digit());
    }
    false
}

/// Capacity and inode counts of the filesystem holding one path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FsUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    /// Space available to unprivileged users.
    pub free_bytes: u64,
    pub used_percent: f64,
    pub inodes_total: u64,
    pub inodes_used: u64,
    pub inodes_free: u64,
}

impl FsUsage {
    /// # Errors
    ///
    /// [`Error::Statvfs`] when `statvfs(2)` fails for `path`.
    pub fn of(path: &Path) -> Result<Self> {
        let stat = statvfs(path).map_err(|source| Error::Statvfs {
            path: path.to_path_buf(),
            source,
        })?;

        let fragment = u64::from(stat.fragment_size());
        let total_bytes = u64::from(stat.blocks()).saturating_mul(fragment);
        let free = u64::from(stat.blocks_free()).saturating_mul(fragment);
        let available = u64::from(stat.blocks_available()).saturating_mul(fragment);
        let used_bytes = total_bytes.saturating_sub(free);
        let used_percent = if total_bytes > 0 {
            used_bytes as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };

        let inodes_total = u64::from(stat.files());
        let inodes_free = u64::from(stat.files_free());
        Ok(FsUsage {
            total_bytes,
            used_bytes,
            free_bytes: available,
            used_percent,
            inodes_total,
            inodes_used: inodes_total.saturating_sub(inodes_free),
            inodes_free,
        })
    }
}
