//! Soft resource limits from `/proc/<pid>/limits`, or `getrlimit(2)` for this process.

use std::io::BufRead;

use nix::sys::resource::{Resource, getrlimit};

/// Soft limits; `None` when the limit was not reported, `u64::MAX` when unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceLimits {
    pub cpu_time_secs: Option<u64>,
    pub data_bytes: Option<u64>,
    pub processes: Option<u64>,
    pub open_files: Option<u64>,
}

fn parse_soft_limit(rest: &str) -> Option<u64> {
    match rest.split_whitespace().next()? {
        "unlimited" => Some(u64::MAX),
        value => value.parse().ok(),
    }
}

impl ResourceLimits {
    /// Parses the table of `/proc/<pid>/limits`.
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut limits = ResourceLimits::default();
        let mut line = String::new();
        while buf.read_line(&mut line)? != 0 {
            if let Some(rest) = line.strip_prefix("Max cpu time") {
                limits.cpu_time_secs = parse_soft_limit(rest);
            } else if let Some(rest) = line.strip_prefix("Max data size") {
                limits.data_bytes = parse_soft_limit(rest);
            } else if let Some(rest) = line.strip_prefix("Max processes") {
                limits.processes = parse_soft_limit(rest);
            } else if let Some(rest) = line.strip_prefix("Max open files") {
                limits.open_files = parse_soft_limit(rest);
            }
            line.clear();
        }
        Ok(limits)
    }

    /// Limits of the calling process.
    pub fn current() -> Self {
        // RLIM_INFINITY is all ones, which is u64::MAX on every 64-bit target.
        let soft = |resource: Resource| match getrlimit(resource) {
            Ok((soft, _hard)) => Some(u64::from(soft)),
            Err(err) => {
                log::warn!("getrlimit({resource:?}) failed: {err}");
                None
            }
        };

        ResourceLimits {
            cpu_time_secs: soft(Resource::RLIMIT_CPU),
            data_bytes: soft(Resource::RLIMIT_DATA),
            processes: soft(Resource::RLIMIT_NPROC),
            open_files: soft(Resource::RLIMIT_NOFILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limits_table() {
        let data = "\
Limit                     Soft Limit           Hard Limit           Units
Max cpu time              unlimited            unlimited            seconds
Max file size             unlimited            unlimited            bytes
Max data size             1073741824           unlimited            bytes
Max processes             63462                63462                processes
Max open files            1024                 524288               files
";
        let limits = ResourceLimits::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(
            limits,
            ResourceLimits {
                cpu_time_secs: Some(u64::MAX),
                data_bytes: Some(1_073_741_824),
                processes: Some(63462),
                open_files: Some(1024),
            }
        );
    }

    #[test]
    fn test_current_limits() {
        let limits = ResourceLimits::current();
        assert!(limits.open_files.is_some_and(|n| n > 0));
    }
}
