mod detect;
mod error;
mod parser;

pub use detect::{Partition, detect_cgroup2_mount_point, is_pseudo_fs, list_partitions};
pub use error::{Error, Result};
pub use parser::{MountInfo, ParseError, parse_mount_info_line, unescape};
