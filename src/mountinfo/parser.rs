//! Mountinfo line parser.
//!
//! Parses lines in `/proc/[pid]/mountinfo` format. See
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)
//! for details on the structure.

use std::borrow::Cow;

/// A parsed mountinfo line. Path fields are still octal-escaped, see [`unescape`].
#[derive(Debug, PartialEq, Eq)]
pub struct MountInfo<'a> {
    pub mount_id: &'a str,
    pub parent_id: &'a str,
    /// Major:Minor device identifier.
    pub major_minor: &'a str,
    /// Root of the mount within the filesystem.
    pub root: &'a str,
    /// Mount point relative to the process's root.
    pub mount_point: &'a str,
    /// Per-mount options such as `rw,nosuid`.
    pub mount_options: &'a str,
    /// Tagged fields like `shared:20`, possibly none.
    pub optional_fields: Vec<&'a str>,
    /// Filesystem type (e.g., `ext4`, `cgroup2`).
    pub fs_type: &'a str,
    /// Source of the mount (e.g., device).
    pub source: &'a str,
    pub super_options: &'a str,
}

/// Named fields in a mountinfo line.
#[derive(Debug)]
pub enum MountInfoField {
    MountId,
    ParentId,
    MajorMinor,
    Root,
    MountPoint,
    MountOptions,
    FsType,
    Source,
    SuperOptions,
}

impl std::fmt::Display for MountInfoField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MountInfoField::MountId => "mount_id",
            MountInfoField::ParentId => "parent_id",
            MountInfoField::MajorMinor => "major:minor",
            MountInfoField::Root => "root",
            MountInfoField::MountPoint => "mount_point",
            MountInfoField::MountOptions => "mount_options",
            MountInfoField::FsType => "fs_type",
            MountInfoField::Source => "source",
            MountInfoField::SuperOptions => "super_options",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum ParseError {
    #[error("missing separator ` - ` in line: `{0}`")]
    MissingSeparator(String),

    #[error("missing `{field}` in pre-separator section of line: `{line}`")]
    MissingPreSeparatorField { field: MountInfoField, line: String },

    #[error("missing `{field}` in post-separator section of line: `{line}`")]
    MissingPostSeparatorField { field: MountInfoField, line: String },
}

/// Parses a single line of mountinfo data without copying any field.
pub fn parse_mount_info_line(line: &str) -> Result<MountInfo<'_>, ParseError> {
    let line = line.trim_end_matches('\n');
    let (pre, post) = line
        .split_once(" - ")
        .ok_or_else(|| ParseError::MissingSeparator(line.to_owned()))?;

    let mut pre_fields = pre.split_whitespace();
    let mut next_pre = |field: MountInfoField| {
        pre_fields
            .next()
            .ok_or_else(|| ParseError::MissingPreSeparatorField {
                field,
                line: line.to_owned(),
            })
    };
    let mount_id = next_pre(MountInfoField::MountId)?;
    let parent_id = next_pre(MountInfoField::ParentId)?;
    let major_minor = next_pre(MountInfoField::MajorMinor)?;
    let root = next_pre(MountInfoField::Root)?;
    let mount_point = next_pre(MountInfoField::MountPoint)?;
    let mount_options = next_pre(MountInfoField::MountOptions)?;
    let optional_fields: Vec<&str> = pre_fields.collect();

    let mut post_fields = post.split_whitespace();
    let mut next_post = |field: MountInfoField| {
        post_fields
            .next()
            .ok_or_else(|| ParseError::MissingPostSeparatorField {
                field,
                line: line.to_owned(),
            })
    };
    let fs_type = next_post(MountInfoField::FsType)?;
    let source = next_post(MountInfoField::Source)?;
    let super_options = next_post(MountInfoField::SuperOptions)?;

    Ok(MountInfo {
        mount_id,
        parent_id,
        major_minor,
        root,
        mount_point,
        mount_options,
        optional_fields,
        fs_type,
        source,
        super_options,
    })
}

/// Decodes the kernel's `\ooo` octal escapes (space, tab, newline, backslash).
pub fn unescape(field: &str) -> Cow<'_, str> {
    if !field.contains('\\') {
        return Cow::Borrowed(field);
    }

    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_with_optional_fields() {
        let line = "70 56 0:45 / /var rw,nosuid,nodev,noexec,relatime shared:20 - ext4 /dev/sdb1 rw,errors=remount-ro\n";
        let result = parse_mount_info_line(line).unwrap();

        assert_eq!(result.mount_id, "70");
        assert_eq!(result.parent_id, "56");
        assert_eq!(result.major_minor, "0:45");
        assert_eq!(result.root, "/");
        assert_eq!(result.mount_point, "/var");
        assert_eq!(result.mount_options, "rw,nosuid,nodev,noexec,relatime");
        assert_eq!(result.optional_fields, vec!["shared:20"]);
        assert_eq!(result.fs_type, "ext4");
        assert_eq!(result.source, "/dev/sdb1");
        assert_eq!(result.super_options, "rw,errors=remount-ro");
    }

    #[test]
    fn test_parse_line_without_optional_fields() {
        let result = parse_mount_info_line("36 25 0:32 / /sys rw - sysfs sysfs rw").unwrap();
        assert!(result.optional_fields.is_empty());
        assert_eq!(result.fs_type, "sysfs");
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_mount_info_line("42 35 0:22 / /mnt rw ext4 /dev/sda1 rw").unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator(_)));
        assert!(matches!(
            parse_mount_info_line("").unwrap_err(),
            ParseError::MissingSeparator(_)
        ));
    }

    #[test]
    fn test_missing_pre_separator_field() {
        let err = parse_mount_info_line("42 35 0:22 / /mnt - ext4 /dev/sda1 rw").unwrap_err();
        match err {
            ParseError::MissingPreSeparatorField { field, .. } => {
                assert_eq!(field.to_string(), "mount_options");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_post_separator_field() {
        let err = parse_mount_info_line("42 35 0:22 / /mnt rw - ext4 /dev/sda1").unwrap_err();
        match err {
            ParseError::MissingPostSeparatorField { field, .. } => {
                assert_eq!(field.to_string(), "super_options");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("/mnt/plain"), "/mnt/plain");
        assert!(matches!(unescape("/mnt/plain"), Cow::Borrowed(_)));
        assert_eq!(unescape("/mnt/my\\040disk"), "/mnt/my disk");
        assert_eq!(unescape("/a\\011b\\134c"), "/a\tb\\c");
        assert_eq!(unescape("/trailing\\04"), "/trailing\\04");
    }
}
