//! String-level heuristics over `/proc/<pid>/cgroup` contents.

const CONTAINER_ID_LENGTH: usize = 64;
/// 32 hex digits plus four separators.
const POD_UID_LENGTH: usize = 36;

/// Prefixes runtimes put in front of the container id in a cgroup path segment.
const CONTAINER_ID_PREFIXES: &[&str] = &[
    "cri-containerd-",
    "containerd-",
    "docker-",
    "crio-",
    "libpod-",
];

const POD_SLICE_PREFIXES: &[&str] = &[
    "kubepods-besteffort-pod",
    "kubepods-burstable-pod",
    "kubepods-guaranteed-pod",
    "kubepods-pod",
];

/// Returns true if the input string is not empty and contains only ASCII hex digits.
pub fn is_non_empty_hex_string(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Returns true if the cgroup listing names a known runtime or carries a long hex id.
pub fn matches_container_cgroup(cgroup: &str) -> bool {
    cgroup.lines().any(|line| {
        line.contains("docker")
            || line.contains("kubepods")
            || line.contains("containerd")
            || line.contains("libpod")
            || line.contains("crio")
            || line
                .split('/')
                .any(|part| part.len() >= 32 && is_non_empty_hex_string(part))
    })
}

pub fn is_kubernetes_cgroup(cgroup: &str) -> bool {
    cgroup.contains("/kubepods") || cgroup.contains("kubepods-")
}

/// Strips the runtime prefix and `.scope` suffix of a segment, leaving the bare id if it is
/// one.
fn container_id_of_segment(segment: &str) -> Option<&str> {
    let stripped = segment.strip_suffix(".scope").unwrap_or(segment);
    let stripped = CONTAINER_ID_PREFIXES
        .iter()
        .find_map(|prefix| stripped.strip_prefix(prefix))
        .unwrap_or(stripped);

    (stripped.len() == CONTAINER_ID_LENGTH && is_non_empty_hex_string(stripped))
        .then_some(stripped)
}

/// The innermost 64 hex digit container id found in any cgroup path.
pub fn extract_container_id(cgroup: &str) -> Option<String> {
    cgroup.lines().find_map(|line| {
        let path = line.splitn(3, ':').nth(2).unwrap_or(line);
        path.rsplit('/')
            .find_map(container_id_of_segment)
            .map(str::to_owned)
    })
}

/// The Kubernetes pod UID, from either systemd (`kubepods-burstable-pod<uid>.slice`) or
/// cgroupfs (`/kubepods/burstable/pod<uid>`) naming. Underscores are turned back into dashes.
pub fn extract_pod_uid(cgroup: &str) -> Option<String> {
    cgroup
        .lines()
        .flat_map(|line| line.split('/'))
        .find_map(|segment| {
            let id = match segment.strip_suffix(".slice") {
                Some(slice) => POD_SLICE_PREFIXES
                    .iter()
                    .find_map(|prefix| slice.strip_prefix(prefix))?,
                None => segment.strip_prefix("pod")?,
            };
            (id.len() == POD_UID_LENGTH
                && id
                    .chars()
                    .all(|c| c.is_ascii_hexdigit() || c == '_' || c == '-'))
            .then(|| id.replace('_', "-"))
        })
}
