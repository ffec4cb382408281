//! Process configuration, read once from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::health::DEFAULT_TIMEOUT;

/// Root under which `proc/`, `sys/` and `run/` are resolved.
pub const ROOTFS_MOUNT_PATH: &str = "ROOTFS_MOUNT_PATH";
/// Default prober timeout in milliseconds.
pub const PROBE_DEFAULT_TIMEOUT_MS: &str = "PROBE_DEFAULT_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rootfs: PathBuf,
    pub default_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rootfs: PathBuf::from("/"),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup. Unset or empty variables keep
    /// their default; invalid ones keep it too, with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(rootfs) = lookup(ROOTFS_MOUNT_PATH) {
            let rootfs = PathBuf::from(rootfs.trim());
            if rootfs.is_absolute() {
                config.rootfs = rootfs;
            } else {
                log::warn!(
                    "Ignoring {ROOTFS_MOUNT_PATH}=`{}`: not an absolute path",
                    rootfs.display()
                );
            }
        }

        if let Some(timeout) = lookup(PROBE_DEFAULT_TIMEOUT_MS) {
            match timeout.trim().parse::<u64>() {
                Ok(0) => log::warn!("Ignoring {PROBE_DEFAULT_TIMEOUT_MS}=0"),
                Ok(ms) => config.default_timeout = Duration::from_millis(ms),
                Err(err) => log::warn!("Ignoring {PROBE_DEFAULT_TIMEOUT_MS}=`{timeout}`: {err}"),
            }
        }

        log::debug!("Configuration: {config:?}");
        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), Config::default());
        assert_eq!(Config::default().rootfs, PathBuf::from("/"));
        assert_eq!(Config::default().default_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let custom = config(&[
            (ROOTFS_MOUNT_PATH, "/rootfs"),
            (PROBE_DEFAULT_TIMEOUT_MS, "250"),
        ]);
        assert_eq!(custom.rootfs, PathBuf::from("/rootfs"));
        assert_eq!(custom.default_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let invalid = config(&[
            (ROOTFS_MOUNT_PATH, "relative/root"),
            (PROBE_DEFAULT_TIMEOUT_MS, "soon"),
        ]);
        assert_eq!(invalid, Config::default());

        let zero = config(&[(PROBE_DEFAULT_TIMEOUT_MS, "0"), (ROOTFS_MOUNT_PATH, "  ")]);
        assert_eq!(zero, Config::default());
    }
}
