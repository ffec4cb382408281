//! `/proc/meminfo`.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::KeyValueStat;

const KIB: u64 = 1024;

/// The subset of `/proc/meminfo` the engine reports, converted from kB to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl MemInfo {
    pub fn used(&self) -> u64 {
        self.mem_total.saturating_sub(self.mem_available)
    }

    pub fn swap_used(&self) -> u64 {
        self.swap_total.saturating_sub(self.swap_free)
    }
}

type Setter = fn(&mut MemInfo, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(7);

    m.insert("MemTotal:", |s, v| s.mem_total = v.saturating_mul(KIB));
    m.insert("MemFree:", |s, v| s.mem_free = v.saturating_mul(KIB));
    m.insert("MemAvailable:", |s, v| s.mem_available = v.saturating_mul(KIB));
    m.insert("Buffers:", |s, v| s.buffers = v.saturating_mul(KIB));
    m.insert("Cached:", |s, v| s.cached = v.saturating_mul(KIB));
    m.insert("SwapTotal:", |s, v| s.swap_total = v.saturating_mul(KIB));
    m.insert("SwapFree:", |s, v| s.swap_free = v.saturating_mul(KIB));

    m
});

impl KeyValueStat for MemInfo {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_LINES: usize = 0;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}
