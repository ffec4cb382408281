//! Interface counters from `/proc/net/dev` and link attributes from `/sys/class/net`.

use std::io::BufRead;
use std::path::Path;

use crate::fsutil;

/// Counters of one interface, as reported in `/proc/net/dev`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceStat {
    pub interface: String,
    /// Bytes received.
    pub rx_bytes: u64,
    /// Packets received.
    pub rx_packets: u64,
    /// Receive errors.
    pub rx_errs: u64,
    /// Dropped packets while receiving.
    pub rx_drop: u64,
    /// Bytes transmitted.
    pub tx_bytes: u64,
    /// Packets transmitted.
    pub tx_packets: u64,
    /// Transmit errors.
    pub tx_errs: u64,
    /// Dropped packets while transmitting.
    pub tx_drop: u64,
}

/// Splits `  eth0: 1 2 3 ...` into the interface name and its counters.
fn parse_interface_line(line: &str) -> Option<(&str, impl Iterator<Item = &str>)> {
    let (iface, data) = line.trim().split_once(':')?;
    Some((iface.trim(), data.split_whitespace()))
}

/// Returns `None` if fewer than the 16 receive and transmit counters are present.
fn stat_from_fields<'a>(
    interface: &str,
    mut fields: impl Iterator<Item = &'a str>,
) -> Option<InterfaceStat> {
    let mut next = || fields.next().map(|f| f.parse::<u64>().unwrap_or(0));
    let rx_bytes = next()?;
    let rx_packets = next()?;
    let rx_errs = next()?;
    let rx_drop = next()?;
    // fifo frame compressed multicast
    for _ in 0..4 {
        next()?;
    }
    let tx_bytes = next()?;
    let tx_packets = next()?;
    let tx_errs = next()?;
    let tx_drop = next()?;
    // fifo colls carrier compressed
    for _ in 0..4 {
        next()?;
    }

    Some(InterfaceStat {
        interface: interface.to_owned(),
        rx_bytes,
        rx_packets,
        rx_errs,
        rx_drop,
        tx_bytes,
        tx_packets,
        tx_errs,
        tx_drop,
    })
}

impl InterfaceStat {
    /// Every interface listed in a `/proc/net/dev`-style buffer, in file order.
    pub fn list_from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Vec<Self>> {
        let mut stats = Vec::new();
        let mut line = String::new();

        // Skip headers (first two lines)
        for _ in 0..2 {
            buf.read_line(&mut line)?;
            line.clear();
        }

        while buf.read_line(&mut line)? != 0 {
            if let Some(stat) = parse_interface_line(&line)
                .and_then(|(iface, fields)| stat_from_fields(iface, fields))
            {
                stats.push(stat);
            }
            line.clear();
        }

        Ok(stats)
    }
}

const IFF_UP: u32 = 0x1;
const IFF_LOOPBACK: u32 = 0x8;

/// Link attributes of one entry under `/sys/class/net`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceInfo {
    pub name: String,
    pub mac_address: String,
    pub mtu: u32,
    pub is_up: bool,
    pub is_loopback: bool,
}

impl InterfaceInfo {
    /// Reads `address`, `mtu` and `flags` below `dir`. Unreadable attributes stay at their
    /// zero value.
    pub fn from_sysfs(name: &str, dir: &Path) -> Self {
        let mac_address = fsutil::read_trimmed(dir.join("address")).unwrap_or_default();
        let mtu = fsutil::read_trimmed(dir.join("mtu"))
            .and_then(|mtu| mtu.parse().ok())
            .unwrap_or(0);
        let flags = fsutil::read_trimmed(dir.join("flags"))
            .and_then(|flags| u32::from_str_radix(flags.trim_start_matches("0x"), 16).ok())
            .unwrap_or(0);

        InterfaceInfo {
            name: name.to_owned(),
            mac_address,
            mtu,
            is_up: flags & IFF_UP != 0,
            is_loopback: flags & IFF_LOOPBACK != 0,
        }
    }
}
