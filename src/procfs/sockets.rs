//! Socket tables from `/proc/net/{tcp,tcp6,udp,udp6,unix}` and socket ownership from
//! `/proc/<pid>/fd`.

use std::collections::HashMap;
use std::io::BufRead;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;

/// Owning process of a socket inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOwner {
    pub pid: i32,
    pub name: String,
}

/// Socket inode to owning process, built by scanning every `/proc/<pid>/fd`.
///
/// Processes whose descriptors cannot be read (other users' processes without privileges)
/// are silently skipped. When several processes share a socket, the last one scanned wins.
#[derive(Debug, Clone, Default)]
pub struct SocketOwners {
    by_inode: HashMap<u64, SocketOwner>,
}

impl SocketOwners {
    pub fn scan(proc_dir: &Path) -> Self {
        let mut owners = SocketOwners::default();
        let entries = match std::fs::read_dir(proc_dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("Failed to list `{}`: {err}", proc_dir.display());
                return owners;
            }
        };

        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<i32>().ok())
            else {
                continue;
            };
            owners.scan_process(pid, &entry.path());
        }
        owners
    }

    fn scan_process(&mut self, pid: i32, dir: &Path) {
        let Ok(fds) = std::fs::read_dir(dir.join("fd")) else {
            return;
        };
        let name = crate::fsutil::read_trimmed(dir.join("comm")).unwrap_or_default();
        for fd in fds.flatten() {
            let Ok(target) = std::fs::read_link(fd.path()) else {
                continue;
            };
            if let Some(inode) = target.to_str().and_then(socket_inode) {
                self.by_inode.insert(
                    inode,
                    SocketOwner {
                        pid,
                        name: name.clone(),
                    },
                );
            }
        }
    }

    pub fn get(&self, inode: u64) -> Option<&SocketOwner> {
        self.by_inode.get(&inode)
    }

    pub fn len(&self) -> usize {
        self.by_inode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_inode.is_empty()
    }
}

/// The inode of a `socket:[12345]` descriptor link.
fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?.strip_suffix(']')?.parse().ok()
}

/// One row of an IPv4 or IPv6 TCP/UDP table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InetSocket {
    pub ipv6: bool,
    pub local_addr: String,
    pub local_port: u16,
    pub remote_addr: String,
    pub remote_port: u16,
    /// Kernel `TCP_*` state code; UDP sockets report 7 (close) or 1 (connected).
    pub state: u8,
    pub tx_queue: u32,
    pub rx_queue: u32,
    pub inode: u64,
}

/// Decodes the kernel's little-endian hex rendering of an IPv4 address.
fn decode_ipv4(hex: &str) -> Option<Ipv4Addr> {
    let raw = u32::from_str_radix(hex, 16).ok()?;
    Some(Ipv4Addr::from(raw.swap_bytes()))
}

/// Decodes an IPv6 address printed as four little-endian 32-bit words.
fn decode_ipv6(hex: &str) -> Option<Ipv6Addr> {
    if hex.len() != 32 {
        return None;
    }
    let mut octets = [0u8; 16];
    for (word, chunk) in octets.chunks_exact_mut(4).enumerate() {
        let raw = u32::from_str_radix(hex.get(word * 8..word * 8 + 8)?, 16).ok()?;
        chunk.copy_from_slice(&raw.swap_bytes().to_be_bytes());
    }
    Some(Ipv6Addr::from(octets))
}

fn decode_endpoint(field: &str, ipv6: bool) -> Option<(String, u16)> {
    let (addr, port) = field.split_once(':')?;
    let addr = if ipv6 {
        decode_ipv6(addr)?.to_string()
    } else {
        decode_ipv4(addr)?.to_string()
    };
    Some((addr, u16::from_str_radix(port, 16).ok()?))
}

fn inet_from_fields<'a>(mut fields: impl Iterator<Item = &'a str>, ipv6: bool) -> Option<InetSocket> {
    let _slot = fields.next()?;
    let (local_addr, local_port) = decode_endpoint(fields.next()?, ipv6)?;
    let (remote_addr, remote_port) = decode_endpoint(fields.next()?, ipv6)?;
    let state = u8::from_str_radix(fields.next()?, 16).ok()?;
    let (tx_queue, rx_queue) = fields.next()?.split_once(':')?;
    // tr:tm->when retrnsmt uid timeout
    let inode = fields.nth(4)?.parse().ok()?;

    Some(InetSocket {
        ipv6,
        local_addr,
        local_port,
        remote_addr,
        remote_port,
        state,
        tx_queue: u32::from_str_radix(tx_queue, 16).unwrap_or(0),
        rx_queue: u32::from_str_radix(rx_queue, 16).unwrap_or(0),
        inode,
    })
}

impl InetSocket {
    /// Rows of a `/proc/net/{tcp,udp}{,6}` buffer. The header and malformed rows are skipped.
    pub fn list_from_reader<R: BufRead>(buf: &mut R, ipv6: bool) -> std::io::Result<Vec<Self>> {
        let mut sockets = Vec::new();
        let mut line = String::new();

        buf.read_line(&mut line)?;
        line.clear();

        while buf.read_line(&mut line)? != 0 {
            match inet_from_fields(line.split_whitespace(), ipv6) {
                Some(socket) => sockets.push(socket),
                None => log::trace!("skipping socket table row: {}", line.trim_end()),
            }
            line.clear();
        }
        Ok(sockets)
    }
}

/// One row of `/proc/net/unix`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnixSocketEntry {
    /// Bound path; empty for unnamed sockets. Abstract names keep their leading `@`.
    pub path: String,
    pub socket_type: &'static str,
    /// Reported with the TCP state codes: 10 listening, 1 connected, 0 anything else.
    pub state: u8,
    pub inode: u64,
}

const TCP_ESTABLISHED: u8 = 1;
const TCP_LISTEN: u8 = 10;

fn unix_socket_type(raw: &str) -> &'static str {
    match raw {
        "0001" => "stream",
        "0002" => "dgram",
        "0005" => "seqpacket",
        _ => "unknown",
    }
}

fn unix_from_fields<'a>(mut fields: impl Iterator<Item = &'a str>) -> Option<UnixSocketEntry> {
    // Num RefCount Protocol Flags
    let flags = u32::from_str_radix(fields.nth(3)?, 16).ok()?;
    let socket_type = unix_socket_type(fields.next()?);
    let st = u8::from_str_radix(fields.next()?, 16).ok()?;
    let inode = fields.next()?.parse().ok()?;
    let path = fields.next().unwrap_or_default().to_owned();

    const SO_ACCEPTCON: u32 = 0x0001_0000;
    const SS_CONNECTED: u8 = 3;
    let state = if flags & SO_ACCEPTCON != 0 {
        TCP_LISTEN
    } else if st == SS_CONNECTED {
        TCP_ESTABLISHED
    } else {
        0
    };

    Some(UnixSocketEntry {
        path,
        socket_type,
        state,
        inode,
    })
}

impl UnixSocketEntry {
    pub fn list_from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Vec<Self>> {
        let mut sockets = Vec::new();
        let mut line = String::new();

        buf.read_line(&mut line)?;
        line.clear();

        while buf.read_line(&mut line)? != 0 {
            if let Some(socket) = unix_from_fields(line.split_whitespace()) {
                sockets.push(socket);
            }
            line.clear();
        }
        Ok(sockets)
    }
}
