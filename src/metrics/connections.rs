use std::sync::Arc;

use super::builders::{
    build_tcp_connection, build_tcp_stats, build_udp_connection, build_unix_socket,
};
use super::collect_list;
use crate::context::Context;
use crate::engine::raw::RawTcpStats;
use crate::error::{self, Result};
use crate::lifecycle::Lifecycle;

/// Pid reported when no process owns a port.
pub const NOT_FOUND_PID: i32 = -1;

/// TCP socket state, numbered like the Linux kernel's `TCP_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SocketState {
    Unknown = 0,
    Established = 1,
    SynSent = 2,
    SynRecv = 3,
    FinWait1 = 4,
    FinWait2 = 5,
    TimeWait = 6,
    Close = 7,
    CloseWait = 8,
    LastAck = 9,
    Listen = 10,
    Closing = 11,
}

static SOCKET_STATES: [(SocketState, &str); 12] = [
    (SocketState::Unknown, "UNKNOWN"),
    (SocketState::Established, "ESTABLISHED"),
    (SocketState::SynSent, "SYN_SENT"),
    (SocketState::SynRecv, "SYN_RECV"),
    (SocketState::FinWait1, "FIN_WAIT1"),
    (SocketState::FinWait2, "FIN_WAIT2"),
    (SocketState::TimeWait, "TIME_WAIT"),
    (SocketState::Close, "CLOSE"),
    (SocketState::CloseWait, "CLOSE_WAIT"),
    (SocketState::LastAck, "LAST_ACK"),
    (SocketState::Listen, "LISTEN"),
    (SocketState::Closing, "CLOSING"),
];

impl SocketState {
    pub fn from_raw(raw: u8) -> Self {
        SOCKET_STATES
            .iter()
            .find(|(state, _)| *state as u8 == raw)
            .map_or(SocketState::Unknown, |(state, _)| *state)
    }

    pub fn as_str(self) -> &'static str {
        SOCKET_STATES
            .iter()
            .find(|(state, _)| *state == self)
            .map_or("UNKNOWN", |(_, name)| name)
    }

    /// Name of a raw state code; `"UNKNOWN"` for anything outside the table.
    pub fn name_of(raw: u8) -> &'static str {
        SOCKET_STATES
            .iter()
            .find(|(state, _)| *state as u8 == raw)
            .map_or("UNKNOWN", |(_, name)| name)
    }
}

impl std::fmt::Display for SocketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for SocketState {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddressFamily {
    Unknown = 0,
    IPv4 = 4,
    IPv6 = 6,
}

static ADDRESS_FAMILIES: [(AddressFamily, &str); 2] =
    [(AddressFamily::IPv4, "IPv4"), (AddressFamily::IPv6, "IPv6")];

impl AddressFamily {
    pub fn from_raw(raw: u8) -> Self {
        ADDRESS_FAMILIES
            .iter()
            .find(|(family, _)| *family as u8 == raw)
            .map_or(AddressFamily::Unknown, |(family, _)| *family)
    }

    pub fn as_str(self) -> &'static str {
        ADDRESS_FAMILIES
            .iter()
            .find(|(family, _)| *family == self)
            .map_or("Unknown", |(_, name)| name)
    }

    pub fn name_of(raw: u8) -> &'static str {
        Self::from_raw(raw).as_str()
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for AddressFamily {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TcpConnection {
    pub family: AddressFamily,
    pub local_addr: String,
    pub local_port: u16,
    pub remote_addr: String,
    pub remote_port: u16,
    pub state: SocketState,
    /// Owning process, or [`NOT_FOUND_PID`] when it could not be resolved.
    pub pid: i32,
    pub process_name: String,
    pub inode: u64,
    pub rx_queue: u32,
    pub tx_queue: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UdpConnection {
    pub family: AddressFamily,
    pub local_addr: String,
    pub local_port: u16,
    pub remote_addr: String,
    pub remote_port: u16,
    pub state: SocketState,
    pub pid: i32,
    pub process_name: String,
    pub inode: u64,
    pub rx_queue: u32,
    pub tx_queue: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UnixSocket {
    pub path: String,
    pub socket_type: String,
    pub state: SocketState,
    pub pid: i32,
    pub process_name: String,
    pub inode: u64,
}

/// Count of TCP sockets per state.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TcpStats {
    pub established: u32,
    pub syn_sent: u32,
    pub syn_recv: u32,
    pub fin_wait1: u32,
    pub fin_wait2: u32,
    pub time_wait: u32,
    pub close: u32,
    pub close_wait: u32,
    pub last_ack: u32,
    pub listen: u32,
    pub closing: u32,
}

impl TcpStats {
    pub fn total(&self) -> u64 {
        [
            self.established,
            self.syn_sent,
            self.syn_recv,
            self.fin_wait1,
            self.fin_wait2,
            self.time_wait,
            self.close,
            self.close_wait,
            self.last_ack,
            self.listen,
            self.closing,
        ]
        .iter()
        .map(|&count| u64::from(count))
        .sum()
    }
}

/// Sockets owned by a single process.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ProcessConnections {
    pub tcp: Vec<TcpConnection>,
    pub udp: Vec<UdpConnection>,
}

/// TCP, UDP and Unix socket tables.
#[derive(Debug, Clone)]
pub struct ConnectionCollector {
    lifecycle: Arc<Lifecycle>,
}

impl ConnectionCollector {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    pub fn collect_tcp(&self, ctx: &Context) -> Result<Vec<TcpConnection>> {
        let engine = self.lifecycle.validate(ctx)?;
        collect_list(
            |list| engine.collect_tcp(list),
            |list| engine.free_tcp(list),
            build_tcp_connection,
        )
    }

    pub fn collect_udp(&self, ctx: &Context) -> Result<Vec<UdpConnection>> {
        let engine = self.lifecycle.validate(ctx)?;
        collect_list(
            |list| engine.collect_udp(list),
            |list| engine.free_udp(list),
            build_udp_connection,
        )
    }

    pub fn collect_unix(&self, ctx: &Context) -> Result<Vec<UnixSocket>> {
        let engine = self.lifecycle.validate(ctx)?;
        collect_list(
            |list| engine.collect_unix(list),
            |list| engine.free_unix(list),
            build_unix_socket,
        )
    }

    pub fn collect_tcp_stats(&self, ctx: &Context) -> Result<TcpStats> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut raw = RawTcpStats::default();
        error::translate(&engine.collect_tcp_stats(&mut raw))?;
        Ok(build_tcp_stats(&raw))
    }

    /// Returns the pid owning `port`, or [`NOT_FOUND_PID`] when no process has it bound.
    pub fn find_process_by_port(&self, ctx: &Context, port: u16, tcp: bool) -> Result<i32> {
        let engine = self.lifecycle.validate(ctx)?;
        let mut pid = NOT_FOUND_PID;
        error::translate(&engine.find_process_by_port(port, tcp, &mut pid))?;
        Ok(pid)
    }

    pub fn collect_listening_ports(&self, ctx: &Context) -> Result<Vec<TcpConnection>> {
        self.collect_tcp_in_state(ctx, SocketState::Listen)
    }

    pub fn collect_established_connections(&self, ctx: &Context) -> Result<Vec<TcpConnection>> {
        self.collect_tcp_in_state(ctx, SocketState::Established)
    }

    fn collect_tcp_in_state(&self, ctx: &Context, state: SocketState) -> Result<Vec<TcpConnection>> {
        let mut conns = self.collect_tcp(ctx)?;
        conns.retain(|conn| conn.state == state);
        Ok(conns)
    }

    pub fn collect_process_connections(&self, ctx: &Context, pid: i32) -> Result<ProcessConnections> {
        let mut tcp = self.collect_tcp(ctx)?;
        tcp.retain(|conn| conn.pid == pid);
        let mut udp = self.collect_udp(ctx)?;
        udp.retain(|conn| conn.pid == pid);
        Ok(ProcessConnections { tcp, udp })
    }
}
