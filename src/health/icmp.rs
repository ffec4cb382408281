//! ICMP echo with a TCP connect fallback.
//!
//! Raw ICMP sockets need `CAP_NET_RAW`. Without it the prober times a TCP handshake to a
//! fallback port instead, reported through the same result shape.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};

use nix::sys::socket::{self, AddressFamily, SockFlag, SockProtocol, SockType};
use tokio::net::TcpStream;

use super::{DEFAULT_TIMEOUT, Error, ProbeResult, Prober, Target, check_context, elapsed, scoped};
use crate::context::Context;

pub const DEFAULT_FALLBACK_PORT: u16 = 80;

const ECHO_REPLY: u8 = 0;
const ECHO_REQUEST: u8 = 8;
const PAYLOAD_LEN: usize = 32;
const SEQUENCE: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IcmpMode {
    Native,
    Fallback,
    /// Native when a raw socket can be opened, fallback otherwise.
    #[default]
    Auto,
}

#[derive(Debug, Clone)]
pub struct IcmpProber {
    timeout: Duration,
    mode: IcmpMode,
    fallback_port: u16,
}

impl IcmpProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            mode: IcmpMode::Auto,
            fallback_port: DEFAULT_FALLBACK_PORT,
        }
    }

    pub fn with_mode(mut self, mode: IcmpMode) -> Self {
        self.mode = mode;
        self
    }

    /// Ports outside `1..=65535` reset to [`DEFAULT_FALLBACK_PORT`].
    pub fn with_fallback_port(mut self, port: i32) -> Self {
        self.fallback_port = u16::try_from(port)
            .ok()
            .filter(|port| *port > 0)
            .unwrap_or(DEFAULT_FALLBACK_PORT);
        self
    }

    pub fn mode(&self) -> IcmpMode {
        self.mode
    }

    pub fn fallback_port(&self) -> u16 {
        self.fallback_port
    }

    fn use_native(&self) -> bool {
        match self.mode {
            IcmpMode::Native => true,
            IcmpMode::Fallback => false,
            IcmpMode::Auto => raw_socket_available(),
        }
    }

    async fn tcp_ping(&self, ctx: &Context, host: &str, start: Instant) -> ProbeResult {
        match scoped(ctx, self.timeout, TcpStream::connect((host, self.fallback_port))).await {
            Ok(Ok(stream)) => {
                drop(stream);
                let latency = elapsed(start);
                ProbeResult::success(
                    latency,
                    format!("ping {host}: latency={latency:?} (tcp fallback)"),
                )
            }
            Ok(Err(err)) => ProbeResult::failure(
                elapsed(start),
                format!("ping failed: {err}"),
                Error::Connect {
                    address: format!("{host}:{}", self.fallback_port),
                    message: err.to_string(),
                },
            ),
            Err(err) => ProbeResult::failure(elapsed(start), format!("ping failed: {err}"), err),
        }
    }

    async fn native_ping(&self, ctx: &Context, host: &str, start: Instant) -> ProbeResult {
        let addr = match resolve_ipv4(host).await {
            Some(addr) => addr,
            None => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("resolve failed: {host}"),
                    Error::Resolve {
                        address: host.to_owned(),
                        message: "no IPv4 address".to_owned(),
                    },
                );
            }
        };

        let socket = match open_raw_socket() {
            Ok(socket) => socket,
            Err(err) => {
                log::debug!("raw ICMP socket unavailable ({err}), using tcp fallback");
                return self.tcp_ping(ctx, host, start).await;
            }
        };

        let wait = match (ctx.remaining(), self.timeout.is_zero()) {
            (Some(remaining), true) => remaining,
            (Some(remaining), false) => remaining.min(self.timeout),
            (None, true) => DEFAULT_TIMEOUT,
            (None, false) => self.timeout,
        };
        let id = (std::process::id() & 0xffff) as u16;
        let exchange = tokio::task::spawn_blocking(move || echo(&socket, addr, id, wait));

        match scoped(ctx, Duration::ZERO, exchange).await {
            Ok(Ok(Ok(()))) => {
                let latency = elapsed(start);
                ProbeResult::success(latency, format!("ping {host}: latency={latency:?}"))
            }
            Ok(Ok(Err(err))) => {
                let output = match &err {
                    Error::Send(_) => "send failed",
                    Error::Receive(_) => "receive failed",
                    Error::Parse(_) => "parse failed",
                    _ => "unexpected reply type",
                };
                ProbeResult::failure(elapsed(start), output, err)
            }
            Ok(Err(join)) => ProbeResult::failure(
                elapsed(start),
                "receive failed",
                Error::Receive(join.to_string()),
            ),
            Err(err) => ProbeResult::failure(elapsed(start), format!("ping failed: {err}"), err),
        }
    }
}

/// `host` out of `host:port` or `[v6]:port`; anything else is returned unchanged.
fn extract_host(address: &str) -> &str {
    if let Some(rest) = address.strip_prefix('[') {
        if let Some((host, _)) = rest.split_once(']') {
            return host;
        }
    }
    match address.rsplit_once(':') {
        Some((host, _)) if !host.contains(':') => host,
        _ => address,
    }
}

async fn resolve_ipv4(host: &str) -> Option<Ipv4Addr> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Some(addr);
    }
    tokio::net::lookup_host((host, 0))
        .await
        .ok()?
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
}

/// Raw ICMPv4 socket wrapped for `sendto`/`recvfrom`.
fn open_raw_socket() -> nix::Result<UdpSocket> {
    let fd = socket::socket(
        AddressFamily::Inet,
        SockType::Raw,
        SockFlag::SOCK_CLOEXEC,
        SockProtocol::Icmp,
    )?;
    Ok(UdpSocket::from(fd))
}

fn raw_socket_available() -> bool {
    open_raw_socket().is_ok()
}

/// RFC 1071 internet checksum.
fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = data
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u32::from(u16::from_be_bytes([*hi, *lo])),
            [hi] => u32::from(*hi) << 8,
            _ => 0,
        })
        .sum();
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

fn echo_request(id: u16, seq: u16) -> Vec<u8> {
    let mut packet = vec![ECHO_REQUEST, 0, 0, 0];
    packet.extend_from_slice(&id.to_be_bytes());
    packet.extend_from_slice(&seq.to_be_bytes());
    packet.extend((0..PAYLOAD_LEN).map(|i| (i & 0xff) as u8));
    let sum = checksum(&packet);
    packet[2..4].copy_from_slice(&sum.to_be_bytes());
    packet
}

enum Reply {
    Matched,
    Ignored,
}

/// Classifies one datagram read from a raw socket, IPv4 header included.
fn parse_reply(datagram: &[u8], id: u16, seq: u16) -> Result<Reply, Error> {
    let first = *datagram
        .first()
        .ok_or_else(|| Error::Parse("empty datagram".to_owned()))?;
    let header_len = usize::from(first & 0x0f) * 4;
    let icmp = datagram
        .get(header_len..)
        .filter(|icmp| icmp.len() >= 8)
        .ok_or_else(|| Error::Parse(format!("short datagram of {} bytes", datagram.len())))?;

    match icmp[0] {
        ECHO_REPLY => {
            let reply_id = u16::from_be_bytes([icmp[4], icmp[5]]);
            let reply_seq = u16::from_be_bytes([icmp[6], icmp[7]]);
            if reply_id == id && reply_seq == seq {
                Ok(Reply::Matched)
            } else {
                Ok(Reply::Ignored)
            }
        }
        ECHO_REQUEST => Ok(Reply::Ignored),
        other => Err(Error::UnexpectedReplyType(other)),
    }
}

/// Sends one echo request and blocks until the matching reply or until `wait` passes.
fn echo(socket: &UdpSocket, addr: Ipv4Addr, id: u16, wait: Duration) -> Result<(), Error> {
    let deadline = Instant::now() + wait;
    let request = echo_request(id, SEQUENCE);
    socket
        .send_to(&request, SocketAddrV4::new(addr, 0))
        .map_err(|err| Error::Send(err.to_string()))?;

    let mut buf = [0u8; 1500];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Receive("timed out".to_owned()));
        }
        socket
            .set_read_timeout(Some(remaining))
            .map_err(|err| Error::Receive(err.to_string()))?;
        let (n, _) = socket
            .recv_from(&mut buf)
            .map_err(|err| Error::Receive(err.to_string()))?;
        if let Reply::Matched = parse_reply(&buf[..n], id, SEQUENCE)? {
            return Ok(());
        }
    }
}

#[async_trait::async_trait]
impl Prober for IcmpProber {
    fn kind(&self) -> &'static str {
        "icmp"
    }

    async fn probe(&self, ctx: &Context, target: &Target) -> ProbeResult {
        let start = Instant::now();
        if let Some(result) = check_context(ctx, start) {
            return result;
        }

        let host = extract_host(&target.address);
        if self.use_native() {
            self.native_ping(ctx, host, start).await
        } else {
            self.tcp_ping(ctx, host, start).await
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("example.com:443"), "example.com");
        assert_eq!(extract_host("example.com"), "example.com");
        assert_eq!(extract_host("[::1]:80"), "::1");
        assert_eq!(extract_host("::1"), "::1");
        assert_eq!(extract_host("10.0.0.1:22"), "10.0.0.1");
    }

    #[test]
    fn test_fallback_port_bounds() {
        let prober = IcmpProber::new(Duration::from_secs(1));
        assert_eq!(prober.fallback_port(), DEFAULT_FALLBACK_PORT);
        assert_eq!(prober.clone().with_fallback_port(22).fallback_port(), 22);
        assert_eq!(prober.clone().with_fallback_port(0).fallback_port(), 80);
        assert_eq!(prober.clone().with_fallback_port(-5).fallback_port(), 80);
        assert_eq!(prober.with_fallback_port(70_000).fallback_port(), 80);
    }

    #[test]
    fn test_echo_request_layout() {
        let packet = echo_request(0x1234, 1);
        assert_eq!(packet.len(), 8 + PAYLOAD_LEN);
        assert_eq!(packet[0], ECHO_REQUEST);
        assert_eq!(&packet[4..8], &[0x12, 0x34, 0x00, 0x01]);
        assert_eq!(packet[8 + 31], 31);
        // A packet carrying its own checksum sums to zero.
        assert_eq!(checksum(&packet), 0);
    }

    #[test]
    fn test_checksum_odd_length() {
        assert_eq!(checksum(&[0xff]), !0xff00);
        assert_eq!(checksum(&[]), 0xffff);
    }

    fn ipv4_wrap(icmp: &[u8]) -> Vec<u8> {
        let mut datagram = vec![0x45];
        datagram.extend_from_slice(&[0u8; 19]);
        datagram.extend_from_slice(icmp);
        datagram
    }

    #[test]
    fn test_parse_reply() {
        let mut reply = echo_request(7, SEQUENCE);
        reply[0] = ECHO_REPLY;
        assert!(matches!(
            parse_reply(&ipv4_wrap(&reply), 7, SEQUENCE),
            Ok(Reply::Matched)
        ));
        assert!(matches!(
            parse_reply(&ipv4_wrap(&reply), 8, SEQUENCE),
            Ok(Reply::Ignored)
        ));

        let own_request = echo_request(7, SEQUENCE);
        assert!(matches!(
            parse_reply(&ipv4_wrap(&own_request), 7, SEQUENCE),
            Ok(Reply::Ignored)
        ));

        let mut unreachable = echo_request(7, SEQUENCE);
        unreachable[0] = 3;
        assert!(matches!(
            parse_reply(&ipv4_wrap(&unreachable), 7, SEQUENCE),
            Err(Error::UnexpectedReplyType(3))
        ));

        assert!(matches!(parse_reply(&[], 7, 1), Err(Error::Parse(_))));
        assert!(matches!(
            parse_reply(&ipv4_wrap(&[0, 0]), 7, 1),
            Err(Error::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_tcp_fallback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = IcmpProber::new(Duration::from_secs(1))
            .with_mode(IcmpMode::Fallback)
            .with_fallback_port(i32::from(port));
        let result = prober
            .probe(&Context::background(), &Target::icmp("127.0.0.1:9999"))
            .await;
        assert!(result.success, "{result:?}");
        assert!(result.output.starts_with("ping 127.0.0.1: latency="));
        assert!(result.output.ends_with("(tcp fallback)"));
    }

    #[tokio::test]
    async fn test_tcp_fallback_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = IcmpProber::new(Duration::from_secs(1))
            .with_mode(IcmpMode::Fallback)
            .with_fallback_port(i32::from(port))
            .probe(&Context::background(), &Target::icmp("127.0.0.1"))
            .await;
        assert!(!result.success);
        assert!(result.output.starts_with("ping failed"));
    }

    #[tokio::test]
    async fn test_auto_mode_always_answers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = IcmpProber::new(Duration::from_secs(1))
            .with_fallback_port(i32::from(port))
            .probe(&Context::background(), &Target::icmp("127.0.0.1"))
            .await;
        assert!(result.success, "{result:?}");
        assert!(result.output.starts_with("ping 127.0.0.1: latency="));
    }

    #[tokio::test]
    async fn test_native_mode_reports_host() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Without CAP_NET_RAW the native mode drops to the TCP fallback.
        let result = IcmpProber::new(Duration::from_secs(1))
            .with_mode(IcmpMode::Native)
            .with_fallback_port(i32::from(port))
            .probe(&Context::background(), &Target::icmp("localhost:80"))
            .await;
        assert!(result.success, "{result:?}");
        assert!(result.output.starts_with("ping localhost: latency="));
        assert!(!result.output.contains("native"));
    }
}
