use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;

use super::{DEFAULT_TIMEOUT, Error, ProbeResult, Prober, Target, check_context, elapsed};
use crate::context::Context;

pub const DEFAULT_PAYLOAD: &[u8] = b"PING";

const READ_BUFFER: usize = 1024;

/// Sends one datagram and waits for at most one reply.
///
/// Silence until the deadline counts as success: a connectionless service is not obliged to
/// answer. Only errors reported by the socket fail the probe.
#[derive(Debug, Clone)]
pub struct UdpProber {
    timeout: Duration,
    payload: Vec<u8>,
}

impl UdpProber {
    pub fn new(timeout: Duration) -> Self {
        Self::with_payload(timeout, DEFAULT_PAYLOAD)
    }

    pub fn with_payload(timeout: Duration, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            timeout,
            payload: payload.into(),
        }
    }

    /// Prober timeout, else the caller's deadline, else [`DEFAULT_TIMEOUT`].
    fn deadline(&self, ctx: &Context, start: Instant) -> Instant {
        if !self.timeout.is_zero() {
            start + self.timeout
        } else {
            ctx.deadline().unwrap_or(start + DEFAULT_TIMEOUT)
        }
    }
}

async fn resolve(network: &str, address: &str) -> std::io::Result<SocketAddr> {
    let mut candidates = tokio::net::lookup_host(address).await?;
    let found = match network {
        "udp4" => candidates.find(SocketAddr::is_ipv4),
        "udp6" => candidates.find(SocketAddr::is_ipv6),
        _ => candidates.next(),
    };
    found.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no {network} address for {address}"),
        )
    })
}

async fn dial(peer: SocketAddr) -> std::io::Result<UdpSocket> {
    let local: SocketAddr = if peer.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(peer).await?;
    Ok(socket)
}

#[async_trait::async_trait]
impl Prober for UdpProber {
    fn kind(&self) -> &'static str {
        "udp"
    }

    async fn probe(&self, ctx: &Context, target: &Target) -> ProbeResult {
        let start = Instant::now();
        if let Some(result) = check_context(ctx, start) {
            return result;
        }

        let network = if target.network.is_empty() {
            "udp"
        } else {
            target.network.as_str()
        };
        let address = target.address.as_str();

        let peer = match resolve(network, address).await {
            Ok(peer) => peer,
            Err(err) => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("failed to resolve address: {err}"),
                    Error::Resolve {
                        address: address.to_owned(),
                        message: err.to_string(),
                    },
                );
            }
        };
        let socket = match dial(peer).await {
            Ok(socket) => socket,
            Err(err) => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("failed to dial: {err}"),
                    Error::Connect {
                        address: address.to_owned(),
                        message: err.to_string(),
                    },
                );
            }
        };

        // Cancellation is only checked up front; once sent, the read is bounded by the
        // deadline alone.
        let deadline = self.deadline(ctx, start);
        if let Err(err) = socket.send(&self.payload).await {
            return ProbeResult::failure(
                elapsed(start),
                format!("failed to write: {err}"),
                Error::Send(err.to_string()),
            );
        }

        let mut buf = [0u8; READ_BUFFER];
        let received =
            tokio::time::timeout_at(deadline.into(), socket.recv(&mut buf)).await;
        match received {
            Ok(Ok(n)) => ProbeResult::success(
                elapsed(start),
                format!("received {n} bytes from {address}"),
            ),
            Ok(Err(err)) => ProbeResult::failure(
                elapsed(start),
                format!("failed to read response: {err}"),
                Error::Receive(err.to_string()),
            ),
            Err(_elapsed) => ProbeResult::success(
                elapsed(start),
                format!("sent to {address} (no response within timeout)"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_silent_peer_is_success() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = silent.local_addr().unwrap().to_string();

        let result = UdpProber::new(Duration::from_millis(50))
            .probe(&Context::background(), &Target::udp(address))
            .await;
        assert!(result.success, "{result:?}");
        assert!(result.output.contains("no response within timeout"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_echo_reply() {
        let echo = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = echo.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, from) = echo.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"hello");
            echo.send_to(b"pong!!", from).await.unwrap();
        });

        let result = UdpProber::with_payload(Duration::from_secs(2), b"hello".to_vec())
            .probe(&Context::background(), &Target::udp(address.clone()))
            .await;
        assert!(result.success, "{result:?}");
        assert_eq!(result.output, format!("received 6 bytes from {address}"));
    }

    #[tokio::test]
    async fn test_caller_deadline_bounds_read() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = silent.local_addr().unwrap().to_string();
        let ctx = Context::background().with_timeout(Duration::from_millis(50));

        let start = Instant::now();
        let result = UdpProber::new(Duration::ZERO)
            .probe(&ctx, &Target::udp(address))
            .await;
        assert!(result.success);
        assert!(start.elapsed() < DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_unresolvable_address() {
        let result = UdpProber::new(Duration::from_millis(50))
            .probe(&Context::background(), &Target::udp("invalid:address:format"))
            .await;
        assert!(!result.success);
        assert!(result.output.starts_with("failed to resolve address"));
        assert!(matches!(result.error, Some(Error::Resolve { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let ctx = Context::background();
        ctx.cancel();
        let result = UdpProber::new(Duration::from_millis(50))
            .probe(&ctx, &Target::udp("127.0.0.1:9"))
            .await;
        assert!(!result.success);
        assert!(result.output.starts_with("context cancelled"));
    }

    #[tokio::test]
    async fn test_cancel_during_read_waits_for_deadline() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = silent.local_addr().unwrap().to_string();
        let ctx = Context::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let result = UdpProber::new(Duration::from_millis(300))
            .probe(&ctx, &Target::udp(address))
            .await;
        assert!(result.success, "{result:?}");
        assert!(result.output.contains("no response within timeout"));
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_refused_port_is_failure() {
        let closed = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = closed.local_addr().unwrap().to_string();
        drop(closed);

        let result = UdpProber::new(Duration::from_secs(1))
            .probe(&Context::background(), &Target::udp(address))
            .await;
        assert!(!result.success, "{result:?}");
        assert!(result.output.starts_with("failed to read response"));
        assert!(matches!(result.error, Some(Error::Receive(_))));
    }
}
