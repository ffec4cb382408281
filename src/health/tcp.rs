use std::time::{Duration, Instant};

use tokio::net::TcpStream;

use super::{Error, ProbeResult, Prober, Target, check_context, elapsed, scoped};
use crate::context::Context;

/// Succeeds when a TCP connection can be established; the connection is closed right away.
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl Prober for TcpProber {
    fn kind(&self) -> &'static str {
        "tcp"
    }

    async fn probe(&self, ctx: &Context, target: &Target) -> ProbeResult {
        let start = Instant::now();
        if let Some(result) = check_context(ctx, start) {
            return result;
        }

        let address = target.address.as_str();
        match scoped(ctx, self.timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                ProbeResult::success(elapsed(start), format!("connected to {address}"))
            }
            Ok(Err(err)) => ProbeResult::failure(
                elapsed(start),
                format!("connection failed: {err}"),
                Error::Connect {
                    address: address.to_owned(),
                    message: err.to_string(),
                },
            ),
            Err(err) => {
                ProbeResult::failure(elapsed(start), format!("connection failed: {err}"), err)
            }
        }
    }
}
