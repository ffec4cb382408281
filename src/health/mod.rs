//! Protocol health probers.
//!
//! Every prober answers one question about one [`Target`] and reports it as a
//! [`ProbeResult`]. Probers never retry and never return `Err`: transport problems,
//! unexpected answers and a done [`Context`] all become a failed result carrying the
//! measured latency and a typed [`Error`].

mod exec;
mod factory;
mod grpc;
mod http;
mod icmp;
mod tcp;
mod udp;

use std::time::{Duration, Instant};

pub use exec::{ExecProber, MAX_OUTPUT_BYTES};
pub use factory::{Factory, KINDS};
pub use grpc::{GrpcProber, ServingStatus};
pub use http::HttpProber;
pub use icmp::{DEFAULT_FALLBACK_PORT, IcmpMode, IcmpProber};
pub use tcp::TcpProber;
pub use udp::{DEFAULT_PAYLOAD, UdpProber};

use crate::context::{Context, ContextError};

/// Timeout used when neither the caller nor the factory supplies one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unknown prober type: {0}")]
    UnknownProberType(String),
    #[error("status code mismatch: got {actual}, expected {expected}")]
    HttpStatusMismatch { expected: u16, actual: u16 },
    #[error("empty command")]
    EmptyCommand,
    #[error("invalid command format `{0}`: pass arguments separately")]
    InvalidCommandFormat(String),
    #[error("service not serving")]
    GrpcNotServing,
    #[error("service unknown")]
    GrpcServiceUnknown,
    #[error("unknown health status")]
    GrpcUnknownStatus,
    #[error("unexpected ICMP reply type {0}")]
    UnexpectedReplyType(u8),
    #[error("failed to resolve `{address}`: {message}")]
    Resolve { address: String, message: String },
    #[error("failed to connect to `{address}`: {message}")]
    Connect { address: String, message: String },
    #[error("failed to send: {0}")]
    Send(String),
    #[error("failed to receive: {0}")]
    Receive(String),
    #[error("failed to parse reply: {0}")]
    Parse(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("health rpc failed ({code}): {message}")]
    Rpc { code: String, message: String },
    #[error("failed to start command: {0}")]
    Spawn(String),
    #[error("command exited with {0}")]
    ExitStatus(String),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// What to probe. Each prober reads only the fields relevant to its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    /// `tcp`, `udp`, `udp4`, `udp6`, ...; empty means the prober's default.
    pub network: String,
    /// `host:port`, a URL for HTTP, or `unix:///path` for gRPC.
    pub address: String,
    pub method: Option<String>,
    pub status_code: Option<u16>,
    pub path: Option<String>,
    pub headers: Vec<(String, String)>,
    pub service: Option<String>,
    pub command: Option<String>,
    pub args: Vec<String>,
}

impl Target {
    pub fn new(network: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn tcp(address: impl Into<String>) -> Self {
        Self::new("tcp", address)
    }

    pub fn udp(address: impl Into<String>) -> Self {
        Self::new("udp", address)
    }

    pub fn http(address: impl Into<String>) -> Self {
        Self::new("tcp", address)
    }

    pub fn grpc(address: impl Into<String>) -> Self {
        Self::new("tcp", address)
    }

    pub fn icmp(host: impl Into<String>) -> Self {
        Self::new("ip4:icmp", host)
    }

    pub fn exec<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: Some(command.into()),
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

/// Outcome of one probe. `success` holds exactly when `error` is `None`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProbeResult {
    pub success: bool,
    pub latency: Duration,
    pub output: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<Error>,
}

fn serialize_error<S>(error: &Option<Error>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(err) => serializer.collect_str(err),
        None => serializer.serialize_none(),
    }
}

impl ProbeResult {
    pub fn success(latency: Duration, output: impl Into<String>) -> Self {
        Self {
            success: true,
            latency,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(latency: Duration, output: impl Into<String>, error: impl Into<Error>) -> Self {
        Self {
            success: false,
            latency,
            output: output.into(),
            error: Some(error.into()),
        }
    }
}

#[async_trait::async_trait]
pub trait Prober: Send + Sync + std::fmt::Debug {
    /// One of [`KINDS`].
    fn kind(&self) -> &'static str;

    async fn probe(&self, ctx: &Context, target: &Target) -> ProbeResult;
}

/// Wall-clock time since `start`, never zero.
pub(crate) fn elapsed(start: Instant) -> Duration {
    start.elapsed().max(Duration::from_nanos(1))
}

/// Failed result for a context that is already done, before any syscall is made.
pub(crate) fn check_context(ctx: &Context, start: Instant) -> Option<ProbeResult> {
    ctx.err().map(|err| {
        ProbeResult::failure(elapsed(start), format!("context cancelled: {err}"), err)
    })
}

/// Runs `fut` until it completes, `ctx` is done, or `timeout` passes. A zero timeout only
/// inherits the caller's scope.
pub(crate) async fn scoped<F>(ctx: &Context, timeout: Duration, fut: F) -> Result<F::Output, ContextError>
where
    F: Future,
{
    let scope = if timeout.is_zero() {
        ctx.child()
    } else {
        ctx.with_timeout(timeout)
    };
    tokio::select! {
        biased;
        output = fut => Ok(output),
        err = scope.done() => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_constructors() {
        let ok = ProbeResult::success(Duration::from_millis(3), "fine");
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = ProbeResult::failure(Duration::from_millis(3), "", Error::EmptyCommand);
        assert!(!failed.success);
        assert_eq!(failed.error, Some(Error::EmptyCommand));
    }

    #[test]
    fn test_elapsed_is_positive() {
        assert!(elapsed(Instant::now()) > Duration::ZERO);
    }

    #[test]
    fn test_check_context() {
        let ctx = Context::background();
        assert!(check_context(&ctx, Instant::now()).is_none());

        ctx.cancel();
        let result = check_context(&ctx, Instant::now()).unwrap();
        assert!(!result.success);
        assert!(result.latency > Duration::ZERO);
        assert_eq!(result.output, "context cancelled: context canceled");
        assert_eq!(
            result.error,
            Some(Error::Context(ContextError::Cancelled))
        );
    }

    #[tokio::test]
    async fn test_scoped_times_out() {
        let ctx = Context::background();
        let result = scoped(
            &ctx,
            Duration::from_millis(10),
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_scoped_zero_timeout_inherits_context() {
        let ctx = Context::background();
        assert_eq!(scoped(&ctx, Duration::ZERO, async { 7 }).await, Ok(7));
    }

    #[test]
    fn test_target_builders() {
        let target = Target::http("localhost:8080")
            .with_method("HEAD")
            .with_status_code(204)
            .with_path("/healthz");
        assert_eq!(target.method.as_deref(), Some("HEAD"));
        assert_eq!(target.status_code, Some(204));

        let exec = Target::exec("echo", ["hello"]);
        assert_eq!(exec.command.as_deref(), Some("echo"));
        assert_eq!(exec.args, vec!["hello".to_owned()]);
    }

    #[test]
    fn test_result_serializes_error_as_message() {
        let result = ProbeResult::failure(
            Duration::from_millis(1),
            "",
            Error::HttpStatusMismatch {
                expected: 200,
                actual: 404,
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error"], "status code mismatch: got 404, expected 200");

        let ok = serde_json::to_value(ProbeResult::success(Duration::from_millis(1), "x")).unwrap();
        assert!(ok.get("error").is_none());
    }
}
