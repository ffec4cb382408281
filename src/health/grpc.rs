//! `grpc.health.v1.Health/Check` client.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use std::{pin, task};

use hyper_util::rt::TokioIo;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

use super::{Error, ProbeResult, Prober, Target, check_context, elapsed, scoped};
use crate::context::{Context, ContextError};

const CHECK_PATH: &str = "/grpc.health.v1.Health/Check";
const UNIX_SCHEME: &str = "unix://";

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthCheckRequest {
    #[prost(string, tag = "1")]
    pub service: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthCheckResponse {
    #[prost(enumeration = "ServingStatus", tag = "1")]
    pub status: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ServingStatus {
    Unknown = 0,
    Serving = 1,
    NotServing = 2,
    ServiceUnknown = 3,
}

#[derive(Debug, Clone)]
struct UnixConnector {
    path: PathBuf,
}

impl tower::Service<hyper::Uri> for UnixConnector {
    type Response = TokioIo<tokio::net::UnixStream>;

    type Error = std::io::Error;

    type Future = pin::Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: hyper::Uri) -> Self::Future {
        let path = self.path.clone();
        Box::pin(async move {
            let stream = tokio::net::UnixStream::connect(path).await?;

            Ok(TokioIo::new(stream))
        })
    }
}

/// Checks a service with the standard gRPC health protocol.
///
/// An empty service name asks about the server as a whole. `unix:///path` addresses are
/// dialed over a Unix domain socket.
#[derive(Debug, Clone)]
pub struct GrpcProber {
    timeout: Duration,
    secure: bool,
}

impl GrpcProber {
    /// Plaintext HTTP/2.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            secure: false,
        }
    }

    /// TLS verified against the system roots.
    pub fn secure(timeout: Duration) -> Self {
        Self {
            timeout,
            secure: true,
        }
    }

    async fn connect(&self, address: &str) -> Result<Channel, tonic::transport::Error> {
        if let Some(path) = address.strip_prefix(UNIX_SCHEME) {
            log::debug!("Connecting to {path}...");
            let connector = UnixConnector {
                path: PathBuf::from(path),
            };
            return Endpoint::from_static("http://[::]:50051")
                .connect_with_connector(connector)
                .await;
        }

        let scheme = if self.secure { "https" } else { "http" };
        let mut endpoint = Endpoint::from_shared(format!("{scheme}://{address}"))?;
        if !self.timeout.is_zero() {
            endpoint = endpoint.connect_timeout(self.timeout);
        }
        if self.secure {
            endpoint = endpoint.tls_config(ClientTlsConfig::new().with_native_roots())?;
        }
        endpoint.connect().await
    }
}

async fn check(channel: Channel, service: &str) -> Result<HealthCheckResponse, tonic::Status> {
    let mut client = tonic::client::Grpc::new(channel);
    client
        .ready()
        .await
        .map_err(|err| tonic::Status::unknown(format!("service was not ready: {err}")))?;
    let request = tonic::Request::new(HealthCheckRequest {
        service: service.to_owned(),
    });
    let response = client
        .unary(
            request,
            PathAndQuery::from_static(CHECK_PATH),
            ProstCodec::default(),
        )
        .await?;
    Ok(response.into_inner())
}

fn display_service(service: &str) -> &str {
    if service.is_empty() { "(server)" } else { service }
}

/// Maps an RPC-level failure onto a probe result.
fn rpc_failure(latency: Duration, service: &str, status: &tonic::Status) -> ProbeResult {
    match status.code() {
        tonic::Code::NotFound => ProbeResult::failure(
            latency,
            format!("gRPC service \"{service}\" unknown"),
            Error::GrpcServiceUnknown,
        ),
        tonic::Code::DeadlineExceeded => ProbeResult::failure(
            latency,
            "gRPC health check timeout",
            ContextError::DeadlineExceeded,
        ),
        code => ProbeResult::failure(
            latency,
            format!("gRPC health check failed: {}", status.message()),
            Error::Rpc {
                code: format!("{code:?}"),
                message: status.message().to_owned(),
            },
        ),
    }
}

/// Maps the reported serving status onto a probe result.
fn serving_result(latency: Duration, service: &str, address: &str, status: i32) -> ProbeResult {
    match ServingStatus::try_from(status) {
        Ok(ServingStatus::Serving) => ProbeResult::success(
            latency,
            format!("gRPC {} serving at {address}", display_service(service)),
        ),
        Ok(ServingStatus::NotServing) => ProbeResult::failure(
            latency,
            format!("gRPC service \"{service}\" not serving"),
            Error::GrpcNotServing,
        ),
        Ok(ServingStatus::ServiceUnknown) => ProbeResult::failure(
            latency,
            format!("gRPC service \"{service}\" unknown"),
            Error::GrpcServiceUnknown,
        ),
        Ok(ServingStatus::Unknown) | Err(_) => ProbeResult::failure(
            latency,
            format!("gRPC service \"{service}\" status unknown: {status}"),
            Error::GrpcUnknownStatus,
        ),
    }
}

#[async_trait::async_trait]
impl Prober for GrpcProber {
    fn kind(&self) -> &'static str {
        "grpc"
    }

    async fn probe(&self, ctx: &Context, target: &Target) -> ProbeResult {
        let start = Instant::now();
        if let Some(result) = check_context(ctx, start) {
            return result;
        }

        let address = target.address.as_str();
        let service = target.service.as_deref().unwrap_or_default();

        let channel = match scoped(ctx, self.timeout, self.connect(address)).await {
            Ok(Ok(channel)) => channel,
            Ok(Err(err)) => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("gRPC connection failed: {err}"),
                    Error::Connect {
                        address: address.to_owned(),
                        message: err.to_string(),
                    },
                );
            }
            Err(err) => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("gRPC connection failed: {err}"),
                    err,
                );
            }
        };

        match scoped(ctx, self.timeout, check(channel, service)).await {
            Ok(Ok(response)) => serving_result(elapsed(start), service, address, response.status),
            Ok(Err(status)) => rpc_failure(elapsed(start), service, &status),
            Err(ContextError::DeadlineExceeded) => ProbeResult::failure(
                elapsed(start),
                "gRPC health check timeout",
                ContextError::DeadlineExceeded,
            ),
            Err(err) => ProbeResult::failure(
                elapsed(start),
                format!("gRPC health check failed: {err}"),
                err,
            ),
        }
    }
}
