use std::time::{Duration, Instant};

use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use super::{Error, ProbeResult, Prober, Target, check_context, elapsed, scoped};
use crate::context::Context;

const DEFAULT_METHOD: &str = "GET";
const DEFAULT_STATUS: u16 = 200;

/// Issues one request and compares the response status with the expected one.
///
/// Only plain `http://` is spoken; an `https://` URL fails at the transport.
#[derive(Debug, Clone)]
pub struct HttpProber {
    timeout: Duration,
    client: Client<HttpConnector, String>,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }
}

/// `address` with an `http://` scheme when it has none, and `path` appended.
fn request_url(address: &str, path: Option<&str>) -> String {
    let base = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_owned()
    } else {
        format!("http://{address}")
    };
    match path {
        Some(path) if !path.is_empty() => {
            format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
        }
        _ => base,
    }
}

fn build_request(target: &Target) -> Result<hyper::Request<String>, String> {
    let mut builder = hyper::Request::builder()
        .method(target.method.as_deref().unwrap_or(DEFAULT_METHOD))
        .uri(request_url(&target.address, target.path.as_deref()));
    for (name, value) in &target.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(String::new()).map_err(|err| err.to_string())
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn probe(&self, ctx: &Context, target: &Target) -> ProbeResult {
        let start = Instant::now();
        if let Some(result) = check_context(ctx, start) {
            return result;
        }

        let request = match build_request(target) {
            Ok(request) => request,
            Err(err) => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("request failed: {err}"),
                    Error::Request(err),
                );
            }
        };
        log::trace!("{} {}", request.method(), request.uri());

        let response = match scoped(ctx, self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("request failed: {err}"),
                    Error::Request(err.to_string()),
                );
            }
            Err(err) => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("request failed: {err}"),
                    err,
                );
            }
        };

        let actual = response.status().as_u16();
        let expected = target.status_code.unwrap_or(DEFAULT_STATUS);
        if actual != expected {
            return ProbeResult::failure(
                elapsed(start),
                format!("unexpected status code: {actual} (expected {expected})"),
                Error::HttpStatusMismatch { expected, actual },
            );
        }
        ProbeResult::success(elapsed(start), format!("HTTP {actual}"))
    }
}
