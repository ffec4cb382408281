use std::time::Duration;

use super::{
    DEFAULT_TIMEOUT, Error, ExecProber, GrpcProber, HttpProber, IcmpProber, Prober, TcpProber,
    UdpProber,
};

/// Every kind [`Factory::create`] understands.
pub const KINDS: [&str; 6] = ["tcp", "udp", "http", "grpc", "exec", "icmp"];

/// Builds probers by kind name, filling in a default timeout.
#[derive(Debug, Clone, Copy)]
pub struct Factory {
    default_timeout: Duration,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Factory {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn kinds(&self) -> &'static [&'static str] {
        &KINDS
    }

    fn timeout(&self, timeout: Duration) -> Duration {
        if timeout.is_zero() {
            self.default_timeout
        } else {
            timeout
        }
    }

    /// # Errors
    ///
    /// [`Error::UnknownProberType`] for a kind outside [`KINDS`].
    pub fn create(&self, kind: &str, timeout: Duration) -> Result<Box<dyn Prober>, Error> {
        let prober: Box<dyn Prober> = match kind {
            "tcp" => Box::new(self.create_tcp(timeout)),
            "udp" => Box::new(self.create_udp(timeout)),
            "http" => Box::new(self.create_http(timeout)),
            "grpc" => Box::new(self.create_grpc(timeout)),
            "exec" => Box::new(self.create_exec(timeout)),
            "icmp" => Box::new(self.create_icmp(timeout)),
            _ => return Err(Error::UnknownProberType(kind.to_owned())),
        };
        Ok(prober)
    }

    pub fn create_tcp(&self, timeout: Duration) -> TcpProber {
        TcpProber::new(self.timeout(timeout))
    }

    pub fn create_udp(&self, timeout: Duration) -> UdpProber {
        UdpProber::new(self.timeout(timeout))
    }

    pub fn create_http(&self, timeout: Duration) -> HttpProber {
        HttpProber::new(self.timeout(timeout))
    }

    pub fn create_grpc(&self, timeout: Duration) -> GrpcProber {
        GrpcProber::new(self.timeout(timeout))
    }

    pub fn create_exec(&self, timeout: Duration) -> ExecProber {
        ExecProber::new(self.timeout(timeout))
    }

    pub fn create_icmp(&self, timeout: Duration) -> IcmpProber {
        IcmpProber::new(self.timeout(timeout))
    }
}
