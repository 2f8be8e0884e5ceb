//! Connectivity probe through a single candidate proxy
//!
//! Each probe owns a throwaway tunnel and HTTP/1 connection; nothing is
//! pooled across candidates. For `https` check URLs the tunnel is wrapped in
//! TLS before the request is sent.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header::{HOST, USER_AGENT};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_native_tls::{native_tls, TlsConnector};
use tracing::{debug, instrument};
use url::Url;

use crate::error::{MaintainerError, Result};
use crate::models::{Candidate, DialType};
use crate::proxy::transport::{ProxyEndpoint, ProxyTransport};

/// Default upper bound for one probe, tunnel and request included
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Checks whether traffic flows through a candidate
#[async_trait]
pub trait Prober: Send + Sync {
    /// `Ok(())` when the candidate forwarded the check request.
    ///
    /// Returns `UnsupportedDialType` without touching the network when the
    /// candidate's dial type is unknown.
    async fn probe(&self, candidate: &Candidate) -> Result<()>;
}

/// Where probes are pointed
#[derive(Debug, Clone)]
struct CheckTarget {
    host: String,
    port: u16,
    /// `host[:port]` as sent in the Host header
    authority: String,
    path_and_query: String,
    tls: bool,
}

impl CheckTarget {
    fn parse(check_url: &str) -> Result<Self> {
        let url = Url::parse(check_url)?;

        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => {
                return Err(MaintainerError::InvalidConfig(format!(
                    "check URL has unsupported scheme: {}",
                    other
                )))
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| MaintainerError::InvalidConfig("check URL must include a host".into()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| MaintainerError::InvalidConfig("check URL must include a port".into()))?;

        let authority = match url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let mut path_and_query = url.path().to_string();
        if let Some(query) = url.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
            .to_string();

        Ok(Self {
            host,
            port,
            authority,
            path_and_query,
            tls,
        })
    }
}

/// Probe that dials through the candidate and fetches the check URL
pub struct ProxyProber {
    target: CheckTarget,
    /// Present only when the check URL is `https`
    tls: Option<TlsConnector>,
    timeout: Duration,
}

impl ProxyProber {
    pub fn new(check_url: &str, probe_timeout: Duration) -> Result<Self> {
        let target = CheckTarget::parse(check_url)?;

        let tls = if target.tls {
            let connector = native_tls::TlsConnector::new().map_err(|e| {
                MaintainerError::InvalidConfig(format!("Failed to build TLS connector: {}", e))
            })?;
            Some(TlsConnector::from(connector))
        } else {
            None
        };

        Ok(Self {
            target,
            tls,
            timeout: probe_timeout,
        })
    }

    async fn check_through(&self, dial_type: DialType, candidate: &Candidate) -> Result<()> {
        let endpoint = ProxyEndpoint::parse(&candidate.address)?;
        let stream =
            ProxyTransport::connect(dial_type, &endpoint, &self.target.host, self.target.port)
                .await?;

        match &self.tls {
            Some(connector) => {
                let stream = connector
                    .connect(&self.target.host, stream)
                    .await
                    .map_err(|e| {
                        MaintainerError::CheckFailed(format!("TLS handshake failed: {}", e))
                    })?;
                self.send_check(stream).await
            }
            None => self.send_check(stream).await,
        }
    }

    /// One GET for the check URL over an already established stream
    async fn send_check<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| MaintainerError::CheckFailed(format!("Handshake failed: {}", e)))?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("Check connection ended: {}", e);
            }
        });

        let request = Request::builder()
            .method(Method::GET)
            .uri(self.target.path_and_query.as_str())
            .header(HOST, self.target.authority.as_str())
            .header(USER_AGENT, concat!("pxier-maintainer/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<Bytes>::new())
            .map_err(|e| MaintainerError::CheckFailed(format!("Failed to build request: {}", e)))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| MaintainerError::CheckFailed(format!("Request failed: {}", e)))?;

        // Any status proves the proxy forwarded traffic; drain the body so the
        // exchange is complete.
        let status = response.status();
        response
            .into_body()
            .collect()
            .await
            .map_err(|e| MaintainerError::CheckFailed(format!("Failed to read response: {}", e)))?;

        debug!(status = status.as_u16(), "Check request answered");
        Ok(())
    }
}

#[async_trait]
impl Prober for ProxyProber {
    #[instrument(skip(self, candidate), fields(address = %candidate.address, dial_type = %candidate.dial_type))]
    async fn probe(&self, candidate: &Candidate) -> Result<()> {
        let dial_type = candidate
            .dial_type_enum()
            .ok_or_else(|| MaintainerError::UnsupportedDialType(candidate.dial_type.clone()))?;

        timeout(self.timeout, self.check_through(dial_type, candidate))
            .await
            .map_err(|_| MaintainerError::Timeout)?
    }
}
