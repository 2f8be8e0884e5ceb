//! Proxy transport layer for HTTP and SOCKS5 candidates
//!
//! Opens a TCP tunnel to a target host through a candidate proxy.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use percent_encoding::percent_decode_str;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;
use tracing::{debug, instrument};

use crate::error::{MaintainerError, Result};
use crate::models::DialType;

/// Largest CONNECT response header we are willing to buffer
const MAX_CONNECT_RESPONSE: usize = 8 * 1024;

/// A candidate's address split into dialable parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyEndpoint {
    /// Parse `host:port` or `user:pass@host:port`
    pub fn parse(address: &str) -> Result<Self> {
        // Use URL parsing to properly handle bracketed IPv6 like "[::1]:8080".
        let url = url::Url::parse(&format!("http://{}", address.trim())).map_err(|e| {
            MaintainerError::InvalidProxyAddress(format!("Invalid address '{}': {}", address, e))
        })?;

        let host = url.host_str().ok_or_else(|| {
            MaintainerError::InvalidProxyAddress(format!("Invalid address '{}': missing host", address))
        })?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        // `port()` hides the scheme default, so only trust the URL once a port was written
        let port = has_explicit_port(address)
            .then(|| url.port_or_known_default())
            .flatten()
            .ok_or_else(|| {
                MaintainerError::InvalidProxyAddress(format!(
                    "Invalid address '{}': missing port",
                    address
                ))
            })?;

        let username = if url.username().is_empty() {
            None
        } else {
            Some(decode_credential(url.username()))
        };
        let password = url.password().map(decode_credential);

        Ok(Self {
            host: host.to_string(),
            port,
            username,
            password,
        })
    }

    /// Address suitable for `TcpStream::connect`
    pub fn socket_addr(&self) -> String {
        format_tcp_addr(&self.host, self.port)
    }
}

/// Whether `[user:pass@]host:port` carries a non-empty port after the host
fn has_explicit_port(address: &str) -> bool {
    let host_port = address.trim();
    let host_port = host_port.rsplit_once('@').map_or(host_port, |(_, hp)| hp);
    let host_port = host_port.split(['/', '?', '#']).next().unwrap_or("");

    let after_host = match host_port.strip_prefix('[') {
        Some(rest) => rest.split_once(']').map_or("", |(_, tail)| tail),
        None => host_port,
    };

    after_host
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty())
}

/// Userinfo comes back percent-encoded from the URL parser
fn decode_credential(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Proxy transport handler
pub struct ProxyTransport;

impl ProxyTransport {
    /// Open a tunnel to `target_host:target_port` through the given proxy
    #[instrument(skip(endpoint), fields(proxy = %endpoint.socket_addr(), target = %target_host))]
    pub async fn connect(
        dial_type: DialType,
        endpoint: &ProxyEndpoint,
        target_host: &str,
        target_port: u16,
    ) -> Result<TcpStream> {
        match dial_type {
            DialType::Http => Self::connect_http(endpoint, target_host, target_port)
                .await
                .map_err(|e| {
                    MaintainerError::ProxyConnectionFailed(format!(
                        "HTTP proxy {} -> {}: {}",
                        endpoint.socket_addr(),
                        format_tcp_addr(target_host, target_port),
                        e
                    ))
                }),
            DialType::Socks5 => Self::connect_socks5(endpoint, target_host, target_port)
                .await
                .map_err(|e| {
                    MaintainerError::ProxyConnectionFailed(format!(
                        "SOCKS5 proxy {} -> {}: {}",
                        endpoint.socket_addr(),
                        format_tcp_addr(target_host, target_port),
                        e
                    ))
                }),
        }
    }

    /// Connect through HTTP CONNECT method
    async fn connect_http(
        endpoint: &ProxyEndpoint,
        target_host: &str,
        target_port: u16,
    ) -> std::result::Result<TcpStream, anyhow::Error> {
        debug!("Connecting to HTTP proxy at {}", endpoint.socket_addr());

        let mut stream = TcpStream::connect(endpoint.socket_addr()).await?;

        let request = Self::build_connect_request(endpoint, target_host, target_port);
        stream.write_all(request.as_bytes()).await?;

        // Read the whole response head so nothing of it leaks into the tunnel
        let mut response = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                anyhow::bail!("proxy closed the connection during CONNECT");
            }
            response.extend_from_slice(&chunk[..n]);

            if response.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
            if response.len() > MAX_CONNECT_RESPONSE {
                anyhow::bail!("CONNECT response header too large");
            }
        }

        let response_str = String::from_utf8_lossy(&response);
        if !is_connect_established(&response_str) {
            anyhow::bail!(
                "CONNECT failed: {}",
                response_str.lines().next().unwrap_or("Unknown error")
            );
        }

        debug!("HTTP CONNECT tunnel established");
        Ok(stream)
    }

    /// Build HTTP CONNECT request
    fn build_connect_request(endpoint: &ProxyEndpoint, target_host: &str, target_port: u16) -> String {
        let authority = format_tcp_addr(target_host, target_port);
        let mut request = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", authority, authority);

        if let Some(username) = &endpoint.username {
            let password = endpoint.password.as_deref().unwrap_or("");
            let credentials = format!("{}:{}", username, password);
            request.push_str(&format!(
                "Proxy-Authorization: Basic {}\r\n",
                BASE64.encode(credentials.as_bytes())
            ));
        }

        request.push_str("\r\n");
        request
    }

    /// Connect through SOCKS5 proxy
    async fn connect_socks5(
        endpoint: &ProxyEndpoint,
        target_host: &str,
        target_port: u16,
    ) -> std::result::Result<TcpStream, anyhow::Error> {
        debug!("Connecting to SOCKS5 proxy at {}", endpoint.socket_addr());

        let socket = TcpStream::connect(endpoint.socket_addr()).await?;

        let stream = match (&endpoint.username, &endpoint.password) {
            (Some(username), Some(password)) => {
                Socks5Stream::connect_with_password_and_socket(
                    socket,
                    (target_host, target_port),
                    username,
                    password,
                )
                .await?
            }
            _ => Socks5Stream::connect_with_socket(socket, (target_host, target_port)).await?,
        };

        debug!("SOCKS5 connection established");
        Ok(stream.into_inner())
    }
}

fn is_connect_established(response: &str) -> bool {
    let mut parts = response.split_whitespace();
    matches!(
        (parts.next(), parts.next()),
        (Some("HTTP/1.1") | Some("HTTP/1.0"), Some(status)) if status.starts_with('2')
    )
}

fn format_tcp_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
