//! Outbound transport for source requests.
//!
//! The aggregator only needs "POST these JSON bytes, give me status and
//! body". Keeping that behind a trait lets the cycle logic run against
//! an in-memory transport in tests.

use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    #[allow(dead_code)] // Used by in-memory transports
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request did not complete.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("cannot connect to {0}")]
    Connect(String),

    #[error("failed to send request: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Sends one JSON POST.
pub trait Transport: Send + Sync {
    fn post_json<'a>(
        &'a self,
        url: &'a Url,
        body: &'a [u8],
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport. `timeout` of `None` keeps reqwest's default (no timeout).
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json<'a>(
        &'a self,
        url: &'a Url,
        body: &'a [u8],
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_vec())
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        TransportError::Timeout
                    } else if e.is_connect() {
                        TransportError::Connect(url.to_string())
                    } else {
                        TransportError::Request(e.to_string())
                    }
                })?;

            let status = response.status().as_u16();
            let bytes = response.bytes().await.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Body(e.to_string())
                }
            })?;

            debug!("POST {} -> {} ({} bytes)", url, status, bytes.len());

            Ok(TransportResponse {
                status,
                body: bytes.to_vec(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(TransportResponse::new(200, "{}").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(199, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(500, "").is_success());
    }

    /// Accept one connection, capture the raw request and answer with
    /// `status` and `body`.
    async fn serve_once(
        listener: tokio::net::TcpListener,
        status: &'static str,
        body: &'static str,
    ) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];

        // Read headers, then as many body bytes as Content-Length says.
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before sending a full request");
            raw.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= split + 4 + length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        String::from_utf8(raw).unwrap()
    }

    #[tokio::test]
    async fn test_post_json_request_and_response() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve_once(listener, "500 Internal Server Error", "oops"));

        let url = Url::parse(&format!("http://127.0.0.1:{}/companies/jobs", port)).unwrap();
        let transport = HttpTransport::new(Some(Duration::from_secs(5))).unwrap();
        let response = transport
            .post_json(&url, br#"{"company":"NVDA"}"#)
            .await
            .unwrap();

        assert_eq!(response, TransportResponse::new(500, "oops"));
        assert!(!response.is_success());

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        let mut lines = head.lines();

        assert_eq!(lines.next(), Some("POST /companies/jobs HTTP/1.1"));
        assert!(lines.any(|l| l.eq_ignore_ascii_case("content-type: application/json")));
        assert_eq!(body, r#"{"company":"NVDA"}"#);
    }

    #[tokio::test]
    async fn test_closed_port_is_a_transport_error() {
        // Bind then drop to get a local port with nothing listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{}/companies/intel", port)).unwrap();

        let transport = HttpTransport::new(Some(Duration::from_secs(5))).unwrap();
        let result = transport.post_json(&url, br#"{"company":"NVDA"}"#).await;

        assert!(result.is_err());
    }
}
