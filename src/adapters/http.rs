//! JSON-over-HTTP client for backend services
//!
//! Shared by the monitoring and billing adapters.

use anyhow::{Context, Result};
use reqwest::{Client, Method, Url};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::error::GatewayError;

/// HTTP client errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl HttpError {
    /// Convert to a gateway error; `wrap` builds the backend-specific variant
    pub fn into_gateway_error(self, wrap: impl FnOnce(String) -> GatewayError) -> GatewayError {
        match self {
            HttpError::Timeout(secs) => GatewayError::Timeout {
                operation: "http request".to_string(),
                secs,
            },
            transport @ (HttpError::ConnectionRefused(_) | HttpError::RequestFailed(_)) => {
                GatewayError::transport(transport.to_string())
            }
            other => wrap(other.to_string()),
        }
    }
}

/// HTTP client bound to one backend
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create client with custom timeout
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            bearer_token: None,
            timeout_secs,
        })
    }

    pub fn bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build full URL
    fn build_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// URL for `prefix` followed by `segment` as one escaped path segment
    fn segment_url(&self, prefix: &str, segment: &str) -> Result<Url, HttpError> {
        let mut url = Url::parse(&self.build_url(prefix))
            .map_err(|e| HttpError::RequestFailed(format!("invalid URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| {
                HttpError::RequestFailed(format!("{} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    /// Send a request and decode the JSON response; an empty body is `null`.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, HttpError> {
        self.send_to(method, self.build_url(path), body).await
    }

    async fn send_to(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<Value, HttpError> {
        debug!("Sending {} request to {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                HttpError::ConnectionRefused(url.clone())
            } else {
                HttpError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::RequestFailed(e.to_string()))?;

        debug!(
            "Response: {} {} in {}ms",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            start.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| HttpError::Decode(e.to_string()))
    }

    pub async fn get(&self, path: &str) -> Result<Value, HttpError> {
        self.send_json(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, HttpError> {
        self.send_json(Method::POST, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, HttpError> {
        self.send_json(Method::DELETE, path, None).await
    }

    /// DELETE `prefix/<segment>`, escaping `segment` so it stays one path segment
    pub async fn delete_segment(&self, prefix: &str, segment: &str) -> Result<Value, HttpError> {
        let url = self.segment_url(prefix, segment)?;
        self.send_to(Method::DELETE, url.into(), None).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! One-shot HTTP responder for adapter tests

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one request with `status` and `body`; the handle yields the raw request.
    pub async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{addr}"), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }
}
