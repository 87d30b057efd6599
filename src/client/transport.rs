//! HTTP exchange primitive.
//!
//! The request executor never touches the network directly. It hands one
//! [`HttpExchange`] to an [`HttpTransport`] and classifies the
//! [`HttpReply`] it gets back. [`ReqwestTransport`] is the default
//! implementation and also serves as the push-stream primitive (see
//! [`EventSource`](crate::client::EventSource)).

use crate::client::config::ClientConfig;
use crate::error::{DroneError, Result};
use crate::protocol::constants::headers;
use crate::types::Method;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// One outgoing HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpExchange {
    /// HTTP method
    pub method: Method,
    /// Absolute (or same-origin) endpoint
    pub url: String,
    /// Request headers in the order they were set
    pub headers: Vec<(String, String)>,
    /// Serialized request payload
    pub body: Option<String>,
}

impl HttpExchange {
    /// Create an exchange with no headers and no payload.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        HttpExchange {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set a request header.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((name.to_string(), value.into()));
    }

    /// Look up a request header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The completed side of an exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpReply {
    /// Final status code
    pub status: u16,
    /// Response headers (keys normalized to lowercase)
    pub headers: BTreeMap<String, String>,
    /// Response body text
    pub body: String,
}

impl HttpReply {
    /// Create a reply with a status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpReply {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Add a response header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// The declared Content-Type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(headers::CONTENT_TYPE).map(String::as_str)
    }
}

/// Executes a single HTTP exchange.
///
/// Implementations must report a reply for every status code, including
/// 4xx and 5xx, and reserve `Err` for exchanges that produced no status.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the exchange and wait for the complete reply.
    async fn send(&self, exchange: HttpExchange) -> Result<HttpReply>;
}

/// `reqwest`-backed transport.
///
/// Connection pooling is disabled: every exchange and every stream opens its
/// own connection.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    pub(crate) client: reqwest::Client,
    request_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport tuned by the client configuration.
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .unwrap_or_default();

        ReqwestTransport {
            client,
            request_timeout: config.request_timeout(),
        }
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, request_timeout: Duration) -> Self {
        ReqwestTransport {
            client,
            request_timeout,
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, exchange: HttpExchange) -> Result<HttpReply> {
        let mut req_builder = self
            .client
            .request(exchange.method.into(), &exchange.url)
            .timeout(self.request_timeout);

        for (k, v) in &exchange.headers {
            req_builder = req_builder.header(k.as_str(), v.as_str());
        }

        if let Some(body) = exchange.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| DroneError::Transport(e.to_string()))?;

        let status = response.status().as_u16();

        let mut headers = BTreeMap::new();
        for (k, v) in response.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| DroneError::Transport(e.to_string()))?;

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}
