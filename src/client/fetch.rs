//! Main Drone client implementation.
//!
//! Provides [`DroneClient`]: the request executor every endpoint goes
//! through, and the entry points for server-push subscriptions.
//!
//! # Examples
//!
//! ## Simple GET request
//!
//! ```ignore
//! use drone_client::DroneClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DroneClient::new("https://drone.example.com", Some("password"), None);
//!     let user = client.get_self().await?;
//!     println!("Logged in as {}", user.as_json().unwrap()["login"]);
//!     Ok(())
//! }
//! ```
//!
//! ## Watching for expired sessions
//!
//! ```ignore
//! use drone_client::DroneClient;
//!
//! let client = DroneClient::from_environ().with_error_sink(|failure| {
//!     if failure.is_unauthorized() {
//!         eprintln!("session expired: {}", failure.message);
//!     }
//! });
//! ```
//!
//! ## Following a build log
//!
//! ```ignore
//! use drone_client::DroneClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = DroneClient::from_environ();
//!     let logs = client.stream_logs("octocat", "hello-world", 42, 2, |line: serde_json::Value| {
//!         print!("{}", line["out"].as_str().unwrap_or_default());
//!     });
//!     logs.closed().await;
//! }
//! ```

use crate::client::config::{ClientConfig, CredentialSource};
use crate::client::event_source::EventSource;
use crate::client::subscription::{self, StreamReceiver, SubscriptionHandle};
use crate::client::transport::{HttpExchange, HttpReply, HttpTransport, ReqwestTransport};
use crate::client::utils::{append_query_param, is_failure_status};
use crate::error::{DroneError, RequestFailure, Result};
use crate::protocol::constants::{self, headers, media};
use crate::protocol::{format_bearer, is_json_media_type, looks_like_json};
use crate::types::{Method, Payload, RequestDescriptor, SubscriptionOptions};
use parking_lot::RwLock;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Client-wide observer of failed requests.
pub type ErrorSink = Arc<dyn Fn(&RequestFailure) + Send + Sync>;

/// The Drone API client
///
/// Cheap to clone; clones share the configuration, the transports and the
/// error sink.
///
/// # Features
///
/// - Bearer and CSRF credentials applied per request
/// - JSON request bodies and content-negotiated responses
/// - One error sink for every failed request
/// - Self-healing event feed and bounded log streams
#[derive(Clone)]
pub struct DroneClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
    events: Arc<dyn EventSource>,
    error_sink: Arc<RwLock<Option<ErrorSink>>>,
}

impl DroneClient {
    /// Create a client for `server` with optional credentials.
    ///
    /// An empty `server` issues same-origin requests (paths only).
    pub fn new(server: impl Into<String>, token: Option<&str>, csrf: Option<&str>) -> Self {
        Self::with_config(ClientConfig::new(server, token, csrf))
    }

    /// Create a client with custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new(&config));
        Self::with_transport(config, transport.clone(), transport)
    }

    /// Create a client on top of custom transports.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        events: Arc<dyn EventSource>,
    ) -> Self {
        DroneClient {
            config: Arc::new(config),
            transport,
            events,
            error_sink: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a client from `DRONE_SERVER`, `DRONE_TOKEN` and `DRONE_CSRF`
    /// in the process environment.
    pub fn from_environ() -> Self {
        Self::with_config(ClientConfig::from_environ())
    }

    /// Create a client from a host-runtime context exposing the same three keys.
    pub fn from_context<S: CredentialSource + ?Sized>(source: &S) -> Self {
        Self::with_config(ClientConfig::from_source(source))
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Install the error sink, replacing any previous one.
    ///
    /// The sink runs synchronously for every request that fails with a
    /// status of 300 or above, possibly from several tasks at once. A
    /// panicking sink is logged and does not affect the request's result.
    pub fn set_error_sink<F>(&self, sink: F)
    where
        F: Fn(&RequestFailure) + Send + Sync + 'static,
    {
        *self.error_sink.write() = Some(Arc::new(sink));
    }

    /// Builder form of [`set_error_sink`](Self::set_error_sink).
    pub fn with_error_sink<F>(self, sink: F) -> Self
    where
        F: Fn(&RequestFailure) + Send + Sync + 'static,
    {
        self.set_error_sink(sink);
        self
    }

    /// Remove the error sink.
    pub fn clear_error_sink(&self) {
        *self.error_sink.write() = None;
    }

    /// Execute one request.
    ///
    /// The path is appended to the configured server verbatim. The bearer
    /// token goes on every request, the CSRF token on every non-GET request,
    /// and a body is sent as JSON.
    ///
    /// # Errors
    ///
    /// - [`DroneError::Request`] for a status of 300 or above (after the
    ///   error sink ran)
    /// - [`DroneError::Transport`] when no status was received
    /// - [`DroneError::Json`] when a body declared as JSON does not parse
    pub async fn execute(&self, request: RequestDescriptor) -> Result<Payload> {
        let RequestDescriptor { method, path, body } = request;
        let mut exchange = HttpExchange::new(method, format!("{}{}", self.config.server, path));

        if let Some(token) = self.config.token() {
            exchange.set_header(headers::AUTHORIZATION, format_bearer(token));
        }
        if method.is_mutating() {
            if let Some(csrf) = self.config.csrf() {
                exchange.set_header(headers::CSRF_TOKEN, csrf);
            }
        }
        if let Some(body) = body {
            exchange.set_header(headers::CONTENT_TYPE, media::JSON);
            exchange.body = Some(serde_json::to_string(&body)?);
        }

        if self.config.enable_logging {
            tracing::debug!("{} {}", method, path);
        }

        let reply = self.transport.send(exchange).await?;

        if is_failure_status(reply.status) {
            let failure = RequestFailure::new(reply.status, reply.body);
            if self.config.enable_logging {
                tracing::debug!("{} {} failed with status {}", method, path, failure.status);
            }
            self.notify_error_sink(&failure);
            return Err(DroneError::Request(failure));
        }

        decode_reply(reply)
    }

    /// Issue a GET request
    pub async fn get(&self, path: &str) -> Result<Payload> {
        self.execute(RequestDescriptor::new(Method::Get, path)).await
    }

    /// Issue a POST request with an optional JSON body
    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<Payload> {
        self.execute(RequestDescriptor {
            method: Method::Post,
            path: path.to_string(),
            body,
        })
        .await
    }

    /// Issue a PATCH request with an optional JSON body
    pub async fn patch(&self, path: &str, body: Option<Value>) -> Result<Payload> {
        self.execute(RequestDescriptor {
            method: Method::Patch,
            path: path.to_string(),
            body,
        })
        .await
    }

    /// Issue a PUT request with an optional JSON body
    pub async fn put(&self, path: &str, body: Option<Value>) -> Result<Payload> {
        self.execute(RequestDescriptor {
            method: Method::Put,
            path: path.to_string(),
            body,
        })
        .await
    }

    /// Issue a DELETE request
    pub async fn delete(&self, path: &str) -> Result<Payload> {
        self.execute(RequestDescriptor::new(Method::Delete, path)).await
    }

    /// Subscribe to a server-push stream.
    ///
    /// Returns immediately; messages are delivered to `receiver` from a task
    /// on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn subscribe<R: StreamReceiver>(
        &self,
        path: &str,
        receiver: R,
        options: SubscriptionOptions,
    ) -> SubscriptionHandle {
        subscription::spawn(
            self.events.clone(),
            self.stream_url(path),
            path.to_string(),
            Box::new(receiver),
            options,
            &self.config,
        )
    }

    /// Subscribe to the global activity feed. Reconnects after drops.
    pub fn on_events<R: StreamReceiver>(&self, receiver: R) -> SubscriptionHandle {
        self.subscribe(
            constants::EVENTS_PATH,
            receiver,
            SubscriptionOptions::event_feed(),
        )
    }

    /// Follow the log of one build step. Never reconnects.
    pub fn stream_logs<R: StreamReceiver>(
        &self,
        owner: &str,
        repo: &str,
        build: u64,
        proc: u64,
        receiver: R,
    ) -> SubscriptionHandle {
        self.subscribe(
            &format!("{}/{}/{}/{}/{}", constants::LOGS_PATH, owner, repo, build, proc),
            receiver,
            SubscriptionOptions::log_stream(),
        )
    }

    /// The full stream endpoint for `path`, with the token as `access_token`.
    ///
    /// Stream connections cannot carry custom headers, so the token travels
    /// in the query string. The CSRF token is never added.
    pub fn stream_url(&self, path: &str) -> String {
        let endpoint = format!("{}{}", self.config.server, path);
        match self.config.token() {
            Some(token) => append_query_param(&endpoint, constants::ACCESS_TOKEN_PARAM, token),
            None => endpoint,
        }
    }

    fn notify_error_sink(&self, failure: &RequestFailure) {
        let sink = self.error_sink.read().clone();
        if let Some(sink) = sink {
            if panic::catch_unwind(AssertUnwindSafe(|| sink(failure))).is_err() {
                tracing::warn!("Error sink panicked while handling status {}", failure.status);
            }
        }
    }
}

impl std::fmt::Debug for DroneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DroneClient")
            .field("server", &self.config.server)
            .field("token", &self.config.token().map(|_| "<redacted>"))
            .field("csrf", &self.config.csrf().map(|_| "<redacted>"))
            .finish()
    }
}

/// Decode a successful reply by its declared content type.
///
/// Declared JSON is parsed strictly. A reply with no Content-Type at all is
/// sniffed: a body opening with `{` or `[` is parsed as JSON when it can be.
/// Everything else stays raw text.
fn decode_reply(reply: HttpReply) -> Result<Payload> {
    let declared_json = reply.content_type().map(is_json_media_type);
    match declared_json {
        Some(true) => Ok(Payload::Json(serde_json::from_str(&reply.body)?)),
        Some(false) => Ok(Payload::Text(reply.body)),
        None if looks_like_json(&reply.body) => {
            match serde_json::from_str::<Value>(&reply.body) {
                Ok(value) => Ok(Payload::Json(value)),
                Err(_) => Ok(Payload::Text(reply.body)),
            }
        }
        None => Ok(Payload::Text(reply.body)),
    }
}
