//! Core request, response and subscription types.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// HTTP methods used by the Drone API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// The method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether requests with this method change server state.
    ///
    /// Everything except GET does, and only those carry the CSRF token.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One request to the Drone API.
///
/// The path is fully composed, including its leading slash and any query
/// string. It is appended to the configured server verbatim.
///
/// # Examples
///
/// ```
/// use drone_client::{Method, RequestDescriptor};
/// use serde_json::json;
///
/// let request = RequestDescriptor::new(Method::Post, "/api/repos/octocat/hello-world/secrets")
///     .with_body(json!({"name": "docker_password"}));
/// assert_eq!(request.method, Method::Post);
/// assert!(request.body.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// Path and query, appended to the server URL as-is
    pub path: String,
    /// JSON payload, if any
    pub body: Option<Value>,
}

impl RequestDescriptor {
    /// Create a request without a body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        RequestDescriptor {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Attach a JSON payload.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successfully decoded response body.
///
/// Bodies declared as JSON are parsed; everything else is kept as raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed JSON document
    Json(Value),
    /// Raw response text
    Text(String),
}

impl Payload {
    /// The JSON value, if the response was JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    /// The raw text, if the response was not JSON.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(_) => None,
        }
    }

    /// Consume the payload into a JSON value. Text becomes a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        }
    }

    /// Deserialize the payload into a typed value.
    ///
    /// ```
    /// use drone_client::Payload;
    /// use serde::Deserialize;
    /// use serde_json::json;
    ///
    /// #[derive(Deserialize)]
    /// struct User { login: String }
    ///
    /// let user: User = Payload::Json(json!({"login": "octocat"})).deserialize().unwrap();
    /// assert_eq!(user.login, "octocat");
    /// ```
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.into_json())?)
    }
}

/// Per-subscription settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// Reopen the connection after a non-terminal error
    pub reconnect: bool,
}

impl SubscriptionOptions {
    /// Defaults for the global event feed: long-lived, self-healing.
    pub fn event_feed() -> Self {
        SubscriptionOptions { reconnect: true }
    }

    /// Defaults for a build log stream: bounded to one build, never reopened.
    pub fn log_stream() -> Self {
        SubscriptionOptions { reconnect: false }
    }

    /// Set the reconnect flag
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self::event_feed()
    }
}
