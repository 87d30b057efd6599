//! Client configuration and credential sources.
//!
//! A [`ClientConfig`] is built once and shared read-only by every request and
//! subscription of a [`DroneClient`](crate::DroneClient). Credentials come
//! from explicit arguments or from a [`CredentialSource`]: the process
//! environment, or a map standing in for a host runtime's globals.
//!
//! ```
//! use drone_client::client::ClientConfig;
//! use std::collections::HashMap;
//!
//! let mut globals = HashMap::new();
//! globals.insert("DRONE_SERVER".to_string(), "https://drone.example.com".to_string());
//! globals.insert("DRONE_TOKEN".to_string(), "password".to_string());
//!
//! let config = ClientConfig::from_source(&globals);
//! assert_eq!(config.server, "https://drone.example.com");
//! assert_eq!(config.token(), Some("password"));
//! assert_eq!(config.csrf(), None);
//! ```

use crate::protocol::constants::env;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Something that can answer `DRONE_SERVER`, `DRONE_TOKEN` and `DRONE_CSRF`.
pub trait CredentialSource {
    /// Look up one credential. `None` means absent.
    fn credential(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Environment;

impl CredentialSource for Environment {
    fn credential(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl CredentialSource for HashMap<String, String> {
    fn credential(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl CredentialSource for BTreeMap<String, String> {
    fn credential(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<S: CredentialSource + ?Sized> CredentialSource for &S {
    fn credential(&self, key: &str) -> Option<String> {
        (**self).credential(key)
    }
}

/// Configuration for a Drone client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL prepended to every path; empty means same-origin
    pub server: String,
    /// Bearer credential
    pub token: Option<String>,
    /// Anti-forgery token for mutating requests
    pub csrf: Option<String>,
    /// Per-request timeout in milliseconds; streams are not bounded by it
    pub request_timeout_ms: u64,
    /// Delay before reopening a dropped stream, in milliseconds
    pub reconnect_delay_ms: u64,
    /// Upper bound for backoff between failed connection attempts
    pub max_reconnect_delay_ms: u64,
    /// Whether to log per-request and reconnect diagnostics
    pub enable_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server: String::new(),
            token: None,
            csrf: None,
            request_timeout_ms: 30_000,
            reconnect_delay_ms: 3_000,
            max_reconnect_delay_ms: 30_000,
            enable_logging: true,
        }
    }
}

impl ClientConfig {
    /// Create a configuration from explicit credentials.
    ///
    /// Empty strings are treated the same as `None`.
    pub fn new(
        server: impl Into<String>,
        token: Option<impl Into<String>>,
        csrf: Option<impl Into<String>>,
    ) -> Self {
        ClientConfig {
            server: server.into(),
            token: non_empty(token.map(Into::into)),
            csrf: non_empty(csrf.map(Into::into)),
            ..Default::default()
        }
    }

    /// Read `DRONE_SERVER`, `DRONE_TOKEN` and `DRONE_CSRF` from the environment.
    pub fn from_environ() -> Self {
        Self::from_source(&Environment)
    }

    /// Read the three credentials from any source. Missing values are fine.
    pub fn from_source<S: CredentialSource + ?Sized>(source: &S) -> Self {
        Self::new(
            source.credential(env::SERVER).unwrap_or_default(),
            source.credential(env::TOKEN),
            source.credential(env::CSRF),
        )
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the stream reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the backoff ceiling for failed stream connection attempts
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Enable or disable diagnostics logging
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// The bearer token, if configured.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// The CSRF token, if configured.
    pub fn csrf(&self) -> Option<&str> {
        self.csrf.as_deref().filter(|t| !t.is_empty())
    }

    /// Per-request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Stream reconnect delay as a `Duration`.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Backoff ceiling as a `Duration`.
    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
