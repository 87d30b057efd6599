//! Drone HTTP client implementation.
//!
//! This module provides the complete client surface:
//!
//! - **Execute requests** with bearer and CSRF credentials applied
//! - **Decode responses** as JSON or text by their declared content type
//! - **Report failures** to one client-wide error sink
//! - **Subscribe to server-push streams** with automatic reconnection
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config       - Client configuration and credential sources
//! ├── endpoints    - Resource endpoint catalogue
//! ├── event_source - Server-sent event connections
//! ├── fetch        - DroneClient and the request executor
//! ├── parser       - Incremental server-sent event parser
//! ├── subscription - Long-lived subscription handling
//! ├── transport    - HTTP exchange primitive
//! └── utils        - Query strings and backoff
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DroneClient`] | Main client, request executor and endpoints |
//! | [`ClientConfig`] | Server, credentials and timing options |
//! | [`EventParser`] | Incremental server-sent event parser |
//! | [`SubscriptionHandle`] | Caller's side of a push subscription |
//! | [`QueryOptions`] | Optional query parameters of an endpoint |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use drone_client::client::{ClientConfig, DroneClient};
//! use std::time::Duration;
//!
//! // Explicit credentials
//! let client = DroneClient::new("https://drone.example.com", Some("password"), None);
//!
//! // Custom configuration
//! let config = ClientConfig::new("https://drone.example.com", Some("password"), None::<&str>)
//!     .with_request_timeout(Duration::from_secs(10))
//!     .with_logging(false);
//! let client = DroneClient::with_config(config);
//! ```
//!
//! ## Parsing Events
//!
//! ```
//! use drone_client::client::{EventParser, ParseState};
//!
//! let mut parser = EventParser::new();
//! assert_eq!(parser.state(), ParseState::StreamStart);
//!
//! // Feed data incrementally
//! let events = parser.feed(b"data: {\"pos\":0}\n\n");
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].data, "{\"pos\":0}");
//! ```
//!
//! ## Utility Functions
//!
//! ```
//! use drone_client::client::{encode_query_string, exponential_backoff, is_failure_status};
//! use std::time::Duration;
//!
//! assert_eq!(encode_query_string([("b", "2"), ("a", "x y")]), "a=x%20y&b=2");
//!
//! assert!(is_failure_status(302));
//! assert!(!is_failure_status(204));
//!
//! let delay = exponential_backoff(2, Duration::from_millis(100), Duration::from_secs(1));
//! assert_eq!(delay, Duration::from_millis(400));
//! ```

mod config;
mod endpoints;
mod event_source;
mod fetch;
mod parser;
mod subscription;
mod transport;
mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ClientConfig, CredentialSource, Environment};
pub use event_source::{parse_event_stream, EventSource, EventStream};
pub use fetch::{DroneClient, ErrorSink};
pub use parser::{EventParser, ParseState, ServerEvent};
pub use subscription::{CloseReason, StreamReceiver, SubscriptionHandle, SubscriptionState};
pub use transport::{HttpExchange, HttpReply, HttpTransport, ReqwestTransport};
pub use utils::*;
