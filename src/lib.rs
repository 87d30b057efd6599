#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Drone Client: the Drone CI HTTP API from Rust
//!
//! This crate is a thin, asynchronous client for the HTTP API of a Drone CI
//! server. It issues authenticated requests against the server's REST
//! endpoints and follows its two server-push channels: the global activity
//! feed and per-step build logs.
//!
//! ## Overview
//!
//! Everything goes through two primitives:
//!
//! 1. **The request executor** - [`DroneClient::execute`] applies
//!    credentials, sends one request and classifies the reply
//! 2. **The subscription driver** - [`DroneClient::subscribe`] keeps a
//!    server-sent event connection alive and delivers decoded messages
//!
//! The endpoint methods (`get_repo`, `restart_build`, `get_self`, ...) only
//! compose paths and call the executor.
//!
//! ## Key Features
//!
//! - **Credentials**: bearer token on every request, CSRF token on every
//!   mutating request, `access_token` on stream URLs
//! - **Content negotiation**: JSON when declared, text otherwise
//! - **Error sink**: one observer for every failed request, e.g. to detect
//!   expired sessions
//! - **Subscriptions**: the activity feed reconnects after drops, log
//!   streams end on the server's `eof` marker
//! - **Credential discovery**: from the process environment or any
//!   key/value context
//!
//! ## Client Usage
//!
//! ```ignore
//! use drone_client::{DroneClient, QueryOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DroneClient::from_environ();
//!
//!     let repos = client
//!         .get_repo_list(&QueryOptions::new().with("all", true))
//!         .await?;
//!     println!("{:?}", repos);
//!
//!     client
//!         .restart_build("octocat", "hello-world", 42, &QueryOptions::new().with("fork", true))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Following the Activity Feed
//!
//! ```ignore
//! use drone_client::DroneClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = DroneClient::from_environ();
//!
//!     let feed = client.on_events(|event: serde_json::Value| {
//!         println!("{}", event);
//!     });
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     feed.close();
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Request descriptors, payloads and subscription options
//! - **[error]** - Error types and result handling
//! - **[client]** - The client, its transports and subscriptions
//! - **[protocol]** - Header names, media types and stream paths

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use client::{
    ClientConfig, CloseReason, DroneClient, QueryOptions, StreamReceiver, SubscriptionHandle,
    SubscriptionState,
};
pub use error::{DroneError, RequestFailure, Result};
pub use types::{Method, Payload, RequestDescriptor, SubscriptionOptions};

#[cfg(test)]
mod tests;
