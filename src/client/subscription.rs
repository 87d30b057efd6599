//! Server-push subscriptions.
//!
//! A subscription owns one push connection at a time and a driver task that
//! walks it through an explicit state machine:
//!
//! ```text
//! Connecting ──▶ Open ──▶ Closed(EndOfStream)     "eof" error event
//!     ▲            │ ───▶ Closed(Failed)          other error, reconnect off
//!     │            │ ───▶ Closed(ClosedByCaller)  handle closed or dropped
//!     │            ▼
//!     └──── Reconnecting                          other error, reconnect on
//! ```
//!
//! Closing by the caller is reachable from every state that is not closed
//! already. Nothing leaves `Closed`.
//!
//! # Delivery
//!
//! Each `message` event is parsed as JSON and handed to the
//! [`StreamReceiver`] in arrival order. Payloads that are not JSON go to
//! [`StreamReceiver::on_decode_error`] and the subscription carries on.
//! Delivery and [`SubscriptionHandle::close`] share a reentrant gate: once
//! `close` returns, the receiver is never called again, and calling `close`
//! from inside the receiver is allowed. A receiver that panics closes the
//! subscription with [`CloseReason::Failed`].
//!
//! # Examples
//!
//! ```ignore
//! use drone_client::{DroneClient, SubscriptionOptions};
//!
//! let client = DroneClient::from_environ();
//! let feed = client.on_events(|event: serde_json::Value| {
//!     println!("activity: {}", event);
//! });
//!
//! // later
//! feed.close();
//! ```

use crate::client::config::ClientConfig;
use crate::client::event_source::{EventSource, EventStream};
use crate::client::utils::exponential_backoff;
use crate::error::DroneError;
use crate::protocol::constants::events;
use crate::types::SubscriptionOptions;
use futures::StreamExt;
use parking_lot::ReentrantMutex;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Receives the messages of a subscription.
///
/// Implemented for every `FnMut(Value) + Send + 'static` closure.
pub trait StreamReceiver: Send + 'static {
    /// Called once per pushed message, in arrival order.
    fn on_message(&mut self, data: Value);

    /// Called when a pushed message is not valid JSON.
    ///
    /// The message is dropped either way; the subscription stays open.
    fn on_decode_error(&mut self, error: DroneError) {
        tracing::warn!(error = %error, "Dropping malformed stream message");
    }
}

impl<F> StreamReceiver for F
where
    F: FnMut(Value) + Send + 'static,
{
    fn on_message(&mut self, data: Value) {
        self(data)
    }
}

/// Why a subscription stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The server sent the `eof` sentinel
    EndOfStream,
    /// The handle was closed or dropped
    ClosedByCaller,
    /// The connection failed and was not reopened, or the receiver panicked
    Failed,
}

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Opening the push connection
    Connecting,
    /// Receiving messages
    Open,
    /// Waiting to reopen after a non-terminal error
    Reconnecting,
    /// Terminal
    Closed(CloseReason),
}

impl SubscriptionState {
    /// Whether the subscription has reached a terminal state.
    pub fn is_closed(&self) -> bool {
        matches!(self, SubscriptionState::Closed(_))
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// ```
    /// use drone_client::client::{CloseReason, SubscriptionState::*};
    ///
    /// assert!(Open.can_transition_to(Reconnecting));
    /// assert!(!Connecting.can_transition_to(Reconnecting));
    /// assert!(!Closed(CloseReason::EndOfStream).can_transition_to(Connecting));
    /// ```
    pub fn can_transition_to(&self, next: SubscriptionState) -> bool {
        use SubscriptionState::*;
        match (*self, next) {
            (Closed(_), _) => false,
            (_, Closed(CloseReason::ClosedByCaller)) => true,
            (Connecting, Open) | (Connecting, Closed(_)) => true,
            (Open, Reconnecting) | (Open, Closed(_)) => true,
            (Reconnecting, Connecting) => true,
            _ => false,
        }
    }
}

/// State shared by a handle and its driver task.
struct Shared {
    state: watch::Sender<SubscriptionState>,
    /// Held while the receiver runs, and by `close`.
    delivery: ReentrantMutex<()>,
}

impl Shared {
    fn transition(&self, next: SubscriptionState) -> bool {
        let moved = self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                *current = next;
                true
            } else {
                false
            }
        });
        if moved {
            tracing::debug!(state = ?next, "Subscription state changed");
        }
        moved
    }

    fn current(&self) -> SubscriptionState {
        *self.state.borrow()
    }
}

/// Caller-owned handle to a live or closed subscription.
///
/// Dropping the handle closes the subscription.
pub struct SubscriptionHandle {
    shared: Arc<Shared>,
}

impl SubscriptionHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        self.shared.current()
    }

    /// Whether the subscription has stopped for good.
    pub fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    /// Stop the subscription.
    ///
    /// Waits for a receiver call that is running on another thread, then
    /// guarantees no further calls. Events already in flight are discarded
    /// and no reconnection happens. Closing twice is a no-op.
    pub fn close(&self) {
        let _guard = self.shared.delivery.lock();
        self.shared
            .transition(SubscriptionState::Closed(CloseReason::ClosedByCaller));
    }

    /// Wait until the subscription reaches a terminal state.
    pub async fn closed(&self) -> CloseReason {
        let mut rx = self.shared.state.subscribe();
        loop {
            if let SubscriptionState::Closed(reason) = *rx.borrow_and_update() {
                return reason;
            }
            if rx.changed().await.is_err() {
                return CloseReason::Failed;
            }
        }
    }

    /// Stream of state changes, starting with the current state.
    pub fn state_changes(&self) -> WatchStream<SubscriptionState> {
        WatchStream::new(self.shared.state.subscribe())
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("state", &self.state())
            .finish()
    }
}

/// Start a subscription on the current Tokio runtime.
///
/// `url` is the full stream endpoint (credentials included); `label` is what
/// gets logged instead.
pub(crate) fn spawn(
    source: Arc<dyn EventSource>,
    url: String,
    label: String,
    receiver: Box<dyn StreamReceiver>,
    options: SubscriptionOptions,
    config: &ClientConfig,
) -> SubscriptionHandle {
    let (state, _) = watch::channel(SubscriptionState::Connecting);
    let shared = Arc::new(Shared {
        state,
        delivery: ReentrantMutex::new(()),
    });

    let driver = Driver {
        shared: shared.clone(),
        source,
        url,
        label,
        receiver,
        options,
        reconnect_delay: config.reconnect_delay(),
        max_reconnect_delay: config.max_reconnect_delay(),
        enable_logging: config.enable_logging,
        last_event_id: None,
    };
    tokio::spawn(driver.run());

    SubscriptionHandle { shared }
}

/// How a connection ended.
enum Disconnect {
    /// The subscription is closed already
    Stopped,
    /// Error event with its payload; `None` for transport errors and closes
    Error(Option<String>),
}

struct Driver {
    shared: Arc<Shared>,
    source: Arc<dyn EventSource>,
    url: String,
    label: String,
    receiver: Box<dyn StreamReceiver>,
    options: SubscriptionOptions,
    reconnect_delay: Duration,
    max_reconnect_delay: Duration,
    enable_logging: bool,
    last_event_id: Option<String>,
}

impl Driver {
    async fn run(mut self) {
        let mut closed_rx = self.shared.state.subscribe();
        let mut failed_attempts = 0u32;

        loop {
            let connected = tokio::select! {
                biased;
                _ = wait_closed(&mut closed_rx) => return,
                result = self.source.connect(&self.url, self.last_event_id.as_deref()) => result,
            };

            let stream = match connected {
                Ok(stream) => stream,
                Err(e) if e.is_transport() && self.options.reconnect => {
                    let delay = exponential_backoff(
                        failed_attempts,
                        self.reconnect_delay,
                        self.max_reconnect_delay,
                    );
                    failed_attempts += 1;
                    if self.enable_logging {
                        tracing::warn!(
                            "Stream {} unreachable (attempt {}), retrying after {:?}: {}",
                            self.label,
                            failed_attempts,
                            delay,
                            e
                        );
                    }
                    if !sleep_unless_closed(delay, &mut closed_rx).await {
                        return;
                    }
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Stream {} could not be opened: {}", self.label, e);
                    self.shared
                        .transition(SubscriptionState::Closed(CloseReason::Failed));
                    return;
                }
            };

            failed_attempts = 0;
            if !self.shared.transition(SubscriptionState::Open) {
                return;
            }

            let payload = match self.pump(stream, &mut closed_rx).await {
                Disconnect::Stopped => return,
                Disconnect::Error(payload) => payload,
            };

            if payload.as_deref() == Some(events::EOF) {
                tracing::debug!("Stream {} reached end of stream", self.label);
                self.shared
                    .transition(SubscriptionState::Closed(CloseReason::EndOfStream));
                return;
            }

            if !self.options.reconnect {
                tracing::debug!("Stream {} dropped: {:?}", self.label, payload);
                self.shared
                    .transition(SubscriptionState::Closed(CloseReason::Failed));
                return;
            }

            if !self.shared.transition(SubscriptionState::Reconnecting) {
                return;
            }
            if self.enable_logging {
                tracing::warn!(
                    "Stream {} dropped ({:?}), reconnecting after {:?}",
                    self.label,
                    payload,
                    self.reconnect_delay
                );
            }
            if !sleep_unless_closed(self.reconnect_delay, &mut closed_rx).await {
                return;
            }
            if !self.shared.transition(SubscriptionState::Connecting) {
                return;
            }
        }
    }

    /// Deliver events from one connection until it ends.
    async fn pump(
        &mut self,
        mut stream: EventStream,
        closed_rx: &mut watch::Receiver<SubscriptionState>,
    ) -> Disconnect {
        loop {
            let next = tokio::select! {
                biased;
                _ = wait_closed(closed_rx) => return Disconnect::Stopped,
                next = stream.next() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    tracing::debug!("Stream {} errored: {}", self.label, e);
                    return Disconnect::Error(None);
                }
                None => return Disconnect::Error(None),
            };

            if event.id.is_some() {
                self.last_event_id = event.id.clone();
            }
            if let Some(retry) = event.retry {
                self.reconnect_delay = retry;
            }

            if event.is_error() {
                return Disconnect::Error(Some(event.data));
            }
            if !event.is_message() {
                tracing::debug!("Stream {} ignoring {:?} event", self.label, event.event);
                continue;
            }
            if !self.deliver(&event.data) {
                return Disconnect::Stopped;
            }
        }
    }

    /// Hand one message to the receiver unless the handle was closed.
    ///
    /// Returns `false` once the subscription is closed, including when the
    /// receiver panicked.
    fn deliver(&mut self, data: &str) -> bool {
        let _guard = self.shared.delivery.lock();
        if self.shared.current().is_closed() {
            return false;
        }

        let receiver = &mut self.receiver;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            match serde_json::from_str::<Value>(data) {
                Ok(value) => receiver.on_message(value),
                Err(e) => receiver.on_decode_error(e.into()),
            }
        }));
        if outcome.is_err() {
            tracing::warn!("Receiver of stream {} panicked, closing", self.label);
            self.shared
                .transition(SubscriptionState::Closed(CloseReason::Failed));
            return false;
        }
        !self.shared.current().is_closed()
    }
}

async fn wait_closed(rx: &mut watch::Receiver<SubscriptionState>) {
    let _ = rx.wait_for(SubscriptionState::is_closed).await;
}

/// Sleep for `delay`; `false` if the subscription was closed meanwhile.
async fn sleep_unless_closed(
    delay: Duration,
    closed_rx: &mut watch::Receiver<SubscriptionState>,
) -> bool {
    tokio::select! {
        biased;
        _ = wait_closed(closed_rx) => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
