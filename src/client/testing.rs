//! Scripted transports for unit tests.

use crate::client::event_source::{EventSource, EventStream};
use crate::client::parser::ServerEvent;
use crate::client::transport::{HttpExchange, HttpReply, HttpTransport};
use crate::error::{DroneError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Poll `condition` until it holds, failing the test after five seconds.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// One scripted connection attempt.
pub(crate) enum Connection {
    /// Yields the events, then the server closes the connection
    Events(Vec<ServerEvent>),
    /// Yields whatever the test sends, until the sender is dropped
    Live(mpsc::Receiver<Result<ServerEvent>>),
    /// The attempt fails
    Refused(DroneError),
}

impl Connection {
    pub(crate) fn events(events: Vec<ServerEvent>) -> Self {
        Connection::Events(events)
    }

    pub(crate) fn live() -> (mpsc::Sender<Result<ServerEvent>>, Self) {
        let (tx, rx) = mpsc::channel(16);
        (tx, Connection::Live(rx))
    }

    pub(crate) fn refused(error: DroneError) -> Self {
        Connection::Refused(error)
    }
}

/// An [`EventSource`] that plays back scripted connections in order.
///
/// Once the script is exhausted, further connections stay open and silent.
pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<Connection>>,
    urls: Mutex<Vec<String>>,
    last_event_ids: Mutex<Vec<Option<String>>>,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Connection>) -> Self {
        ScriptedSource {
            script: Mutex::new(script.into()),
            urls: Mutex::new(Vec::new()),
            last_event_ids: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn connects(&self) -> usize {
        self.urls.lock().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    pub(crate) fn last_event_ids(&self) -> Vec<Option<String>> {
        self.last_event_ids.lock().clone()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn connect(&self, url: &str, last_event_id: Option<&str>) -> Result<EventStream> {
        self.urls.lock().push(url.to_string());
        self.last_event_ids
            .lock()
            .push(last_event_id.map(str::to_string));

        let next = self.script.lock().pop_front();
        match next {
            Some(Connection::Events(events)) => Ok(stream::iter(events.into_iter().map(Ok)).boxed()),
            Some(Connection::Live(rx)) => Ok(ReceiverStream::new(rx).boxed()),
            Some(Connection::Refused(e)) => Err(e),
            None => Ok(stream::pending().boxed()),
        }
    }
}

/// An [`HttpTransport`] that records exchanges and answers from a queue.
pub(crate) struct RecordingTransport {
    replies: Mutex<VecDeque<Result<HttpReply>>>,
    exchanges: Mutex<Vec<HttpExchange>>,
}

impl RecordingTransport {
    pub(crate) fn new(replies: Vec<Result<HttpReply>>) -> Self {
        RecordingTransport {
            replies: Mutex::new(replies.into()),
            exchanges: Mutex::new(Vec::new()),
        }
    }

    /// A transport answering every request with `200 OK` and an empty body.
    pub(crate) fn ok() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn exchanges(&self) -> Vec<HttpExchange> {
        self.exchanges.lock().clone()
    }

    pub(crate) fn last(&self) -> HttpExchange {
        self.exchanges
            .lock()
            .last()
            .cloned()
            .expect("no exchange recorded")
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, exchange: HttpExchange) -> Result<HttpReply> {
        self.exchanges.lock().push(exchange);
        let reply = self.replies.lock().pop_front();
        reply.unwrap_or_else(|| Ok(HttpReply::new(200, "")))
    }
}
