//! Push-stream primitive.
//!
//! An [`EventSource`] opens one server-sent event connection and yields the
//! parsed events until the connection ends. Reconnect policy lives in the
//! subscription driver, not here: a stream simply ends, or yields an `Err`,
//! when its connection drops.

use crate::client::parser::{EventParser, ServerEvent};
use crate::client::transport::ReqwestTransport;
use crate::client::utils::is_failure_status;
use crate::error::{DroneError, RequestFailure, Result};
use crate::protocol::constants::{headers, media};
use crate::protocol::is_event_stream_media_type;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;

/// Events of one open connection. `None` means the server closed it.
pub type EventStream = BoxStream<'static, Result<ServerEvent>>;

/// Opens server-sent event connections.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open a connection to `url`.
    ///
    /// `last_event_id` is the id of the last event seen on a previous
    /// connection of the same subscription.
    ///
    /// Returns [`DroneError::Transport`] when no connection could be made,
    /// and [`DroneError::Request`] or [`DroneError::Stream`] when the server
    /// answered but refused to stream.
    async fn connect(&self, url: &str, last_event_id: Option<&str>) -> Result<EventStream>;
}

#[async_trait]
impl EventSource for ReqwestTransport {
    async fn connect(&self, url: &str, last_event_id: Option<&str>) -> Result<EventStream> {
        let mut req_builder = self
            .client
            .get(url)
            .header(headers::ACCEPT, media::EVENT_STREAM)
            .header(headers::CACHE_CONTROL, "no-cache");

        if let Some(id) = last_event_id {
            req_builder = req_builder.header(headers::LAST_EVENT_ID, id);
        }

        // The url carries the access token and must stay out of error text.
        let response = req_builder
            .send()
            .await
            .map_err(|e| DroneError::Transport(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        if is_failure_status(status) || status == 204 {
            let message = response.text().await.unwrap_or_default();
            return Err(RequestFailure::new(status, message).into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_event_stream_media_type(&content_type) {
            return Err(DroneError::Stream(format!(
                "unexpected content type {:?}",
                content_type
            )));
        }

        Ok(parse_event_stream(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(reqwest::Error::without_url)),
        ))
    }
}

/// Turn a raw body stream into parsed events.
///
/// The returned stream ends after the first error.
pub fn parse_event_stream<S, B, E>(body: S) -> EventStream
where
    S: futures::Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    struct State<S> {
        body: Pin<Box<S>>,
        parser: EventParser,
        ready: VecDeque<ServerEvent>,
        failed: bool,
    }

    let state = State {
        body: Box::pin(body),
        parser: EventParser::new(),
        ready: VecDeque::new(),
        failed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.failed {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.parser.feed(chunk.as_ref());
                    state.ready.extend(events);
                }
                Some(Err(e)) => {
                    state.failed = true;
                    return Some((Err(DroneError::Transport(e.to_string())), state));
                }
                None => return None,
            }
        }
    })
    .boxed()
}
