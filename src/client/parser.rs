//! Incremental parser for `text/event-stream` bodies.
//!
//! Bytes arrive in arbitrary chunks; the parser buffers partial lines and
//! emits a [`ServerEvent`] each time a blank line completes an event.
//!
//! # Parsing Flow
//!
//! 1. **StreamStart**: Drop a leading UTF-8 byte order mark, if any
//! 2. **WaitingForLine**: Accumulate bytes until LF, CRLF or CR ends a line
//! 3. **PendingEvent**: Field lines (`event`, `data`, `id`, `retry`) were seen
//!    and wait for the blank line that dispatches them
//!
//! Comment lines start with `:`. A single space after the field colon is
//! stripped. Events without any `data` line are never dispatched.
//!
//! # Examples
//!
//! ```
//! use drone_client::client::EventParser;
//!
//! let mut parser = EventParser::new();
//! assert!(parser.feed(b"data: {\"login\":").is_empty());
//!
//! let events = parser.feed(b"\"octocat\"}\n\n");
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].event, "message");
//! assert_eq!(events[0].data, r#"{"login":"octocat"}"#);
//! ```

use crate::protocol::constants::events;
use bytes::BytesMut;
use std::time::Duration;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse state for the event stream parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Nothing consumed yet; a byte order mark may follow
    StreamStart,
    /// Between events, waiting for the next line
    WaitingForLine,
    /// Fields buffered, waiting for the dispatching blank line
    PendingEvent,
}

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    /// Event type, `message` unless the server named it
    pub event: String,
    /// Data lines joined with `\n`
    pub data: String,
    /// Last event id seen on the stream at dispatch time
    pub id: Option<String>,
    /// Reconnection time most recently requested by the server
    pub retry: Option<Duration>,
}

impl ServerEvent {
    /// Create an unnamed (`message`) event.
    pub fn message(data: impl Into<String>) -> Self {
        ServerEvent {
            event: events::MESSAGE.to_string(),
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    /// Create a named event.
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        ServerEvent {
            event: event.into(),
            ..Self::message(data)
        }
    }

    /// Whether this is an ordinary pushed message.
    pub fn is_message(&self) -> bool {
        self.event == events::MESSAGE
    }

    /// Whether the server signalled an error on the stream.
    pub fn is_error(&self) -> bool {
        self.event == events::ERROR
    }
}

/// Incremental `text/event-stream` parser.
#[derive(Debug)]
pub struct EventParser {
    /// Bytes not yet terminated by a line ending
    buffer: BytesMut,
    /// Whether a leading BOM may still be pending
    at_stream_start: bool,
    /// Event type of the event being assembled
    event_type: String,
    /// Data of the event being assembled, one `\n` after each line
    data: String,
    /// Whether any field line was seen since the last dispatch
    pending: bool,
    /// Id buffer, committed on dispatch
    id_buffer: Option<String>,
    /// Committed last event id
    last_event_id: Option<String>,
    /// Server-requested reconnection time
    retry: Option<Duration>,
}

impl EventParser {
    /// Create a new parser
    pub fn new() -> Self {
        EventParser {
            buffer: BytesMut::with_capacity(8192),
            at_stream_start: true,
            event_type: String::new(),
            data: String::new(),
            pending: false,
            id_buffer: None,
            last_event_id: None,
            retry: None,
        }
    }

    /// Feed bytes to the parser, returning every event they complete.
    pub fn feed(&mut self, data: &[u8]) -> Vec<ServerEvent> {
        self.buffer.extend_from_slice(data);

        if self.at_stream_start {
            if self.buffer.len() < BOM.len() && BOM.starts_with(&self.buffer) {
                return Vec::new();
            }
            if self.buffer.starts_with(BOM) {
                let _ = self.buffer.split_to(BOM.len());
            }
            self.at_stream_start = false;
        }

        let mut events = Vec::new();
        while let Some(line) = self.next_line() {
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Split the next complete line off the buffer.
    ///
    /// A trailing CR is held back until the following byte shows whether it
    /// starts a CRLF pair. Invalid UTF-8 is replaced with U+FFFD.
    fn next_line(&mut self) -> Option<String> {
        let pos = self
            .buffer
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r')?;

        let terminator_len = if self.buffer[pos] == b'\r' {
            match self.buffer.get(pos + 1) {
                Some(b'\n') => 2,
                Some(_) => 1,
                None => return None,
            }
        } else {
            1
        };

        let line = self.buffer.split_to(pos);
        let _ = self.buffer.split_to(terminator_len);
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn process_line(&mut self, line: &str) -> Option<ServerEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(colon) => {
                let value = &line[colon + 1..];
                (&line[..colon], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => {
                self.event_type = value.to_string();
                self.pending = true;
            }
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
                self.pending = true;
            }
            "id" => {
                if !value.contains('\0') {
                    self.id_buffer = Some(value.to_string());
                    self.pending = true;
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.retry = Some(Duration::from_millis(ms));
                    }
                }
            }
            _ => {}
        }

        None
    }

    /// Finalize the buffered event, if it carries data.
    fn dispatch(&mut self) -> Option<ServerEvent> {
        if let Some(id) = self.id_buffer.take() {
            self.last_event_id = if id.is_empty() { None } else { Some(id) };
        }
        self.pending = false;

        let event_type = std::mem::take(&mut self.event_type);
        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        data.pop();

        Some(ServerEvent {
            event: if event_type.is_empty() {
                events::MESSAGE.to_string()
            } else {
                event_type
            },
            data,
            id: self.last_event_id.clone(),
            retry: self.retry,
        })
    }

    /// Get current parse state
    pub fn state(&self) -> ParseState {
        if self.at_stream_start {
            ParseState::StreamStart
        } else if self.pending {
            ParseState::PendingEvent
        } else {
            ParseState::WaitingForLine
        }
    }

    /// The last event id committed by a dispatch.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// The reconnection time most recently requested by the server.
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}
