//! Header names, media types, and well-known values of the Drone API.

/// Header names (lowercase, as stored in [`HttpReply::headers`](crate::client::HttpReply)).
pub mod headers {
    /// Bearer credential header
    pub const AUTHORIZATION: &str = "authorization";
    /// Anti-forgery header, sent on mutating requests only
    pub const CSRF_TOKEN: &str = "x-csrf-token";
    /// Declared body media type
    pub const CONTENT_TYPE: &str = "content-type";
    /// Accepted response media type
    pub const ACCEPT: &str = "accept";
    /// Resume point for an event stream
    pub const LAST_EVENT_ID: &str = "last-event-id";
    /// Disables intermediary caching of event streams
    pub const CACHE_CONTROL: &str = "cache-control";
}

/// Media types.
pub mod media {
    /// JSON documents
    pub const JSON: &str = "application/json";
    /// Server-sent event streams
    pub const EVENT_STREAM: &str = "text/event-stream";
}

/// Server-sent event vocabulary.
pub mod events {
    /// Event type of ordinary pushed messages
    pub const MESSAGE: &str = "message";
    /// Event type the server uses to signal an error or the end of a stream
    pub const ERROR: &str = "error";
    /// Error payload meaning the stream ended on purpose
    pub const EOF: &str = "eof";
}

/// Query parameter carrying the token on stream URLs.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Stream path of the global activity feed.
pub const EVENTS_PATH: &str = "/stream/events";

/// Stream path prefix of build log feeds.
pub const LOGS_PATH: &str = "/stream/logs";

/// Environment keys read by [`ClientConfig::from_environ`](crate::client::ClientConfig::from_environ).
pub mod env {
    /// Base URL of the Drone server
    pub const SERVER: &str = "DRONE_SERVER";
    /// Personal API token
    pub const TOKEN: &str = "DRONE_TOKEN";
    /// CSRF token for browser sessions
    pub const CSRF: &str = "DRONE_CSRF";
}
