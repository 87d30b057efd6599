//! Header formatting and media-type checks for the Drone API.
//!
//! # Header Formats
//!
//! | Header | Format | Example |
//! |--------|--------|---------|
//! | Authorization | `Bearer {token}` | `Bearer 3da541559918a808c2402bba5012f6c60b27661c` |
//! | X-CSRF-TOKEN | opaque | `MTU5MDI3...` |
//! | Content-Type | media type with optional parameters | `application/json; charset=utf-8` |
//!
//! # Examples
//!
//! ```
//! use drone_client::protocol::{format_bearer, is_json_media_type, media_type};
//!
//! assert_eq!(format_bearer("password"), "Bearer password");
//! assert_eq!(media_type("application/json; charset=utf-8"), "application/json");
//! assert!(is_json_media_type("application/json"));
//! ```

/// Format an `Authorization` header value for a bearer token.
///
/// # Examples
///
/// ```
/// use drone_client::protocol::format_bearer;
///
/// assert_eq!(format_bearer("password"), "Bearer password");
/// ```
#[inline]
pub fn format_bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Extract the bare media type from a Content-Type value.
///
/// Parameters after `;` are dropped and the result is trimmed and lowercased.
///
/// # Examples
///
/// ```
/// use drone_client::protocol::media_type;
///
/// assert_eq!(media_type("Application/JSON ; charset=UTF-8"), "application/json");
/// assert_eq!(media_type("text/plain"), "text/plain");
/// assert_eq!(media_type(""), "");
/// ```
pub fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Check whether a Content-Type value declares a JSON document.
///
/// Accepts `application/json` and structured `+json` suffixes such as
/// `application/vnd.drone+json`.
///
/// # Examples
///
/// ```
/// use drone_client::protocol::is_json_media_type;
///
/// assert!(is_json_media_type("application/json"));
/// assert!(is_json_media_type("application/json; charset=utf-8"));
/// assert!(is_json_media_type("application/problem+json"));
/// assert!(!is_json_media_type("text/plain"));
/// ```
pub fn is_json_media_type(value: &str) -> bool {
    let media = media_type(value);
    media == super::constants::media::JSON || media.ends_with("+json")
}

/// Check whether a Content-Type value declares a server-sent event stream.
///
/// # Examples
///
/// ```
/// use drone_client::protocol::is_event_stream_media_type;
///
/// assert!(is_event_stream_media_type("text/event-stream"));
/// assert!(is_event_stream_media_type("text/event-stream; charset=utf-8"));
/// assert!(!is_event_stream_media_type("application/json"));
/// ```
pub fn is_event_stream_media_type(value: &str) -> bool {
    media_type(value) == super::constants::media::EVENT_STREAM
}

/// Check whether an undeclared body looks like a JSON document.
///
/// Only used when the response carries no Content-Type at all.
///
/// # Examples
///
/// ```
/// use drone_client::protocol::looks_like_json;
///
/// assert!(looks_like_json(r#"{"login":"octocat"}"#));
/// assert!(looks_like_json("  [1, 2]"));
/// assert!(!looks_like_json("abc"));
/// ```
pub fn looks_like_json(body: &str) -> bool {
    matches!(body.trim_start().as_bytes().first(), Some(b'{') | Some(b'['))
}
