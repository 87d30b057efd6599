//! Wire-level constants and header helpers shared by the request executor
//! and the stream subscriber.

pub mod constants;
mod headers;

pub use headers::{
    format_bearer, is_event_stream_media_type, is_json_media_type, looks_like_json, media_type,
};
