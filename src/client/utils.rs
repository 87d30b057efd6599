//! Utility functions for the Drone client.
//!
//! This module provides helper functions for:
//! - Query string encoding (sorted, percent-encoded)
//! - Status code classification
//! - Stream URL composition
//! - Reconnect backoff

use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;

/// Ordered query parameters for list and restart endpoints.
///
/// # Examples
///
/// ```
/// use drone_client::client::QueryOptions;
///
/// let opts = QueryOptions::new().with("flush", true).with("all", true);
/// assert_eq!(opts.encode(), "all=true&flush=true");
/// assert_eq!(QueryOptions::new().encode(), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    params: BTreeMap<String, String>,
}

impl QueryOptions {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Whether no parameters are set
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Encode into a query string without the leading `?`.
    pub fn encode(&self) -> String {
        encode_query_string(&self.params)
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for QueryOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(QueryOptions::new(), |opts, (k, v)| opts.with(k, v))
    }
}

/// Encode parameters into a `key=value&...` query string, sorted by key.
///
/// Keys and values are percent-encoded. An empty set encodes to `""`.
///
/// # Examples
///
/// ```
/// use drone_client::client::encode_query_string;
///
/// assert_eq!(encode_query_string([("b", "b"), ("a", "a")]), "a=a&b=b");
/// assert_eq!(encode_query_string([("q", "a b&c")]), "q=a%20b%26c");
/// assert_eq!(encode_query_string(Vec::<(&str, &str)>::new()), "");
/// ```
pub fn encode_query_string<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(K, V)> = params.into_iter().collect();
    pairs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));
    pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k.as_ref()),
                urlencoding::encode(v.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Join a path and an encoded query, omitting `?` when the query is empty.
pub fn with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

/// Append one encoded parameter to a URL that may already carry a query.
///
/// ```
/// use drone_client::client::append_query_param;
///
/// assert_eq!(append_query_param("/stream/events", "access_token", "t"), "/stream/events?access_token=t");
/// assert_eq!(append_query_param("/x?a=1", "access_token", "t"), "/x?a=1&access_token=t");
/// ```
pub fn append_query_param(url: &str, key: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}={}",
        url,
        separator,
        urlencoding::encode(key),
        urlencoding::encode(value)
    )
}

/// Check if status code is classified as a request failure
///
/// Redirects count as failures alongside client and server errors.
pub fn is_failure_status(status: u16) -> bool {
    status >= 300
}

/// Exponential backoff delay calculation, capped at `max`
pub fn exponential_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2_u32.pow(attempt.min(10));
    base.saturating_mul(factor).min(max)
}
