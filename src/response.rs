//! Response wrapper that preserves both the payload and raw response details.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successful HTTP response.
///
/// [`Transport`](crate::Transport)s produce `Response<serde_json::Value>`; the
/// [`Client`](crate::Client) converts the payload into the caller's type and
/// keeps everything else.
///
/// # Examples
///
/// ```
/// # use endpointer::Response;
/// # use http::{HeaderMap, StatusCode};
/// # use std::time::Duration;
/// let response = Response::new(
///     42,
///     "42".to_string(),
///     StatusCode::OK,
///     HeaderMap::new(),
///     Duration::from_millis(100),
/// );
///
/// let string_response = response.map(|n| n.to_string());
/// assert_eq!(string_response.data, "42");
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The response payload.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from sending the request until the body was read.
    pub latency: Duration,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
        }
    }

    /// Maps the payload to a different type, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
        }
    }

    /// Discards the metadata and returns the payload.
    pub fn into_data(self) -> T {
        self.data
    }

    /// Returns a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use endpointer::Response;
    /// # use http::{HeaderMap, StatusCode, HeaderValue};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// let response = Response::new((), String::new(), StatusCode::OK, headers, Duration::ZERO);
    ///
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
