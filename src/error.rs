//! Error types for endpoint parsing and HTTP calls.
//!
//! Parser failures are raised synchronously before any transport call. Every
//! other variant is produced by a [`Transport`](crate::Transport) and reaches
//! the caller exactly as the transport returned it.

use http::{HeaderMap, StatusCode};

/// The main error type of this crate.
///
/// # Examples
///
/// ```
/// use endpointer::{parse_endpoint, EndpointRequest, Error};
///
/// let err = parse_endpoint("/users", &EndpointRequest::new()).unwrap_err();
/// assert!(matches!(err, Error::MalformedRoute { .. }));
/// assert!(!err.is_transport());
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The route template has no `<METHOD> ` prefix.
    #[error("Malformed route {route:?}: expected \"<METHOD> <path>\"")]
    MalformedRoute {
        /// The route as given by the caller
        route: String,
    },

    /// A path placeholder had no value in the parameter bag.
    ///
    /// Only returned by [`parse_endpoint_strict`](crate::parse_endpoint_strict);
    /// the permissive parser renders such placeholders as `undefined`.
    #[error("Missing value for path parameter {name:?} in route {route:?}")]
    MissingParameter {
        /// The placeholder name
        name: String,
        /// The route template
        route: String,
    },

    /// A reserved parameter bag key holds a value of the wrong shape.
    #[error("Invalid parameter {key:?}: {reason}")]
    InvalidParameter {
        /// The offending key
        key: String,
        /// What was expected
        reason: String,
    },

    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The server returned a non-2xx HTTP status code.
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// Failure reported by a custom [`Transport`](crate::Transport) implementation.
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Failed to deserialize the response payload into the expected type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Invalid configuration was provided, such as an invalid header value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if this error was surfaced by the transport.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout | Error::HttpError { .. } | Error::Transport(_)
        )
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Wraps an arbitrary error from a custom transport.
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Transport(err.into())
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
