//! # Endpointer - config-merging HTTP client with endpoint shorthand
//!
//! Endpointer is a thin layer over an HTTP [`Transport`] (by default
//! [`reqwest`]). A [`Client`] holds a base [`RequestConfig`] that is deep-merged
//! into every call, and can describe a whole call as a route template plus a
//! flat parameter bag.
//!
//! ## Quick Start
//!
//! ```no_run
//! use endpointer::{Client, EndpointRequest, RequestConfig};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), endpointer::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .default_header("x-api-key", "secret")?
//!         .build()?;
//!
//!     // Verb call: headers from the call are merged with the default ones
//!     let user = client
//!         .get::<User>("/users/123", Some(RequestConfig::new().with_header("x-request-id", "1")))
//!         .await?;
//!     println!("User: {} ({:?})", user.data.name, user.latency);
//!
//!     // Endpoint shorthand: `userId` fills the path, `userVersion` the query
//!     // string and the remaining fields become the JSON body.
//!     let updated = client
//!         .endpoint::<User>(
//!             "PATCH /users/{userId}{?userVersion}",
//!             EndpointRequest::new()
//!                 .with_param("userId", "123")
//!                 .with_param("userVersion", 5)
//!                 .with_param("name", "Alice"),
//!         )
//!         .await?;
//!     println!("Updated user {}", updated.data.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Route templates
//!
//! `"<METHOD> <path>"`, where the path may contain `{name}` placeholders
//! (percent-encoded into the URL) and a single `{?a,b}` query group. Fields
//! not consumed by a placeholder become query parameters for `GET` and
//! `HEAD`, and the request body for every other method, unless a `data`
//! field is left over, in which case it alone is the body. See
//! [`parse_endpoint`].
//!
//! ## Errors
//!
//! Malformed routes fail before anything is sent. Transport failures
//! ([`Error::Network`], [`Error::Timeout`], [`Error::HttpError`], ...) are
//! returned exactly as the transport produced them: this crate never retries.

mod client;
pub mod config;
pub mod endpoint;
mod error;
mod params;
mod response;
mod transport;

pub use client::{Client, ClientBuilder, DataClient};
pub use config::RequestConfig;
pub use endpoint::{parse_endpoint, parse_endpoint_strict};
pub use error::{Error, Result};
pub use params::{EndpointRequest, ReservedKey};
pub use response::Response;
pub use transport::{ReqwestTransport, Transport};
