//! The transport capability the client delegates to, and its `reqwest` implementation.

use crate::{Error, RequestConfig, Response, Result};
use http::{HeaderName, HeaderValue, Method};
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Instant;
use url::Url;

/// Something that can perform an HTTP request described by a [`RequestConfig`].
///
/// Only [`request`](Transport::request) is required. The per-verb methods
/// fill in `method`, `url` and (for body-bearing verbs) `data`, then call
/// `request`; implementations may override them.
///
/// Whatever error a transport returns is handed to the caller unchanged.
pub trait Transport: Send + Sync {
    /// Performs a request.
    fn request(
        &self,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response<Value>>> + Send;

    /// Performs a `GET` request.
    fn get(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response<Value>>> + Send {
        self.request(config.with_method(Method::GET).with_url(url))
    }

    /// Performs a `HEAD` request.
    fn head(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response<Value>>> + Send {
        self.request(config.with_method(Method::HEAD).with_url(url))
    }

    /// Performs a `DELETE` request.
    fn delete(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response<Value>>> + Send {
        self.request(config.with_method(Method::DELETE).with_url(url))
    }

    /// Performs a `POST` request. A `None` body keeps `config.data`.
    fn post(
        &self,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response<Value>>> + Send {
        self.request(with_body(config.with_method(Method::POST).with_url(url), data))
    }

    /// Performs a `PUT` request. A `None` body keeps `config.data`.
    fn put(
        &self,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response<Value>>> + Send {
        self.request(with_body(config.with_method(Method::PUT).with_url(url), data))
    }

    /// Performs a `PATCH` request. A `None` body keeps `config.data`.
    fn patch(
        &self,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response<Value>>> + Send {
        self.request(with_body(config.with_method(Method::PATCH).with_url(url), data))
    }
}

fn with_body(config: RequestConfig, data: Option<Value>) -> RequestConfig {
    match data {
        Some(data) => config.with_data(data),
        None => config,
    }
}

/// [`Transport`] backed by a [`reqwest::Client`].
///
/// - relative `url`s are appended to `base_url`; absolute ones are used as is
/// - `params` become the query string, skipping `null`s and repeating the key
///   for each array element
/// - non-2xx responses fail with [`Error::HttpError`]
/// - the body is decoded as JSON, falling back to a JSON string, and an empty
///   body becomes `null`
///
/// `extra` options are not interpreted.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self::with_client(http_client))
    }

    /// Wraps an existing `reqwest` client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    fn build_request(&self, config: &RequestConfig) -> Result<reqwest::RequestBuilder> {
        let mut url = resolve_url(
            config.base_url.as_deref(),
            config.url.as_deref().unwrap_or(""),
        )?;
        if let Some(params) = &config.params {
            append_query(&mut url, params);
        }

        let method = config.method.clone().unwrap_or(Method::GET);

        if !config.extra.is_empty() {
            tracing::trace!(
                options = ?config.extra.keys().collect::<Vec<_>>(),
                "Ignoring transport options"
            );
        }

        let mut request = self.http_client.request(method, url);

        if let Some(headers) = &config.headers {
            for (name, value) in headers {
                let name = HeaderName::try_from(name.as_str()).map_err(|e| {
                    Error::ConfigurationError(format!("Invalid header name: {}", e))
                })?;
                let value = HeaderValue::try_from(value.as_str()).map_err(|e| {
                    Error::ConfigurationError(format!("Invalid header value: {}", e))
                })?;
                request = request.header(name, value);
            }
        }

        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        if let Some(data) = &config.data {
            request = request.json(data);
        }

        Ok(request)
    }

    async fn read_response(
        &self,
        response: reqwest::Response,
        started: Instant,
    ) -> Result<Response<Value>> {
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let raw_response = response.text().await.unwrap_or_default();

            if status.is_client_error() {
                tracing::error!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Client error (4xx)"
                );
            } else if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Server error (5xx)"
                );
            }

            return Err(Error::HttpError {
                status,
                raw_response,
                headers,
            });
        }

        let raw_body = response.text().await.map_err(network_error)?;
        let latency = started.elapsed();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        let data = decode_body(&raw_body);
        Ok(Response::new(data, raw_body, status, headers, latency))
    }
}

impl Transport for ReqwestTransport {
    async fn request(&self, config: RequestConfig) -> Result<Response<Value>> {
        let request = self.build_request(&config)?;

        tracing::debug!(
            method = %config.method.as_ref().unwrap_or(&Method::GET),
            url = config.url.as_deref().unwrap_or(""),
            base_url = config.base_url.as_deref().unwrap_or(""),
            "Executing HTTP request"
        );

        let started = Instant::now();
        let response = request.send().await.map_err(network_error)?;
        self.read_response(response, started).await
    }
}

fn network_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(err)
    }
}

/// Joins `url` onto `base_url` unless `url` is already absolute.
fn resolve_url(base_url: Option<&str>, url: &str) -> Result<Url> {
    match Url::parse(url) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base_url {
            Some(base) if !url.is_empty() => Ok(Url::parse(&format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ))?),
            Some(base) => Ok(Url::parse(base)?),
            None => Err(Error::ConfigurationError(format!(
                "Relative URL {:?} requires a base URL",
                url
            ))),
        },
        Err(e) => Err(e.into()),
    }
}

fn append_query(url: &mut Url, params: &Map<String, Value>) {
    let pairs: Vec<(&str, String)> = params
        .iter()
        .flat_map(|(key, value)| match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| query_text(item).map(|text| (key.as_str(), text)))
                .collect::<Vec<_>>(),
            value => query_text(value)
                .map(|text| (key.as_str(), text))
                .into_iter()
                .collect(),
        })
        .collect();

    if pairs.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in pairs {
        query.append_pair(key, &value);
    }
}

fn query_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn decode_body(raw_body: &str) -> Value {
    if raw_body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw_body).unwrap_or_else(|_| Value::String(raw_body.to_string()))
}
