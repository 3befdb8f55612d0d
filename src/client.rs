//! The request facade: base-config merging, endpoint expansion and delegation.
//!
//! [`Client`] returns full [`Response`]s, [`DataClient`] only their payloads.
//! Both hold an immutable base [`RequestConfig`] and a [`Transport`]; every
//! call merges its own configuration over the base and makes exactly one
//! transport call. Use [`ClientBuilder`] to configure and create clients.

use crate::{
    endpoint::{parse_endpoint_with, MissingPlaceholders},
    EndpointRequest, Error, RequestConfig, Response, Result, ReqwestTransport, Transport,
};
use http::{HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// An HTTP client that merges a base configuration into every request.
///
/// The client is cheap to clone and can be shared across tasks; clones share
/// the transport and the base configuration.
///
/// # Examples
///
/// ```no_run
/// use endpointer::{Client, EndpointRequest, RequestConfig, Response};
/// use serde::Deserialize;
/// use std::time::Duration;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), endpointer::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .default_header("x-api-key", "secret")?
///     .timeout(Duration::from_secs(30))
///     .build()?;
///
/// // Plain verb call with a per-call override
/// let user: Response<User> = client
///     .get("/users/123", Some(RequestConfig::new().with_param("expand", "teams")))
///     .await?;
/// println!("User: {}", user.data.name);
///
/// // Endpoint shorthand
/// let updated: Response<User> = client
///     .endpoint(
///         "PATCH /users/{userId}{?userVersion}",
///         EndpointRequest::new()
///             .with_param("userId", "123")
///             .with_param("userVersion", 5)
///             .with_param("name", "Alice"),
///     )
///     .await?;
/// println!("Updated user {}", updated.data.id);
/// # Ok(())
/// # }
/// ```
pub struct Client<T = ReqwestTransport> {
    inner: Arc<ClientInner<T>>,
}

struct ClientInner<T> {
    transport: T,
    config: RequestConfig,
    missing_placeholders: MissingPlaceholders,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Client<ReqwestTransport> {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client from a transport and a base configuration.
    pub fn new(transport: T, config: RequestConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                missing_placeholders: MissingPlaceholders::default(),
            }),
        }
    }

    /// The base configuration merged into every request.
    pub fn config(&self) -> &RequestConfig {
        &self.inner.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Converts into a client that returns only response payloads.
    pub fn into_data_client(self) -> DataClient<T> {
        DataClient { core: self }
    }

    fn merge_config(&self, config: Option<RequestConfig>) -> RequestConfig {
        match config {
            Some(config) => self.inner.config.merge(&config),
            None => self.inner.config.clone(),
        }
    }

    /// Makes a `GET` request.
    pub async fn get<R>(&self, url: &str, config: Option<RequestConfig>) -> Result<Response<R>>
    where
        R: DeserializeOwned,
    {
        let config = self.merge_config(config);
        tracing::debug!(method = "GET", url, "Dispatching request");
        decode(self.inner.transport.get(url, config).await?)
    }

    /// Makes a `HEAD` request.
    pub async fn head<R>(&self, url: &str, config: Option<RequestConfig>) -> Result<Response<R>>
    where
        R: DeserializeOwned,
    {
        let config = self.merge_config(config);
        tracing::debug!(method = "HEAD", url, "Dispatching request");
        decode(self.inner.transport.head(url, config).await?)
    }

    /// Makes a `DELETE` request.
    pub async fn delete<R>(&self, url: &str, config: Option<RequestConfig>) -> Result<Response<R>>
    where
        R: DeserializeOwned,
    {
        let config = self.merge_config(config);
        tracing::debug!(method = "DELETE", url, "Dispatching request");
        decode(self.inner.transport.delete(url, config).await?)
    }

    /// Makes a `POST` request with an optional JSON body.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use endpointer::Client;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize)]
    /// struct CreateUser { name: String }
    ///
    /// #[derive(Deserialize)]
    /// struct User { id: u64 }
    ///
    /// # async fn example() -> Result<(), endpointer::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let request = CreateUser { name: "Alice".to_string() };
    /// let user: endpointer::Response<User> = client.post("/users", Some(&request), None).await?;
    /// println!("Created user ID: {}", user.data.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn post<B, R>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<RequestConfig>,
    ) -> Result<Response<R>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let data = encode(body)?;
        let config = self.merge_config(config);
        tracing::debug!(method = "POST", url, "Dispatching request");
        decode(self.inner.transport.post(url, data, config).await?)
    }

    /// Makes a `PUT` request with an optional JSON body.
    pub async fn put<B, R>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<RequestConfig>,
    ) -> Result<Response<R>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let data = encode(body)?;
        let config = self.merge_config(config);
        tracing::debug!(method = "PUT", url, "Dispatching request");
        decode(self.inner.transport.put(url, data, config).await?)
    }

    /// Makes a `PATCH` request with an optional JSON body.
    pub async fn patch<B, R>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<RequestConfig>,
    ) -> Result<Response<R>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let data = encode(body)?;
        let config = self.merge_config(config);
        tracing::debug!(method = "PATCH", url, "Dispatching request");
        decode(self.inner.transport.patch(url, data, config).await?)
    }

    /// Makes a request fully described by `config`, merged over the base.
    pub async fn request<R>(&self, config: RequestConfig) -> Result<Response<R>>
    where
        R: DeserializeOwned,
    {
        let config = self.inner.config.merge(&config);
        tracing::debug!(
            method = %config.method.as_ref().unwrap_or(&Method::GET),
            url = config.url.as_deref().unwrap_or(""),
            "Dispatching request"
        );
        decode(self.inner.transport.request(config).await?)
    }

    /// Expands a route template and performs the request.
    ///
    /// Only the descriptor's `baseURL`, `headers` and `params` are merged with
    /// the base configuration; `method`, `url` and `data` come from the
    /// template alone.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MalformedRoute`] (or [`Error::MissingParameter`]
    /// on a strict client) before any transport call.
    pub async fn endpoint<R>(&self, route: &str, request: EndpointRequest) -> Result<Response<R>>
    where
        R: DeserializeOwned,
    {
        let config = self.expand(route, &request)?;
        tracing::debug!(route, "Dispatching endpoint request");
        decode(self.inner.transport.request(config).await?)
    }

    fn expand(&self, route: &str, request: &EndpointRequest) -> Result<RequestConfig> {
        let RequestConfig {
            method,
            url,
            base_url,
            headers,
            params,
            data,
            ..
        } = parse_endpoint_with(route, request, self.inner.missing_placeholders)?;

        let overrides = RequestConfig {
            base_url,
            headers,
            params,
            ..RequestConfig::default()
        };
        let mut config = self.inner.config.merge(&overrides);
        config.method = method;
        config.url = url;
        config.data = data;
        Ok(config)
    }
}

/// A client that returns only response payloads, discarding status, headers
/// and timing.
///
/// # Examples
///
/// ```no_run
/// use endpointer::{Client, EndpointRequest};
/// use serde_json::Value;
///
/// # async fn example() -> Result<(), endpointer::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?
///     .into_data_client();
///
/// let users: Value = client
///     .endpoint("GET /users", EndpointRequest::new().with_param("pageSize", 10))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct DataClient<T = ReqwestTransport> {
    core: Client<T>,
}

impl<T> Clone for DataClient<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> From<Client<T>> for DataClient<T> {
    fn from(core: Client<T>) -> Self {
        Self { core }
    }
}

impl<T: Transport> DataClient<T> {
    /// The client this one unwraps.
    pub fn core(&self) -> &Client<T> {
        &self.core
    }

    /// Makes a `GET` request and returns the payload.
    pub async fn get<R>(&self, url: &str, config: Option<RequestConfig>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        Ok(self.core.get::<R>(url, config).await?.into_data())
    }

    /// Makes a `HEAD` request and returns the payload.
    pub async fn head<R>(&self, url: &str, config: Option<RequestConfig>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        Ok(self.core.head::<R>(url, config).await?.into_data())
    }

    /// Makes a `DELETE` request and returns the payload.
    pub async fn delete<R>(&self, url: &str, config: Option<RequestConfig>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        Ok(self.core.delete::<R>(url, config).await?.into_data())
    }

    /// Makes a `POST` request and returns the payload.
    pub async fn post<B, R>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<RequestConfig>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        Ok(self.core.post::<B, R>(url, body, config).await?.into_data())
    }

    /// Makes a `PUT` request and returns the payload.
    pub async fn put<B, R>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<RequestConfig>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        Ok(self.core.put::<B, R>(url, body, config).await?.into_data())
    }

    /// Makes a `PATCH` request and returns the payload.
    pub async fn patch<B, R>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<RequestConfig>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        Ok(self.core.patch::<B, R>(url, body, config).await?.into_data())
    }

    /// Makes a request described by `config` and returns the payload.
    pub async fn request<R: DeserializeOwned>(&self, config: RequestConfig) -> Result<R> {
        Ok(self.core.request::<R>(config).await?.into_data())
    }

    /// Expands a route template, performs the request and returns the payload.
    pub async fn endpoint<R>(&self, route: &str, request: EndpointRequest) -> Result<R>
    where
        R: DeserializeOwned,
    {
        Ok(self.core.endpoint::<R>(route, request).await?.into_data())
    }
}

fn encode<B: Serialize + ?Sized>(body: Option<&B>) -> Result<Option<Value>> {
    body.map(serde_json::to_value)
        .transpose()
        .map_err(|e| Error::SerializationFailed(e.to_string()))
}

fn decode<R: DeserializeOwned>(response: Response<Value>) -> Result<Response<R>> {
    let Response {
        data,
        raw_body,
        status,
        headers,
        latency,
    } = response;

    match serde_json::from_value::<R>(data) {
        Ok(data) => Ok(Response::new(data, raw_body, status, headers, latency)),
        Err(e) => {
            tracing::error!(
                error = %e,
                raw_response = %raw_body,
                "Failed to deserialize response"
            );

            Err(Error::DeserializationFailed {
                raw_response: raw_body,
                serde_error: e.to_string(),
                status,
            })
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Everything set here ends up in the client's base [`RequestConfig`].
///
/// # Examples
///
/// ```no_run
/// use endpointer::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), endpointer::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .map_config(|config| config.with_extra("maxRedirects", 3))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: RequestConfig,
    missing_placeholders: MissingPlaceholders,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with an empty base configuration.
    pub fn new() -> Self {
        Self {
            config: RequestConfig::default(),
            missing_placeholders: MissingPlaceholders::default(),
            http_client: None,
        }
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        self.config.base_url = Some(url.into());
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        let value = value
            .to_str()
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?
            .to_string();
        self.config = self.config.with_header(name.as_str(), value);
        Ok(self)
    }

    /// Adds a default query parameter.
    pub fn default_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config = self.config.with_param(key, value);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Merges a whole configuration over what has been set so far.
    pub fn config(mut self, config: RequestConfig) -> Self {
        self.config = self.config.merge(&config);
        self
    }

    /// Transforms the base configuration built so far.
    pub fn map_config(mut self, f: impl FnOnce(RequestConfig) -> RequestConfig) -> Self {
        self.config = f(self.config);
        self
    }

    /// Makes [`Client::endpoint`] fail on path placeholders without a value
    /// instead of rendering them as `undefined`.
    pub fn strict_placeholders(mut self, strict: bool) -> Self {
        self.missing_placeholders = if strict {
            MissingPlaceholders::Reject
        } else {
            MissingPlaceholders::Render
        };
        self
    }

    /// Uses a preconfigured `reqwest` client for the default transport.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Builds a client over [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn build(mut self) -> Result<Client> {
        let transport = match self.http_client.take() {
            Some(http_client) => ReqwestTransport::with_client(http_client),
            None => ReqwestTransport::new()?,
        };
        Ok(self.build_with_transport(transport))
    }

    /// Builds a client over a custom transport.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Client<T> {
        Client {
            inner: Arc::new(ClientInner {
                transport,
                config: self.config,
                missing_placeholders: self.missing_placeholders,
            }),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
