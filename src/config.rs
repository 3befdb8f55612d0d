//! Request configuration and the structural merge applied per call.
//!
//! [`RequestConfig`] is both the base configuration a [`Client`](crate::Client)
//! is built with and the request descriptor handed to a
//! [`Transport`](crate::Transport). It serializes with axios-style keys
//! (`baseURL`, `params`, `timeout` in milliseconds) and never emits a key for
//! an unset field.

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration for a single HTTP request, or the defaults shared by all of them.
///
/// # Examples
///
/// ```
/// use endpointer::RequestConfig;
///
/// let base = RequestConfig::new()
///     .with_base_url("https://api.example.com")
///     .with_header("x-api-key", "secret");
/// let call = RequestConfig::new().with_header("x-request-id", "42");
///
/// let merged = base.merge(&call);
/// assert_eq!(merged.base_url.as_deref(), Some("https://api.example.com"));
/// assert_eq!(merged.headers.as_ref().map(|h| h.len()), Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    /// The HTTP method. Transports default to `GET` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "method_serde")]
    pub method: Option<Method>,

    /// The request URL, absolute or relative to `base_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Prefix for relative URLs.
    #[serde(
        default,
        rename = "baseURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_url: Option<String>,

    /// Request headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    /// Query string parameters. `null` values are not sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,

    /// The request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Per-request timeout.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timeout_millis")]
    pub timeout: Option<Duration>,

    /// Transport-specific options (e.g. `maxRedirects`), merged but not interpreted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the request URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Adds a query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Sets the request body.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds an opaque transport option.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Recursively merges `overrides` on top of `self`.
    ///
    /// Scalars set in `overrides` replace the base value, maps are merged key
    /// by key, and arrays are concatenated (base first). `self` is left
    /// untouched.
    pub fn merge(&self, overrides: &RequestConfig) -> RequestConfig {
        RequestConfig {
            method: overrides.method.clone().or_else(|| self.method.clone()),
            url: overrides.url.clone().or_else(|| self.url.clone()),
            base_url: overrides
                .base_url
                .clone()
                .or_else(|| self.base_url.clone()),
            headers: merge_option(&self.headers, &overrides.headers, |base, over| {
                let mut merged = base.clone();
                merged.extend(over.iter().map(|(k, v)| (k.clone(), v.clone())));
                merged
            }),
            params: merge_option(&self.params, &overrides.params, merge_objects),
            data: merge_option(&self.data, &overrides.data, merge_values),
            timeout: overrides.timeout.or(self.timeout),
            extra: merge_objects(&self.extra, &overrides.extra),
        }
    }
}

fn merge_option<T: Clone>(
    base: &Option<T>,
    overrides: &Option<T>,
    merge: impl FnOnce(&T, &T) -> T,
) -> Option<T> {
    match (base, overrides) {
        (Some(base), Some(overrides)) => Some(merge(base, overrides)),
        (None, Some(value)) | (Some(value), None) => Some(value.clone()),
        (None, None) => None,
    }
}

/// Deep-merges two JSON values.
///
/// Objects merge key by key, arrays concatenate, anything else is replaced by
/// `overrides`.
///
/// # Examples
///
/// ```
/// use endpointer::config::merge_values;
/// use serde_json::json;
///
/// let merged = merge_values(
///     &json!({"a": {"x": 1}, "tags": ["a"]}),
///     &json!({"a": {"y": 2}, "tags": ["b"]}),
/// );
/// assert_eq!(merged, json!({"a": {"x": 1, "y": 2}, "tags": ["a", "b"]}));
/// ```
pub fn merge_values(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            Value::Object(merge_objects(base, overrides))
        }
        (Value::Array(base), Value::Array(overrides)) => {
            Value::Array(base.iter().chain(overrides).cloned().collect())
        }
        (_, overrides) => overrides.clone(),
    }
}

fn merge_objects(base: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overrides {
        let value = match merged.get(key) {
            Some(existing) => merge_values(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    merged
}

mod method_serde {
    use http::Method;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        method: &Option<Method>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match method {
            Some(method) => serializer.serialize_some(method.as_str()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Method>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|name| {
                Method::from_bytes(name.to_uppercase().as_bytes()).map_err(D::Error::custom)
            })
            .transpose()
    }
}

mod timeout_millis {
    use serde::{ser::Error as _, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        timeout: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match timeout {
            Some(timeout) => {
                let millis = u64::try_from(timeout.as_millis())
                    .map_err(|_| S::Error::custom("timeout does not fit in u64 milliseconds"))?;
                serializer.serialize_some(&millis)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
