//! The parameter bag consumed by the endpoint shorthand.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Bag keys with a meaning of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedKey {
    /// `baseURL`: the request base, never a path, query or body field.
    BaseUrl,
    /// `headers`: request headers, never a path, query or body field.
    Headers,
    /// `data`: when left over on a mutating method, becomes the whole body.
    Data,
}

impl ReservedKey {
    /// All reserved keys.
    pub const ALL: [ReservedKey; 3] = [
        ReservedKey::BaseUrl,
        ReservedKey::Headers,
        ReservedKey::Data,
    ];

    /// The key as it appears in a bag.
    pub fn as_str(self) -> &'static str {
        match self {
            ReservedKey::BaseUrl => "baseURL",
            ReservedKey::Headers => "headers",
            ReservedKey::Data => "data",
        }
    }

    /// Looks up a reserved key by name.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reserved| reserved.as_str() == key)
    }

    /// Whether the key is stripped from the bag before placeholder resolution.
    pub(crate) fn is_request_option(key: &str) -> bool {
        matches!(
            Self::from_key(key),
            Some(ReservedKey::BaseUrl | ReservedKey::Headers)
        )
    }
}

/// Input to [`parse_endpoint`](crate::parse_endpoint): a flat bag of values
/// for path placeholders, query parameters and the request body, plus the
/// reserved `baseURL` and `headers` options.
///
/// # Examples
///
/// ```
/// use endpointer::EndpointRequest;
/// use serde_json::json;
///
/// let typed = EndpointRequest::new()
///     .with_header("x-api-key", "secret")
///     .with_param("userId", "1")
///     .with_param("pageSize", 10);
///
/// let dynamic = EndpointRequest::try_from(json!({
///     "headers": {"x-api-key": "secret"},
///     "userId": "1",
///     "pageSize": 10,
/// }))
/// .unwrap();
///
/// assert_eq!(typed, dynamic);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointRequest {
    base_url: Option<String>,
    headers: Option<BTreeMap<String, String>>,
    fields: Map<String, Value>,
}

impl EndpointRequest {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `baseURL`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Adds a path, query or body field.
    ///
    /// `baseURL` and `headers` land in their option slots, as they do for
    /// [`TryFrom<Value>`]. A reserved value of the wrong shape is dropped
    /// with a warning; use [`try_with_param`](Self::try_with_param) to get
    /// the error instead.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Err(err) = self.insert(key.into(), value.into()) {
            tracing::warn!(error = %err, "Ignoring invalid request option");
        }
        self
    }

    /// Like [`with_param`](Self::with_param), but rejects a `baseURL` that is
    /// not a string or `headers` that are not a flat object.
    pub fn try_with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self> {
        self.insert(key.into(), value.into())?;
        Ok(self)
    }

    fn insert(&mut self, key: String, value: Value) -> Result<()> {
        match ReservedKey::from_key(&key) {
            Some(ReservedKey::BaseUrl) => {
                self.base_url = match value {
                    Value::String(base_url) => Some(base_url),
                    Value::Null => None,
                    other => {
                        return Err(Error::InvalidParameter {
                            key,
                            reason: format!("expected a string, got {}", other),
                        })
                    }
                };
            }
            Some(ReservedKey::Headers) => {
                if let Some(headers) = header_map(&key, value)? {
                    self.headers.get_or_insert_with(BTreeMap::new).extend(headers);
                }
            }
            Some(ReservedKey::Data) | None => {
                self.fields.insert(key, value);
            }
        }
        Ok(())
    }

    /// Sets the explicit body override (`data`).
    pub fn with_data(self, data: impl Into<Value>) -> Self {
        self.with_param(ReservedKey::Data.as_str(), data)
    }

    /// Adds every field of a serializable value, e.g. a request struct.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `value` does not serialize,
    /// or an error from [`TryFrom<Value>`] if it is not a JSON object.
    pub fn with_fields<S: serde::Serialize>(self, value: &S) -> Result<Self> {
        let value =
            serde_json::to_value(value).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        let other = EndpointRequest::try_from(value)?;
        Ok(self.extend(other))
    }

    fn extend(mut self, other: EndpointRequest) -> Self {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if let Some(headers) = other.headers {
            self.headers.get_or_insert_with(BTreeMap::new).extend(headers);
        }
        self.fields.extend(other.fields);
        self
    }

    /// The `baseURL` option, if set.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The `headers` option, if set.
    pub fn headers(&self) -> Option<&BTreeMap<String, String>> {
        self.headers.as_ref()
    }

    /// All non-option fields, including `data`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Looks up a field the way placeholders see it: `baseURL` and `headers`
    /// are never visible.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if ReservedKey::is_request_option(key) {
            return None;
        }
        self.fields.get(key)
    }
}

impl TryFrom<Value> for EndpointRequest {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => EndpointRequest::try_from(map),
            Value::Null => Ok(EndpointRequest::new()),
            other => Err(Error::InvalidParameter {
                key: String::new(),
                reason: format!("parameter bag must be a JSON object, got {}", other),
            }),
        }
    }
}

impl TryFrom<Map<String, Value>> for EndpointRequest {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut request = EndpointRequest::new();
        for (key, value) in map {
            request.insert(key, value)?;
        }
        Ok(request)
    }
}

fn header_map(key: &str, value: Value) -> Result<Option<BTreeMap<String, String>>> {
    let invalid = |reason: String| Error::InvalidParameter {
        key: key.to_string(),
        reason,
    };
    let entries = match value {
        Value::Null => return Ok(None),
        Value::Object(entries) => entries,
        other => return Err(invalid(format!("expected an object, got {}", other))),
    };

    let mut headers = BTreeMap::new();
    for (name, value) in entries {
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(invalid(format!(
                    "header {:?} must be a string, got {}",
                    name, other
                )))
            }
        };
        headers.insert(name, value);
    }
    Ok(Some(headers))
}
