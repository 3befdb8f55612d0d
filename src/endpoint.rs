//! Route-template endpoint parsing.
//!
//! A route template is `"<METHOD> <path>"`, where the path may contain `{name}`
//! placeholders and one `{?a,b}` query group:
//!
//! ```text
//! PATCH /users/{userId}{?userVersion}
//! ```
//!
//! [`parse_endpoint`] resolves a template against an [`EndpointRequest`] into
//! a [`RequestConfig`]. Bag fields consumed by a placeholder are used exactly
//! once; whatever is left over becomes query parameters for `GET`/`HEAD` and
//! the request body for every other method.

use crate::{EndpointRequest, Error, RequestConfig, Result, ReservedKey};
use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Characters left alone by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Text substituted for a path placeholder with no value.
pub const UNDEFINED_SEGMENT: &str = "undefined";

static PATH_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^?}][^}]*)\}").expect("path placeholder pattern"));

static QUERY_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\?([^}]+)\}").expect("query group pattern"));

/// How path placeholders without a value are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPlaceholders {
    /// Render the literal text `undefined`.
    #[default]
    Render,
    /// Fail with [`Error::MissingParameter`].
    Reject,
}

/// Parses a route template against a parameter bag.
///
/// Placeholders with no value in the bag render as `undefined`; see
/// [`parse_endpoint_strict`] for the failing variant.
///
/// # Errors
///
/// Returns [`Error::MalformedRoute`] if the route has no method token.
///
/// # Examples
///
/// ```
/// use endpointer::{parse_endpoint, EndpointRequest};
/// use serde_json::json;
///
/// let request = EndpointRequest::new()
///     .with_param("userId", "1")
///     .with_param("userVersion", 5)
///     .with_param("name", "user1");
///
/// let config = parse_endpoint("PATCH /users/{userId}{?userVersion}", &request).unwrap();
///
/// assert_eq!(
///     serde_json::to_value(&config).unwrap(),
///     json!({
///         "method": "PATCH",
///         "url": "/users/1",
///         "params": {"userVersion": 5},
///         "data": {"name": "user1"},
///     })
/// );
/// ```
pub fn parse_endpoint(route: &str, request: &EndpointRequest) -> Result<RequestConfig> {
    parse_endpoint_with(route, request, MissingPlaceholders::Render)
}

/// Like [`parse_endpoint`], but a path placeholder with no value is an error.
///
/// Query group keys stay optional.
///
/// # Errors
///
/// Returns [`Error::MalformedRoute`] or [`Error::MissingParameter`].
pub fn parse_endpoint_strict(route: &str, request: &EndpointRequest) -> Result<RequestConfig> {
    parse_endpoint_with(route, request, MissingPlaceholders::Reject)
}

/// Parses a route template with an explicit policy for missing placeholders.
pub fn parse_endpoint_with(
    route: &str,
    request: &EndpointRequest,
    missing: MissingPlaceholders,
) -> Result<RequestConfig> {
    let (method, template) = split_route(route)?;

    let mut used: HashSet<String> = HashSet::new();
    let mut query = Map::new();

    // Only the first query group is recognized; later ones stay literal.
    let path_template: Cow<'_, str> = match QUERY_GROUP.captures(template) {
        Some(caps) => {
            for key in caps[1].split(',') {
                query.insert(
                    key.to_string(),
                    request.get(key).cloned().unwrap_or(Value::Null),
                );
                used.insert(key.to_string());
            }
            QUERY_GROUP.replace(template, "")
        }
        None => Cow::Borrowed(template),
    };

    let mut first_missing: Option<String> = None;
    let url = PATH_PLACEHOLDER
        .replace_all(&path_template, |caps: &Captures<'_>| {
            let name = &caps[1];
            used.insert(name.to_string());
            let value = request.get(name);
            if value.is_none() && first_missing.is_none() {
                first_missing = Some(name.to_string());
            }
            encode_segment(value)
        })
        .into_owned();

    if let (MissingPlaceholders::Reject, Some(name)) = (missing, first_missing) {
        return Err(Error::MissingParameter {
            name,
            route: route.to_string(),
        });
    }

    let leftover: Map<String, Value> = request
        .fields()
        .iter()
        .filter(|(key, _)| !ReservedKey::is_request_option(key) && !used.contains(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let data = if is_read_only(&method) {
        query.extend(leftover);
        None
    } else if let Some(data) = leftover.get(ReservedKey::Data.as_str()) {
        Some(data.clone())
    } else if !leftover.is_empty() {
        Some(Value::Object(leftover))
    } else {
        None
    };

    tracing::debug!(
        method = %method,
        url = %url,
        query_params = query.len(),
        has_body = data.is_some(),
        "Parsed endpoint"
    );

    Ok(RequestConfig {
        method: Some(method),
        url: Some(url),
        base_url: request.base_url().map(str::to_string),
        headers: request.headers().cloned(),
        params: Some(query),
        data,
        ..RequestConfig::default()
    })
}

/// Splits `"<METHOD> <path>"` on the first space. Text after a second space
/// is ignored.
fn split_route(route: &str) -> Result<(Method, &str)> {
    let malformed = || Error::MalformedRoute {
        route: route.to_string(),
    };

    let (method, rest) = route.split_once(' ').ok_or_else(malformed)?;
    if method.is_empty() {
        return Err(malformed());
    }
    let method =
        Method::from_bytes(method.to_uppercase().as_bytes()).map_err(|_| malformed())?;
    let template = rest.split(' ').next().unwrap_or_default();

    Ok((method, template))
}

/// Methods whose leftover fields go to the query string instead of the body.
fn is_read_only(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn encode_segment(value: Option<&Value>) -> String {
    let text = match value {
        Some(value) => segment_text(value),
        None => Cow::Borrowed(UNDEFINED_SEGMENT),
    };
    utf8_percent_encode(&text, COMPONENT).to_string()
}

/// String form of a value as it appears in a path segment.
fn segment_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Array(items) => Cow::Owned(
            items
                .iter()
                .map(|item| match item {
                    Value::Null => Cow::Borrowed(""),
                    item => segment_text(item),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Cow::Owned(other.to_string()),
    }
}
