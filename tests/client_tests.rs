//! Facade contract tests against an in-memory recording transport.

use endpointer::{
    Client, ClientBuilder, EndpointRequest, Error, RequestConfig, Response, Result, Transport,
};
use http::{HeaderMap, StatusCode};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One call as seen by the transport.
#[derive(Debug, Clone, PartialEq)]
struct Call {
    verb: &'static str,
    url: Option<String>,
    body: Option<Value>,
    config: Value,
}

#[derive(Clone)]
struct RecordingTransport {
    calls: Arc<Mutex<Vec<Call>>>,
    reply: Value,
    fail_with: Option<StatusCode>,
}

impl RecordingTransport {
    fn new() -> Self {
        Self::replying(json!({"answer": 42}))
    }

    fn replying(reply: Value) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            reply,
            fail_with: None,
        }
    }

    fn failing(status: StatusCode) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::new()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(
        &self,
        verb: &'static str,
        url: Option<&str>,
        body: Option<Value>,
        config: RequestConfig,
    ) -> Result<Response<Value>> {
        self.calls.lock().unwrap().push(Call {
            verb,
            url: url.map(str::to_string),
            body,
            config: serde_json::to_value(config).unwrap(),
        });

        if let Some(status) = self.fail_with {
            return Err(Error::HttpError {
                status,
                raw_response: "failure".to_string(),
                headers: HeaderMap::new(),
            });
        }

        Ok(Response::new(
            self.reply.clone(),
            self.reply.to_string(),
            StatusCode::OK,
            HeaderMap::new(),
            Duration::ZERO,
        ))
    }
}

impl Transport for RecordingTransport {
    async fn request(&self, config: RequestConfig) -> Result<Response<Value>> {
        self.record("request", None, None, config)
    }

    async fn get(&self, url: &str, config: RequestConfig) -> Result<Response<Value>> {
        self.record("get", Some(url), None, config)
    }

    async fn head(&self, url: &str, config: RequestConfig) -> Result<Response<Value>> {
        self.record("head", Some(url), None, config)
    }

    async fn delete(&self, url: &str, config: RequestConfig) -> Result<Response<Value>> {
        self.record("delete", Some(url), None, config)
    }

    async fn post(
        &self,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> Result<Response<Value>> {
        self.record("post", Some(url), data, config)
    }

    async fn put(
        &self,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> Result<Response<Value>> {
        self.record("put", Some(url), data, config)
    }

    async fn patch(
        &self,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> Result<Response<Value>> {
        self.record("patch", Some(url), data, config)
    }
}

fn config(value: Value) -> RequestConfig {
    serde_json::from_value(value).unwrap()
}

/// Base config, call config, expected merged config.
struct MergeCase {
    name: &'static str,
    initial: Value,
    call: Value,
    expected: Value,
}

fn merge_cases() -> Vec<MergeCase> {
    vec![
        MergeCase {
            name: "with initial baseURL",
            initial: json!({"baseURL": "https://example.com"}),
            call: json!({}),
            expected: json!({"baseURL": "https://example.com"}),
        },
        MergeCase {
            name: "with initial headers",
            initial: json!({"baseURL": "https://example.com", "headers": {"x-api-key": "api-key"}}),
            call: json!({}),
            expected: json!({
                "baseURL": "https://example.com",
                "headers": {"x-api-key": "api-key"}
            }),
        },
        MergeCase {
            name: "without initial baseURL",
            initial: json!({}),
            call: json!({"baseURL": "https://example.com"}),
            expected: json!({"baseURL": "https://example.com"}),
        },
        MergeCase {
            name: "with query",
            initial: json!({"baseURL": "https://example.com"}),
            call: json!({"params": {"q": "search"}}),
            expected: json!({"baseURL": "https://example.com", "params": {"q": "search"}}),
        },
        MergeCase {
            name: "with custom headers",
            initial: json!({"baseURL": "https://example.com"}),
            call: json!({"headers": {"userId": "1"}}),
            expected: json!({"baseURL": "https://example.com", "headers": {"userId": "1"}}),
        },
        MergeCase {
            name: "with initial and custom headers",
            initial: json!({"baseURL": "https://example.com", "headers": {"x-api-key": "api-key"}}),
            call: json!({"headers": {"userId": "1"}}),
            expected: json!({
                "baseURL": "https://example.com",
                "headers": {"x-api-key": "api-key", "userId": "1"},
            }),
        },
        MergeCase {
            name: "with redeclared baseURL and passthrough options",
            initial: json!({"baseURL": "localhost"}),
            call: json!({"baseURL": "127.0.0.1", "data": {"name": "user1"}, "maxRedirects": 1}),
            expected: json!({"baseURL": "127.0.0.1", "data": {"name": "user1"}, "maxRedirects": 1}),
        },
    ]
}

fn client_with(transport: &RecordingTransport, initial: &Value) -> Client<RecordingTransport> {
    Client::new(transport.clone(), config(initial.clone()))
}

#[tokio::test]
async fn test_methods_without_body_merge_configs() {
    for case in merge_cases() {
        for verb in ["delete", "get", "head"] {
            let transport = RecordingTransport::new();
            let client = client_with(&transport, &case.initial);
            let call = Some(config(case.call.clone()));

            let _: Response<Value> = match verb {
                "delete" => client.delete("/some-path", call).await,
                "get" => client.get("/some-path", call).await,
                _ => client.head("/some-path", call).await,
            }
            .unwrap();

            assert_eq!(
                transport.calls(),
                vec![Call {
                    verb,
                    url: Some("/some-path".to_string()),
                    body: None,
                    config: case.expected.clone(),
                }],
                "{} [{}]",
                case.name,
                verb
            );
        }
    }
}

#[tokio::test]
async fn test_methods_with_body_merge_configs() {
    for case in merge_cases() {
        for body in [None, Some(json!({"payload": 1}))] {
            for verb in ["patch", "post", "put"] {
                let transport = RecordingTransport::new();
                let client = client_with(&transport, &case.initial);
                let call = Some(config(case.call.clone()));

                let _: Response<Value> = match verb {
                    "patch" => client.patch("/some-path", body.as_ref(), call).await,
                    "post" => client.post("/some-path", body.as_ref(), call).await,
                    _ => client.put("/some-path", body.as_ref(), call).await,
                }
                .unwrap();

                assert_eq!(
                    transport.calls(),
                    vec![Call {
                        verb,
                        url: Some("/some-path".to_string()),
                        body: body.clone(),
                        config: case.expected.clone(),
                    }],
                    "{} [{}] body={:?}",
                    case.name,
                    verb,
                    body
                );
            }
        }
    }
}

#[tokio::test]
async fn test_generic_request_merges_config() {
    for case in merge_cases() {
        let transport = RecordingTransport::new();
        let client = client_with(&transport, &case.initial);

        let call = config(case.call.clone())
            .with_method(http::Method::POST)
            .with_url("/some-path")
            .with_data(json!({"payload": 1}));
        let _: Response<Value> = client.request(call).await.unwrap();

        let mut expected = case.expected.clone();
        let object = expected.as_object_mut().unwrap();
        object.insert("method".to_string(), json!("POST"));
        object.insert("url".to_string(), json!("/some-path"));
        object.insert("data".to_string(), json!({"payload": 1}));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1, "{}", case.name);
        assert_eq!(calls[0].verb, "request");
        assert_eq!(calls[0].config, expected, "{}", case.name);
    }
}

#[tokio::test]
async fn test_endpoint_requests_merge_configs() {
    for case in merge_cases() {
        // passthrough options cannot be expressed through a parameter bag
        if case.call.get("maxRedirects").is_some() {
            continue;
        }

        for (verb, body) in [
            ("DELETE", None),
            ("GET", None),
            ("HEAD", None),
            ("PATCH", None),
            ("POST", Some(json!({"payload": 1}))),
            ("PUT", Some(json!({"payload": 1}))),
        ] {
            let transport = RecordingTransport::new();
            let client = client_with(&transport, &case.initial);

            let params = case.call.get("params").and_then(Value::as_object).cloned();
            let query_group = params
                .as_ref()
                .map(|p| format!("{{?{}}}", p.keys().cloned().collect::<Vec<_>>().join(",")))
                .unwrap_or_default();

            let mut bag = json!({});
            let object = bag.as_object_mut().unwrap();
            for key in ["baseURL", "headers"] {
                if let Some(value) = case.call.get(key) {
                    object.insert(key.to_string(), value.clone());
                }
            }
            object.extend(params.clone().unwrap_or_default());
            if let Some(Value::Object(body)) = &body {
                object.extend(body.clone());
            }

            let route = format!("{} /some-path{}", verb, query_group);
            let _: Response<Value> = client
                .endpoint(&route, EndpointRequest::try_from(bag).unwrap())
                .await
                .unwrap();

            let mut expected = json!({"url": "/some-path", "method": verb, "params": {}});
            let object = expected.as_object_mut().unwrap();
            object.extend(case.expected.as_object().unwrap().clone());
            if let Some(body) = &body {
                object.insert("data".to_string(), body.clone());
            }

            let calls = transport.calls();
            assert_eq!(calls.len(), 1, "{} [{}]", case.name, verb);
            assert_eq!(calls[0].verb, "request");
            assert_eq!(calls[0].config, expected, "{} [{}]", case.name, verb);
        }
    }
}

#[tokio::test]
async fn test_endpoint_with_empty_bag() {
    let transport = RecordingTransport::new();
    let client = client_with(&transport, &json!({"baseURL": "localhost"}));

    let _: Response<Value> = client
        .endpoint("GET /some-get-endpoint", EndpointRequest::new())
        .await
        .unwrap();

    assert_eq!(
        transport.calls()[0].config,
        json!({
            "baseURL": "localhost",
            "method": "GET",
            "params": {},
            "url": "/some-get-endpoint",
        })
    );
}

#[tokio::test]
async fn test_endpoint_path_parameter_is_not_a_body() {
    let transport = RecordingTransport::new();
    let client = client_with(&transport, &json!({"baseURL": "localhost"}));

    let _: Response<Value> = client
        .endpoint(
            "POST /some-get-endpoint/{name}",
            EndpointRequest::new().with_param("name", "user1"),
        )
        .await
        .unwrap();

    assert_eq!(
        transport.calls()[0].config,
        json!({
            "baseURL": "localhost",
            "method": "POST",
            "params": {},
            "url": "/some-get-endpoint/user1",
        })
    );
}

#[tokio::test]
async fn test_endpoint_body_replaces_base_data() {
    let transport = RecordingTransport::new();
    let client = client_with(&transport, &json!({"data": {"stale": true}, "timeout": 1000}));

    let _: Response<Value> = client
        .endpoint("POST /items", EndpointRequest::new().with_data(json!([1, 2])))
        .await
        .unwrap();

    assert_eq!(
        transport.calls()[0].config,
        json!({
            "method": "POST",
            "url": "/items",
            "params": {},
            "data": [1, 2],
            "timeout": 1000,
        })
    );
}

#[tokio::test]
async fn test_malformed_route_never_reaches_transport() {
    let transport = RecordingTransport::new();
    let client = client_with(&transport, &json!({}));

    let err = client
        .endpoint::<Value>("/users", EndpointRequest::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedRoute { .. }));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_transport_error_propagates_unchanged() {
    let transport = RecordingTransport::failing(StatusCode::BAD_GATEWAY);
    let client = client_with(&transport, &json!({})).into_data_client();

    let err = client.get::<Value>("/some-path", None).await.unwrap_err();

    match err {
        Error::HttpError {
            status,
            raw_response,
            ..
        } => {
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert_eq!(raw_response, "failure");
        }
        other => panic!("Expected HttpError, got {:?}", other),
    }
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_data_client_unwraps_payload() {
    let transport = RecordingTransport::new();
    let client = client_with(&transport, &json!({})).into_data_client();
    let expected = json!({"answer": 42});

    let get: Value = client
        .get("/some-path", Some(RequestConfig::new().with_param("q", "search")))
        .await
        .unwrap();
    assert_eq!(get, expected);

    let post: Value = client
        .post("/some-path", Some(&json!({"payload": 1})), None)
        .await
        .unwrap();
    assert_eq!(post, expected);

    let request: Value = client
        .request(RequestConfig::new().with_url("/some-path"))
        .await
        .unwrap();
    assert_eq!(request, expected);

    let endpoint: Value = client
        .endpoint("GET /some-path", EndpointRequest::new().with_param("q", "search"))
        .await
        .unwrap();
    assert_eq!(endpoint, expected);

    let calls = transport.calls();
    assert_eq!(calls[0].config, json!({"params": {"q": "search"}}));
    assert_eq!(
        calls[3].config,
        json!({"method": "GET", "url": "/some-path", "params": {"q": "search"}})
    );
}

#[tokio::test]
async fn test_data_client_unwraps_every_verb() {
    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Answer {
        answer: u32,
    }

    let transport = RecordingTransport::new();
    let client = client_with(&transport, &json!({})).into_data_client();
    let body = json!({"payload": 1});

    let head: Answer = client.head("/some-path", None).await.unwrap();
    let delete: Answer = client.delete("/some-path", None).await.unwrap();
    let put: Answer = client.put("/some-path", Some(&body), None).await.unwrap();
    let patch: Answer = client.patch("/some-path", Some(&body), None).await.unwrap();

    for answer in [head, delete, put, patch] {
        assert_eq!(answer, Answer { answer: 42 });
    }
    let verbs: Vec<_> = transport.calls().into_iter().map(|call| call.verb).collect();
    assert_eq!(verbs, ["head", "delete", "put", "patch"]);
}

#[tokio::test]
async fn test_payload_deserializes_into_caller_type() {
    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Answer {
        answer: u32,
    }

    let transport = RecordingTransport::new();
    let client = client_with(&transport, &json!({}));

    let response = client.get::<Answer>("/some-path", None).await.unwrap();
    assert_eq!(response.data, Answer { answer: 42 });
    assert_eq!(response.raw_body, r#"{"answer":42}"#);

    let err = client.get::<Vec<String>>("/some-path", None).await.unwrap_err();
    assert!(matches!(err, Error::DeserializationFailed { .. }));
}

#[tokio::test]
async fn test_base_config_is_not_mutated_by_calls() {
    let transport = RecordingTransport::new();
    let client = ClientBuilder::new()
        .default_header("x-api-key", "api-key")
        .unwrap()
        .map_config(|config| config.with_base_url("localhost"))
        .build_with_transport(transport.clone());
    let before = client.config().clone();

    let _: Response<Value> = client
        .get("/a", Some(RequestConfig::new().with_header("userId", "1")))
        .await
        .unwrap();
    let _: Response<Value> = client
        .endpoint("GET /b", EndpointRequest::new().with_header("userId", "2"))
        .await
        .unwrap();
    let _: Response<Value> = client.get("/c", None).await.unwrap();

    assert_eq!(client.config(), &before);
    assert_eq!(
        transport.calls()[2].config,
        json!({"baseURL": "localhost", "headers": {"x-api-key": "api-key"}})
    );
}

#[tokio::test]
async fn test_default_verb_methods_route_through_request() {
    /// Implements only `request`; verbs use the provided defaults.
    #[derive(Clone)]
    struct RequestOnly(RecordingTransport);

    impl Transport for RequestOnly {
        async fn request(&self, config: RequestConfig) -> Result<Response<Value>> {
            self.0.request(config).await
        }
    }

    let recorder = RecordingTransport::new();
    let client = Client::new(
        RequestOnly(recorder.clone()),
        config(json!({"baseURL": "localhost"})),
    );

    let _: Response<Value> = client
        .patch("/users/1", Some(&json!({"name": "user1"})), None)
        .await
        .unwrap();
    let _: Response<Value> = client.delete("/users/1", None).await.unwrap();

    let calls = recorder.calls();
    assert_eq!(
        calls[0].config,
        json!({
            "baseURL": "localhost",
            "method": "PATCH",
            "url": "/users/1",
            "data": {"name": "user1"},
        })
    );
    assert_eq!(
        calls[1].config,
        json!({"baseURL": "localhost", "method": "DELETE", "url": "/users/1"})
    );
}
