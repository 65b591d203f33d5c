use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::error::TransportError;

// Enough of an error body to tell what went wrong without logging whole pages
const MAX_ERROR_BODY_CHARS: usize = 1024;

/// Outbound HTTP to a configured upstream.
///
/// Implementations issue exactly one request per call: no retries, no method fallback.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, headers: &HashMap<String, String>)
        -> Result<Value, TransportError>;

    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &str,
    ) -> Result<Value, TransportError>;
}

pub fn build_http_client(request_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent("Device Sources Fetcher")
        .timeout(request_timeout)
        .build()
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(request_timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self::new(build_http_client(request_timeout)?))
    }

    async fn send(
        &self,
        method: http::Method,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&str>,
    ) -> Result<Value, TransportError> {
        let parsed_url = reqwest::Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let headers: HeaderMap = headers.try_into().map_err(TransportError::InvalidHeaders)?;

        let mut request = self.client.request(method, parsed_url).headers(headers);
        if let Some(body) = body {
            request = request.body(body.to_owned());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        Ok(parse_body(text))
    }
}

/// Bodies that are not JSON are handed back as a JSON string, the way a plain HTTP client
/// surfaces text. Callers expecting an element list reject them downstream.
fn parse_body(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Value, TransportError> {
        self.send(http::Method::GET, url, headers, None).await
    }

    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &str,
    ) -> Result<Value, TransportError> {
        self.send(http::Method::POST, url, headers, Some(body)).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockTransportCall {
    pub method: http::Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// Canned-response transport for tests.
///
/// Every call gets the same body (or the same failure status) and is recorded.
#[derive(Clone)]
pub struct MockTransport {
    response: Result<Value, (StatusCode, String)>,
    hits: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<MockTransportCall>>>,
}

impl MockTransport {
    pub fn responding(body: Value) -> Self {
        Self {
            response: Ok(body),
            hits: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            response: Err((status, body.into())),
            hits: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> Vec<MockTransportCall> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn respond(
        &self,
        method: http::Method,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&str>,
    ) -> Result<Value, TransportError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let call = MockTransportCall {
            method,
            url: url.to_string(),
            headers: headers.clone(),
            body: body.map(str::to_string),
        };
        match self.calls.lock() {
            Ok(mut guard) => guard.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }

        match &self.response {
            Ok(value) => Ok(value.clone()),
            Err((status, body)) => Err(TransportError::Status {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Value, TransportError> {
        self.respond(http::Method::GET, url, headers, None)
    }

    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &str,
    ) -> Result<Value, TransportError> {
        self.respond(http::Method::POST, url, headers, Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn transport() -> HttpTransport {
        HttpTransport::with_timeout(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_custom_headers_and_parses_json() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/devices").header("x-api-key", "secret");
                then.status(200).json_body(json!([{"id": 1}]));
            })
            .await;

        let headers = HashMap::from([("x-api-key".to_string(), "secret".to_string())]);
        let body = transport()
            .get(&server.url("/devices"), &headers)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn test_post_sends_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query")
                    .header("content-type", "application/json")
                    .body("{\"page\":1}");
                then.status(200).json_body(json!({"items": []}));
            })
            .await;

        let body = transport()
            .post(&server.url("/query"), &HashMap::new(), "{\"page\":1}")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, json!({"items": []}));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken");
                then.status(503).body("maintenance");
            })
            .await;

        let err = transport()
            .get(&server.url("/broken"), &HashMap::new())
            .await
            .unwrap_err();

        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "maintenance");
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_text_body_is_returned_as_string() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/text");
                then.status(200).body("not json");
            })
            .await;

        let body = transport()
            .get(&server.url("/text"), &HashMap::new())
            .await
            .unwrap();

        assert_eq!(body, json!("not json"));
    }

    #[tokio::test]
    async fn test_invalid_url_and_headers() {
        let err = transport()
            .get("not a url", &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));

        let headers = HashMap::from([("bad header".to_string(), "v".to_string())]);
        let err = transport()
            .get("http://localhost:1/", &headers)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeaders(_)));
    }

    #[tokio::test]
    async fn test_mock_transport_records_calls() {
        let transport = MockTransport::responding(json!([]));
        transport
            .post("http://upstream/", &HashMap::new(), "body")
            .await
            .unwrap();

        assert_eq!(transport.call_count(), 1);
        let calls = transport.get_calls();
        assert_eq!(calls[0].method, http::Method::POST);
        assert_eq!(calls[0].body.as_deref(), Some("body"));

        let failing = MockTransport::failing(StatusCode::BAD_GATEWAY, "down");
        assert!(failing.get("http://upstream/", &HashMap::new()).await.is_err());
        assert_eq!(failing.call_count(), 1);
    }
}
