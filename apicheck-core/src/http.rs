//! HTTP transport used to dispatch scenario requests.
//!
//! The runner only depends on the [`Transport`] trait. [`Client`] is the
//! default implementation built on hyper's legacy pooled client with a TLS
//! capable connector. Responses come back with the body already parsed
//! into a JSON tree.
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http_body_util::{BodyExt, Full};
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client as HyperClient},
    rt::TokioExecutor,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::time::Duration;
use tracing::*;
use url::Url;

pub use http::{Method, StatusCode};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("http error: {0}")]
    Protocol(String),
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// A request as declared by a scenario.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path relative to the transport's base URL, or an absolute URL.
    pub path: String,
    pub headers: IndexMap<String, String>,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Request {
        Request {
            method,
            path: path.into(),
            headers: IndexMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Request {
        Request::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Request {
        Request::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Request {
        Request::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Request {
        Request::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Request {
        Request::new(Method::DELETE, path)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Request {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach a bearer credential as the `Authorization` header.
    pub fn bearer(self, credential: impl AsRef<str>) -> Request {
        let value = format!("Bearer {}", credential.as_ref());
        self.header(AUTHORIZATION.as_str(), value)
    }

    /// Use `json` as the request body and set `content-type: application/json`.
    pub fn json(self, json: &Value) -> Request {
        self.header(CONTENT_TYPE.as_str(), "application/json")
            .body(json.to_string())
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Request {
        self.body = Some(body.into());
        self
    }

    /// Convert the declared headers into an [`http::HeaderMap`].
    pub fn header_map(&self) -> Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (key, value) in &self.headers {
            let name = HeaderName::try_from(key.as_str())
                .map_err(|e| TransportError::InvalidRequest(format!("header \"{key}\": {e}")))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| TransportError::InvalidRequest(format!("header \"{key}\": {e}")))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    /// The URL the request was sent to.
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed body. See [`parse_body`].
    pub body: Value,
    /// Raw body text, kept for logs.
    pub text: String,
}

/// Parse a response body into a tree. An empty body is `null`, a body that
/// is not JSON becomes a single string value.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|e| {
        trace!("response body is not json: {e}");
        Value::String(text.to_string())
    })
}

#[derive(Debug, Clone)]
pub struct LogRequest {
    pub method: Method,
    pub target: String,
    pub headers: HeaderMap,
}

#[derive(Debug, Clone)]
pub struct LogResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Captured request/response pair. `response` is `None` when the exchange
/// failed at the transport level.
#[derive(Debug, Clone)]
pub struct Log {
    pub request: LogRequest,
    pub response: Option<LogResponse>,
}

/// The HTTP collaborator the runner dispatches through.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// apicheck's default HTTP client.
#[derive(Clone)]
pub struct Client {
    inner: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    base_url: Option<Url>,
}

impl Default for Client {
    fn default() -> Client {
        Client {
            inner: HyperClient::builder(TokioExecutor::new()).build(HttpsConnector::new()),
            base_url: None,
        }
    }
}

impl Client {
    /// Client without a base URL; every request path must be absolute.
    pub fn new() -> Client {
        Client::default()
    }

    pub fn with_base_url(base_url: impl AsRef<str>) -> Result<Client, TransportError> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|e| {
            TransportError::InvalidRequest(format!("base url \"{}\": {e}", base_url.as_ref()))
        })?;
        Ok(Client {
            base_url: Some(base_url),
            ..Client::default()
        })
    }

    /// Resolve a request path. Absolute URLs are used as they are; other paths
    /// are appended to the base URL, keeping any path prefix it carries.
    pub fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }
        let Some(base_url) = &self.base_url else {
            return Err(TransportError::InvalidRequest(format!(
                "relative path \"{path}\" requires a base url"
            )));
        };
        let joined = format!(
            "{}/{}",
            base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| TransportError::InvalidRequest(format!("url \"{joined}\": {e}")))
    }
}

#[async_trait::async_trait]
impl Transport for Client {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let url = self.resolve(&request.path)?;
        debug!("Requesting {} {url}", request.method);

        let mut builder = http::Request::builder()
            .method(request.method.clone())
            .uri(url.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.header_map()?);
        }
        let req = builder
            .body(Full::new(request.body.clone().unwrap_or_default()))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let res = self.inner.request(req).await.map_err(|e| {
            let is_connect = e.is_connect();
            let message = format!("{:#}", eyre::Report::new(e));
            if is_connect {
                TransportError::Connect(message)
            } else {
                TransportError::Protocol(message)
            }
        })?;

        let (parts, body) = res.into_parts();
        let bytes = body
            .collect()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_bytes();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        debug!("{} {url} responded {}", request.method, parts.status);

        Ok(Response {
            url: url.to_string(),
            status: parts.status,
            headers: parts.headers,
            body: parse_body(&text),
            text,
        })
    }
}
