// ABOUTME: Minimal HTTP client seam shared by the fetcher, probes, token exchange and deploy API.
// ABOUTME: ReqwestClient is the production transport; tests substitute scripted clients.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// HTTP method subset used by the actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Request body variants.
#[derive(Clone, PartialEq, Eq)]
pub enum Body {
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// Pre-serialized JSON document.
    Json(String),
    /// Raw bytes sent without a content type.
    Raw(Bytes),
}

impl Body {
    /// Encode form pairs as a urlencoded string.
    pub fn encode_form(pairs: &[(String, String)]) -> String {
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

// Bodies can carry credentials, so Debug never prints their contents.
impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Form(pairs) => f
                .debug_struct("Form")
                .field("fields", &pairs.iter().map(|(k, _)| k).collect::<Vec<_>>())
                .finish(),
            Body::Json(json) => f.debug_struct("Json").field("len", &json.len()).finish(),
            Body::Raw(bytes) => f.debug_struct("Raw").field("len", &bytes.len()).finish(),
        }
    }
}

/// A single outgoing request.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Body) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("authorization") {
                    (k.as_str(), "***")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Status code followed by its canonical reason, e.g. `401 Unauthorized`.
    pub fn status_line(&self) -> String {
        status_line(self.status)
    }
}

pub fn status_line(status: u16) -> String {
    match reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
    {
        Some(reason) => format!("{status} {reason}"),
        None => status.to_string(),
    }
}

fn describe_status(status: &u16) -> String {
    status_line(*status)
}

/// Transport failures for one request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {}", describe_status(.0))]
    Status(u16),
}

/// Something that can send an [`HttpRequest`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for &T {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        (**self).send(request).await
    }
}

/// Send `request`, giving up after `timeout`.
pub async fn send_with_timeout<C: HttpClient + ?Sized>(
    client: &C,
    request: HttpRequest,
    timeout: Duration,
) -> Result<HttpResponse, HttpError> {
    match tokio::time::timeout(timeout, client.send(request)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(HttpError::Timeout(timeout)),
    }
}

/// reqwest-backed client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, HttpError> {
        let inner = reqwest::Client::builder()
            .user_agent(concat!("stepguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Network(e.without_url().to_string()))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.inner.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match request.body {
            None => builder,
            Some(Body::Form(pairs)) => builder
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::encode_form(&pairs)),
            Some(Body::Json(json)) => builder.header("Content-Type", "application/json").body(json),
            Some(Body::Raw(bytes)) => builder.body(bytes),
        };

        // URLs may embed credentials, so they are stripped from error text.
        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::Network(e.without_url().to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::Network(e.without_url().to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_encoding_escapes_reserved_characters() {
        let pairs = vec![
            ("grant_type".to_string(), "client_credentials".to_string()),
            ("scope".to_string(), "read write&admin".to_string()),
        ];
        assert_eq!(
            Body::encode_form(&pairs),
            "grant_type=client_credentials&scope=read%20write%26admin"
        );
    }

    #[test]
    fn body_debug_hides_values() {
        let body = Body::Form(vec![("client_secret".to_string(), "hunter2".to_string())]);
        let rendered = format!("{body:?}");
        assert!(rendered.contains("client_secret"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn status_line_includes_reason() {
        assert_eq!(status_line(401), "401 Unauthorized");
        assert_eq!(status_line(599), "599");
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("post"), Some(Method::Post));
        assert_eq!(Method::parse("PUT"), None);
    }

    #[test]
    fn request_debug_hides_authorization() {
        let request = HttpRequest::get("http://x").header("Authorization", "Bearer s3cr3t");
        assert!(!format!("{request:?}").contains("s3cr3t"));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let request = HttpRequest::get("http://x").header("Authorization", "Bearer t");
        assert_eq!(request.header_value("authorization"), Some("Bearer t"));
    }
}
