// ABOUTME: HTTP readiness probe: one request per attempt, judged by status and body.
// ABOUTME: Non-matching responses are "not ready" and retried, never terminal.

use async_trait::async_trait;

use super::error::ProbeError;
use super::probe::{Probe, Readiness};
use crate::fetch::redact_url;
use crate::http::{Body, HttpClient, HttpRequest, HttpResponse, Method};

/// Checks an HTTP endpoint, optionally requiring a status code and a body substring.
#[derive(Debug, Clone)]
pub struct HttpProbe<C> {
    client: C,
    method: Method,
    url: String,
    body: Option<String>,
    expect_status: Option<u16>,
    expect_body: Option<String>,
}

impl<C: HttpClient> HttpProbe<C> {
    /// A GET probe that is ready on any 2xx response.
    pub fn get(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            method: Method::Get,
            url: url.into(),
            body: None,
            expect_status: None,
            expect_body: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Request body sent with each attempt (as JSON when it parses as JSON).
    pub fn body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    /// Require this exact status instead of any 2xx.
    pub fn expect_status(mut self, status: Option<u16>) -> Self {
        self.expect_status = status;
        self
    }

    /// Require the response body to contain this text.
    pub fn expect_body(mut self, needle: Option<String>) -> Self {
        self.expect_body = needle;
        self
    }

    fn request(&self) -> HttpRequest {
        let body = self.body.as_ref().map(|b| {
            if serde_json::from_str::<serde_json::Value>(b).is_ok() {
                Body::Json(b.clone())
            } else {
                Body::Raw(b.clone().into())
            }
        });
        HttpRequest {
            method: self.method,
            url: self.url.clone(),
            headers: Vec::new(),
            body,
        }
    }
}

#[async_trait]
impl<C: HttpClient> Probe for HttpProbe<C> {
    type Output = HttpResponse;

    fn target(&self) -> String {
        format!("{} {}", self.method, redact_url(&self.url))
    }

    async fn attempt(&self) -> Result<HttpResponse, ProbeError> {
        Ok(self.client.send(self.request()).await?)
    }

    fn check(&self, response: &HttpResponse) -> Readiness {
        let status_ok = match self.expect_status {
            Some(expected) => response.status == expected,
            None => response.is_success(),
        };
        if !status_ok {
            return Readiness::NotReady(format!("status {}", response.status_line()));
        }

        if let Some(needle) = &self.expect_body
            && !response.text().contains(needle.as_str())
        {
            return Readiness::NotReady(format!("response body does not contain {needle:?}"));
        }

        Readiness::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpError;

    struct NoClient;

    #[async_trait]
    impl HttpClient for NoClient {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, HttpError> {
            Err(HttpError::Network("unreachable".to_string()))
        }
    }

    #[test]
    fn any_success_status_is_ready_by_default() {
        let probe = HttpProbe::get(NoClient, "http://localhost/health");
        assert_eq!(probe.check(&HttpResponse::new(204, "")), Readiness::Ready);
        assert!(matches!(
            probe.check(&HttpResponse::new(503, "")),
            Readiness::NotReady(_)
        ));
    }

    #[test]
    fn expected_status_must_match_exactly() {
        let probe = HttpProbe::get(NoClient, "http://localhost/health").expect_status(Some(200));
        assert!(matches!(
            probe.check(&HttpResponse::new(204, "")),
            Readiness::NotReady(_)
        ));
        assert_eq!(probe.check(&HttpResponse::new(200, "")), Readiness::Ready);
    }

    #[test]
    fn expected_body_is_a_substring_match() {
        let probe = HttpProbe::get(NoClient, "http://localhost/health")
            .expect_body(Some("\"status\":\"ok\"".to_string()));
        assert_eq!(
            probe.check(&HttpResponse::new(200, r#"{"status":"ok","uptime":3}"#)),
            Readiness::Ready
        );
        assert!(matches!(
            probe.check(&HttpResponse::new(200, r#"{"status":"starting"}"#)),
            Readiness::NotReady(_)
        ));
    }

    #[test]
    fn json_bodies_are_sent_as_json() {
        let probe = HttpProbe::get(NoClient, "http://localhost/graphql")
            .method(Method::Post)
            .body(Some(r#"{"query":"{ ping }"}"#.to_string()));
        let request = probe.request();
        assert_eq!(request.method, Method::Post);
        assert!(matches!(request.body, Some(Body::Json(_))));
    }

    #[tokio::test]
    async fn network_errors_surface_as_probe_errors() {
        let probe = HttpProbe::get(NoClient, "http://localhost/health");
        let err = probe.attempt().await.unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }
}
