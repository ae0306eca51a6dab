// ABOUTME: Authenticated client for the remote deployment API.
// ABOUTME: Triggers a deployment and polls its status until it succeeds or fails.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::error::DeployError;
use super::status::DeploymentStatus;
use crate::auth::{Secret, Token};
use crate::fetch::redact_url;
use crate::http::{Body, HttpClient, HttpRequest, HttpResponse, send_with_timeout};
use crate::poll::{PollError, PollSpec, Probe, ProbeError, Readiness, poll_until_ready};

/// Body of `POST <api_url>/deployments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployRequest {
    pub application: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl DeployRequest {
    pub fn new(application: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            version: version.into(),
            environment: None,
        }
    }

    pub fn environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment.filter(|e| !e.is_empty());
        self
    }

    fn validate(&self) -> Result<(), DeployError> {
        if self.application.trim().is_empty() {
            return Err(DeployError::InvalidConfig("application is empty".to_string()));
        }
        if self.version.trim().is_empty() {
            return Err(DeployError::InvalidConfig("version is empty".to_string()));
        }
        Ok(())
    }
}

pub struct DeployClient<C> {
    client: C,
    api_url: String,
    authorization: Secret,
    timeout: Duration,
}

impl<C: HttpClient> DeployClient<C> {
    pub fn new(client: C, api_url: impl Into<String>, token: &Token) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            api_url,
            authorization: Secret::new(token.authorization()),
            timeout: Duration::from_secs(30),
        }
    }

    /// Per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DeployError> {
        let request = request
            .header("Authorization", self.authorization.expose())
            .header("Accept", "application/json");
        let response = send_with_timeout(&self.client, request, self.timeout).await?;
        if !response.is_success() {
            return Err(DeployError::Rejected {
                status: response.status,
                status_line: response.status_line(),
            });
        }
        Ok(response)
    }

    /// Start a deployment and return the id the API assigned to it.
    pub async fn trigger(&self, request: &DeployRequest) -> Result<String, DeployError> {
        request.validate()?;
        let body = serde_json::to_string(request)
            .map_err(|e| DeployError::InvalidConfig(e.to_string()))?;

        debug!(api = %redact_url(&self.api_url), application = %request.application, "triggering deployment");
        let response = self
            .send(HttpRequest::post(self.endpoint("deployments"), Body::Json(body)))
            .await?;

        let id = parse_deployment_id(&response)?;
        info!(
            deployment = %id,
            application = %request.application,
            version = %request.version,
            "deployment triggered"
        );
        Ok(id)
    }

    /// Current status of deployment `id`.
    pub async fn status(&self, id: &str) -> Result<DeploymentStatus, DeployError> {
        let path = format!("deployments/{}", urlencoding::encode(id));
        let response = self.send(HttpRequest::get(self.endpoint(&path))).await?;
        parse_status(&response)
    }

    /// Poll deployment `id` until it succeeds, fails, or `spec` runs out.
    ///
    /// Transport errors and unexpected statuses during polling count as a
    /// failed attempt; only a failure status reported by the API ends the
    /// wait early.
    pub async fn wait_for_completion(
        &self,
        id: &str,
        spec: &PollSpec,
    ) -> Result<DeploymentStatus, DeployError> {
        let probe = StatusProbe { client: self, id };
        match poll_until_ready(&probe, spec).await {
            Ok(status) => Ok(status),
            Err(PollError::Failed { reason, .. }) => Err(DeployError::Failed {
                id: id.to_string(),
                reason,
            }),
            Err(source) => Err(DeployError::Incomplete {
                id: id.to_string(),
                source,
            }),
        }
    }
}

struct StatusProbe<'a, C> {
    client: &'a DeployClient<C>,
    id: &'a str,
}

#[async_trait]
impl<'a, C: HttpClient> Probe for StatusProbe<'a, C> {
    type Output = DeploymentStatus;

    fn target(&self) -> String {
        format!("deployment {}", self.id)
    }

    async fn attempt(&self) -> Result<DeploymentStatus, ProbeError> {
        self.client
            .status(self.id)
            .await
            .map_err(|e| ProbeError::new(e.to_string()))
    }

    fn check(&self, status: &DeploymentStatus) -> Readiness {
        match status {
            DeploymentStatus::Succeeded => Readiness::Ready,
            DeploymentStatus::Failed(raw) => Readiness::Failed(format!("status {raw}")),
            DeploymentStatus::Pending(raw) => Readiness::NotReady(format!("status {raw}")),
        }
    }
}

fn json_body(response: &HttpResponse) -> Result<serde_json::Value, DeployError> {
    serde_json::from_slice(&response.body)
        .map_err(|_| DeployError::InvalidResponse("body is not JSON".to_string()))
}

fn parse_deployment_id(response: &HttpResponse) -> Result<String, DeployError> {
    let body = json_body(response)?;
    let id = body.get("id").or_else(|| body.get("deployment_id"));
    match id {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(DeployError::InvalidResponse("missing deployment id".to_string())),
    }
}

fn parse_status(response: &HttpResponse) -> Result<DeploymentStatus, DeployError> {
    let body = json_body(response)?;
    body.get("status")
        .and_then(serde_json::Value::as_str)
        .map(DeploymentStatus::parse)
        .ok_or_else(|| DeployError::InvalidResponse("missing status field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_may_be_strings_or_numbers() {
        let id = parse_deployment_id(&HttpResponse::new(201, r#"{"id":"dep-7"}"#)).unwrap();
        assert_eq!(id, "dep-7");
        let id = parse_deployment_id(&HttpResponse::new(201, r#"{"deployment_id":42}"#)).unwrap();
        assert_eq!(id, "42");
    }

    #[test]
    fn empty_id_is_invalid() {
        let err = parse_deployment_id(&HttpResponse::new(201, r#"{"id":""}"#)).unwrap_err();
        assert!(matches!(err, DeployError::InvalidResponse(_)));
    }

    #[test]
    fn status_field_is_required() {
        let err = parse_status(&HttpResponse::new(200, r#"{"state":"running"}"#)).unwrap_err();
        assert!(matches!(err, DeployError::InvalidResponse(_)));
        let status = parse_status(&HttpResponse::new(200, r#"{"status":"running"}"#)).unwrap();
        assert_eq!(status, DeploymentStatus::Pending("running".to_string()));
    }

    #[test]
    fn environment_is_omitted_when_unset() {
        let request = DeployRequest::new("shop", "1.2.3");
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"application":"shop","version":"1.2.3"}"#
        );
        let request = request.environment(Some("staging".to_string()));
        assert!(serde_json::to_string(&request).unwrap().contains(r#""environment":"staging""#));
    }

    #[test]
    fn blank_application_is_rejected() {
        assert!(DeployRequest::new(" ", "1").validate().is_err());
    }
}
