use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::{scoped, Backend, Probe, ProbeError};
use crate::configuration::{ApiSettings, DEFAULT_PROBE_TIMEOUT};
use crate::models::BackendKind;

const MAX_BODY_IN_DETAIL: usize = 512;

/// One bounded GET against the API health endpoint. Healthy means 200 with a JSON body.
pub struct ApiProbe {
    settings: ApiSettings,
    timeout: Duration,
}

impl ApiProbe {
    pub fn new(settings: ApiSettings) -> Self {
        Self {
            settings,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn transport_error(err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::RequestFailure(format!("request timeout: {}", err))
    } else if err.is_connect() {
        ProbeError::RequestFailure(format!("connection failed: {}", err))
    } else {
        ProbeError::RequestFailure(err.to_string())
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_IN_DETAIL {
        return body.to_string();
    }
    let mut short: String = body.chars().take(MAX_BODY_IN_DETAIL).collect();
    short.push_str("...");
    short
}

#[async_trait]
impl Backend for ApiProbe {
    type Session = reqwest::Client;

    async fn connect(&self) -> Result<reqwest::Client, ProbeError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| ProbeError::RequestFailure(format!("HTTP client error: {}", err)))
    }

    #[tracing::instrument(name = "Check Maestro API health", skip(self, client), fields(url = %self.settings.health_url()))]
    async fn check(&self, client: &mut reqwest::Client) -> Result<String, ProbeError> {
        let response = client
            .get(self.settings.health_url())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if status != StatusCode::OK {
            return Err(ProbeError::UnhealthyStatus {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        serde_json::from_str::<serde_json::Value>(&body)
            .map(|json| json.to_string())
            .map_err(|err| {
                ProbeError::RequestFailure(format!("health response is not JSON: {}", err))
            })
    }

    async fn release(&self, _client: reqwest::Client) {}
}

#[async_trait]
impl Probe for ApiProbe {
    fn kind(&self) -> BackendKind {
        BackendKind::Api
    }

    fn target(&self) -> String {
        self.settings.health_url()
    }

    async fn execute(&self) -> Result<String, ProbeError> {
        scoped(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(MAX_BODY_IN_DETAIL + 10);
        let short = truncate(&body);
        assert_eq!(short.len(), MAX_BODY_IN_DETAIL + 3);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn short_bodies_are_kept() {
        assert_eq!(truncate("service unavailable"), "service unavailable");
    }
}
