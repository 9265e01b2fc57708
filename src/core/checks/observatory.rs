// src/core/checks/observatory.rs

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ObservatorySettings;
use crate::core::checks::{CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;

/// Mozilla Observatory scan: starts an analysis for the host, then polls until
/// the scan reports an `end_time`.
pub struct ObservatoryCheck {
    client: Client,
    settings: ObservatorySettings,
}

impl ObservatoryCheck {
    pub fn new(client: Client, settings: ObservatorySettings) -> Self {
        Self { client, settings }
    }

    fn analyze_url(&self) -> String {
        format!("{}/analyze", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CheckAdapter for ObservatoryCheck {
    async fn run(&self, input: CheckInput, progress: Progress) -> Result<Value, AdapterError> {
        let url = input.as_url()?;
        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| AdapterError::Parse(format!("no host in {url}")))?;
        info!(host = %host, "Starting Observatory scan.");

        let started: Value = self
            .client
            .post(self.analyze_url())
            .query(&[("host", host.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = started.get("error").and_then(Value::as_str) {
            warn!(host = %host, error, "Observatory refused the scan.");
            return Err(AdapterError::Remote(format!("Observatory error: {error}")));
        }
        progress.publish(started.clone());
        if is_finished(&started) {
            return Ok(started);
        }

        for attempt in 1..=self.settings.poll_attempts {
            tokio::time::sleep(self.settings.poll_interval()).await;
            let scan: Value = self
                .client
                .get(self.analyze_url())
                .query(&[("host", host.as_str())])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            debug!(attempt, state = %scan["state"], "Polled Observatory scan.");
            progress.publish(scan.clone());
            if is_finished(&scan) {
                info!(host = %host, grade = %scan["grade"], "Observatory scan finished.");
                return Ok(scan);
            }
        }

        Err(AdapterError::Remote(
            "Observatory scan did not finish within the polling window".to_string(),
        ))
    }
}

fn is_finished(scan: &Value) -> bool {
    scan.get("end_time").is_some_and(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer, attempts: u32) -> ObservatorySettings {
        ObservatorySettings {
            base_url: format!("{}/api/v1/", server.uri()),
            poll_attempts: attempts,
            poll_interval_ms: 5,
        }
    }

    #[tokio::test]
    async fn polls_until_the_scan_ends() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/analyze"))
            .and(query_param("host", "example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "PENDING", "end_time": null })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "state": "FINISHED", "end_time": "Tue, 01 Oct 2024 10:00:00 GMT", "grade": "B" }),
            ))
            .mount(&server)
            .await;

        let check = ObservatoryCheck::new(Client::new(), settings(&server, 3));
        let payload = check
            .run(CheckInput::Url("https://example.com/path".into()), Progress::default())
            .await
            .unwrap();
        assert_eq!(payload["grade"], "B");
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "PENDING" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "RUNNING" })))
            .expect(2)
            .mount(&server)
            .await;

        let progress = Progress::default();
        let check = ObservatoryCheck::new(Client::new(), settings(&server, 2));
        let err = check
            .run(CheckInput::Url("https://example.com".into()), progress.clone())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not finish"));
        assert_eq!(progress.latest().unwrap()["state"], "RUNNING");
    }

    #[tokio::test]
    async fn remote_error_field_fails_the_check() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "invalid-hostname" })))
            .mount(&server)
            .await;

        let check = ObservatoryCheck::new(Client::new(), settings(&server, 1));
        let err = check
            .run(CheckInput::Url("https://localhost".into()), Progress::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Observatory error: invalid-hostname");
    }
}
