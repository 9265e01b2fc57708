// src/core/checks/performance.rs

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::core::checks::{CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;

/// Number of back-to-back requests the rate-limit probe sends.
const RATE_LIMIT_PROBES: usize = 5;

/// Single-request load timing.
pub struct PerformanceCheck {
    client: Client,
}

impl PerformanceCheck {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CheckAdapter for PerformanceCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let url = input.as_url()?;
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?.len();
        let load_time_ms = start.elapsed().as_millis() as u64;
        info!(url, status, load_time_ms, "Performance check finished.");
        Ok(json!({ "status": status, "loadTimeMs": load_time_ms, "bytes": bytes }))
    }
}

/// Sends a short burst of sequential requests and records whether the server
/// starts throttling or advertises rate-limit headers.
pub struct RateLimitCheck {
    client: Client,
}

impl RateLimitCheck {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CheckAdapter for RateLimitCheck {
    async fn run(&self, input: CheckInput, progress: Progress) -> Result<Value, AdapterError> {
        let url = input.as_url()?;
        let mut results = Vec::with_capacity(RATE_LIMIT_PROBES);

        for attempt in 0..RATE_LIMIT_PROBES {
            let response = self.client.get(url).send().await?;
            let status = response.status().as_u16();
            let headers = rate_limit_headers(response.headers());
            debug!(attempt, status, "Rate-limit probe answered.");
            results.push(json!({ "status": status, "headers": headers }));
            progress.publish(json!({ "results": results }));
        }

        let rate_limited = results.iter().any(|r| r["status"] == 429);
        let advertises_limits = results
            .iter()
            .any(|r| r["headers"].as_object().is_some_and(|h| !h.is_empty()));
        info!(url, rate_limited, advertises_limits, "Rate-limit check finished.");

        Ok(json!({
            "results": results,
            "rateLimited": rate_limited,
            "advertisesLimits": advertises_limits,
        }))
    }
}

/// Keeps only headers that hint at throttling or edge protection.
fn rate_limit_headers(headers: &reqwest::header::HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        let name = name.as_str();
        let relevant = name.contains("ratelimit")
            || name.contains("rate-limit")
            || name == "retry-after"
            || name == "cf-ray"
            || name == "x-sucuri-id";
        if relevant {
            if let Ok(value) = value.to_str() {
                map.insert(name.to_string(), Value::String(value.to_string()));
            }
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn performance_reports_status_and_timing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let payload = PerformanceCheck::new(Client::new())
            .run(CheckInput::Url(server.uri()), Progress::default())
            .await
            .unwrap();
        assert_eq!(payload["status"], 200);
        assert_eq!(payload["bytes"], 5);
        assert!(payload["loadTimeMs"].is_u64());
    }

    #[tokio::test]
    async fn rate_limit_detects_throttling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "30")
                    .insert_header("x-ratelimit-limit", "3")
                    .insert_header("content-type", "text/plain"),
            )
            .expect(5)
            .mount(&server)
            .await;

        let progress = Progress::default();
        let payload = RateLimitCheck::new(Client::new())
            .run(CheckInput::Url(server.uri()), progress.clone())
            .await
            .unwrap();

        assert_eq!(payload["rateLimited"], true);
        assert_eq!(payload["advertisesLimits"], true);
        assert_eq!(payload["results"].as_array().unwrap().len(), 5);
        assert_eq!(payload["results"][0]["headers"]["retry-after"], "30");
        assert!(payload["results"][0]["headers"].get("content-type").is_none());
        assert_eq!(progress.latest().unwrap()["results"].as_array().unwrap().len(), 5);
    }
}
