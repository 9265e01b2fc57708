// src/core/checks/headers.rs

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::core::checks::{CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;
use crate::core::models::{AnalysisFinding, Severity};

/// Security headers the analysis looks for, with the finding raised when absent.
const EXPECTED_HEADERS: &[(&str, Severity, &str)] = &[
    ("strict-transport-security", Severity::Warning, "HEADERS_HSTS_MISSING"),
    ("content-security-policy", Severity::Warning, "HEADERS_CSP_MISSING"),
    ("x-frame-options", Severity::Warning, "HEADERS_X_FRAME_OPTIONS_MISSING"),
    ("x-content-type-options", Severity::Info, "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING"),
];

/// HTTP security header analysis.
pub struct HeadersCheck {
    client: Client,
}

impl HeadersCheck {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CheckAdapter for HeadersCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let url = input.as_url()?;
        info!(url, "Starting headers check.");

        let response = self.client.get(url).send().await?;
        info!(status = %response.status(), "Received HTTP response for headers check.");

        let headers = response.headers();
        let analysis = analyze_headers(headers);
        info!(findings = analysis.len(), "Headers check finished.");

        Ok(json!({
            "status": response.status().as_u16(),
            "headers": header_map_to_json(headers),
            "analysis": analysis,
        }))
    }
}

/// Flattens a `HeaderMap` into a JSON object. Repeated headers are joined
/// with `, ` and non-UTF-8 values are replaced by a placeholder.
pub fn header_map_to_json(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .map(|v| {
                v.to_str().unwrap_or_else(|_| {
                    warn!(header_name = %name, "Header contained invalid UTF-8.");
                    "[Invalid UTF-8]"
                })
            })
            .collect();
        map.insert(name.as_str().to_string(), Value::String(values.join(", ")));
    }
    Value::Object(map)
}

/// Flags each expected security header that is missing from the response.
fn analyze_headers(headers: &HeaderMap) -> Vec<AnalysisFinding> {
    EXPECTED_HEADERS
        .iter()
        .filter(|(name, _, _)| {
            let missing = !headers.contains_key(*name);
            debug!(header_name = name, missing, "Checked header.");
            missing
        })
        .map(|(_, severity, code)| AnalysisFinding::new(*severity, code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn reports_headers_and_missing_protections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("strict-transport-security", "max-age=63072000")
                    .insert_header("x-content-type-options", "nosniff"),
            )
            .mount(&server)
            .await;

        let check = HeadersCheck::new(Client::new());
        let payload = check
            .run(CheckInput::Url(server.uri()), Progress::default())
            .await
            .unwrap();

        assert_eq!(payload["status"], 200);
        assert_eq!(payload["headers"]["strict-transport-security"], "max-age=63072000");
        let codes: Vec<&str> = payload["analysis"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["HEADERS_CSP_MISSING", "HEADERS_X_FRAME_OPTIONS_MISSING"]);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let check = HeadersCheck::new(Client::new());
        let result = check
            .run(CheckInput::Url("http://127.0.0.1:1".into()), Progress::default())
            .await;
        assert!(matches!(result, Err(AdapterError::Http(_))));
    }
}
