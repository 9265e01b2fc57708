// src/core/checks/social.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use tracing::info;

use crate::core::checks::{fetch_page, CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;

/// Social media metadata validation (Open Graph and Twitter Card tags).
pub struct SocialCheck {
    client: Client,
}

impl SocialCheck {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CheckAdapter for SocialCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let url = input.as_url()?;
        info!(url, "Starting social metadata check.");
        let page = fetch_page(&self.client, url).await?.require_success()?;
        let payload = extract_social_tags(&page.body);
        info!(missing = %payload["missing"], "Social metadata check finished.");
        Ok(payload)
    }
}

fn extract_social_tags(body: &str) -> Value {
    let document = Html::parse_document(body);
    let open_graph = collect_meta(&document, r#"meta[property^="og:"]"#, "property");
    let twitter = collect_meta(&document, r#"meta[name^="twitter:"]"#, "name");

    let mut missing = Vec::new();
    if open_graph.is_empty() {
        missing.push("Open Graph");
    }
    if twitter.is_empty() {
        missing.push("Twitter Card");
    }

    json!({ "openGraph": open_graph, "twitter": twitter, "missing": missing })
}

/// Maps the `key_attr` of every element matching `selector` to its `content`.
fn collect_meta(document: &Html, selector: &str, key_attr: &str) -> BTreeMap<String, String> {
    let Ok(selector) = Selector::parse(selector) else {
        return BTreeMap::new();
    };
    document
        .select(&selector)
        .filter_map(|el| {
            let key = el.value().attr(key_attr)?;
            let content = el.value().attr("content")?;
            Some((key.to_string(), content.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn collects_tags_and_reports_missing_families() {
        let html = r#"<html><head>
            <meta property="og:title" content="Example">
            <meta property="og:image" content="https://example.com/a.png">
            <meta property="og:empty">
        </head></html>"#;
        let payload = extract_social_tags(html);

        assert_eq!(payload["openGraph"]["og:title"], "Example");
        assert_eq!(payload["openGraph"].as_object().unwrap().len(), 2);
        assert_eq!(payload["missing"], json!(["Twitter Card"]));
    }

    #[tokio::test]
    async fn fetches_and_parses_the_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<meta name="twitter:card" content="summary"><meta property="og:title" content="T">"#,
            ))
            .mount(&server)
            .await;

        let payload = SocialCheck::new(Client::new())
            .run(CheckInput::Url(server.uri()), Progress::default())
            .await
            .unwrap();
        assert_eq!(payload["twitter"]["twitter:card"], "summary");
        assert_eq!(payload["missing"], json!([]));
    }

    #[tokio::test]
    async fn missing_pages_are_not_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"<meta property="og:title" content="Not Found">"#))
            .mount(&server)
            .await;

        let outcome = SocialCheck::new(Client::new())
            .run(CheckInput::Url(server.uri()), Progress::default())
            .await;
        assert!(matches!(outcome, Err(AdapterError::Remote(_))), "{outcome:?}");
    }
}
