// src/core/checks/links.rs

use std::collections::BTreeSet;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode, Url};
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::LinkSettings;
use crate::core::checks::{fetch_page, CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BrokenLink {
    pub url: String,
    pub reason: String,
}

/// Broken-link crawler: checks every link on the target page, one level deep.
///
/// Publishes the running list of broken links after each checked link so a
/// timed-out crawl still reports what it found.
pub struct LinksCheck {
    client: Client,
    settings: LinkSettings,
}

impl LinksCheck {
    pub fn new(client: Client, settings: LinkSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl CheckAdapter for LinksCheck {
    async fn run(&self, input: CheckInput, progress: Progress) -> Result<Value, AdapterError> {
        let url = input.as_url()?;
        info!(url, "Starting broken link check.");
        let page = fetch_page(&self.client, url).await?;
        let links = collect_links(&page.url, &page.body, self.settings.max_links);
        debug!(count = links.len(), "Collected links.");

        let mut broken = Vec::new();
        let mut checked = 0usize;
        let mut results = stream::iter(links)
            .map(|link| async move {
                let verdict = probe(&self.client, &link).await;
                (link, verdict)
            })
            .buffer_unordered(self.settings.concurrency.max(1));

        while let Some((link, verdict)) = results.next().await {
            checked += 1;
            if let Err(reason) = verdict {
                debug!(link = %link, reason = %reason, "Broken link.");
                broken.push(BrokenLink { url: link.to_string(), reason });
            }
            progress.publish(json!({ "brokenLinks": broken, "checked": checked }));
        }

        info!(checked, broken = broken.len(), "Broken link check finished.");
        Ok(json!({ "brokenLinks": broken, "checked": checked }))
    }
}

/// HTTP(S) links on the page, resolved against `base`, deduplicated, capped at `max`.
fn collect_links(base: &Url, body: &str, max: usize) -> Vec<Url> {
    let document = Html::parse_document(body);
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    let mut links = Vec::new();
    for href in document.select(&anchor).filter_map(|a| a.value().attr("href")) {
        let Ok(mut link) = base.join(href.trim()) else {
            continue;
        };
        if !matches!(link.scheme(), "http" | "https") {
            continue;
        }
        link.set_fragment(None);
        if seen.insert(link.to_string()) {
            links.push(link);
            if links.len() >= max {
                break;
            }
        }
    }
    links
}

/// `Ok` for a healthy link, otherwise the reason it is considered broken.
async fn probe(client: &Client, link: &Url) -> Result<(), String> {
    let status = match client.head(link.clone()).send().await {
        Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => client
            .get(link.clone())
            .send()
            .await
            .map(|r| r.status())
            .map_err(|e| e.to_string())?,
        Ok(response) => response.status(),
        Err(e) => return Err(e.to_string()),
    };
    if status.is_client_error() || status.is_server_error() {
        Err(format!("HTTP {}", status.as_u16()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn links_are_resolved_deduplicated_and_capped() {
        let base = Url::parse("https://example.com/docs/").unwrap();
        let body = r##"
            <a href="intro">Intro</a>
            <a href="/about#team">About</a>
            <a href="/about">About again</a>
            <a href="mailto:hi@example.com">Mail</a>
            <a href="https://other.org/">Other</a>
        "##;

        let links: Vec<String> = collect_links(&base, body, 10).iter().map(Url::to_string).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/docs/intro",
                "https://example.com/about",
                "https://other.org/",
            ]
        );
        assert_eq!(collect_links(&base, body, 1).len(), 1);
    }

    #[tokio::test]
    async fn reports_broken_links_and_falls_back_to_get() {
        let server = MockServer::start().await;
        let body = r#"<a href="/ok">ok</a><a href="/gone">gone</a><a href="/no-head">no head</a>"#;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/no-head"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/no-head"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let progress = Progress::default();
        let check = LinksCheck::new(Client::new(), LinkSettings::default());
        let payload = check.run(CheckInput::Url(format!("{}/", server.uri())), progress.clone()).await.unwrap();

        assert_eq!(payload["checked"], 3);
        let broken = payload["brokenLinks"].as_array().unwrap();
        assert_eq!(broken.len(), 1);
        assert!(broken[0]["url"].as_str().unwrap().ends_with("/gone"));
        assert_eq!(broken[0]["reason"], "HTTP 404");
        assert_eq!(progress.latest().unwrap()["checked"], 3);
    }
}
