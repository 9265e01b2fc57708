// src/core/checks/markup.rs

//! Heuristic checks that fetch the target page once and inspect its markup:
//! accessibility, authentication surface and privacy/GDPR indicators.
//!
//! These are pattern matches, not verified findings.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use tracing::info;

use crate::core::checks::{fetch_page, CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;

static RE_TWO_FACTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)2fa|two[- ]factor").expect("valid 2FA regex"));
static RE_PRIVACY_POLICY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)privacy policy").expect("valid privacy regex"));
static RE_COOKIE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)cookie").expect("valid cookie regex"));

/// Which markup heuristic a `MarkupCheck` applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupKind {
    Accessibility,
    Auth,
    Privacy,
}

pub struct MarkupCheck {
    client: Client,
    kind: MarkupKind,
}

impl MarkupCheck {
    pub fn new(client: Client, kind: MarkupKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait]
impl CheckAdapter for MarkupCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let url = input.as_url()?;
        info!(url, kind = ?self.kind, "Starting markup check.");
        let page = fetch_page(&self.client, url).await?.require_success()?;
        let payload = match self.kind {
            MarkupKind::Accessibility => accessibility(&page.body),
            MarkupKind::Auth => auth(&page.body),
            MarkupKind::Privacy => privacy(&page.body),
        };
        info!(kind = ?self.kind, "Markup check finished.");
        Ok(payload)
    }
}

fn count(document: &Html, selector: &str) -> usize {
    Selector::parse(selector).map(|s| document.select(&s).count()).unwrap_or(0)
}

/// Images without `alt` and inputs with neither `aria-label` nor `placeholder`.
fn accessibility(body: &str) -> Value {
    let document = Html::parse_document(body);
    json!({
        "imagesWithoutAlt": count(&document, "img:not([alt])"),
        "inputsWithoutLabel": count(&document, "input:not([aria-label]):not([placeholder])"),
    })
}

/// Forms carrying a password field, and any mention of two-factor authentication.
fn auth(body: &str) -> Value {
    let document = Html::parse_document(body);
    let login_forms = Selector::parse("form")
        .ok()
        .zip(Selector::parse(r#"input[type="password"]"#).ok())
        .map(|(form, password)| {
            document
                .select(&form)
                .filter(|f| f.select(&password).next().is_some())
                .count()
        })
        .unwrap_or(0);
    json!({ "loginForms": login_forms, "has2FA": RE_TWO_FACTOR.is_match(body) })
}

fn privacy(body: &str) -> Value {
    json!({
        "hasPrivacyPolicy": RE_PRIVACY_POLICY.is_match(body),
        "hasCookieConsent": RE_COOKIE.is_match(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
        <img src="a.png"><img src="b.png" alt="B">
        <form action="/login">
            <input name="user" placeholder="User">
            <input type="password" name="pass">
        </form>
        <form action="/search"><input name="q" aria-label="Search"></form>
        <p>Enable Two-Factor authentication. Read our Privacy Policy.</p>
    </body></html>"#;

    #[test]
    fn accessibility_counts_unlabelled_elements() {
        let payload = accessibility(PAGE);
        assert_eq!(payload["imagesWithoutAlt"], 1);
        assert_eq!(payload["inputsWithoutLabel"], 1);
    }

    #[test]
    fn auth_counts_password_forms() {
        let payload = auth(PAGE);
        assert_eq!(payload["loginForms"], 1);
        assert_eq!(payload["has2FA"], true);
    }

    #[test]
    fn privacy_looks_for_policy_and_cookies() {
        let payload = privacy(PAGE);
        assert_eq!(payload["hasPrivacyPolicy"], true);
        assert_eq!(payload["hasCookieConsent"], false);
    }

    #[tokio::test]
    async fn runs_against_a_live_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let check = MarkupCheck::new(Client::new(), MarkupKind::Accessibility);
        let payload = check.run(CheckInput::Url(server.uri()), Progress::default()).await.unwrap();
        assert_eq!(payload["imagesWithoutAlt"], 1);
    }

    #[tokio::test]
    async fn error_pages_fail_the_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string(PAGE))
            .mount(&server)
            .await;

        let check = MarkupCheck::new(Client::new(), MarkupKind::Privacy);
        match check.run(CheckInput::Url(server.uri()), Progress::default()).await {
            Err(AdapterError::Remote(message)) => assert!(message.ends_with("returned HTTP 503"), "{message}"),
            other => panic!("expected a remote error, got {other:?}"),
        }
    }
}
