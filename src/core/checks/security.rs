// src/core/checks/security.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::core::checks::{fetch_page, CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;
use crate::core::models::{AnalysisFinding, Severity, Technology};

/// Where a fingerprint looks for its pattern.
enum Signal {
    Header(&'static str),
    Generator,
    Body,
    ScriptSrc,
    LinkHref,
    Cookie,
}

/// Detects one technology; the first capture group, if any, is its version.
struct Fingerprint {
    name: &'static str,
    category: &'static str,
    signal: Signal,
    pattern: &'static Lazy<Regex>,
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($re).expect("valid fingerprint regex"));
    };
}

pattern!(RE_NGINX, r"nginx(?:/([\d.]+))?");
pattern!(RE_APACHE, r"Apache(?:/([\d.]+))?");
pattern!(RE_IIS, r"Microsoft-IIS(?:/([\d.]+))?");
pattern!(RE_CLOUDFLARE, r"(?i)cloudflare");
pattern!(RE_LITESPEED, r"LiteSpeed");
pattern!(RE_PHP, r"PHP(?:/([\d.]+))?");
pattern!(RE_ASPNET_VERSION, r"([\d.]+)");
pattern!(RE_EXPRESS, r"Express");
pattern!(RE_NEXTJS_HEADER, r"Next\.js(?: ([\d.]+))?");
pattern!(RE_WORDPRESS, r"WordPress ?([\d.]+)?");
pattern!(RE_WP_ASSETS, r"/wp-content/|/wp-includes/");
pattern!(RE_JOOMLA, r"Joomla!");
pattern!(RE_DRUPAL, r"Drupal ?([\d.]+)?");
pattern!(RE_PHPSESSID, r"PHPSESSID");
pattern!(RE_JSESSIONID, r"JSESSIONID");
pattern!(RE_LARAVEL, r"laravel_session");
pattern!(RE_RAILS, r"_rails_session");
pattern!(RE_NEXT_STATIC, r"/_next/static/");
pattern!(RE_NUXT, r"__NUXT__");
pattern!(RE_ANGULAR, r#"ng-version="([\d.]+)""#);
pattern!(RE_REACT, r"react-dom|data-reactroot");
pattern!(RE_JQUERY, r"jquery[.-]?([\d]+\.[\d.]+)?(?:\.min|\.slim)?\.js");
pattern!(RE_BOOTSTRAP, r"bootstrap(?:@([\d.]+))?[^\s]*\.css");

static FINGERPRINTS: &[Fingerprint] = &[
    Fingerprint { name: "Nginx", category: "Web Server", signal: Signal::Header("server"), pattern: &RE_NGINX },
    Fingerprint { name: "Apache", category: "Web Server", signal: Signal::Header("server"), pattern: &RE_APACHE },
    Fingerprint { name: "IIS", category: "Web Server", signal: Signal::Header("server"), pattern: &RE_IIS },
    Fingerprint { name: "LiteSpeed", category: "Web Server", signal: Signal::Header("server"), pattern: &RE_LITESPEED },
    Fingerprint { name: "Cloudflare", category: "CDN / WAF", signal: Signal::Header("server"), pattern: &RE_CLOUDFLARE },
    Fingerprint { name: "PHP", category: "Language", signal: Signal::Header("x-powered-by"), pattern: &RE_PHP },
    Fingerprint { name: "PHP", category: "Language", signal: Signal::Cookie, pattern: &RE_PHPSESSID },
    Fingerprint { name: "ASP.NET", category: "Framework", signal: Signal::Header("x-aspnet-version"), pattern: &RE_ASPNET_VERSION },
    Fingerprint { name: "Express", category: "Framework", signal: Signal::Header("x-powered-by"), pattern: &RE_EXPRESS },
    Fingerprint { name: "Next.js", category: "JS Framework", signal: Signal::Header("x-powered-by"), pattern: &RE_NEXTJS_HEADER },
    Fingerprint { name: "Next.js", category: "JS Framework", signal: Signal::ScriptSrc, pattern: &RE_NEXT_STATIC },
    Fingerprint { name: "Nuxt.js", category: "JS Framework", signal: Signal::Body, pattern: &RE_NUXT },
    Fingerprint { name: "Angular", category: "JS Framework", signal: Signal::Body, pattern: &RE_ANGULAR },
    Fingerprint { name: "React", category: "JS Library", signal: Signal::Body, pattern: &RE_REACT },
    Fingerprint { name: "jQuery", category: "JS Library", signal: Signal::ScriptSrc, pattern: &RE_JQUERY },
    Fingerprint { name: "Bootstrap", category: "UI Framework", signal: Signal::LinkHref, pattern: &RE_BOOTSTRAP },
    Fingerprint { name: "WordPress", category: "CMS", signal: Signal::Generator, pattern: &RE_WORDPRESS },
    Fingerprint { name: "WordPress", category: "CMS", signal: Signal::Body, pattern: &RE_WP_ASSETS },
    Fingerprint { name: "Joomla", category: "CMS", signal: Signal::Generator, pattern: &RE_JOOMLA },
    Fingerprint { name: "Drupal", category: "CMS", signal: Signal::Generator, pattern: &RE_DRUPAL },
    Fingerprint { name: "Java", category: "Language", signal: Signal::Cookie, pattern: &RE_JSESSIONID },
    Fingerprint { name: "Laravel", category: "Framework", signal: Signal::Cookie, pattern: &RE_LARAVEL },
    Fingerprint { name: "Ruby on Rails", category: "Framework", signal: Signal::Cookie, pattern: &RE_RAILS },
];

/// A path that should never be publicly readable, and how to recognise its content.
struct ExposedPath {
    path: &'static str,
    code: &'static str,
    looks_exposed: fn(&str) -> bool,
}

static EXPOSED_PATHS: &[ExposedPath] = &[
    ExposedPath { path: "/.git/HEAD", code: "SEC_EXPOSED_GIT", looks_exposed: |body| body.trim_start().starts_with("ref:") },
    ExposedPath {
        path: "/.env",
        code: "SEC_EXPOSED_ENV",
        looks_exposed: |body| {
            !body.trim_start().starts_with('<')
                && body.lines().any(|l| l.split_once('=').is_some_and(|(k, _)| !k.is_empty() && !k.contains(' ')))
        },
    },
    ExposedPath { path: "/server-status", code: "SEC_EXPOSED_SERVER_STATUS", looks_exposed: |body| body.contains("Server Status") },
];

/// Security scan: technology fingerprinting, version disclosure and probes
/// for commonly exposed files. Heuristic, not a verified vulnerability scan.
pub struct SecurityCheck {
    client: Client,
}

impl SecurityCheck {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn probe_exposed_paths(&self, base: &reqwest::Url) -> Vec<AnalysisFinding> {
        let mut findings = Vec::new();
        for probe in EXPOSED_PATHS {
            let Ok(url) = base.join(probe.path) else { continue };
            let body = match self.client.get(url).send().await {
                Ok(response) if response.status() == StatusCode::OK => response.text().await.unwrap_or_default(),
                Ok(response) => {
                    debug!(path = probe.path, status = %response.status(), "Path not exposed.");
                    continue;
                }
                Err(e) => {
                    debug!(path = probe.path, error = %e, "Probe failed.");
                    continue;
                }
            };
            if (probe.looks_exposed)(&body) {
                info!(path = probe.path, "Exposed path found.");
                findings.push(AnalysisFinding::new(Severity::Critical, probe.code));
            }
        }
        findings
    }
}

#[async_trait]
impl CheckAdapter for SecurityCheck {
    async fn run(&self, input: CheckInput, progress: Progress) -> Result<Value, AdapterError> {
        let url = input.as_url()?;
        info!(url, "Starting security scan.");
        let page = fetch_page(&self.client, url).await?;

        let technologies = fingerprint(&page.headers, &page.body);
        let mut analysis = disclosure_findings(&page.headers);
        progress.publish(json!({ "technologies": technologies, "analysis": analysis }));

        analysis.extend(self.probe_exposed_paths(&page.url).await);
        info!(technologies = technologies.len(), findings = analysis.len(), "Security scan finished.");
        Ok(json!({ "technologies": technologies, "analysis": analysis }))
    }
}

/// Applies every fingerprint; a technology seen several times keeps the first version found.
fn fingerprint(headers: &HeaderMap, body: &str) -> Vec<Technology> {
    let document = Html::parse_document(body);
    let cookies = headers
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    let scripts = attribute_values(&document, "script[src]", "src");
    let links = attribute_values(&document, "link[href]", "href");
    let generator = attribute_values(&document, r#"meta[name="generator"]"#, "content");

    let mut found: BTreeMap<&str, Technology> = BTreeMap::new();
    for rule in FINGERPRINTS {
        let haystacks: Vec<&str> = match rule.signal {
            Signal::Header(name) => headers.get(name).and_then(|v| v.to_str().ok()).into_iter().collect(),
            Signal::Generator => generator.iter().map(String::as_str).collect(),
            Signal::Body => vec![body],
            Signal::ScriptSrc => scripts.iter().map(String::as_str).collect(),
            Signal::LinkHref => links.iter().map(String::as_str).collect(),
            Signal::Cookie => vec![cookies.as_str()],
        };
        let Some(version) = haystacks.into_iter().find_map(|text| match_version(text, rule.pattern)) else {
            continue;
        };
        debug!(tech = rule.name, version = ?version, "Fingerprint matched.");
        let entry = found.entry(rule.name).or_insert_with(|| Technology {
            name: rule.name.to_string(),
            category: rule.category.to_string(),
            version: None,
        });
        if entry.version.is_none() {
            entry.version = version;
        }
    }
    found.into_values().collect()
}

/// `None` when the pattern does not match; `Some(version)` otherwise, where the
/// version is the first non-empty capture group.
fn match_version(text: &str, re: &Regex) -> Option<Option<String>> {
    re.captures(text).map(|caps| {
        caps.get(1).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty())
    })
}

fn attribute_values(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr).map(str::to_string))
        .collect()
}

/// Headers that leak exact software versions.
fn disclosure_findings(headers: &HeaderMap) -> Vec<AnalysisFinding> {
    static RE_VERSIONED: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(\.\d+)*").expect("valid version regex"));
    let mut findings = Vec::new();
    for (header, code) in [
        ("server", "SEC_SERVER_VERSION_DISCLOSED"),
        ("x-powered-by", "SEC_POWERED_BY_DISCLOSED"),
        ("x-aspnet-version", "SEC_ASPNET_VERSION_DISCLOSED"),
    ] {
        let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) else { continue };
        if header == "x-aspnet-version" || RE_VERSIONED.is_match(value) {
            findings.push(AnalysisFinding::new(Severity::Warning, code));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn fingerprints_merge_and_keep_versions() {
        let headers = headers(&[("server", "nginx/1.25.3"), ("set-cookie", "PHPSESSID=abc; path=/")]);
        let body = r#"<html><head>
            <meta name="generator" content="WordPress 6.4.2">
            <script src="/js/jquery-3.7.1.min.js"></script>
        </head><body><img src="/wp-content/uploads/a.png"></body></html>"#;

        let techs = fingerprint(&headers, body);
        let find = |name: &str| techs.iter().find(|t| t.name == name).cloned();

        assert_eq!(find("Nginx").unwrap().version.as_deref(), Some("1.25.3"));
        assert_eq!(find("WordPress").unwrap().version.as_deref(), Some("6.4.2"));
        assert_eq!(find("jQuery").unwrap().version.as_deref(), Some("3.7.1"));
        assert_eq!(find("PHP").unwrap().version, None);
        assert_eq!(techs.iter().filter(|t| t.name == "WordPress").count(), 1);
        assert!(find("React").is_none());
    }

    #[test]
    fn only_versioned_headers_are_disclosures() {
        let codes = |h: HeaderMap| disclosure_findings(&h).into_iter().map(|f| f.code).collect::<Vec<_>>();
        assert_eq!(codes(headers(&[("server", "nginx")])), Vec::<String>::new());
        assert_eq!(
            codes(headers(&[("server", "Apache/2.4.57"), ("x-powered-by", "PHP/8.2.1")])),
            vec!["SEC_SERVER_VERSION_DISCLOSED", "SEC_POWERED_BY_DISCLOSED"]
        );
    }

    #[tokio::test]
    async fn exposed_git_head_is_critical() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).insert_header("server", "nginx").set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/.git/HEAD"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ref: refs/heads/main\n"))
            .mount(&server)
            .await;
        // A catch-all HTML page must not count as an exposed .env.
        Mock::given(method("GET"))
            .and(path("/.env"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>a=b</html>"))
            .mount(&server)
            .await;

        let payload = SecurityCheck::new(Client::new())
            .run(CheckInput::Url(server.uri()), Progress::default())
            .await
            .unwrap();

        assert_eq!(payload["technologies"][0]["name"], "Nginx");
        let codes: Vec<&str> = payload["analysis"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["code"].as_str())
            .collect();
        assert_eq!(codes, vec!["SEC_EXPOSED_GIT"]);
    }
}
