// src/core/checks/dns.rs

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::core::checks::{whois, CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;
use crate::core::models::{AnalysisFinding, Severity};

/// Common DKIM selectors probed when the real one is unknown.
const COMMON_DKIM_SELECTORS: &[&str] = &["google", "selector1", "selector2", "default", "dkim"];

type Lookup<T> = Result<T, String>;

/// Domain & DNS information: resolver records, email-authentication records and WHOIS.
///
/// Individual lookup failures are reported inline as messages; the check as a
/// whole only fails if its input is malformed.
pub struct DnsCheck;

#[async_trait]
impl CheckAdapter for DnsCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let host = input.as_host()?;
        // Ports never matter for DNS.
        let domain = host.split(':').next().unwrap_or(host);
        // Mail-authentication records live on the root domain.
        let root = domain.strip_prefix("www.").unwrap_or(domain);
        info!(domain, "Starting DNS check.");

        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

        let (addresses, mx, ns, txt, dmarc, dkim, caa, whois) = tokio::join!(
            lookup_addresses(&resolver, domain),
            lookup_mx(&resolver, domain),
            lookup_ns(&resolver, root),
            lookup_txt(&resolver, root),
            lookup_dmarc(&resolver, root),
            lookup_dkim(&resolver, root),
            lookup_caa(&resolver, root),
            whois::lookup(root),
        );

        let spf = find_spf(&txt);
        let analysis = analyze_dns(&spf, &dmarc, &dkim, &caa);
        info!(findings = analysis.len(), "DNS check finished.");

        let whois = whois.unwrap_or_else(|e| {
            warn!(domain = root, error = %e, "WHOIS lookup failed.");
            e.to_string()
        });

        Ok(json!({
            "domain": domain,
            "dns": {
                "addresses": inline(addresses),
                "mx": inline(mx),
                "ns": inline(ns),
                "txt": inline(txt),
                "spf": inline(spf),
                "dmarc": inline(dmarc),
                "dkim": inline(dkim),
                "caa": inline(caa),
            },
            "whois": whois,
            "analysis": analysis,
        }))
    }
}

/// Renders a lookup as its value, or as its error message.
fn inline<T: serde::Serialize>(lookup: Lookup<T>) -> Value {
    match lookup {
        Ok(value) => json!(value),
        Err(message) => Value::String(message),
    }
}

fn analyze_dns(
    spf: &Lookup<Option<String>>,
    dmarc: &Lookup<Option<(String, Option<String>)>>,
    dkim: &Lookup<Vec<Value>>,
    caa: &Lookup<Vec<String>>,
) -> Vec<AnalysisFinding> {
    let mut analyses = Vec::new();

    match dmarc {
        Ok(Some((_, Some(policy)))) if policy == "none" => {
            debug!("DMARC policy is 'none'.");
            analyses.push(AnalysisFinding::new(Severity::Warning, "DNS_DMARC_POLICY_NONE"));
        }
        Ok(None) => analyses.push(AnalysisFinding::new(Severity::Critical, "DNS_DMARC_MISSING")),
        _ => {}
    }

    match spf {
        Ok(Some(record)) if record.ends_with("~all") => {
            analyses.push(AnalysisFinding::new(Severity::Info, "DNS_SPF_POLICY_SOFTFAIL"));
        }
        Ok(Some(record)) if record.ends_with("?all") => {
            analyses.push(AnalysisFinding::new(Severity::Info, "DNS_SPF_POLICY_NEUTRAL"));
        }
        Ok(None) => analyses.push(AnalysisFinding::new(Severity::Warning, "DNS_SPF_MISSING")),
        _ => {}
    }

    if matches!(dkim, Ok(records) if records.is_empty()) {
        analyses.push(AnalysisFinding::new(Severity::Info, "DNS_DKIM_MISSING"));
    }
    if matches!(caa, Ok(records) if records.is_empty()) {
        analyses.push(AnalysisFinding::new(Severity::Info, "DNS_CAA_MISSING"));
    }

    analyses
}

async fn lookup_addresses(resolver: &TokioAsyncResolver, target: &str) -> Lookup<Vec<String>> {
    debug!(target, "Looking up A/AAAA records.");
    resolver
        .lookup_ip(target)
        .await
        .map(|ips| ips.iter().map(|ip| ip.to_string()).collect())
        .map_err(|e| dns_error(target, "A/AAAA", e))
}

async fn lookup_mx(resolver: &TokioAsyncResolver, target: &str) -> Lookup<Vec<String>> {
    resolver
        .mx_lookup(target)
        .await
        .map(|mx| {
            mx.iter()
                .map(|r| format!("{} {}", r.preference(), r.exchange()))
                .collect()
        })
        .map_err(|e| dns_error(target, "MX", e))
}

async fn lookup_ns(resolver: &TokioAsyncResolver, target: &str) -> Lookup<Vec<String>> {
    resolver
        .ns_lookup(target)
        .await
        .map(|ns| ns.iter().map(|r| r.to_string()).collect())
        .map_err(|e| dns_error(target, "NS", e))
}

async fn lookup_txt(resolver: &TokioAsyncResolver, target: &str) -> Lookup<Vec<String>> {
    match resolver.txt_lookup(target).await {
        Ok(txt) => Ok(txt.iter().map(|r| r.to_string()).collect()),
        Err(e) if is_no_records(&e) => Ok(Vec::new()),
        Err(e) => Err(dns_error(target, "TXT", e)),
    }
}

/// SPF lives in a TXT record starting with `v=spf1`.
fn find_spf(txt: &Lookup<Vec<String>>) -> Lookup<Option<String>> {
    txt.as_ref()
        .map(|records| records.iter().find(|r| r.starts_with("v=spf1")).cloned())
        .map_err(Clone::clone)
}

/// DMARC lives in a TXT record at `_dmarc.<domain>`; returns the record and its `p=` policy.
async fn lookup_dmarc(
    resolver: &TokioAsyncResolver,
    target: &str,
) -> Lookup<Option<(String, Option<String>)>> {
    let dmarc_target = format!("_dmarc.{target}");
    match resolver.txt_lookup(&dmarc_target).await {
        Ok(txt_records) => Ok(txt_records.iter().next().map(|record| {
            let record = record.to_string();
            let policy = parse_dmarc_policy(&record);
            (record, policy)
        })),
        Err(e) if is_no_records(&e) => Ok(None),
        Err(e) => Err(dns_error(&dmarc_target, "DMARC", e)),
    }
}

fn parse_dmarc_policy(record: &str) -> Option<String> {
    record
        .split(';')
        .find(|s| s.trim().starts_with("p="))
        .and_then(|s| s.trim().split('=').nth(1))
        .map(|s| s.trim().to_string())
}

async fn lookup_dkim(resolver: &TokioAsyncResolver, target: &str) -> Lookup<Vec<Value>> {
    let mut found = Vec::new();
    for selector in COMMON_DKIM_SELECTORS {
        let dkim_target = format!("{selector}._domainkey.{target}");
        match resolver.txt_lookup(&dkim_target).await {
            Ok(txt_records) => {
                for record in txt_records.iter() {
                    let record = record.to_string();
                    if record.starts_with("v=DKIM1") {
                        debug!(selector, "Found DKIM record.");
                        found.push(json!({ "selector": selector, "record": record }));
                    }
                }
            }
            // Most selectors do not exist on any given domain.
            Err(e) => debug!(selector, error = %e, "No DKIM record for selector."),
        }
    }
    Ok(found)
}

async fn lookup_caa(resolver: &TokioAsyncResolver, target: &str) -> Lookup<Vec<String>> {
    match resolver.lookup(target, RecordType::CAA).await {
        Ok(caa) => Ok(caa.iter().map(|r| r.to_string()).collect()),
        Err(e) if is_no_records(&e) => Ok(Vec::new()),
        Err(e) => Err(dns_error(target, "CAA", e)),
    }
}

fn is_no_records(e: &hickory_resolver::error::ResolveError) -> bool {
    matches!(e.kind(), hickory_resolver::error::ResolveErrorKind::NoRecordsFound { .. })
}

fn dns_error(target: &str, kind: &str, e: hickory_resolver::error::ResolveError) -> String {
    warn!(target, kind, error = %e, "DNS lookup failed.");
    format!("DNS Error: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dmarc_policy_is_parsed() {
        assert_eq!(
            parse_dmarc_policy("v=DMARC1; p=reject; rua=mailto:d@example.com").as_deref(),
            Some("reject")
        );
        assert_eq!(parse_dmarc_policy("v=DMARC1"), None);
    }

    #[test]
    fn spf_is_picked_from_txt_records() {
        let txt = Ok(vec!["google-site-verification=abc".to_string(), "v=spf1 -all".to_string()]);
        assert_eq!(find_spf(&txt), Ok(Some("v=spf1 -all".to_string())));
        assert_eq!(find_spf(&Ok(vec![])), Ok(None));
    }

    #[test]
    fn missing_records_raise_findings() {
        let codes: Vec<String> = analyze_dns(&Ok(None), &Ok(None), &Ok(vec![]), &Ok(vec![]))
            .into_iter()
            .map(|f| f.code)
            .collect();
        assert_eq!(
            codes,
            vec!["DNS_DMARC_MISSING", "DNS_SPF_MISSING", "DNS_DKIM_MISSING", "DNS_CAA_MISSING"]
        );
    }

    #[test]
    fn lookup_errors_do_not_raise_findings() {
        fn err<T>() -> Lookup<T> {
            Err("DNS Error: timeout".to_string())
        }
        assert!(analyze_dns(&err(), &err(), &err(), &err()).is_empty());
    }

    #[test]
    fn weak_policies_are_flagged() {
        let spf = Ok(Some("v=spf1 include:_spf.example.com ~all".to_string()));
        let dmarc = Ok(Some(("v=DMARC1; p=none".to_string(), Some("none".to_string()))));
        let codes: Vec<String> = analyze_dns(&spf, &dmarc, &Ok(vec![json!({})]), &Ok(vec!["0 issue \"letsencrypt.org\"".into()]))
            .into_iter()
            .map(|f| f.code)
            .collect();
        assert_eq!(codes, vec!["DNS_DMARC_POLICY_NONE", "DNS_SPF_POLICY_SOFTFAIL"]);
    }
}
