// src/core/checks/ssl.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use serde_json::{json, Value};
use std::net::TcpStream;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info};
use x509_parser::prelude::*;

use crate::core::checks::{CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;
use crate::core::models::{AnalysisFinding, CertificateInfo, Severity, SslData};

/// Certificates expiring within this many days raise a warning.
const EXPIRY_WARNING_DAYS: i64 = 30;

/// SSL certificate validation against `host:443`.
pub struct SslCheck;

#[async_trait]
impl CheckAdapter for SslCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let host = input.as_host()?.to_string();
        info!(host = %host, "Starting SSL/TLS check.");

        debug!("Spawning blocking task for TLS connection.");
        let data = spawn_blocking(move || perform_tls_scan(&host))
            .await
            .map_err(|e| {
                error!(panic = %e, "Blocking SSL task failed.");
                AdapterError::Tls(format!("Task failed: {e}"))
            })??;

        let analysis = analyze_ssl(&data);
        info!(findings = analysis.len(), "SSL/TLS check finished.");
        Ok(json!({ "certificate": data, "analysis": analysis }))
    }
}

/// Splits an optional `:port` suffix off the host, defaulting to 443.
fn split_host_port(host: &str) -> (&str, u16) {
    match host.rsplit_once(':') {
        Some((name, port)) => match port.parse() {
            Ok(port) => (name, port),
            Err(_) => (host, 443),
        },
        None => (host, 443),
    }
}

fn perform_tls_scan(target: &str) -> Result<SslData, AdapterError> {
    let (host, port) = split_host_port(target);
    debug!(host, port, "Performing TLS connection and handshake.");

    let connector = TlsConnector::new().map_err(|e| {
        error!(error = %e, "Failed to create TlsConnector");
        AdapterError::Tls(format!("TlsConnector Error: {e}"))
    })?;

    let stream = TcpStream::connect((host, port)).map_err(|e| {
        error!(error = %e, "TCP connection failed");
        AdapterError::Tls(format!("TCP Connection Error: {e}"))
    })?;

    let stream = connector.connect(host, stream).map_err(|e| {
        error!(error = %e, "TLS handshake failed");
        AdapterError::Tls(format!("TLS Handshake Error: {e}"))
    })?;

    let cert = stream
        .peer_certificate()
        .map_err(|e| AdapterError::Tls(format!("Could not get peer certificate: {e}")))?
        .ok_or_else(|| AdapterError::Tls("Server did not provide a certificate.".to_string()))?;

    let cert_der = cert
        .to_der()
        .map_err(|e| AdapterError::Tls(format!("Could not convert certificate to DER: {e}")))?;

    let (_, x509) = parse_x509_certificate(&cert_der).map_err(|e| {
        error!(error = %e, "Failed to parse X.509 certificate");
        AdapterError::Parse(format!("X.509 Parse Error: {e}"))
    })?;

    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Parsed certificate.");

    let validity = x509.validity();
    let not_after = asn1_time_to_chrono_utc(&validity.not_after);
    let not_before = asn1_time_to_chrono_utc(&validity.not_before);
    let now = Utc::now();

    Ok(SslData {
        host: host.to_string(),
        is_valid: now > not_before && now < not_after,
        certificate_info: CertificateInfo {
            subject_name: x509.subject().to_string(),
            issuer_name: x509.issuer().to_string(),
            not_before,
            not_after,
            days_until_expiry: not_after.signed_duration_since(now).num_days(),
        },
    })
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

fn analyze_ssl(data: &SslData) -> Vec<AnalysisFinding> {
    let mut analyses = Vec::new();
    if !data.is_valid {
        debug!(expiry_date = %data.certificate_info.not_after, "Certificate outside its validity window.");
        analyses.push(AnalysisFinding::new(Severity::Critical, "SSL_EXPIRED"));
    }
    let days_left = data.certificate_info.days_until_expiry;
    if (0..=EXPIRY_WARNING_DAYS).contains(&days_left) {
        debug!(days_left, "Certificate is expiring soon.");
        analyses.push(AnalysisFinding::new(Severity::Warning, "SSL_EXPIRING_SOON"));
    }
    analyses
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn data(valid: bool, days: i64) -> SslData {
        let now = Utc::now();
        SslData {
            host: "example.com".into(),
            is_valid: valid,
            certificate_info: CertificateInfo {
                subject_name: "CN=example.com".into(),
                issuer_name: "CN=Test CA".into(),
                not_before: now - Duration::days(60),
                not_after: now + Duration::days(days),
                days_until_expiry: days,
            },
        }
    }

    #[test]
    fn healthy_certificate_has_no_findings() {
        assert!(analyze_ssl(&data(true, 200)).is_empty());
    }

    #[test]
    fn expiring_and_expired_certificates_are_flagged() {
        let codes = |d: &SslData| analyze_ssl(d).into_iter().map(|f| f.code).collect::<Vec<_>>();
        assert_eq!(codes(&data(true, 10)), vec!["SSL_EXPIRING_SOON"]);
        assert_eq!(codes(&data(false, -3)), vec!["SSL_EXPIRED"]);
    }

    #[test]
    fn port_suffix_is_honoured() {
        assert_eq!(split_host_port("example.com"), ("example.com", 443));
        assert_eq!(split_host_port("example.com:8443"), ("example.com", 8443));
    }

    #[tokio::test]
    async fn url_input_is_rejected() {
        let result = SslCheck
            .run(CheckInput::Url("https://example.com".into()), Progress::default())
            .await;
        assert!(matches!(result, Err(AdapterError::Parse(_))));
    }
}
