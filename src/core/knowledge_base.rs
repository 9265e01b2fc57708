// src/core/knowledge_base.rs

//! Static catalogue of the finding codes adapters emit, with the title and
//! remediation advice shown next to them in the results panel and exports.

use crate::core::models::{CheckId, Severity};

/// Human-readable context for one finding code.
#[derive(Debug)]
pub struct FindingDetail {
    pub code: &'static str,
    pub title: &'static str,
    /// The check that emits this code.
    pub source: CheckId,
    pub severity: Severity,
    pub remediation: &'static str,
}

static FINDINGS: &[FindingDetail] = &[
    // DNS and mail authentication
    FindingDetail {
        code: "DNS_DMARC_MISSING",
        title: "No DMARC record",
        source: CheckId::Dns,
        severity: Severity::Critical,
        remediation: "Publish a TXT record at _dmarc.<domain>, starting with 'v=DMARC1; p=none;' and tightening to quarantine or reject once reports look clean.",
    },
    FindingDetail {
        code: "DNS_DMARC_POLICY_NONE",
        title: "DMARC policy only monitors",
        source: CheckId::Dns,
        severity: Severity::Warning,
        remediation: "Move the DMARC policy from 'p=none' to 'p=quarantine' or 'p=reject' so spoofed mail is actually stopped.",
    },
    FindingDetail {
        code: "DNS_SPF_MISSING",
        title: "No SPF record",
        source: CheckId::Dns,
        severity: Severity::Warning,
        remediation: "Add a 'v=spf1 ... -all' TXT record listing every service allowed to send mail for the domain.",
    },
    FindingDetail {
        code: "DNS_SPF_POLICY_SOFTFAIL",
        title: "SPF ends in soft fail (~all)",
        source: CheckId::Dns,
        severity: Severity::Info,
        remediation: "Once all senders are listed, switch the SPF qualifier from '~all' to '-all'.",
    },
    FindingDetail {
        code: "DNS_SPF_POLICY_NEUTRAL",
        title: "SPF ends in neutral (?all)",
        source: CheckId::Dns,
        severity: Severity::Info,
        remediation: "A neutral SPF record gives receivers no guidance. Use '~all' or, better, '-all'.",
    },
    FindingDetail {
        code: "DNS_DKIM_MISSING",
        title: "No DKIM key on common selectors",
        source: CheckId::Dns,
        severity: Severity::Info,
        remediation: "Enable DKIM signing at your mail provider and publish its key. A custom selector may simply not have been probed.",
    },
    FindingDetail {
        code: "DNS_CAA_MISSING",
        title: "No CAA record",
        source: CheckId::Dns,
        severity: Severity::Info,
        remediation: "Add CAA records naming the certificate authorities allowed to issue for the domain.",
    },
    // TLS certificate
    FindingDetail {
        code: "SSL_EXPIRED",
        title: "Certificate has expired",
        source: CheckId::Ssl,
        severity: Severity::Critical,
        remediation: "Renew and deploy the certificate now, and automate renewal (for example with an ACME client).",
    },
    FindingDetail {
        code: "SSL_EXPIRING_SOON",
        title: "Certificate expires within 30 days",
        source: CheckId::Ssl,
        severity: Severity::Warning,
        remediation: "Renew the certificate before it lapses and check that automated renewal is working.",
    },
    // HTTP response headers
    FindingDetail {
        code: "HEADERS_HSTS_MISSING",
        title: "Strict-Transport-Security not set",
        source: CheckId::Headers,
        severity: Severity::Warning,
        remediation: "Send 'Strict-Transport-Security: max-age=31536000; includeSubDomains' on HTTPS responses.",
    },
    FindingDetail {
        code: "HEADERS_CSP_MISSING",
        title: "Content-Security-Policy not set",
        source: CheckId::Headers,
        severity: Severity::Warning,
        remediation: "Define a Content-Security-Policy, starting in report-only mode to find what the pages load.",
    },
    FindingDetail {
        code: "HEADERS_X_FRAME_OPTIONS_MISSING",
        title: "X-Frame-Options not set",
        source: CheckId::Headers,
        severity: Severity::Info,
        remediation: "Send 'X-Frame-Options: DENY' (or SAMEORIGIN), or a CSP 'frame-ancestors' directive.",
    },
    FindingDetail {
        code: "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING",
        title: "X-Content-Type-Options not set",
        source: CheckId::Headers,
        severity: Severity::Info,
        remediation: "Send 'X-Content-Type-Options: nosniff' on every response.",
    },
    // Fingerprinting and exposure
    FindingDetail {
        code: "SEC_SERVER_VERSION_DISCLOSED",
        title: "Server header reveals a version",
        source: CheckId::Security,
        severity: Severity::Warning,
        remediation: "Configure the web server to omit its version (e.g. 'server_tokens off' or 'ServerTokens Prod').",
    },
    FindingDetail {
        code: "SEC_POWERED_BY_DISCLOSED",
        title: "X-Powered-By reveals a version",
        source: CheckId::Security,
        severity: Severity::Warning,
        remediation: "Remove the X-Powered-By header in the application or reverse proxy.",
    },
    FindingDetail {
        code: "SEC_ASPNET_VERSION_DISCLOSED",
        title: "X-AspNet-Version is sent",
        source: CheckId::Security,
        severity: Severity::Warning,
        remediation: "Set enableVersionHeader=\"false\" in web.config.",
    },
    FindingDetail {
        code: "SEC_EXPOSED_GIT",
        title: "Git metadata is publicly readable",
        source: CheckId::Security,
        severity: Severity::Critical,
        remediation: "Block access to /.git on the web server and rotate any secret the repository history contains.",
    },
    FindingDetail {
        code: "SEC_EXPOSED_ENV",
        title: ".env file is publicly readable",
        source: CheckId::Security,
        severity: Severity::Critical,
        remediation: "Move the file outside the web root, deny dotfiles, and rotate every credential it held.",
    },
    FindingDetail {
        code: "SEC_EXPOSED_SERVER_STATUS",
        title: "Server status page is public",
        source: CheckId::Security,
        severity: Severity::Critical,
        remediation: "Restrict /server-status to localhost or an admin network.",
    },
];

pub fn finding_detail(code: &str) -> Option<&'static FindingDetail> {
    FINDINGS.iter().find(|detail| detail.code == code)
}

/// All catalogued findings emitted by one check.
pub fn findings_for(check: CheckId) -> impl Iterator<Item = &'static FindingDetail> {
    FINDINGS.iter().filter(move |detail| detail.source == check)
}
