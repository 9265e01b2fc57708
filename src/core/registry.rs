// src/core/registry.rs

//! The static table of checks: what each one is called, how long it may run,
//! what input it needs, and which adapter performs it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use strum::IntoEnumIterator;
use tracing::debug;

use crate::config::Settings;
use crate::core::checks::dns::DnsCheck;
use crate::core::checks::headers::HeadersCheck;
use crate::core::checks::links::LinksCheck;
use crate::core::checks::local::{BackupCheck, DependencyCheck, SecretsCheck};
use crate::core::checks::markup::{MarkupCheck, MarkupKind};
use crate::core::checks::observatory::ObservatoryCheck;
use crate::core::checks::performance::{PerformanceCheck, RateLimitCheck};
use crate::core::checks::ports::PortsCheck;
use crate::core::checks::security::SecurityCheck;
use crate::core::checks::social::SocialCheck;
use crate::core::checks::ssl::SslCheck;
use crate::core::checks::{build_client, CheckAdapter, CheckInput};
use crate::core::error::{AdapterError, AuditError};
use crate::core::models::CheckId;
use crate::core::target::Target;

/// How a check derives its adapter input from the audit target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRule {
    /// The normalized target, e.g. `https://example.com/shop`.
    FullUrl,
    /// Scheme, path, query and fragment stripped: `example.com`.
    BareHost,
    /// The local working tree. The target is ignored.
    Workspace,
}

impl InputRule {
    pub fn derive(self, target: &Target, workspace: &Path) -> CheckInput {
        match self {
            InputRule::FullUrl => CheckInput::Url(target.as_str().to_string()),
            InputRule::BareHost => CheckInput::Host(target.bare_host()),
            InputRule::Workspace => CheckInput::Workspace(workspace.to_path_buf()),
        }
    }
}

/// Immutable description of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckDescriptor {
    pub id: CheckId,
    pub label: &'static str,
    pub description: &'static str,
    pub timeout: Duration,
    pub input: InputRule,
}

impl CheckId {
    /// The descriptor for this check. The `match` is exhaustive, so a new
    /// variant cannot be added without a budget and input rule.
    pub fn descriptor(self) -> CheckDescriptor {
        use InputRule::*;
        let (label, description, timeout_ms, input) = match self {
            CheckId::Security => (
                "Security Scan & Vulnerability Check",
                "Fingerprints server software and looks for commonly exposed files and version disclosure.",
                8_000,
                FullUrl,
            ),
            CheckId::BrokenLinks => (
                "Broken Link Checker",
                "Follows every link on the page and reports the ones that are dead or erroring.",
                20_000,
                FullUrl,
            ),
            CheckId::Dns => (
                "Domain & DNS Information",
                "DNS records, mail authentication (SPF, DMARC, DKIM), CAA and registrar WHOIS data.",
                8_000,
                BareHost,
            ),
            CheckId::Social => (
                "Social Media Metadata Validation",
                "Open Graph and Twitter Card tags that control link previews.",
                8_000,
                FullUrl,
            ),
            CheckId::Ssl => (
                "SSL Certificate Check",
                "Certificate subject, issuer, validity window and time to expiry.",
                8_000,
                BareHost,
            ),
            CheckId::Observatory => (
                "Mozilla Observatory Security Check",
                "Grade and test summary from Mozilla's public Observatory service.",
                8_000,
                FullUrl,
            ),
            CheckId::Dependency => (
                "Dependency Vulnerability Scan",
                "Runs cargo audit or npm audit against the local project lockfile.",
                15_000,
                Workspace,
            ),
            CheckId::Headers => (
                "HTTP Security Headers Analysis",
                "Response headers, with findings for missing security headers.",
                8_000,
                FullUrl,
            ),
            CheckId::RateLimit => (
                "Rate Limiting & DDoS Protection Check",
                "A short burst of requests to see whether the server throttles or advertises limits.",
                10_000,
                FullUrl,
            ),
            CheckId::Auth => (
                "Authentication & Authorization Review",
                "Login forms on the page and any mention of two-factor authentication.",
                8_000,
                FullUrl,
            ),
            CheckId::Privacy => (
                "Data Privacy & GDPR Compliance",
                "Privacy policy and cookie consent indicators.",
                8_000,
                FullUrl,
            ),
            CheckId::Accessibility => (
                "Automated Accessibility Audit",
                "Images without alt text and inputs without a label.",
                8_000,
                FullUrl,
            ),
            CheckId::Performance => (
                "Performance & Load Testing",
                "Status and load time of the page.",
                8_000,
                FullUrl,
            ),
            CheckId::Ports => (
                "Open Ports & Network Exposure Scan",
                "nmap fast scan of the host's most common ports.",
                15_000,
                BareHost,
            ),
            CheckId::Secrets => (
                "Secrets & Key Exposure Scan",
                "Searches the local project for hardcoded keys, tokens and passwords.",
                15_000,
                Workspace,
            ),
            CheckId::Backup => (
                "Backup & Disaster Recovery Validation",
                "Looks for backup and recovery documentation in the local project.",
                8_000,
                Workspace,
            ),
        };
        CheckDescriptor { id: self, label, description, timeout: Duration::from_millis(timeout_ms), input }
    }
}

/// Resolves a string id to its descriptor.
pub fn resolve(id: &str) -> Result<CheckDescriptor, AuditError> {
    id.parse::<CheckId>()
        .map(CheckId::descriptor)
        .map_err(|_| AuditError::UnknownCheck(id.to_string()))
}

/// Every registered check, in display order.
pub fn all_descriptors() -> Vec<CheckDescriptor> {
    CheckId::iter().map(CheckId::descriptor).collect()
}

/// Binds each check id to the adapter that performs it.
pub struct ScanRegistry {
    adapters: HashMap<CheckId, Arc<dyn CheckAdapter>>,
    workspace: PathBuf,
}

impl ScanRegistry {
    /// An empty registry; adapters are added with [`ScanRegistry::with_adapter`].
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self { adapters: HashMap::new(), workspace: workspace.into() }
    }

    /// The production adapters, configured from `settings`.
    pub fn standard(settings: &Settings) -> Result<Self, AdapterError> {
        let client = build_client(&settings.http)?;
        let registry = CheckId::iter().fold(Self::new(settings.workspace_dir.clone()), |registry, id| {
            let adapter: Arc<dyn CheckAdapter> = match id {
                CheckId::Security => Arc::new(SecurityCheck::new(client.clone())),
                CheckId::BrokenLinks => Arc::new(LinksCheck::new(client.clone(), settings.links.clone())),
                CheckId::Dns => Arc::new(DnsCheck),
                CheckId::Social => Arc::new(SocialCheck::new(client.clone())),
                CheckId::Ssl => Arc::new(SslCheck),
                CheckId::Observatory => {
                    Arc::new(ObservatoryCheck::new(client.clone(), settings.observatory.clone()))
                }
                CheckId::Dependency => Arc::new(DependencyCheck::new(&settings.tools)),
                CheckId::Headers => Arc::new(HeadersCheck::new(client.clone())),
                CheckId::RateLimit => Arc::new(RateLimitCheck::new(client.clone())),
                CheckId::Auth => Arc::new(MarkupCheck::new(client.clone(), MarkupKind::Auth)),
                CheckId::Privacy => Arc::new(MarkupCheck::new(client.clone(), MarkupKind::Privacy)),
                CheckId::Accessibility => {
                    Arc::new(MarkupCheck::new(client.clone(), MarkupKind::Accessibility))
                }
                CheckId::Performance => Arc::new(PerformanceCheck::new(client.clone())),
                CheckId::Ports => Arc::new(PortsCheck::new(settings.tools.nmap.clone())),
                CheckId::Secrets => Arc::new(SecretsCheck::new(&settings.tools)),
                CheckId::Backup => Arc::new(BackupCheck),
            };
            registry.with_adapter(id, adapter)
        });
        debug!(adapters = registry.adapters.len(), "Scan registry built.");
        Ok(registry)
    }

    pub fn with_adapter(mut self, id: CheckId, adapter: Arc<dyn CheckAdapter>) -> Self {
        self.adapters.insert(id, adapter);
        self
    }

    pub fn adapter(&self, id: CheckId) -> Option<Arc<dyn CheckAdapter>> {
        self.adapters.get(&id).cloned()
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::normalize_target;
    use strum::EnumCount;

    #[test]
    fn every_check_has_a_positive_budget() {
        let descriptors = all_descriptors();
        assert_eq!(descriptors.len(), CheckId::COUNT);
        assert!(descriptors.iter().all(|d| d.timeout > Duration::ZERO && !d.label.is_empty()));
    }

    #[test]
    fn budgets_and_input_rules() {
        let links = resolve("brokenLinks").unwrap();
        assert_eq!(links.timeout, Duration::from_secs(20));
        assert_eq!(links.input, InputRule::FullUrl);

        for id in ["dns", "ssl", "ports"] {
            assert_eq!(resolve(id).unwrap().input, InputRule::BareHost, "{id}");
        }
        for id in ["secrets", "backup", "dependency"] {
            assert_eq!(resolve(id).unwrap().input, InputRule::Workspace, "{id}");
        }
        assert_eq!(resolve("rateLimit").unwrap().timeout, Duration::from_secs(10));
    }

    #[test]
    fn unknown_ids_fail_fast() {
        assert_eq!(resolve("wifi"), Err(AuditError::UnknownCheck("wifi".to_string())));
        assert!(resolve("RateLimit").is_err());
    }

    #[test]
    fn inputs_are_derived_from_the_target() {
        let target = normalize_target("https://example.com/shop?x=1").unwrap();
        let workspace = Path::new("/srv/site");
        assert_eq!(
            InputRule::FullUrl.derive(&target, workspace),
            CheckInput::Url("https://example.com/shop?x=1".into())
        );
        assert_eq!(InputRule::BareHost.derive(&target, workspace), CheckInput::Host("example.com".into()));
        assert_eq!(
            InputRule::Workspace.derive(&target, workspace),
            CheckInput::Workspace(PathBuf::from("/srv/site"))
        );
    }

    #[test]
    fn standard_registry_covers_every_check() {
        let registry = ScanRegistry::standard(&Settings::default()).unwrap();
        assert!(CheckId::iter().all(|id| registry.adapter(id).is_some()));
    }
}
