// src/core/target.rs

use url::Url;

use crate::core::error::AuditError;

/// A user-supplied target after normalization and validation.
///
/// `as_str` is the normalized string exactly as checks receive it, which is
/// not necessarily what `Url` would re-serialize (no trailing slash is added).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    normalized: String,
    url: Url,
}

impl Target {
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host (and port, if one is given) of the validated URL. Userinfo,
    /// path, query and fragment are never part of it.
    pub fn bare_host(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

/// Normalizes raw user input into a `Target`.
///
/// Inputs without an `http://` or `https://` prefix default to `https://`.
/// The result must parse as a URL with a non-empty host.
pub fn normalize_target(raw: &str) -> Result<Target, AuditError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuditError::InvalidInput("Please enter a URL.".to_string()));
    }

    let normalized = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&normalized)
        .map_err(|_| AuditError::InvalidInput("Please enter a valid URL.".to_string()))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(Target { normalized, url }),
        _ => Err(AuditError::InvalidInput("Please enter a valid URL.".to_string())),
    }
}

fn has_http_scheme(s: &str) -> bool {
    strip_http_scheme(s).len() != s.len()
}

fn strip_http_scheme(s: &str) -> &str {
    for scheme in ["https://", "http://"] {
        if let Some(prefix) = s.get(..scheme.len()) {
            if prefix.eq_ignore_ascii_case(scheme) {
                return &s[scheme.len()..];
            }
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domain_defaults_to_https() {
        let target = normalize_target("example.com").unwrap();
        assert_eq!(target.as_str(), "https://example.com");
        assert_eq!(target.url().host_str(), Some("example.com"));
    }

    #[test]
    fn explicit_scheme_is_kept() {
        let target = normalize_target("  http://example.com/path  ").unwrap();
        assert_eq!(target.as_str(), "http://example.com/path");
        let target = normalize_target("HTTPS://Example.com").unwrap();
        assert_eq!(target.as_str(), "HTTPS://Example.com");
    }

    #[test]
    fn empty_and_malformed_input_is_rejected() {
        assert_eq!(
            normalize_target("   "),
            Err(AuditError::InvalidInput("Please enter a URL.".to_string()))
        );
        assert!(matches!(normalize_target("not a url"), Err(AuditError::InvalidInput(_))));
        assert!(matches!(normalize_target("https://"), Err(AuditError::InvalidInput(_))));
    }

    fn host(raw: &str) -> String {
        normalize_target(raw).unwrap().bare_host()
    }

    #[test]
    fn bare_host_strips_scheme_and_path() {
        assert_eq!(host("https://example.com"), "example.com");
        assert_eq!(host("http://example.com/a/b"), "example.com");
        assert_eq!(host("https://example.com:8443/x"), "example.com:8443");
        assert_eq!(host("https://example.com?q=1"), "example.com");
        assert_eq!(host("example.com#top"), "example.com");
    }

    #[test]
    fn bare_host_is_the_validated_host() {
        assert_eq!(host("user@example.com"), "example.com");
        assert_eq!(host("https://user:pw@example.com:8080/admin"), "example.com:8080");
        assert_eq!(host("//example.com"), "example.com");
        assert_eq!(host("https:////example.com/x"), "example.com");
        // Default ports are not repeated.
        assert_eq!(host("https://example.com:443"), "example.com");
    }
}
