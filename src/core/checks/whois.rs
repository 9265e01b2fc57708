// src/core/checks/whois.rs

//! Minimal WHOIS client over TCP port 43.
//!
//! Queries IANA first and follows its `refer:` line to the registry's server.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::core::error::AdapterError;

const IANA_SERVER: &str = "whois.iana.org";
const WHOIS_PORT: u16 = 43;
/// Upper bound for a single WHOIS exchange; the check's own deadline is shorter anyway.
const QUERY_TIMEOUT: Duration = Duration::from_secs(6);
const MAX_RESPONSE_BYTES: usize = 256 * 1024;

pub async fn lookup(domain: &str) -> Result<String, AdapterError> {
    let domain = registered_domain(domain);
    let iana = query(IANA_SERVER, &domain).await?;
    match referral(&iana) {
        Some(server) if server != IANA_SERVER => {
            debug!(domain = %domain, server = %server, "Following WHOIS referral.");
            query(&server, &domain).await
        }
        _ => Ok(iana),
    }
}

async fn query(server: &str, domain: &str) -> Result<String, AdapterError> {
    let exchange = async {
        let mut stream = TcpStream::connect((server, WHOIS_PORT)).await?;
        stream.write_all(format!("{domain}\r\n").as_bytes()).await?;
        let mut buf = Vec::new();
        (&mut stream).take(MAX_RESPONSE_BYTES as u64).read_to_end(&mut buf).await?;
        Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
    };

    match tokio::time::timeout(QUERY_TIMEOUT, exchange).await {
        Ok(result) => result.map_err(AdapterError::from),
        Err(_) => {
            warn!(server, domain, "WHOIS query timed out.");
            Err(AdapterError::Remote(format!("WHOIS query to {server} timed out")))
        }
    }
}

/// Extracts the `refer:` (or `whois:`) server from an IANA response.
fn referral(response: &str) -> Option<String> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        ((key == "refer" || key == "whois") && !value.is_empty()).then(|| value.to_string())
    })
}

/// Drops a port suffix and a leading `www.`; registries only know the registered name.
fn registered_domain(host: &str) -> String {
    let host = host.split(':').next().unwrap_or(host);
    host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase()
}
