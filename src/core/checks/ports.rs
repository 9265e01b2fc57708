// src/core/checks/ports.rs

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{info, warn};

use crate::core::checks::{CheckAdapter, CheckInput, Progress};
use crate::core::error::AdapterError;

/// `22/tcp   open  ssh`
static RE_OPEN_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\d+)/(tcp|udp)\s+open\s+(\S+)").expect("valid nmap port regex"));

/// Fast nmap scan (`-F`, the 100 most common ports) of the bare host.
pub struct PortsCheck {
    nmap: String,
}

impl PortsCheck {
    pub fn new(nmap: impl Into<String>) -> Self {
        Self { nmap: nmap.into() }
    }
}

#[async_trait]
impl CheckAdapter for PortsCheck {
    async fn run(&self, input: CheckInput, _progress: Progress) -> Result<Value, AdapterError> {
        let host = input.as_host()?;
        // nmap takes a host, not host:port.
        let host = host.split(':').next().unwrap_or(host);
        info!(host, program = %self.nmap, "Starting port scan.");

        let output = Command::new(&self.nmap)
            .arg("-F")
            .arg(host)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AdapterError::Process { program: self.nmap.clone(), message: e.to_string() })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(host, status = %output.status, "Port scan exited with an error.");
            return Ok(json!({ "error": "nmap scan failed", "details": stderr }));
        }

        let open_ports = parse_open_ports(&stdout);
        info!(host, open = open_ports.len(), "Port scan finished.");
        Ok(json!({ "host": host, "openPorts": open_ports, "output": stdout }))
    }
}

fn parse_open_ports(output: &str) -> Vec<Value> {
    RE_OPEN_PORT
        .captures_iter(output)
        .filter_map(|caps| {
            let port: u16 = caps[1].parse().ok()?;
            Some(json!({ "port": port, "protocol": &caps[2], "service": &caps[3] }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::CheckResult;

    #[test]
    fn open_ports_are_parsed_from_nmap_output() {
        let output = "Nmap scan report for example.com (93.184.216.34)\n\
                      PORT    STATE    SERVICE\n\
                      22/tcp  filtered ssh\n\
                      80/tcp  open     http\n\
                      443/tcp open     https\n";
        let ports = parse_open_ports(output);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0], json!({ "port": 80, "protocol": "tcp", "service": "http" }));
    }

    #[tokio::test]
    async fn missing_binary_is_a_process_error() {
        let check = PortsCheck::new("definitely-not-nmap-binary");
        let err = check.run(CheckInput::Host("example.com".into()), Progress::default()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Process { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_becomes_an_error_payload() {
        // `false` ignores its arguments and exits with status 1.
        let check = PortsCheck::new("false");
        let payload = check.run(CheckInput::Host("example.com".into()), Progress::default()).await.unwrap();
        assert_eq!(payload["error"], "nmap scan failed");
        assert!(matches!(CheckResult::from_adapter(Ok::<_, AdapterError>(payload)), CheckResult::Failure(_)));
    }
}
