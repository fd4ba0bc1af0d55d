//! Records produced during a reconnaissance run and the ledger that
//! accumulates them.
//!
//! The ledger only appends: attempts are never rewritten, service references
//! are deduplicated by `(protocol, port)`, and the overall verdict is computed
//! by [`RunLedger::finish`] from the findings that were actually recorded.
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Outcome of one technique invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub technique: String,
    pub succeeded: bool,
    pub detail: String,
}

impl AttemptRecord {
    pub fn succeeded(technique: &str, detail: impl Into<String>) -> Self {
        Self {
            technique: technique.to_string(),
            succeeded: true,
            detail: detail.into(),
        }
    }

    pub fn failed(technique: &str, detail: impl Into<String>) -> Self {
        Self {
            technique: technique.to_string(),
            succeeded: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceReference {
    pub protocol: String,
    pub port: u16,
}

impl ServiceReference {
    pub fn new(protocol: &str, port: u16) -> Self {
        Self {
            protocol: protocol.to_string(),
            port,
        }
    }
}

impl fmt::Display for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareHandle {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub share: String,
    pub filename: String,
    pub is_directory: bool,
}

/// A remote file copied into the artifact store. The local copy is kept after
/// the run for analyst review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub share: String,
    pub filename: String,
    pub local_path: PathBuf,
}

/// Evidence that data was obtained and inspected: one per analyzed download
/// and one per non-empty directory enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialFinding {
    pub source_file: String,
    pub content_file: PathBuf,
    pub cred_file: Option<PathBuf>,
    pub line_count: usize,
}

/// Terminal artifact of a run.
#[derive(Debug, Clone, Default)]
pub struct ReconResult {
    pub attempts: Vec<AttemptRecord>,
    pub services: Vec<ServiceReference>,
    pub accessible_shares: Vec<String>,
    pub downloads: Vec<DownloadedArtifact>,
    pub findings: Vec<CredentialFinding>,
    pub success: bool,
}

impl ReconResult {
    pub fn succeeded_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| a.succeeded).count()
    }
}

/// Append-only accumulator owned by the running orchestrator.
#[derive(Debug, Default)]
pub struct RunLedger {
    attempts: Vec<AttemptRecord>,
    services: Vec<ServiceReference>,
    accessible_shares: Vec<String>,
    downloads: Vec<DownloadedArtifact>,
    findings: Vec<CredentialFinding>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, attempt: AttemptRecord) {
        self.attempts.push(attempt);
    }

    /// Returns false when the service was already known.
    pub fn add_service(&mut self, service: ServiceReference) -> bool {
        if self.services.contains(&service) {
            return false;
        }
        self.services.push(service);
        true
    }

    pub fn add_share(&mut self, share: &str) {
        self.accessible_shares.push(share.to_string());
    }

    pub fn add_download(&mut self, artifact: DownloadedArtifact) {
        self.downloads.push(artifact);
    }

    pub fn add_finding(&mut self, finding: CredentialFinding) {
        self.findings.push(finding);
    }

    /// Close the run. Success requires at least one finding; open ports or
    /// accessible shares on their own do not count.
    pub fn finish(self) -> ReconResult {
        let success = !self.findings.is_empty();
        ReconResult {
            attempts: self.attempts,
            services: self.services,
            accessible_shares: self.accessible_shares,
            downloads: self.downloads,
            findings: self.findings,
            success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(name: &str) -> CredentialFinding {
        CredentialFinding {
            source_file: name.to_string(),
            content_file: PathBuf::from(format!("extracted_{name}")),
            cred_file: None,
            line_count: 0,
        }
    }

    #[test]
    fn services_are_deduplicated_in_discovery_order() {
        let mut ledger = RunLedger::new();
        assert!(ledger.add_service(ServiceReference::new("SMB", 445)));
        assert!(ledger.add_service(ServiceReference::new("SMB", 139)));
        assert!(!ledger.add_service(ServiceReference::new("SMB", 445)));
        assert!(ledger.add_service(ServiceReference::new("LDAP", 445)));
        let result = ledger.finish();
        let names: Vec<String> = result.services.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["SMB:445", "SMB:139", "LDAP:445"]);
    }

    #[test]
    fn reachability_alone_is_not_success() {
        let mut ledger = RunLedger::new();
        ledger.record(AttemptRecord::succeeded("Basic Connectivity", "reachable"));
        ledger.add_service(ServiceReference::new("SMB", 445));
        ledger.add_share("Public");
        let result = ledger.finish();
        assert!(!result.success);
        assert_eq!(result.succeeded_attempts(), 1);
    }

    #[test]
    fn a_zero_line_finding_is_success() {
        let mut ledger = RunLedger::new();
        ledger.record(AttemptRecord::failed("Basic Connectivity", "unreachable"));
        ledger.add_finding(finding("notes.txt"));
        let result = ledger.finish();
        assert!(result.success);
        assert_eq!(result.findings[0].line_count, 0);
    }
}
