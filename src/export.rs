//! Export helpers for writing run results to CSV files.
//!
//! - `save_attempts_csv` writes one row per attempt record, in run order.
//! - `save_findings_csv` writes one row per finding with its artifact paths.
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;

use crate::finding::{CredentialFinding, ReconResult};

#[derive(Serialize)]
struct FindingRow<'a> {
    source_file: &'a str,
    content_file: String,
    cred_file: String,
    line_count: usize,
}

impl<'a> From<&'a CredentialFinding> for FindingRow<'a> {
    fn from(f: &'a CredentialFinding) -> Self {
        Self {
            source_file: &f.source_file,
            content_file: f.content_file.display().to_string(),
            cred_file: f
                .cred_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            line_count: f.line_count,
        }
    }
}

pub fn save_attempts_csv<P: AsRef<Path>>(result: &ReconResult, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr =
        Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for attempt in &result.attempts {
        wtr.serialize(attempt)?;
    }
    if result.attempts.is_empty() {
        wtr.write_record(["technique", "succeeded", "detail"])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_findings_csv<P: AsRef<Path>>(result: &ReconResult, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr =
        Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for finding in &result.findings {
        wtr.serialize(FindingRow::from(finding))?;
    }
    if result.findings.is_empty() {
        wtr.write_record(["source_file", "content_file", "cred_file", "line_count"])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{AttemptRecord, RunLedger};
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn writes_attempts_and_findings() {
        let mut ledger = RunLedger::new();
        ledger.record(AttemptRecord::succeeded(
            "Basic Connectivity",
            "Target is reachable on port 445",
        ));
        ledger.record(AttemptRecord::failed("LDAP Access", "No LDAP ports accessible"));
        ledger.add_finding(CredentialFinding {
            source_file: "LDAP_enumeration".to_string(),
            content_file: PathBuf::from("ldap_enumeration_ldap.txt"),
            cred_file: None,
            line_count: 12,
        });
        let result = ledger.finish();

        let dir = tempdir().unwrap();
        let attempts_path = dir.path().join("attempts.csv");
        let findings_path = dir.path().join("findings.csv");
        save_attempts_csv(&result, &attempts_path).unwrap();
        save_findings_csv(&result, &findings_path).unwrap();

        let attempts = std::fs::read_to_string(attempts_path).unwrap();
        let findings = std::fs::read_to_string(findings_path).unwrap();
        assert!(attempts.starts_with("technique,succeeded,detail\n"));
        assert!(attempts.contains("Basic Connectivity,true,Target is reachable on port 445"));
        assert!(attempts.contains("LDAP Access,false,No LDAP ports accessible"));
        assert!(findings.starts_with("source_file,content_file,cred_file,line_count\n"));
        assert!(findings.contains("LDAP_enumeration,ldap_enumeration_ldap.txt,,12"));
    }

    #[test]
    fn empty_result_still_gets_headers() {
        let result = RunLedger::new().finish();
        let dir = tempdir().unwrap();
        let path = dir.path().join("findings.csv");
        save_findings_csv(&result, &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "source_file,content_file,cred_file,line_count\n"
        );
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("attempts.csv");
        assert!(save_attempts_csv(&RunLedger::new().finish(), path).is_err());
    }
}
