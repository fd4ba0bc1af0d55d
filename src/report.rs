//! Human-readable report rendering for terminal output.
//!
//! Produces a colored summary of a finished run: attempt results with the
//! overall success rate, discovered services, accessible shares, retained
//! downloads, extracted artifacts and the final verdict.
use colored::*;

use crate::{finding::ReconResult, stats::attempt_stats, target::Target};

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let len = visible_len(title);
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push_str("\n\n");
    s
}

fn push_section(out: &mut String, title: String, lines: Vec<String>) {
    out.push_str(&section_header(&title));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
}

pub fn render_summary(result: &ReconResult, target: &Target) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        format!("Reconnaissance Summary: {}", target).bold().cyan()
    ));

    let stats = attempt_stats(&result.attempts);
    let mut attempt_lines: Vec<String> = Vec::new();
    if result.attempts.is_empty() {
        attempt_lines.push("(No attempts recorded)".to_string());
    }
    for a in &result.attempts {
        let status = if a.succeeded {
            "SUCCESS".green().bold()
        } else {
            "FAILED".red()
        };
        attempt_lines.push(format!("{}: {} - {}", a.technique, status, a.detail));
    }
    attempt_lines.push(String::new());
    attempt_lines.push(format!(
        "Successful techniques: {}/{} ({})",
        stats.succeeded, stats.total, stats.success_percentage
    ));
    push_section(
        &mut out,
        "Reconnaissance Results".bold().yellow().to_string(),
        attempt_lines,
    );

    let service_lines = if result.services.is_empty() {
        vec!["(No services discovered)".to_string()]
    } else {
        result.services.iter().map(|s| format!("  {}", s)).collect()
    };
    push_section(
        &mut out,
        "Discovered Services".bold().cyan().to_string(),
        service_lines,
    );

    let share_lines = if result.accessible_shares.is_empty() {
        vec!["(No accessible shares)".to_string()]
    } else {
        result
            .accessible_shares
            .iter()
            .map(|s| format!("  {}", s.bold().green()))
            .collect()
    };
    push_section(
        &mut out,
        "Accessible Shares".bold().cyan().to_string(),
        share_lines,
    );

    let download_lines = if result.downloads.is_empty() {
        vec!["(No files downloaded)".to_string()]
    } else {
        result
            .downloads
            .iter()
            .map(|d| {
                format!(
                    "  {}\\{} -> {}",
                    d.share,
                    d.filename,
                    d.local_path.display()
                )
            })
            .collect()
    };
    push_section(
        &mut out,
        "Downloaded Files".bold().cyan().to_string(),
        download_lines,
    );

    let mut extraction_lines: Vec<String> = Vec::new();
    if result.findings.is_empty() {
        extraction_lines.push("(No data extracted)".to_string());
    } else {
        let lines_total: usize = result.findings.iter().map(|f| f.line_count).sum();
        extraction_lines.push(format!("Findings: {}", result.findings.len()));
        extraction_lines.push(format!("Total lines flagged or objects found: {}", lines_total));
        for f in &result.findings {
            extraction_lines.push(format!("{}", f.source_file.bold()));
            extraction_lines.push(format!("  Content: {}", f.content_file.display()));
            match &f.cred_file {
                Some(p) => extraction_lines.push(format!(
                    "  Potential credentials ({}): {}",
                    f.line_count,
                    p.display().to_string().red()
                )),
                None => extraction_lines.push(format!("  Entries: {}", f.line_count)),
            }
        }
    }
    push_section(
        &mut out,
        "Data Extraction Summary".bold().magenta().to_string(),
        extraction_lines,
    );

    let verdict = if result.success {
        "SUCCESS: data extracted from target".green().bold()
    } else {
        "FAILED: no data could be extracted".red().bold()
    };
    push_section(&mut out, "Verdict".bold().yellow().to_string(), vec![verdict.to_string()]);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{
        AttemptRecord, CredentialFinding, DownloadedArtifact, RunLedger, ServiceReference,
    };
    use std::path::PathBuf;

    fn target() -> Target {
        Target::parse("10.0.0.5", "corp.local").unwrap()
    }

    #[test]
    fn visible_len_ignores_escape_codes() {
        assert_eq!(visible_len("\u{1b}[1;32mabc\u{1b}[0m"), 3);
        assert_eq!(visible_len("plain"), 5);
    }

    #[test]
    fn summary_of_failed_run() {
        colored::control::set_override(false);
        let mut ledger = RunLedger::new();
        ledger.record(AttemptRecord::failed(
            "Basic Connectivity",
            "Target not reachable on port 445",
        ));
        let s = render_summary(&ledger.finish(), &target());
        assert!(s.contains("Reconnaissance Summary: 10.0.0.5 (corp.local)"));
        assert!(s.contains("Basic Connectivity: FAILED - Target not reachable on port 445"));
        assert!(s.contains("Successful techniques: 0/1 (0.0%)"));
        assert!(s.contains("(No services discovered)"));
        assert!(s.contains("(No data extracted)"));
        assert!(s.contains("FAILED: no data could be extracted"));
    }

    #[test]
    fn summary_lists_shares_downloads_and_findings() {
        colored::control::set_override(false);
        let mut ledger = RunLedger::new();
        ledger.record(AttemptRecord::succeeded("SMB Guest Access", "Guest account access granted"));
        ledger.record(AttemptRecord::failed("RPC Enumeration", "RPC port 135 not accessible"));
        ledger.add_service(ServiceReference::new("SMB", 445));
        ledger.add_share("Finance");
        ledger.add_download(DownloadedArtifact {
            share: "Finance".to_string(),
            filename: "passwords.txt".to_string(),
            local_path: PathBuf::from("out/downloads/download_x_passwords.txt"),
        });
        ledger.add_finding(CredentialFinding {
            source_file: "passwords.txt".to_string(),
            content_file: PathBuf::from("out/extracted_passwords.txt"),
            cred_file: Some(PathBuf::from("out/potential_creds_passwords.txt.txt")),
            line_count: 2,
        });
        let s = render_summary(&ledger.finish(), &target());
        assert!(s.contains("Successful techniques: 1/2 (50.0%)"));
        assert!(s.contains("Findings: 1"));
        assert!(s.contains("  SMB:445"));
        assert!(s.contains("  Finance"));
        assert!(s.contains("Finance\\passwords.txt -> out/downloads/download_x_passwords.txt"));
        assert!(s.contains("Potential credentials (2): out/potential_creds_passwords.txt.txt"));
        assert!(s.contains("SUCCESS: data extracted from target"));
    }
}
