//! Structured run events.
//!
//! The orchestrator and its components never print. They emit [`ReconEvent`]s
//! into an [`EventSink`] supplied by the caller; [`LogSink`] turns them into
//! log lines and [`MemorySink`] keeps them for inspection.
use std::path::PathBuf;

use log::{debug, error, info, warn};

use crate::finding::{AttemptRecord, ServiceReference};
use crate::recon::Stage;
use crate::stats::ObjectTally;

/// Number of matched credential lines echoed to the log per file.
pub const PREVIEW_LINES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconEvent {
    RunStarted { target: String },
    StageStarted(Stage),
    Attempt(AttemptRecord),
    ServiceDiscovered(ServiceReference),
    LoginRejected { account: String, reason: String },
    ShareAccessible { share: String, entries: usize },
    ShareSkipped { share: String, reason: String },
    Downloading { share: String, filename: String },
    DownloadFailed { filename: String, reason: String },
    ContentSaved { source: String, path: PathBuf, bytes: usize },
    CredentialLines {
        source: String,
        total: usize,
        preview: Vec<String>,
        path: PathBuf,
    },
    NoCredentialLines { source: String },
    AnalysisFailed { source: String, reason: String },
    EndpointFailed { name: String, port: u16, reason: String },
    SearchUnavailable,
    DirectoryBase { label: String, base_dn: String },
    DirectoryReport {
        label: String,
        path: PathBuf,
        tally: ObjectTally,
    },
    DirectoryEmpty { label: String },
    DirectoryFailed { label: String, reason: String },
}

pub trait EventSink {
    fn emit(&mut self, event: ReconEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: ReconEvent) {
        match event {
            ReconEvent::RunStarted { target } => {
                info!("starting reconnaissance against {}", target)
            }
            ReconEvent::StageStarted(stage) => info!("[*] {}...", stage.description()),
            ReconEvent::Attempt(a) if a.succeeded => {
                info!("[+] {}: SUCCESS - {}", a.technique, a.detail)
            }
            ReconEvent::Attempt(a) => warn!("[-] {}: FAILED - {}", a.technique, a.detail),
            ReconEvent::ServiceDiscovered(s) => debug!("service discovered: {}", s),
            ReconEvent::LoginRejected { account, reason } => {
                debug!("{} login rejected: {}", account, reason)
            }
            ReconEvent::ShareAccessible { share, entries } => {
                info!("[+] Accessible share: {} ({} entries)", share, entries)
            }
            ReconEvent::ShareSkipped { share, reason } => {
                warn!("[-] Cannot access share {}: {}", share, reason)
            }
            ReconEvent::Downloading { share, filename } => {
                info!("[*] Downloading interesting file: {}\\{}", share, filename)
            }
            ReconEvent::DownloadFailed { filename, reason } => {
                error!("[-] Failed to download {}: {}", filename, reason)
            }
            ReconEvent::ContentSaved {
                source,
                path,
                bytes,
            } => info!(
                "[+] Content of {} ({} bytes) saved to: {}",
                source,
                bytes,
                path.display()
            ),
            ReconEvent::CredentialLines {
                source,
                total,
                preview,
                path,
            } => {
                info!(
                    "[+] Found {} potential credential lines in {}:",
                    total, source
                );
                for line in &preview {
                    info!("  {}", line);
                }
                if total > preview.len() {
                    info!("  ... and {} more", total - preview.len());
                }
                info!("[+] Credential lines saved to: {}", path.display());
            }
            ReconEvent::NoCredentialLines { source } => {
                info!("[-] No obvious credential patterns found in {}", source)
            }
            ReconEvent::AnalysisFailed { source, reason } => {
                error!("[-] Error analyzing {}: {}", source, reason)
            }
            ReconEvent::EndpointFailed { name, port, reason } => {
                warn!("[-] {} connection on port {} failed: {}", name, port, reason)
            }
            ReconEvent::SearchUnavailable => {
                warn!("[-] directory search unavailable, checking LDAP connectivity only")
            }
            ReconEvent::DirectoryBase { label, base_dn } => {
                info!("[*] Enumerating {} objects under {}", label, base_dn)
            }
            ReconEvent::DirectoryReport { label, path, tally } => {
                info!(
                    "[+] Found {} {} objects, enumeration saved to: {}",
                    tally.total(),
                    label,
                    path.display()
                );
                info!(
                    "    Users: {}, Computers: {}, Groups: {}",
                    tally.users, tally.computers, tally.groups
                );
            }
            ReconEvent::DirectoryEmpty { label } => {
                warn!("[-] No {} objects found or insufficient permissions", label)
            }
            ReconEvent::DirectoryFailed { label, reason } => {
                error!("[-] {} enumeration failed: {}", label, reason)
            }
        }
    }
}

/// Keeps every event in emission order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub events: Vec<ReconEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ReconEvent::StageStarted(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&mut self, event: ReconEvent) {
        self.events.push(event);
    }
}
