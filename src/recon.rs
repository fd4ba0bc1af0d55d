//! Reconnaissance orchestrator: runs every stage in a fixed order, collects
//! results in a [`RunLedger`] and decides the overall outcome.
//!
//! Stages never short-circuit each other. An error escaping a stage becomes a
//! failed attempt named after that stage and the run moves on. The run
//! succeeds only if at least one file or directory listing was actually
//! extracted and recorded as a finding.
//!
//! ```no_run
//! use reconprobe::{config::ReconConfig, events::LogSink, recon::Reconnaissance, target::Target};
//! # fn main() -> anyhow::Result<()> {
//! let target = Target::parse("10.0.0.5", "corp.local")?;
//! let result = Reconnaissance::new(target, ReconConfig::default()).run(&mut LogSink);
//! std::process::exit(if result.success { 0 } else { 1 });
//! # }
//! ```
use std::thread;

use log::debug;

use crate::analyze::ContentAnalyzer;
use crate::config::ReconConfig;
use crate::error::StageError;
use crate::events::{EventSink, ReconEvent};
use crate::extract::FileExtractor;
use crate::finding::{AttemptRecord, ReconResult, RunLedger, ServiceReference};
use crate::ldap::{DirectoryConnector, DirectoryEnumerator, ENDPOINTS};
use crate::probe::{
    PortProbe, RPC_ENDPOINT_MAPPER_PORT, SMB_NETBIOS_PORT, SMB_PORT, TcpProbe,
};
use crate::smb::smbclient::SmbClientConnector;
use crate::smb::{
    AccessibleShare, ShareConnector, ShareCredentials, ShareEnumerator, ShareSession,
};
use crate::store::ArtifactStore;
use crate::target::Target;

const SHARE_ENUMERATION: &str = "Share Enumeration";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Connectivity,
    SmbDiscovery,
    SmbAccess,
    RpcCheck,
    LdapCheck,
}

impl Stage {
    /// Execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Connectivity,
        Stage::SmbDiscovery,
        Stage::SmbAccess,
        Stage::RpcCheck,
        Stage::LdapCheck,
    ];

    /// Attempt name recorded when the stage itself fails.
    pub fn technique(self) -> &'static str {
        match self {
            Stage::Connectivity => "Basic Connectivity",
            Stage::SmbDiscovery => "SMB Service Discovery",
            Stage::SmbAccess => "SMB Access",
            Stage::RpcCheck => "RPC Enumeration",
            Stage::LdapCheck => "LDAP Access",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::Connectivity => "Checking basic connectivity",
            Stage::SmbDiscovery => "Discovering SMB services",
            Stage::SmbAccess => "Testing SMB guest access",
            Stage::RpcCheck => "Checking RPC services",
            Stage::LdapCheck => "Testing LDAP access",
        }
    }
}

#[cfg(feature = "ldap")]
fn default_directory_connector() -> Option<Box<dyn DirectoryConnector>> {
    Some(Box::new(crate::ldap::client::Ldap3Connector))
}

#[cfg(not(feature = "ldap"))]
fn default_directory_connector() -> Option<Box<dyn DirectoryConnector>> {
    None
}

struct RunContext<'s> {
    ledger: RunLedger,
    sink: &'s mut dyn EventSink,
}

impl RunContext<'_> {
    fn attempt(&mut self, record: AttemptRecord) {
        self.sink.emit(ReconEvent::Attempt(record.clone()));
        self.ledger.record(record);
    }

    fn service(&mut self, protocol: &str, port: u16) {
        let service = ServiceReference::new(protocol, port);
        if self.ledger.add_service(service.clone()) {
            self.sink.emit(ReconEvent::ServiceDiscovered(service));
        }
    }
}

pub struct Reconnaissance {
    target: Target,
    config: ReconConfig,
    store: ArtifactStore,
    probe: Box<dyn PortProbe>,
    shares: Box<dyn ShareConnector>,
    directory: Option<Box<dyn DirectoryConnector>>,
}

impl Reconnaissance {
    /// Orchestrator wired to the default collaborators: TCP probes,
    /// `smbclient`, and `ldap3` when directory search is enabled and compiled in.
    pub fn new(target: Target, config: ReconConfig) -> Self {
        let store = ArtifactStore::new(&config.output_dir);
        let shares = Box::new(SmbClientConnector::new(config.session_timeout));
        let directory = if config.directory_search {
            default_directory_connector()
        } else {
            None
        };
        Self {
            target,
            config,
            store,
            probe: Box::new(TcpProbe),
            shares,
            directory,
        }
    }

    pub fn with_probe<P: PortProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn with_share_connector<C: ShareConnector + 'static>(mut self, connector: C) -> Self {
        self.shares = Box::new(connector);
        self
    }

    /// `None` selects the connectivity-only LDAP check.
    pub fn with_directory_connector(mut self, connector: Option<Box<dyn DirectoryConnector>>) -> Self {
        self.directory = connector;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn run(&self, sink: &mut dyn EventSink) -> ReconResult {
        let mut ctx = RunContext {
            ledger: RunLedger::new(),
            sink,
        };
        ctx.sink.emit(ReconEvent::RunStarted {
            target: self.target.to_string(),
        });
        for stage in Stage::ALL {
            ctx.sink.emit(ReconEvent::StageStarted(stage));
            if let Err(e) = self.run_stage(stage, &mut ctx) {
                ctx.attempt(AttemptRecord::failed(stage.technique(), format!("Error: {}", e)));
            }
            if !self.config.stage_pause.is_zero() {
                thread::sleep(self.config.stage_pause);
            }
        }
        ctx.ledger.finish()
    }

    fn run_stage(&self, stage: Stage, ctx: &mut RunContext<'_>) -> Result<(), StageError> {
        match stage {
            Stage::Connectivity => self.check_connectivity(ctx),
            Stage::SmbDiscovery => self.discover_smb(ctx),
            Stage::SmbAccess => self.access_smb(ctx),
            Stage::RpcCheck => self.check_rpc(ctx),
            Stage::LdapCheck => self.check_ldap(ctx),
        }
    }

    fn check_connectivity(&self, ctx: &mut RunContext<'_>) -> Result<(), StageError> {
        let technique = Stage::Connectivity.technique();
        if self
            .probe
            .probe(self.target.ip(), SMB_PORT, self.config.connect_timeout)
        {
            ctx.attempt(AttemptRecord::succeeded(
                technique,
                format!("Target is reachable on port {}", SMB_PORT),
            ));
        } else {
            ctx.attempt(AttemptRecord::failed(
                technique,
                format!("Target not reachable on port {}", SMB_PORT),
            ));
        }
        Ok(())
    }

    fn discover_smb(&self, ctx: &mut RunContext<'_>) -> Result<(), StageError> {
        let open: Vec<u16> = [SMB_NETBIOS_PORT, SMB_PORT]
            .into_iter()
            .filter(|&port| {
                self.probe
                    .probe(self.target.ip(), port, self.config.discovery_timeout)
            })
            .collect();
        for &port in &open {
            ctx.service("SMB", port);
        }
        let technique = Stage::SmbDiscovery.technique();
        if open.is_empty() {
            ctx.attempt(AttemptRecord::failed(technique, "No SMB ports accessible"));
        } else {
            ctx.attempt(AttemptRecord::succeeded(
                technique,
                format!("SMB ports open: {:?}", open),
            ));
        }
        Ok(())
    }

    fn access_smb(&self, ctx: &mut RunContext<'_>) -> Result<(), StageError> {
        let Some(mut session) = self.open_share_session(ctx) else {
            return Ok(());
        };
        let shares = ShareEnumerator::new().enumerate(session.as_mut(), &mut *ctx.sink)?;
        for share in &shares {
            ctx.ledger.add_share(&share.share.name);
            self.harvest(session.as_mut(), share, ctx);
        }
        if shares.is_empty() {
            ctx.attempt(AttemptRecord::failed(
                SHARE_ENUMERATION,
                "No accessible shares found",
            ));
        } else {
            ctx.attempt(AttemptRecord::succeeded(
                SHARE_ENUMERATION,
                format!("Found {} accessible shares", shares.len()),
            ));
        }
        Ok(())
    }

    /// Anonymous first, then guest. Only the first success or the final
    /// failure is recorded as an attempt.
    fn open_share_session(&self, ctx: &mut RunContext<'_>) -> Option<Box<dyn ShareSession>> {
        let mut last_error = None;
        for credentials in [ShareCredentials::anonymous(), ShareCredentials::guest()] {
            match self.shares.login(&self.target, &credentials) {
                Ok(session) => {
                    let detail = if credentials.is_anonymous() {
                        "Anonymous SMB access granted"
                    } else {
                        "Guest account access granted"
                    };
                    ctx.attempt(AttemptRecord::succeeded(credentials.technique(), detail));
                    return Some(session);
                }
                Err(e) => {
                    ctx.sink.emit(ReconEvent::LoginRejected {
                        account: credentials.label().to_string(),
                        reason: e.to_string(),
                    });
                    last_error = Some(e);
                }
            }
        }
        let detail = match last_error {
            Some(e) => format!("No guest access available ({})", e),
            None => "No guest access available".to_string(),
        };
        ctx.attempt(AttemptRecord::failed(
            ShareCredentials::guest().technique(),
            detail,
        ));
        None
    }

    /// Download and analyze the interesting files of one share, one at a time.
    /// A failed download or analysis only loses that file.
    fn harvest(
        &self,
        session: &mut dyn ShareSession,
        share: &AccessibleShare,
        ctx: &mut RunContext<'_>,
    ) {
        let extractor = FileExtractor::new(&self.store);
        let analyzer =
            ContentAnalyzer::new(&self.store).with_mmap_threshold(self.config.mmap_threshold);
        for file in share.interesting_files() {
            ctx.sink.emit(ReconEvent::Downloading {
                share: share.share.name.clone(),
                filename: file.filename.clone(),
            });
            let artifact = match extractor.download(session, &share.share.name, &file.filename) {
                Ok(artifact) => artifact,
                Err(e) => {
                    ctx.sink.emit(ReconEvent::DownloadFailed {
                        filename: file.filename.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let local_path = artifact.local_path.clone();
            ctx.ledger.add_download(artifact);

            match analyzer.analyze(&local_path, &file.filename) {
                Ok(analysis) => {
                    let finding = analysis.finding;
                    ctx.sink.emit(ReconEvent::ContentSaved {
                        source: finding.source_file.clone(),
                        path: finding.content_file.clone(),
                        bytes: analysis.content_len,
                    });
                    match &finding.cred_file {
                        Some(path) => ctx.sink.emit(ReconEvent::CredentialLines {
                            source: finding.source_file.clone(),
                            total: finding.line_count,
                            preview: analysis.preview,
                            path: path.clone(),
                        }),
                        None => ctx.sink.emit(ReconEvent::NoCredentialLines {
                            source: finding.source_file.clone(),
                        }),
                    }
                    ctx.ledger.add_finding(finding);
                }
                Err(e) => ctx.sink.emit(ReconEvent::AnalysisFailed {
                    source: file.filename.clone(),
                    reason: format!("{:#}", e),
                }),
            }
        }
    }

    fn check_rpc(&self, ctx: &mut RunContext<'_>) -> Result<(), StageError> {
        let technique = Stage::RpcCheck.technique();
        let port = RPC_ENDPOINT_MAPPER_PORT;
        if self
            .probe
            .probe(self.target.ip(), port, self.config.connect_timeout)
        {
            ctx.service("RPC", port);
            ctx.attempt(AttemptRecord::succeeded(
                technique,
                format!("RPC ports accessible: [{}]", port),
            ));
        } else {
            ctx.attempt(AttemptRecord::failed(
                technique,
                format!("RPC port {} not accessible", port),
            ));
        }
        Ok(())
    }

    /// Bind anonymously to the first directory endpoint that accepts it and
    /// enumerate it. Directory failures never fail the stage.
    fn check_ldap(&self, ctx: &mut RunContext<'_>) -> Result<(), StageError> {
        let technique = Stage::LdapCheck.technique();
        let Some(connector) = self.directory.as_deref() else {
            ctx.sink.emit(ReconEvent::SearchUnavailable);
            return self.check_ldap_connectivity(ctx);
        };

        for endpoint in &ENDPOINTS {
            let mut session = match connector.bind_anonymous(
                self.target.ip(),
                endpoint,
                self.config.session_timeout,
            ) {
                Ok(session) => session,
                Err(e) => {
                    ctx.sink.emit(ReconEvent::EndpointFailed {
                        name: endpoint.name.to_string(),
                        port: endpoint.port,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            ctx.attempt(AttemptRecord::succeeded(
                technique,
                format!("{} port {} accessible", endpoint.name, endpoint.port),
            ));
            ctx.service("LDAP", endpoint.port);

            let enumerator = DirectoryEnumerator::new(&self.store, &self.target.domain)
                .with_size_limit(self.config.ldap_size_limit);
            match enumerator.enumerate(session.as_mut(), endpoint.name, &mut *ctx.sink) {
                Ok(Some(finding)) => ctx.ledger.add_finding(finding),
                Ok(None) => {}
                Err(e) => ctx.sink.emit(ReconEvent::DirectoryFailed {
                    label: endpoint.name.to_string(),
                    reason: e.to_string(),
                }),
            }
            if let Err(e) = session.unbind() {
                debug!("{} unbind failed: {}", endpoint.name, e);
            }
            return Ok(());
        }

        ctx.attempt(AttemptRecord::failed(technique, "No LDAP ports accessible"));
        Ok(())
    }

    fn check_ldap_connectivity(&self, ctx: &mut RunContext<'_>) -> Result<(), StageError> {
        let technique = Stage::LdapCheck.technique();
        for endpoint in &ENDPOINTS {
            if self
                .probe
                .probe(self.target.ip(), endpoint.port, self.config.connect_timeout)
            {
                ctx.attempt(AttemptRecord::succeeded(
                    technique,
                    format!("LDAP port {} accessible", endpoint.port),
                ));
                ctx.service("LDAP", endpoint.port);
                return Ok(());
            }
        }
        ctx.attempt(AttemptRecord::failed(technique, "No LDAP ports accessible"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_run_in_protocol_order() {
        let names: Vec<&str> = Stage::ALL.iter().map(|s| s.technique()).collect();
        assert_eq!(
            names,
            vec![
                "Basic Connectivity",
                "SMB Service Discovery",
                "SMB Access",
                "RPC Enumeration",
                "LDAP Access"
            ]
        );
    }
}
