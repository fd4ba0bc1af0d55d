//! Directory (LDAP) enumeration.
//!
//! [`DirectoryEnumerator`] resolves a search base, runs one bounded subtree
//! search for every object, classifies the results and writes a plain-text
//! report. The protocol client sits behind [`DirectoryConnector`] and
//! [`DirectorySession`]; with the `ldap` feature the `ldap3` crate provides it.
use std::fmt::Write as _;
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use log::debug;

use crate::error::NetworkError;
use crate::events::{EventSink, ReconEvent};
use crate::finding::CredentialFinding;
use crate::probe::{GLOBAL_CATALOG_PORT, LDAP_PORT, LDAPS_PORT};
use crate::stats::ObjectTally;
use crate::store::ArtifactStore;

#[cfg(feature = "ldap")]
pub mod client;

/// Upper bound on objects returned by one enumeration.
pub const DEFAULT_SIZE_LIMIT: usize = 1000;

pub const WILDCARD_FILTER: &str = "(objectClass=*)";

pub const SEARCH_ATTRIBUTES: [&str; 7] = [
    "distinguishedName",
    "objectClass",
    "name",
    "sAMAccountName",
    "userPrincipalName",
    "description",
    "memberOf",
];

/// A directory service port and how to speak to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEndpoint {
    pub name: &'static str,
    pub port: u16,
    pub secure: bool,
}

/// Endpoints tried in order until one accepts an anonymous bind.
pub const ENDPOINTS: [DirectoryEndpoint; 3] = [
    DirectoryEndpoint {
        name: "LDAP",
        port: LDAP_PORT,
        secure: false,
    },
    DirectoryEndpoint {
        name: "LDAPS",
        port: LDAPS_PORT,
        secure: true,
    },
    DirectoryEndpoint {
        name: "Global Catalog",
        port: GLOBAL_CATALOG_PORT,
        secure: false,
    },
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryObject {
    pub dn: String,
    pub object_classes: Vec<String>,
    pub name: Option<String>,
    pub account_name: Option<String>,
    pub principal_name: Option<String>,
    pub description: Option<String>,
    pub member_of: Vec<String>,
}

impl DirectoryObject {
    pub fn kind(&self) -> ObjectKind {
        ObjectKind::classify(self.object_classes.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    User,
    Computer,
    Group,
    Other,
}

impl ObjectKind {
    /// First match wins, in the order user, computer, group. Object classes
    /// are compared case-insensitively.
    pub fn classify<S: AsRef<str>>(classes: &[S]) -> Self {
        let has = |wanted: &str| classes.iter().any(|c| c.as_ref().eq_ignore_ascii_case(wanted));
        if has("user") {
            ObjectKind::User
        } else if has("computer") {
            ObjectKind::Computer
        } else if has("group") {
            ObjectKind::Group
        } else {
            ObjectKind::Other
        }
    }
}

pub trait DirectoryConnector {
    fn bind_anonymous(
        &self,
        address: IpAddr,
        endpoint: &DirectoryEndpoint,
        timeout: Duration,
    ) -> Result<Box<dyn DirectorySession>, NetworkError>;
}

pub trait DirectorySession {
    /// Naming contexts advertised by the server's root DSE.
    fn naming_contexts(&mut self) -> Result<Vec<String>, NetworkError>;

    fn search_subtree(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[&str],
        size_limit: usize,
    ) -> Result<Vec<DirectoryObject>, NetworkError>;

    fn unbind(&mut self) -> Result<(), NetworkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory search failed: {0}")]
    Search(#[from] NetworkError),
    #[error("writing {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `example.local` becomes `DC=example,DC=local`.
pub fn domain_base_dn(domain: &str) -> String {
    domain
        .split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| format!("DC={}", part))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn report_file_name(label: &str) -> String {
    format!("ldap_enumeration_{}.txt", label.to_lowercase().replace(' ', "_"))
}

/// Render the enumeration report and count objects per category.
pub fn render_report(label: &str, base_dn: &str, objects: &[DirectoryObject]) -> (String, ObjectTally) {
    let mut tally = ObjectTally::default();
    let mut out = String::new();
    let _ = writeln!(out, "=== LDAP Enumeration Results ({}) ===", label);
    let _ = writeln!(out, "Base DN: {}", base_dn);
    let _ = writeln!(out, "Total Objects: {}", objects.len());
    out.push('\n');

    for obj in objects {
        tally.record(obj.kind());
        let _ = writeln!(out, "DN: {}", obj.dn);
        if !obj.object_classes.is_empty() {
            let _ = writeln!(out, "Object Classes: {}", obj.object_classes.join(", "));
        }
        for (title, value) in [
            ("Name", &obj.name),
            ("SAM Account", &obj.account_name),
            ("UPN", &obj.principal_name),
            ("Description", &obj.description),
        ] {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                let _ = writeln!(out, "{}: {}", title, v);
            }
        }
        if !obj.member_of.is_empty() {
            let _ = writeln!(out, "Member Of: {}", obj.member_of.join("; "));
        }
        out.push('\n');
        out.push_str(&"-".repeat(50));
        out.push('\n');
    }

    out.push_str("\n=== Summary ===\n");
    let _ = writeln!(out, "Users: {}", tally.users);
    let _ = writeln!(out, "Computers: {}", tally.computers);
    let _ = writeln!(out, "Groups: {}", tally.groups);
    let _ = writeln!(out, "Other Objects: {}", tally.other);
    (out, tally)
}

pub struct DirectoryEnumerator<'a> {
    store: &'a ArtifactStore,
    domain: &'a str,
    size_limit: usize,
}

impl<'a> DirectoryEnumerator<'a> {
    pub fn new(store: &'a ArtifactStore, domain: &'a str) -> Self {
        Self {
            store,
            domain,
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }

    pub fn with_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }

    /// The server's first naming context, or the configured domain's DN.
    pub fn resolve_base(&self, session: &mut dyn DirectorySession) -> String {
        match session.naming_contexts() {
            Ok(contexts) => {
                if let Some(ctx) = contexts.into_iter().find(|c| !c.trim().is_empty()) {
                    return ctx;
                }
            }
            Err(e) => debug!("root DSE unavailable, falling back to domain: {}", e),
        }
        domain_base_dn(self.domain)
    }

    /// Enumerate every object under the base entry and write the report.
    /// Returns `None` when the search comes back empty.
    pub fn enumerate(
        &self,
        session: &mut dyn DirectorySession,
        label: &str,
        sink: &mut dyn EventSink,
    ) -> Result<Option<CredentialFinding>, DirectoryError> {
        let base_dn = self.resolve_base(session);
        sink.emit(ReconEvent::DirectoryBase {
            label: label.to_string(),
            base_dn: base_dn.clone(),
        });

        let objects =
            session.search_subtree(&base_dn, WILDCARD_FILTER, &SEARCH_ATTRIBUTES, self.size_limit)?;
        if objects.is_empty() {
            sink.emit(ReconEvent::DirectoryEmpty {
                label: label.to_string(),
            });
            return Ok(None);
        }

        let (report, tally) = render_report(label, &base_dn, &objects);
        let name = report_file_name(label);
        let path = self
            .store
            .write(&name, report.as_bytes())
            .map_err(|source| DirectoryError::Report {
                path: self.store.path_for(&name),
                source,
            })?;
        sink.emit(ReconEvent::DirectoryReport {
            label: label.to_string(),
            path: path.clone(),
            tally,
        });

        Ok(Some(CredentialFinding {
            source_file: format!("{}_enumeration", label),
            content_file: path,
            cred_file: None,
            line_count: objects.len(),
        }))
    }
}
