//! SMB share enumeration.
//!
//! The protocol client is reached through [`ShareConnector`] and
//! [`ShareSession`]; [`smbclient`] provides the default implementation.
//! [`ShareEnumerator`] lists the non-administrative shares of a session and
//! the files at the root of each, skipping shares that cannot be listed.
use std::io::Write;

use crate::error::NetworkError;
use crate::events::{EventSink, ReconEvent};
use crate::finding::{RemoteFile, ShareHandle};
use crate::target::Target;

pub mod smbclient;

pub const ADMINISTRATIVE_SHARES: [&str; 3] = ["ADMIN$", "C$", "IPC$"];

pub const INTERESTING_EXTENSIONS: [&str; 7] =
    [".txt", ".xml", ".config", ".ini", ".log", ".csv", ".xlsx"];

pub const INTERESTING_KEYWORDS: [&str; 8] = [
    "password",
    "credential",
    "account",
    "user",
    "admin",
    "config",
    "finance",
    "hr",
];

/// Account used to open an SMB session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareCredentials {
    pub username: String,
    pub password: String,
}

impl ShareCredentials {
    pub fn anonymous() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
        }
    }

    pub fn guest() -> Self {
        Self {
            username: "guest".to_string(),
            password: String::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }

    /// Attempt name under which a login with these credentials is recorded.
    pub fn technique(&self) -> &'static str {
        if self.is_anonymous() {
            "SMB Anonymous Access"
        } else {
            "SMB Guest Access"
        }
    }

    pub fn label(&self) -> &str {
        if self.is_anonymous() {
            "anonymous"
        } else {
            &self.username
        }
    }
}

pub trait ShareConnector {
    fn login(
        &self,
        target: &Target,
        credentials: &ShareCredentials,
    ) -> Result<Box<dyn ShareSession>, NetworkError>;
}

/// An authenticated SMB session. Share handles are only meaningful while the
/// session is alive.
pub trait ShareSession {
    fn list_shares(&mut self) -> Result<Vec<String>, NetworkError>;
    /// Entries at the root of `share`.
    fn list_files(&mut self, share: &str) -> Result<Vec<RemoteFile>, NetworkError>;
    /// Stream the remote file into `out`, returning the number of bytes copied.
    fn read_file(
        &mut self,
        share: &str,
        filename: &str,
        out: &mut dyn Write,
    ) -> Result<u64, NetworkError>;
}

pub fn is_administrative_share(name: &str) -> bool {
    ADMINISTRATIVE_SHARES
        .iter()
        .any(|admin| admin.eq_ignore_ascii_case(name))
}

/// A file is worth downloading when its extension or name suggests
/// configuration or account data.
pub fn is_interesting(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    INTERESTING_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        || INTERESTING_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Share with the root listing that proved it accessible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibleShare {
    pub share: ShareHandle,
    pub files: Vec<RemoteFile>,
}

impl AccessibleShare {
    /// Files to download, in listing order.
    pub fn interesting_files(&self) -> impl Iterator<Item = &RemoteFile> {
        self.files
            .iter()
            .filter(|f| !f.is_directory && is_interesting(&f.filename))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ShareEnumerator;

impl ShareEnumerator {
    pub fn new() -> Self {
        Self
    }

    pub fn list_shares(
        &self,
        session: &mut dyn ShareSession,
    ) -> Result<Vec<ShareHandle>, NetworkError> {
        Ok(session
            .list_shares()?
            .into_iter()
            .filter(|name| !is_administrative_share(name))
            .map(|name| ShareHandle { name })
            .collect())
    }

    pub fn list_files(
        &self,
        session: &mut dyn ShareSession,
        share: &ShareHandle,
    ) -> Result<Vec<RemoteFile>, NetworkError> {
        session.list_files(&share.name)
    }

    /// List every share and its files. A share whose listing fails is
    /// reported and left out; only a failure to list the shares themselves
    /// is returned as an error.
    pub fn enumerate(
        &self,
        session: &mut dyn ShareSession,
        sink: &mut dyn EventSink,
    ) -> Result<Vec<AccessibleShare>, NetworkError> {
        let mut accessible = Vec::new();
        for share in self.list_shares(session)? {
            match self.list_files(session, &share) {
                Ok(files) => {
                    sink.emit(ReconEvent::ShareAccessible {
                        share: share.name.clone(),
                        entries: files.len(),
                    });
                    accessible.push(AccessibleShare { share, files });
                }
                Err(e) => sink.emit(ReconEvent::ShareSkipped {
                    share: share.name.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        Ok(accessible)
    }
}
