use std::path::PathBuf;
use std::time::Duration;

use crate::io::DEFAULT_MMAP_THRESHOLD_BYTES;
use crate::ldap::DEFAULT_SIZE_LIMIT;

pub const DEFAULT_DOMAIN: &str = "cybersuraksha.local";

/// Tunables for one reconnaissance run.
#[derive(Debug, Clone)]
pub struct ReconConfig {
    /// Where artifacts and downloads are kept after the run.
    pub output_dir: PathBuf,
    /// Basic connectivity, RPC and LDAP fallback probes.
    pub connect_timeout: Duration,
    /// SMB port discovery probes.
    pub discovery_timeout: Duration,
    /// SMB and LDAP protocol sessions.
    pub session_timeout: Duration,
    /// Pause after every stage.
    pub stage_pause: Duration,
    pub ldap_size_limit: usize,
    pub mmap_threshold: u64,
    /// Use the directory search client when one is available.
    pub directory_search: bool,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            connect_timeout: Duration::from_secs(5),
            discovery_timeout: Duration::from_secs(3),
            session_timeout: Duration::from_secs(10),
            stage_pause: Duration::from_secs(1),
            ldap_size_limit: DEFAULT_SIZE_LIMIT,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD_BYTES,
            directory_search: true,
        }
    }
}
