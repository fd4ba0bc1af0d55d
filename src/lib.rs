pub mod analyze;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod extract;
pub mod finding;
pub mod io;
pub mod ldap;
pub mod probe;
pub mod recon;
pub mod report;
pub mod smb;
pub mod stats;
pub mod store;
pub mod target;

pub mod prelude {
    pub use crate::config::ReconConfig;
    pub use crate::events::{EventSink, LogSink, MemorySink, ReconEvent};
    pub use crate::finding::{AttemptRecord, CredentialFinding, ReconResult};
    pub use crate::recon::{Reconnaissance, Stage};
    pub use crate::target::Target;
}
