//! Download of remote files into the artifact store.
//!
//! Content is streamed into a fresh temporary file under `downloads/`. The
//! temporary file deletes itself if the transfer fails part-way; once the
//! transfer completes it is persisted and left in place for review.
use std::io::{self, Write};
use std::path::PathBuf;

use log::debug;

use crate::error::NetworkError;
use crate::finding::DownloadedArtifact;
use crate::smb::ShareSession;
use crate::store::{ArtifactStore, sanitize_file_name};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("reading {share}\\{filename} failed: {source}")]
    Remote {
        share: String,
        filename: String,
        #[source]
        source: NetworkError,
    },
    #[error("local write failed: {0}")]
    Local(#[from] io::Error),
    #[error("could not keep {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct FileExtractor<'a> {
    store: &'a ArtifactStore,
}

impl<'a> FileExtractor<'a> {
    pub fn new(store: &'a ArtifactStore) -> Self {
        Self { store }
    }

    pub fn download(
        &self,
        session: &mut dyn ShareSession,
        share: &str,
        filename: &str,
    ) -> Result<DownloadedArtifact, TransferError> {
        let dir = self.store.downloads_dir()?;
        let suffix = format!("_{}", sanitize_file_name(filename));
        let mut tmp = tempfile::Builder::new()
            .prefix("download_")
            .suffix(&suffix)
            .tempfile_in(&dir)?;

        let bytes = session
            .read_file(share, filename, &mut tmp)
            .map_err(|source| TransferError::Remote {
                share: share.to_string(),
                filename: filename.to_string(),
                source,
            })?;
        tmp.flush()?;

        let (_file, local_path) = tmp.keep().map_err(|e| TransferError::Persist {
            path: e.file.path().to_path_buf(),
            source: e.error,
        })?;
        debug!(
            "downloaded {}\\{} ({} bytes) to {}",
            share,
            filename,
            bytes,
            local_path.display()
        );
        Ok(DownloadedArtifact {
            share: share.to_string(),
            filename: filename.to_string(),
            local_path,
        })
    }
}
