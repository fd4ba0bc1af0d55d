//! Artifact retention directory.
//!
//! Everything the probe writes (extracted content, credential line dumps,
//! directory reports and the raw downloads) lands under one configurable root.
//! Nothing here is removed at the end of a run: the files are kept for
//! analyst review after the exercise.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const DOWNLOADS_DIR: &str = "downloads";

/// Replace path separators so a remote-controlled name cannot escape the
/// artifact directory.
pub fn sanitize_file_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Path of an artifact file directly under the root.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(sanitize_file_name(name))
    }

    /// Write an artifact, creating the root if needed, and return its path.
    pub fn write(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn downloads_dir(&self) -> io::Result<PathBuf> {
        let dir = self.root.join(DOWNLOADS_DIR);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
