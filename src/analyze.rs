//! Credential-line scan over downloaded files.
//!
//! Every analyzed file yields an `extracted_<name>` copy of its text. Lines
//! that look like `key: value` pairs are written, numbered, to
//! `potential_creds_<name>.txt`. A file with no such line still produces a
//! finding with a zero count.
use std::path::Path;

use anyhow::{Context, Result};

use crate::events::PREVIEW_LINES;
use crate::finding::CredentialFinding;
use crate::io::{DEFAULT_MMAP_THRESHOLD_BYTES, decode_lossy, read_artifact};
use crate::store::{ArtifactStore, sanitize_file_name};

/// Minimum trimmed length, exclusive, of a credential-looking line.
const MIN_LINE_LEN: usize = 5;

/// A matched line and its 1-based position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLine {
    pub number: usize,
    pub text: String,
}

impl CandidateLine {
    pub fn render(&self) -> String {
        format!("Line {}: {}", self.number, self.text)
    }
}

pub fn is_potential_credential_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.contains(':') && line.chars().count() > MIN_LINE_LEN
}

pub fn scan_credential_lines(content: &str) -> Vec<CandidateLine> {
    content
        .split('\n')
        .enumerate()
        .filter(|(_, line)| is_potential_credential_line(line))
        .map(|(idx, line)| CandidateLine {
            number: idx + 1,
            text: line.trim().to_string(),
        })
        .collect()
}

pub fn content_file_name(display_name: &str) -> String {
    format!("extracted_{}", sanitize_file_name(display_name))
}

pub fn cred_file_name(display_name: &str) -> String {
    format!("potential_creds_{}.txt", sanitize_file_name(display_name))
}

/// Result of analyzing one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub finding: CredentialFinding,
    /// First matched lines, rendered, for progress output.
    pub preview: Vec<String>,
    /// Length of the decoded text.
    pub content_len: usize,
}

pub struct ContentAnalyzer<'a> {
    store: &'a ArtifactStore,
    mmap_threshold: u64,
}

impl<'a> ContentAnalyzer<'a> {
    pub fn new(store: &'a ArtifactStore) -> Self {
        Self {
            store,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD_BYTES,
        }
    }

    pub fn with_mmap_threshold(mut self, threshold_bytes: u64) -> Self {
        self.mmap_threshold = threshold_bytes;
        self
    }

    pub fn analyze(&self, local_path: &Path, display_name: &str) -> Result<Analysis> {
        let bytes = read_artifact(local_path, self.mmap_threshold)?;
        let content = decode_lossy(&bytes);
        drop(bytes);

        let mut extracted = format!("=== Content from {} ===\n", display_name);
        extracted.push_str(&content);
        let content_file = self
            .store
            .write(&content_file_name(display_name), extracted.as_bytes())
            .with_context(|| format!("save content of {}", display_name))?;

        let lines = scan_credential_lines(&content);
        let cred_file = if lines.is_empty() {
            None
        } else {
            let mut dump = format!("=== Potential credentials from {} ===\n\n", display_name);
            for line in &lines {
                dump.push_str(&line.render());
                dump.push('\n');
            }
            let path = self
                .store
                .write(&cred_file_name(display_name), dump.as_bytes())
                .with_context(|| format!("save credential lines of {}", display_name))?;
            Some(path)
        };

        Ok(Analysis {
            finding: CredentialFinding {
                source_file: display_name.to_string(),
                content_file,
                cred_file,
                line_count: lines.len(),
            },
            preview: lines
                .iter()
                .take(PREVIEW_LINES)
                .map(CandidateLine::render)
                .collect(),
            content_len: content.len(),
        })
    }
}
