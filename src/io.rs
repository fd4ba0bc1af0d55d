use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;

/// Threshold in bytes above which downloaded artifacts are memory-mapped
/// instead of read into a buffer.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    // mapping a zero-length file fails on most platforms
    file_size_bytes > 0 && file_size_bytes >= threshold_bytes
}

/// Raw bytes of an artifact, either mapped or owned.
pub enum ArtifactBytes {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Deref for ArtifactBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ArtifactBytes::Mapped(m) => m,
            ArtifactBytes::Buffered(v) => v,
        }
    }
}

/// Read a whole artifact, mapping it when it is at least `threshold_bytes` long.
pub fn read_artifact<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<ArtifactBytes> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if meta.is_file() && should_use_mmap(meta.len(), threshold_bytes) {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.display()))?;
        Ok(ArtifactBytes::Mapped(mmap))
    } else {
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Ok(ArtifactBytes::Buffered(bytes))
    }
}

/// Decode UTF-8 best-effort: invalid byte sequences are dropped, not replaced.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn drops_invalid_sequences() {
        assert_eq!(decode_lossy(b"us\xffer:a\xc3dmin"), "user:admin");
        assert_eq!(decode_lossy("caf\u{e9}".as_bytes()), "caf\u{e9}");
    }

    #[test]
    fn mmap_and_buffered_reads_agree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"line one\nline two\n").unwrap();
        let mapped = read_artifact(&path, 1).unwrap();
        let buffered = read_artifact(&path, u64::MAX).unwrap();
        assert!(matches!(mapped, ArtifactBytes::Mapped(_)));
        assert!(matches!(buffered, ArtifactBytes::Buffered(_)));
        assert_eq!(&*mapped, &*buffered);
    }

    #[test]
    fn empty_file_is_never_mapped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();
        let bytes = read_artifact(&path, 0).unwrap();
        assert!(bytes.is_empty());
    }
}
