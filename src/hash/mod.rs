//! Hashing utilities

use crate::types::{FileRecord, MirrorError};
use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 32-byte content digest
pub type Digest = [u8; 32];

/// Files are streamed through the digest in 1 MiB chunks.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Digest algorithm used for change detection
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

enum StreamHasher {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => StreamHasher::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => StreamHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            StreamHasher::Sha256(h) => h.update(bytes),
            StreamHasher::Blake3(h) => {
                h.update(bytes);
            }
        }
    }

    fn finalize(self) -> Digest {
        match self {
            StreamHasher::Sha256(h) => {
                let mut digest = [0u8; 32];
                digest.copy_from_slice(&h.finalize());
                digest
            }
            StreamHasher::Blake3(h) => *h.finalize().as_bytes(),
        }
    }
}

/// Compute the digest of a file
///
/// The file is streamed in 1 MiB chunks so memory use does not depend on file size.
///
/// # Example
/// ```no_run
/// use hashmirror::hash::{compute_hash, HashAlgorithm};
/// use std::path::Path;
///
/// let digest = compute_hash(Path::new("file.txt"), HashAlgorithm::Sha256)?;
/// # Ok::<(), hashmirror::types::MirrorError>(())
/// ```
pub fn compute_hash(file_path: &Path, algorithm: HashAlgorithm) -> Result<Digest, MirrorError> {
    stream_digest(file_path, algorithm).map(|(digest, _)| digest)
}

/// Hash the file behind `record`, rooted at `root`
///
/// Fails with [`MirrorError::Hash`] when the file cannot be read or when the number of
/// bytes read differs from the size recorded at scan time (truncated or rewritten mid-run).
pub fn hash_record(
    root: &Path,
    record: &FileRecord,
    algorithm: HashAlgorithm,
) -> Result<Digest, MirrorError> {
    let path = root.join(&record.relative_path);
    let (digest, bytes_read) = stream_digest(&path, algorithm).map_err(|e| MirrorError::Hash {
        path: record.relative_path.clone(),
        reason: e.to_string(),
    })?;

    if bytes_read != record.size {
        return Err(MirrorError::Hash {
            path: record.relative_path.clone(),
            reason: format!(
                "file changed while hashing ({} bytes scanned, {} bytes read)",
                record.size, bytes_read
            ),
        });
    }

    Ok(digest)
}

fn stream_digest(path: &Path, algorithm: HashAlgorithm) -> Result<(Digest, u64), MirrorError> {
    let mut file = File::open(path).map_err(MirrorError::Io)?;
    let mut hasher = StreamHasher::new(algorithm);
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = file.read(&mut buffer).map_err(MirrorError::Io)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    Ok((hasher.finalize(), total))
}

/// Lowercase hex rendering of a digest
pub fn to_hex(digest: &Digest) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::UNIX_EPOCH;
    use tempfile::NamedTempFile;

    fn temp_with(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_sha256_known_vector() {
        let file = temp_with(b"abc");
        let digest = compute_hash(file.path(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            to_hex(&digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_algorithms_disagree() {
        let file = temp_with(b"same bytes");
        let sha = compute_hash(file.path(), HashAlgorithm::Sha256).unwrap();
        let blake = compute_hash(file.path(), HashAlgorithm::Blake3).unwrap();
        assert_ne!(sha, blake);
    }

    #[test]
    fn test_hash_spans_multiple_chunks() {
        let content = vec![7u8; CHUNK_SIZE * 2 + 17];
        let a = temp_with(&content);
        let mut altered = content.clone();
        *altered.last_mut().unwrap() = 8;
        let b = temp_with(&altered);

        assert_ne!(
            compute_hash(a.path(), HashAlgorithm::Sha256).unwrap(),
            compute_hash(b.path(), HashAlgorithm::Sha256).unwrap()
        );
    }

    #[test]
    fn test_hash_record_detects_size_change() {
        let file = temp_with(b"0123456789");
        let root = file.path().parent().unwrap();
        let name = PathBuf::from(file.path().file_name().unwrap());
        let stale = FileRecord::new(name, 4, UNIX_EPOCH);

        let err = hash_record(root, &stale, HashAlgorithm::Sha256).unwrap_err();
        assert!(matches!(err, MirrorError::Hash { .. }));
    }

    #[test]
    fn test_hash_record_missing_file_is_hash_error() {
        let dir = tempfile::tempdir().unwrap();
        let record = FileRecord::new(PathBuf::from("vanished.txt"), 3, UNIX_EPOCH);

        let err = hash_record(dir.path(), &record, HashAlgorithm::Sha256).unwrap_err();
        match err {
            MirrorError::Hash { path, .. } => assert_eq!(path, PathBuf::from("vanished.txt")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
