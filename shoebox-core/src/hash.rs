//! Content fingerprinting for duplicate detection.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 1_048_576; // 1MB

/// SHA-256 over the raw file bytes, as lowercase hex.
///
/// Deterministic from the content alone; the duplicate-detection key.
pub async fn hash_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hash an in-memory buffer. Same digest as [`hash_file`] over the same bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_and_buffer_digests_agree() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.bin");
        tokio::fs::write(&path, b"some photo bytes").await.unwrap();

        let from_file = hash_file(&path).await.unwrap();
        assert_eq!(from_file, hash_bytes(b"some photo bytes"));
    }

    #[tokio::test]
    async fn digest_is_stable_sha256() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty");
        tokio::fs::write(&path, b"").await.unwrap();

        // SHA-256 of the empty input
        assert_eq!(
            hash_file(&path).await.unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn different_content_different_digest() {
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
    }
}
