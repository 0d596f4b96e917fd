//! SHA256 verification of downloaded release assets.
//!
//! Checksum files may hold a bare digest, a `sha256:`-prefixed digest, or
//! `sha256sum` output listing several assets.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::core::UpdateError;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Verifies the integrity of a downloaded binary using SHA256 checksums.
///
/// Digests are compared case-insensitively and may carry a `sha256:` prefix.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the hex-encoded SHA256 digest of a file, streaming its contents.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tasklog::upgrade::verification::ChecksumVerifier;
    /// use std::path::Path;
    ///
    /// # async fn example() -> Result<(), tasklog::core::UpdateError> {
    /// let checksum = ChecksumVerifier::compute_sha256(Path::new("/path/to/binary")).await?;
    /// println!("SHA256: {}", checksum);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compute_sha256(file_path: &Path) -> Result<String, UpdateError> {
        debug!("Computing SHA256 checksum for: {:?}", file_path);

        let mut file = File::open(file_path)
            .await
            .map_err(|e| UpdateError::fs("open file for checksum", file_path, e))?;

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| UpdateError::fs("read file for checksum", file_path, e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Verify a file against an expected digest.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ChecksumMismatch`] when the digests differ.
    pub async fn verify_checksum(
        file_path: &Path,
        expected_checksum: &str,
    ) -> Result<(), UpdateError> {
        info!("Verifying checksum for: {:?}", file_path);

        let actual = Self::compute_sha256(file_path).await?;
        let expected = normalize_digest(expected_checksum);

        if actual != expected {
            return Err(UpdateError::ChecksumMismatch {
                file: file_path.display().to_string(),
                expected,
                actual,
            });
        }

        info!("Checksum verification successful");
        Ok(())
    }

    /// Extract the expected digest for `file_name` from a checksum file.
    ///
    /// Accepted formats:
    /// ```text
    /// abc123def456...                              (bare digest)
    /// sha256:abc123def456...                       (prefixed digest)
    /// abc123def456...  tasklog_1.1.0_linux_x86_64  (sha256sum output)
    /// abc123def456... *tasklog_1.1.0_linux_x86_64  (sha256sum binary mode)
    /// ```
    ///
    /// Returns `None` when no line applies to `file_name`.
    #[must_use]
    pub fn parse_expected_checksum(content: &str, file_name: &str) -> Option<String> {
        let lines: Vec<Vec<&str>> = content
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty())
            .collect();

        if let [single] = lines.as_slice() {
            if let [digest] = single.as_slice() {
                return Some(normalize_digest(digest));
            }
        }

        lines.iter().find_map(|parts| match parts.as_slice() {
            [digest, name] => {
                let name = name.trim_start_matches('*');
                // Entries may carry a directory prefix like `dist/`.
                let matches = name == file_name || name.ends_with(&format!("/{file_name}"));
                matches.then(|| normalize_digest(digest))
            }
            _ => None,
        })
    }
}

fn normalize_digest(digest: &str) -> String {
    let digest = digest.trim();
    let digest = digest.strip_prefix("sha256:").unwrap_or(digest);
    digest.to_lowercase()
}
