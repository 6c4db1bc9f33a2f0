//! Hashing utilities

use crate::types::TroveError;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Compute the MD5 content fingerprint of a file as lowercase hex
///
/// The file is streamed in 64KB chunks, so memory use does not depend on
/// file size. MD5 matches the ETag S3 reports for single-part uploads; it
/// is only used to detect changes.
///
/// # Example
/// ```no_run
/// use trove::hash::compute_hash;
/// use std::path::Path;
///
/// let hash = compute_hash(Path::new("trove/model.bin"))?;
/// # Ok::<(), trove::TroveError>(())
/// ```
pub fn compute_hash(file_path: &Path) -> Result<String, TroveError> {
    let mut file = File::open(file_path)?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let bytes_read = file.read(&mut buffer)?;

        if bytes_read == 0 {
            break; // EOF
        }

        hasher.update(&buffer[0..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute the MD5 fingerprint of an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_hash_empty_file() {
        let temp_file = NamedTempFile::new().unwrap();

        let hash = compute_hash(temp_file.path()).unwrap();
        assert_eq!(hash, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_hash_known_content() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"hello").unwrap();
        temp_file.flush().unwrap();

        let hash = compute_hash(temp_file.path()).unwrap();
        assert_eq!(hash, "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_file_and_buffer_hashes_agree() {
        let content = vec![7u8; 200 * 1024];
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&content).unwrap();
        temp_file.flush().unwrap();

        assert_eq!(compute_hash(temp_file.path()).unwrap(), hash_bytes(&content));
    }

    #[test]
    fn test_hash_nonexistent_file() {
        let result = compute_hash(Path::new("/nonexistent/file.txt"));
        assert!(matches!(result, Err(TroveError::Io(_))));
    }
}
