//! Remote versioned object storage

pub mod memory;
pub mod s3;

use crate::config::StorageUrl;
use crate::types::{FileRecord, RemoteObjectInfo, Result, UploadReceipt, VersionRecord};
use std::path::Path;

pub use memory::MemoryStorage;
pub use s3::{S3Storage, S3StorageConfig};

/// Progress callback: `(bytes_transferred, total_bytes)`
pub type ProgressFn<'a> = dyn FnMut(u64, u64) + 'a;

/// Operations the sync engine needs from a versioned object store
///
/// Names are relative to the backend's namespace (the URL prefix).
/// "Absent" outcomes are part of the contract and not errors: `info`
/// returns `None`, `delete` returns `false`.
pub trait StorageBackend {
    /// Fetch metadata for the latest or a specific version, without content
    fn info(&self, name: &str, version: Option<&str>) -> Result<Option<RemoteObjectInfo>>;

    /// Stream a local file to storage
    fn upload(&self, src: &Path, name: &str, on_progress: &mut ProgressFn<'_>)
        -> Result<UploadReceipt>;

    /// Stream an object to `dest`, replacing it only once fully received
    ///
    /// Fails with `RemoteFileNotFound` when the object or version is absent.
    fn download(
        &self,
        name: &str,
        dest: &Path,
        version: Option<&str>,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<()>;

    /// Delete the object (or one version of it); `false` if that failed
    fn delete(&self, name: &str, version: Option<&str>) -> bool;

    /// One record per object name under the namespace
    fn list(&self) -> Result<Vec<FileRecord>>;

    /// Every stored version of one object
    fn versions(&self, name: &str) -> Result<Vec<VersionRecord>>;
}

/// Builds a backend for a parsed storage URL
pub type Provider = fn(&StorageUrl) -> Result<Box<dyn StorageBackend>>;

const PROVIDERS: &[(&str, Provider)] = &[("s3", s3::open)];

/// Look up the backend constructor registered for `scheme`
pub fn provider(scheme: &str) -> Option<Provider> {
    PROVIDERS
        .iter()
        .find(|(name, _)| *name == scheme)
        .map(|(_, provider)| *provider)
}

/// Open the backend a storage URL points at
pub fn open(url: &StorageUrl) -> Result<Box<dyn StorageBackend>> {
    let provider = provider(&url.scheme)
        .ok_or_else(|| crate::TroveError::InvalidStorageProvider(url.scheme.clone()))?;
    provider(url)
}
