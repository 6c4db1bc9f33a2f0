//! In-memory versioned storage
//!
//! Behaves like a versioned bucket and counts transfers, so engine
//! behaviour can be checked without network access.

use super::{ProgressFn, StorageBackend};
use crate::hash::hash_bytes;
use crate::transfer::{write_atomic, PartialFile, CHUNK_SIZE};
use crate::types::{FileRecord, RemoteObjectInfo, Result, TroveError, UploadReceipt, VersionRecord};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct StoredVersion {
    id: Option<String>,
    data: Vec<u8>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Versions per name, oldest first
    objects: BTreeMap<String, Vec<StoredVersion>>,
    next_version: u64,
    uploads: usize,
    downloads: usize,
    fail_downloads: bool,
}

/// Shared handle to an in-memory object store
///
/// Clones share state, so a test can keep one handle while the engine
/// owns another.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Rc<RefCell<Inner>>,
    versioned: bool,
}

impl MemoryStorage {
    /// A store that assigns `v1`, `v2`, ... to every upload
    pub fn new() -> Self {
        Self {
            inner: Rc::default(),
            versioned: true,
        }
    }

    /// A store without versioning: uploads replace content, ids are absent
    pub fn unversioned() -> Self {
        Self {
            inner: Rc::default(),
            versioned: false,
        }
    }

    /// Store `data` under `name` directly, returning the new version id
    pub fn put(&self, name: &str, data: &[u8]) -> Option<String> {
        let mut inner = self.inner.borrow_mut();
        let id = if self.versioned {
            inner.next_version += 1;
            Some(format!("v{}", inner.next_version))
        } else {
            None
        };

        let versions = inner.objects.entry(name.to_string()).or_default();
        if !self.versioned {
            versions.clear();
        }
        versions.push(StoredVersion {
            id: id.clone(),
            data: data.to_vec(),
            updated_at: Utc::now(),
        });
        id
    }

    /// Content of the latest or a specific version
    pub fn content(&self, name: &str, version: Option<&str>) -> Option<Vec<u8>> {
        self.find(name, version).map(|stored| stored.data)
    }

    /// Number of completed uploads
    pub fn uploads(&self) -> usize {
        self.inner.borrow().uploads
    }

    /// Number of completed downloads
    pub fn downloads(&self) -> usize {
        self.inner.borrow().downloads
    }

    /// Make downloads fail after writing part of the content
    pub fn set_fail_downloads(&self, fail: bool) {
        self.inner.borrow_mut().fail_downloads = fail;
    }

    fn find(&self, name: &str, version: Option<&str>) -> Option<StoredVersion> {
        let inner = self.inner.borrow();
        let versions = inner.objects.get(name)?;
        match version {
            Some(version) => versions
                .iter()
                .find(|stored| stored.id.as_deref() == Some(version))
                .cloned(),
            None => versions.last().cloned(),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryStorage {
    fn info(&self, name: &str, version: Option<&str>) -> Result<Option<RemoteObjectInfo>> {
        Ok(self.find(name, version).map(|stored| RemoteObjectInfo {
            version: stored.id,
            content_hash: hash_bytes(&stored.data),
        }))
    }

    fn upload(
        &self,
        src: &Path,
        name: &str,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<UploadReceipt> {
        let mut file = File::open(src)?;
        let total = file.metadata()?.len();
        let mut data = Vec::with_capacity(total as usize);
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            data.extend_from_slice(&buffer[..bytes_read]);
            on_progress(data.len() as u64, total);
        }
        if data.is_empty() {
            on_progress(0, 0);
        }

        let version = self.put(name, &data);
        self.inner.borrow_mut().uploads += 1;
        Ok(UploadReceipt { version })
    }

    fn download(
        &self,
        name: &str,
        dest: &Path,
        version: Option<&str>,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<()> {
        let stored = self
            .find(name, version)
            .ok_or_else(|| TroveError::RemoteFileNotFound(name.to_string()))?;

        if self.inner.borrow().fail_downloads {
            let mut part = PartialFile::create(dest)?;
            part.write_chunk(&stored.data[..stored.data.len() / 2])?;
            return Err(TroveError::Backend("connection reset".to_string()));
        }

        let total = stored.data.len() as u64;
        write_atomic(dest, &mut stored.data.as_slice(), total, on_progress)?;
        self.inner.borrow_mut().downloads += 1;
        Ok(())
    }

    fn delete(&self, name: &str, version: Option<&str>) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(versions) = inner.objects.get_mut(name) else {
            return false;
        };

        let removed = match version {
            Some(version) => {
                let before = versions.len();
                versions.retain(|stored| stored.id.as_deref() != Some(version));
                versions.len() != before
            }
            None => {
                versions.clear();
                true
            }
        };
        if versions.is_empty() {
            inner.objects.remove(name);
        }
        removed
    }

    fn list(&self) -> Result<Vec<FileRecord>> {
        let inner = self.inner.borrow();
        Ok(inner
            .objects
            .iter()
            .filter_map(|(name, versions)| {
                versions.last().map(|latest| FileRecord {
                    filename: name.clone(),
                    size: latest.data.len() as u64,
                    updated_at: latest.updated_at,
                })
            })
            .collect())
    }

    fn versions(&self, name: &str) -> Result<Vec<VersionRecord>> {
        let inner = self.inner.borrow();
        Ok(inner
            .objects
            .get(name)
            .map(|versions| {
                versions
                    .iter()
                    .rev()
                    .map(|stored| VersionRecord {
                        version: stored.id.clone(),
                        size: stored.data.len() as u64,
                        updated_at: stored.updated_at,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
