//! Sync engine: push and pull decisions against a storage backend

mod event;

pub use event::{Direction, SyncCallback, SyncEvent};

use crate::config::Manifest;
use crate::hash::compute_hash;
use crate::storage::{self, StorageBackend};
use crate::types::{FileRecord, RemoteObjectInfo, Result, TroveError, VersionRecord};
use once_cell::unsync::OnceCell;
use std::path::Path;
use tracing::{debug, info};

/// Result of a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    /// Version now authoritative for the file
    pub version: Option<String>,

    /// Whether content was uploaded (false when already up to date)
    pub uploaded: bool,
}

/// One invocation's view of a project: manifest plus storage handle
///
/// The storage backend is opened on first use, so commands that fail
/// before touching storage never resolve the storage URL.
pub struct Trove {
    manifest: Manifest,
    storage: OnceCell<Box<dyn StorageBackend>>,
    on_event: Option<Box<SyncCallback>>,
}

impl Trove {
    /// Load the manifest governing `start` and build an engine around it
    pub fn open(start: &Path) -> Result<Self> {
        Ok(Self::new(Manifest::load(start)?))
    }

    /// Build an engine around an already loaded manifest
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            storage: OnceCell::new(),
            on_event: None,
        }
    }

    /// Use `storage` instead of the backend named by the manifest
    pub fn with_storage(self, storage: Box<dyn StorageBackend>) -> Self {
        Self {
            storage: OnceCell::with_value(storage),
            ..self
        }
    }

    /// Register a callback for progress and status events
    pub fn with_events(mut self, on_event: impl Fn(&SyncEvent<'_>) + 'static) -> Self {
        self.on_event = Some(Box::new(on_event));
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn storage(&self) -> Result<&dyn StorageBackend> {
        self.storage
            .get_or_try_init(|| storage::open(&self.manifest.storage_url()?))
            .map(|storage| &**storage)
    }

    fn emit(&self, event: SyncEvent<'_>) {
        if let Some(on_event) = &self.on_event {
            on_event(&event);
        }
    }

    /// Upload a tracked file unless storage already has identical content
    ///
    /// When tracking is enabled the resulting version is recorded in the
    /// manifest, which is saved immediately.
    pub fn push(&mut self, name: &str) -> Result<PushOutcome> {
        let src = self.manifest.resolved_path(name)?;
        if !src.is_file() {
            return Err(TroveError::LocalFileNotFound(name.to_string()));
        }

        let storage = self.storage()?;
        let remote = storage.info(name, None)?;
        let outcome = match remote {
            Some(info) if !is_stale(&src, &info)? => {
                debug!(name, version = ?info.version, "remote content matches");
                self.emit(SyncEvent::UpToDate { name });
                PushOutcome {
                    version: info.version,
                    uploaded: false,
                }
            }
            _ => {
                self.emit(SyncEvent::Started {
                    name,
                    direction: Direction::Push,
                });
                let receipt = storage.upload(&src, name, &mut |current, total| {
                    self.emit(SyncEvent::Progress {
                        name,
                        current,
                        total,
                    })
                })?;
                self.emit(SyncEvent::Finished {
                    name,
                    direction: Direction::Push,
                });
                info!(name, version = ?receipt.version, "pushed");
                PushOutcome {
                    version: receipt.version,
                    uploaded: true,
                }
            }
        };

        if self.manifest.tracking_enabled() {
            self.manifest.record_version(name, outcome.version.clone())?;
        }
        Ok(outcome)
    }

    /// Pull one file, or every file in the manifest when `name` is None
    ///
    /// Returns how many files were downloaded. A batch pull stops at the
    /// first failing file.
    pub fn pull(&self, name: Option<&str>, version: Option<&str>) -> Result<usize> {
        match name {
            Some(name) => Ok(usize::from(self.pull_file(name, version)?)),
            None if version.is_some() => Err(TroveError::Argument(
                "Specify filename for version".to_string(),
            )),
            None => self.pull_all(),
        }
    }

    /// Pull every file listed in the manifest at its recorded version
    pub fn pull_all(&self) -> Result<usize> {
        let mut downloaded = 0;
        for file in self.manifest.files() {
            if self.sync_down(&file.name, file.version.as_deref(), true)? {
                downloaded += 1;
            }
        }
        Ok(downloaded)
    }

    /// Bring one local file in line with storage; true if it was downloaded
    ///
    /// An explicit `version` wins over the manifest's record, which wins
    /// over the latest version.
    pub fn pull_file(&self, name: &str, version: Option<&str>) -> Result<bool> {
        self.sync_down(name, version, false)
    }

    fn sync_down(&self, name: &str, version: Option<&str>, batch: bool) -> Result<bool> {
        let dest = self.manifest.resolved_path(name)?;
        let version = version.or_else(|| self.manifest.recorded_version(name));
        let storage = self.storage()?;

        let download = if dest.exists() {
            match storage.info(name, version)? {
                Some(info) => is_stale(&dest, &info)?,
                None => true,
            }
        } else {
            true
        };
        debug!(name, ?version, download, "pull decision");

        if !download {
            if !batch {
                self.emit(SyncEvent::UpToDate { name });
            }
            return Ok(false);
        }

        self.emit(SyncEvent::Started {
            name,
            direction: Direction::Pull,
        });
        storage.download(name, &dest, version, &mut |current, total| {
            self.emit(SyncEvent::Progress {
                name,
                current,
                total,
            })
        })?;
        self.emit(SyncEvent::Finished {
            name,
            direction: Direction::Pull,
        });
        info!(name, ?version, "pulled");
        Ok(true)
    }

    /// Delete a file from storage; the manifest entry is left in place
    pub fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.storage()?.delete(name, None))
    }

    /// Delete one stored version of a file
    pub fn delete_version(&self, name: &str, version: &str) -> Result<bool> {
        Ok(self.storage()?.delete(name, Some(version)))
    }

    /// Files currently in storage
    pub fn list(&self) -> Result<Vec<FileRecord>> {
        self.storage()?.list()
    }

    /// Stored versions of one file
    pub fn versions(&self, name: &str) -> Result<Vec<VersionRecord>> {
        self.storage()?.versions(name)
    }
}

/// Local content differs from what storage holds for the resolved version
fn is_stale(path: &Path, remote: &RemoteObjectInfo) -> Result<bool> {
    Ok(compute_hash(path)? != remote.content_hash)
}
