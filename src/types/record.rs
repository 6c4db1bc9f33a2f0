//! Records exchanged between the sync engine and storage backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote metadata returned by `StorageBackend::info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObjectInfo {
    /// Backend-assigned version id (None when the store is unversioned)
    pub version: Option<String>,

    /// Content check value, lowercase hex MD5 for single-part uploads
    pub content_hash: String,
}

/// Result of a completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Version id assigned to the new object
    pub version: Option<String>,
}

/// One object in the storage namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Object name with the namespace prefix stripped
    pub filename: String,
    pub size: u64,
    pub updated_at: DateTime<Utc>,
}

/// One stored version of an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: Option<String>,
    pub size: u64,
    pub updated_at: DateTime<Utc>,
}
