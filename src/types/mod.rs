//! Core type definitions for trove

mod error;
mod record;

pub use error::{Result, TroveError};
pub use record::{FileRecord, RemoteObjectInfo, UploadReceipt, VersionRecord};
