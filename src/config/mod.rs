//! Configuration: project manifest, storage URL and command line

mod cli;
mod manifest;
mod storage_url;

pub use cli::{Cli, Command};
pub use manifest::{
    Manifest, TrackedFile, DEFAULT_ROOT, MANIFEST_FILE, MAX_SEARCH_DEPTH, STORAGE_URL_ENV,
};
pub use storage_url::StorageUrl;
