//! Storage URL parsing

use crate::types::TroveError;
use url::Url;

/// A parsed `scheme://bucket/prefix` storage location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUrl {
    /// URL scheme, selects the backend
    pub scheme: String,

    /// Host component (the bucket for S3)
    pub bucket: String,

    /// Path with surrounding slashes removed, None when empty
    pub prefix: Option<String>,
}

impl StorageUrl {
    /// Parse a storage URL without checking the scheme against the registry
    pub fn parse(raw: &str) -> Result<Self, TroveError> {
        let url = Url::parse(raw.trim()).map_err(|_| TroveError::InvalidStorageUrl)?;

        let prefix = url.path().trim_matches('/');
        Ok(Self {
            scheme: url.scheme().to_string(),
            bucket: url.host_str().unwrap_or_default().to_string(),
            prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
        })
    }
}

impl std::fmt::Display for StorageUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}://{}/{}", self.scheme, self.bucket, prefix),
            None => write!(f, "{}://{}", self.scheme, self.bucket),
        }
    }
}
