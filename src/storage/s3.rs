//! S3-compatible storage backend
//!
//! The AWS SDK is async; trove is a blocking CLI, so each backend owns a
//! current-thread tokio runtime and drives requests with `block_on`.

use super::{ProgressFn, StorageBackend};
use crate::config::StorageUrl;
use crate::transfer::{PartialFile, CHUNK_SIZE};
use crate::types::{FileRecord, RemoteObjectInfo, Result, TroveError, UploadReceipt, VersionRecord};
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use http_body::Frame;
use http_body_util::StreamBody;
use std::path::Path;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// Environment variable holding a custom endpoint (MinIO, LocalStack)
pub const ENDPOINT_ENV: &str = "TROVE_S3_ENDPOINT";

/// Environment variable overriding the region
pub const REGION_ENV: &str = "TROVE_S3_REGION";

/// S3 reports this version id for objects written while versioning was off
const NULL_VERSION: &str = "null";

/// Location and client settings for S3Storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3StorageConfig {
    /// Bucket name
    pub bucket: String,
    /// Key prefix within the bucket
    pub prefix: Option<String>,
    /// Custom endpoint (MinIO, LocalStack); enables path-style addressing
    pub endpoint_url: Option<String>,
    /// Region override
    pub region: Option<String>,
}

impl S3StorageConfig {
    /// Config for a bare bucket
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            endpoint_url: None,
            region: None,
        }
    }

    /// Config for an `s3://bucket/prefix` URL
    pub fn from_url(url: &StorageUrl) -> Result<Self> {
        if url.bucket.is_empty() {
            return Err(TroveError::InvalidStorageUrl);
        }
        let config = Self::new(url.bucket.clone());
        Ok(match &url.prefix {
            Some(prefix) => config.with_prefix(prefix.clone()),
            None => config,
        })
    }

    /// Set the key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a custom endpoint URL
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Apply `TROVE_S3_ENDPOINT` and `TROVE_S3_REGION` when set
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(non_empty_env(ENDPOINT_ENV), non_empty_env(REGION_ENV))
    }

    fn with_overrides(self, endpoint: Option<String>, region: Option<String>) -> Self {
        let config = match endpoint {
            Some(endpoint) => self.with_endpoint_url(endpoint),
            None => self,
        };
        match region {
            Some(region) => config.with_region(region),
            None => config,
        }
    }

    /// Full object key for a name
    pub fn key(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), name),
            None => name.to_string(),
        }
    }

    /// Listing prefix covering every object in the namespace
    fn list_prefix(&self) -> Option<String> {
        self.prefix
            .as_ref()
            .map(|prefix| format!("{}/", prefix.trim_end_matches('/')))
    }

    /// Name of an object relative to the namespace
    fn name_for_key<'a>(&self, key: &'a str) -> &'a str {
        match self.list_prefix() {
            Some(prefix) => key.strip_prefix(prefix.as_str()).unwrap_or(key),
            None => key,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Registry constructor for `s3://` URLs
pub(crate) fn open(url: &StorageUrl) -> Result<Box<dyn StorageBackend>> {
    let config = S3StorageConfig::from_url(url)?.with_env_overrides();
    Ok(Box::new(S3Storage::new(config)?))
}

/// Storage backed by an S3-compatible bucket
///
/// Credentials come from the standard AWS chain
pub struct S3Storage {
    runtime: Runtime,
    client: Client,
    config: S3StorageConfig,
}

impl S3Storage {
    /// Create the runtime and client for `config`
    pub fn new(config: S3StorageConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let client = runtime.block_on(async {
            let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = &config.region {
                aws_config_loader =
                    aws_config_loader.region(aws_config::Region::new(region.clone()));
            }
            let aws_config = aws_config_loader.load().await;

            let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);
            if let Some(endpoint) = &config.endpoint_url {
                s3_config_builder = s3_config_builder
                    .endpoint_url(endpoint)
                    .force_path_style(true);
            }
            Client::from_conf(s3_config_builder.build())
        });

        debug!(bucket = %config.bucket, prefix = ?config.prefix, "S3 storage ready");
        Ok(Self {
            runtime,
            client,
            config,
        })
    }

}

fn backend_error<E>(err: SdkError<E>) -> TroveError
where
    E: std::error::Error + 'static,
{
    TroveError::Backend(DisplayErrorContext(&err).to_string())
}

/// Service-level failures (404, invalid version id, access denied) as
/// opposed to transport failures
fn is_service_error<E>(err: &SdkError<E>) -> bool {
    matches!(err, SdkError::ServiceError(_))
}

fn to_utc(time: Option<&aws_sdk_s3::primitives::DateTime>) -> DateTime<Utc> {
    time.and_then(|time| DateTime::from_timestamp(time.secs(), time.subsec_nanos()))
        .unwrap_or_default()
}

impl StorageBackend for S3Storage {
    fn info(&self, name: &str, version: Option<&str>) -> Result<Option<RemoteObjectInfo>> {
        let key = self.config.key(name);
        let response = self.runtime.block_on(
            self.client
                .head_object()
                .bucket(&self.config.bucket)
                .key(&key)
                .set_version_id(version.map(str::to_owned))
                .send(),
        );

        match response {
            // ETag is MD5 only for single-part uploads, which is all trove does
            Ok(head) => Ok(Some(RemoteObjectInfo {
                version: head.version_id().map(str::to_owned),
                content_hash: head.e_tag().unwrap_or_default().trim_matches('"').to_string(),
            })),
            Err(err) if is_service_error(&err) => {
                debug!(key = %key, ?version, "object not found");
                Ok(None)
            }
            Err(err) => Err(backend_error(err)),
        }
    }

    fn upload(
        &self,
        src: &Path,
        name: &str,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<UploadReceipt> {
        let key = self.config.key(name);
        let total = std::fs::metadata(src)?.len();

        self.runtime.block_on(async {
            let file = tokio::fs::File::open(src).await?;

            // The request body reports bytes sent over a channel, so progress
            // is delivered on this thread while the request is in flight.
            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<u64>();
            let mut sent = 0u64;
            let chunks = ReaderStream::with_capacity(file, CHUNK_SIZE).map(move |chunk| {
                chunk.map(|bytes| {
                    sent += bytes.len() as u64;
                    let _ = progress_tx.send(sent);
                    Frame::data(bytes)
                })
            });

            let request = self
                .client
                .put_object()
                .bucket(&self.config.bucket)
                .key(&key)
                .content_length(total as i64)
                .body(ByteStream::from_body_1_x(StreamBody::new(chunks)))
                .send();
            tokio::pin!(request);

            let response = loop {
                tokio::select! {
                    Some(sent) = progress_rx.recv() => on_progress(sent, total),
                    response = &mut request => break response,
                }
            };
            while let Ok(sent) = progress_rx.try_recv() {
                on_progress(sent, total);
            }

            let response = response.map_err(backend_error)?;
            Ok::<_, TroveError>(UploadReceipt {
                version: response.version_id().map(str::to_owned),
            })
        })
    }

    fn download(
        &self,
        name: &str,
        dest: &Path,
        version: Option<&str>,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<()> {
        let key = self.config.key(name);

        self.runtime.block_on(async {
            let response = self
                .client
                .get_object()
                .bucket(&self.config.bucket)
                .key(&key)
                .set_version_id(version.map(str::to_owned))
                .send()
                .await
                .map_err(|err| {
                    if is_service_error(&err) {
                        TroveError::RemoteFileNotFound(name.to_string())
                    } else {
                        backend_error(err)
                    }
                })?;

            let total = response.content_length().unwrap_or_default().max(0) as u64;
            let mut body = response.body;

            // Dropping `part` on any early return removes the temp file
            let mut part = PartialFile::create(dest)?;
            while let Some(chunk) = body
                .try_next()
                .await
                .map_err(|err| TroveError::Backend(err.to_string()))?
            {
                let written = part.write_chunk(&chunk)?;
                on_progress(written, total);
            }
            if part.written() == 0 {
                on_progress(0, total);
            }
            part.commit()?;
            Ok::<_, TroveError>(())
        })
    }

    fn delete(&self, name: &str, version: Option<&str>) -> bool {
        let key = self.config.key(name);
        let response = self.runtime.block_on(
            self.client
                .delete_object()
                .bucket(&self.config.bucket)
                .key(&key)
                .set_version_id(version.map(str::to_owned))
                .send(),
        );

        match response {
            Ok(_) => true,
            Err(err) => {
                warn!(key = %key, error = %DisplayErrorContext(&err), "delete failed");
                false
            }
        }
    }

    fn list(&self) -> Result<Vec<FileRecord>> {
        let prefix = self.config.list_prefix();

        self.runtime.block_on(async {
            let mut files = Vec::new();
            let mut continuation_token: Option<String> = None;

            loop {
                let response = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.config.bucket)
                    .set_prefix(prefix.clone())
                    .set_continuation_token(continuation_token.take())
                    .send()
                    .await
                    .map_err(backend_error)?;

                for object in response.contents() {
                    let Some(key) = object.key() else { continue };
                    files.push(FileRecord {
                        filename: self.config.name_for_key(key).to_string(),
                        size: object.size().unwrap_or_default().max(0) as u64,
                        updated_at: to_utc(object.last_modified()),
                    });
                }

                if response.is_truncated() == Some(true) {
                    continuation_token = response.next_continuation_token().map(str::to_owned);
                } else {
                    break;
                }
            }

            Ok::<_, TroveError>(files)
        })
    }

    fn versions(&self, name: &str) -> Result<Vec<VersionRecord>> {
        let key = self.config.key(name);

        self.runtime.block_on(async {
            let mut versions = Vec::new();
            let mut key_marker: Option<String> = None;
            let mut version_id_marker: Option<String> = None;

            loop {
                let response = self
                    .client
                    .list_object_versions()
                    .bucket(&self.config.bucket)
                    .prefix(&key)
                    .set_key_marker(key_marker.take())
                    .set_version_id_marker(version_id_marker.take())
                    .send()
                    .await
                    .map_err(backend_error)?;

                // The prefix also matches longer keys such as `a.txt.bak`
                for object in response.versions() {
                    if object.key() != Some(key.as_str()) {
                        continue;
                    }
                    versions.push(VersionRecord {
                        version: object
                            .version_id()
                            .filter(|id| *id != NULL_VERSION)
                            .map(str::to_owned),
                        size: object.size().unwrap_or_default().max(0) as u64,
                        updated_at: to_utc(object.last_modified()),
                    });
                }

                if response.is_truncated() == Some(true) {
                    key_marker = response.next_key_marker().map(str::to_owned);
                    version_id_marker = response.next_version_id_marker().map(str::to_owned);
                } else {
                    break;
                }
            }

            Ok::<_, TroveError>(versions)
        })
    }
}
