//! Project manifest (`.trove.yml`)

use super::StorageUrl;
use crate::storage;
use crate::transfer::PartialFile;
use crate::types::{Result, TroveError};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Manifest file name searched for in the working tree
pub const MANIFEST_FILE: &str = ".trove.yml";

/// Maximum number of directories inspected while searching upward
pub const MAX_SEARCH_DEPTH: usize = 20;

/// Directory holding tracked files when `root` is not set
pub const DEFAULT_ROOT: &str = "trove";

/// Environment variable consulted when the manifest has no `storage`
pub const STORAGE_URL_ENV: &str = "TROVE_STORAGE_URL";

const STORAGE_KEY: &str = "storage";
const FILES_KEY: &str = "files";

/// One tracked file and the remote version it should materialize as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Typed view of the keys trove interprets
#[derive(Debug, Clone, Default, Deserialize)]
struct ManifestFields {
    #[serde(default)]
    root: Option<String>,

    #[serde(default)]
    vcs: Option<bool>,

    #[serde(default)]
    files: Option<Vec<TrackedFile>>,
}

/// In-memory manifest bound to the file it was loaded from
///
/// The parsed mapping is kept as the document so a rewrite preserves key
/// order and keys trove does not interpret.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    document: Mapping,
    fields: ManifestFields,
}

impl Manifest {
    /// Find the manifest in `start` or one of its ancestors
    pub fn discover(start: &Path) -> Result<PathBuf> {
        start
            .ancestors()
            .take(MAX_SEARCH_DEPTH)
            .map(|dir| dir.join(MANIFEST_FILE))
            .find(|candidate| candidate.is_file())
            .ok_or(TroveError::ConfigNotFound)
    }

    /// Discover and load the manifest governing `start`
    pub fn load(start: &Path) -> Result<Self> {
        let path = Self::discover(start)?;
        debug!(path = %path.display(), "loading manifest");
        Self::from_path(&path)
    }

    /// Load a manifest from an explicit file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(path, &content)
    }

    /// Parse manifest text; `path` is where it will be saved
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(TroveError::EmptyConfig);
        }

        let value: Value = serde_yaml::from_str(content)
            .map_err(|err| TroveError::InvalidConfig(err.to_string()))?;
        let document = match value {
            Value::Mapping(mapping) if !mapping.is_empty() => mapping,
            _ => return Err(TroveError::EmptyConfig),
        };

        let fields = serde_yaml::from_value(Value::Mapping(document.clone()))
            .map_err(|err| TroveError::InvalidConfig(err.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            document,
            fields,
        })
    }

    /// Path of the manifest file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Directory (relative to the manifest) holding tracked files
    pub fn root(&self) -> &str {
        self.fields.root.as_deref().unwrap_or(DEFAULT_ROOT)
    }

    /// Whether pushes persist version records (`vcs` key)
    pub fn tracking_enabled(&self) -> bool {
        self.fields.vcs.unwrap_or(true)
    }

    /// Local path of a tracked file
    ///
    /// Names are relative to the root directory. Absolute names and names
    /// climbing out with `..` are rejected.
    pub fn resolved_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if name.trim().is_empty() || !contained {
            return Err(TroveError::InvalidFileName(name.to_string()));
        }
        Ok(self.dir().join(self.root()).join(relative))
    }

    /// Tracked files in manifest order
    pub fn files(&self) -> &[TrackedFile] {
        self.fields.files.as_deref().unwrap_or(&[])
    }

    /// Version recorded for `name`, if any
    pub fn recorded_version(&self, name: &str) -> Option<&str> {
        self.files()
            .iter()
            .find(|file| file.name == name)
            .and_then(|file| file.version.as_deref())
    }

    /// Upsert the record for `name`, saving the manifest when tracking is on
    ///
    /// New names are appended so existing entries keep their order. The
    /// `files` key stays where it was in the document, or goes last.
    pub fn record_version(&mut self, name: &str, version: Option<String>) -> Result<()> {
        let files = self.fields.files.get_or_insert_with(Vec::new);
        match files.iter_mut().find(|file| file.name == name) {
            Some(file) => file.version = version,
            None => files.push(TrackedFile {
                name: name.to_string(),
                version,
            }),
        }
        let files = serde_yaml::to_value(&*files)
            .map_err(|err| TroveError::InvalidConfig(err.to_string()))?;
        self.document.insert(Value::String(FILES_KEY.to_string()), files);

        if self.tracking_enabled() {
            self.save()?;
        }
        Ok(())
    }

    /// Serialize the manifest as YAML without a leading `---`
    pub fn to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.document)
            .map_err(|err| TroveError::InvalidConfig(err.to_string()))?;
        Ok(match yaml.strip_prefix("---\n") {
            Some(body) => body.to_string(),
            None => yaml,
        })
    }

    /// Atomically rewrite the manifest file
    pub fn save(&self) -> Result<()> {
        let yaml = self.to_yaml()?;
        let mut part = PartialFile::create(&self.path)?;
        part.write_chunk(yaml.as_bytes())?;
        part.commit()?;

        info!(path = %self.path.display(), "manifest updated");
        Ok(())
    }

    /// Storage URL from the manifest, falling back to `TROVE_STORAGE_URL`
    pub fn storage_url(&self) -> Result<StorageUrl> {
        self.storage_url_with(std::env::var(STORAGE_URL_ENV).ok())
    }

    /// Storage URL resolution with an explicit fallback value
    pub fn storage_url_with(&self, fallback: Option<String>) -> Result<StorageUrl> {
        let raw = match self.document.get(STORAGE_KEY) {
            Some(Value::String(raw)) => raw.clone(),
            Some(Value::Null) | None => fallback
                .filter(|raw| !raw.trim().is_empty())
                .ok_or(TroveError::MissingStorage)?,
            Some(_) => return Err(TroveError::InvalidStorageUrl),
        };

        let url = StorageUrl::parse(&raw)?;
        if storage::provider(&url.scheme).is_none() {
            return Err(TroveError::InvalidStorageProvider(url.scheme));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> Result<Manifest> {
        Manifest::parse(Path::new("/project/.trove.yml"), content)
    }

    #[test]
    fn test_defaults() {
        let manifest = parse("storage: s3://bucket/trove\n").unwrap();
        assert_eq!(manifest.root(), "trove");
        assert!(manifest.tracking_enabled());
        assert!(manifest.files().is_empty());
        assert_eq!(
            manifest.resolved_path("a.txt").unwrap(),
            PathBuf::from("/project/trove/a.txt")
        );
    }

    #[test]
    fn test_custom_root_and_vcs() {
        let manifest = parse("storage: s3://b/p\nroot: data\nvcs: false\n").unwrap();
        assert_eq!(manifest.root(), "data");
        assert!(!manifest.tracking_enabled());
        assert_eq!(
            manifest.resolved_path("x/y.bin").unwrap(),
            PathBuf::from("/project/data/x/y.bin")
        );
    }

    #[test]
    fn test_resolved_path_stays_under_root() {
        let manifest = parse("storage: s3://b/p\n").unwrap();
        assert_eq!(
            manifest.resolved_path("./models/a.bin").unwrap(),
            PathBuf::from("/project/trove/./models/a.bin")
        );

        for name in ["/etc/passwd", "../outside.txt", "models/../../x", "", "  "] {
            match manifest.resolved_path(name) {
                Err(TroveError::InvalidFileName(rejected)) => assert_eq!(rejected, name),
                other => panic!("{name:?} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_documents() {
        assert!(matches!(parse(""), Err(TroveError::EmptyConfig)));
        assert!(matches!(parse("\n  \n"), Err(TroveError::EmptyConfig)));
        assert!(matches!(parse("{}"), Err(TroveError::EmptyConfig)));
        assert!(matches!(parse("- a\n- b\n"), Err(TroveError::EmptyConfig)));
        assert!(matches!(parse("just a string"), Err(TroveError::EmptyConfig)));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            parse("storage: [unclosed\n"),
            Err(TroveError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse("storage: s3://b/p\nvcs: [1]\n"),
            Err(TroveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_recorded_version_lookup() {
        let manifest = parse(
            "storage: s3://b/p\nfiles:\n- name: a.txt\n  version: v1\n- name: b.txt\n",
        )
        .unwrap();
        assert_eq!(manifest.recorded_version("a.txt"), Some("v1"));
        assert_eq!(manifest.recorded_version("b.txt"), None);
        assert_eq!(manifest.recorded_version("c.txt"), None);
    }

    #[test]
    fn test_storage_url_resolution() {
        let manifest = parse("storage: s3://bucket/prefix\n").unwrap();
        let url = manifest.storage_url_with(None).unwrap();
        assert_eq!(url.bucket, "bucket");
        assert_eq!(url.prefix.as_deref(), Some("prefix"));
    }

    #[test]
    fn test_storage_url_env_fallback() {
        let manifest = parse("hello: world\n").unwrap();
        assert!(matches!(
            manifest.storage_url_with(None),
            Err(TroveError::MissingStorage)
        ));
        assert!(matches!(
            manifest.storage_url_with(Some(String::new())),
            Err(TroveError::MissingStorage)
        ));

        let url = manifest
            .storage_url_with(Some("s3://env-bucket/x".to_string()))
            .unwrap();
        assert_eq!(url.bucket, "env-bucket");
    }

    #[test]
    fn test_manifest_storage_wins_over_fallback() {
        let manifest = parse("storage: s3://manifest/x\n").unwrap();
        let url = manifest
            .storage_url_with(Some("s3://env/y".to_string()))
            .unwrap();
        assert_eq!(url.bucket, "manifest");
    }

    #[test]
    fn test_storage_url_errors() {
        let not_a_string = parse("storage: [bad_value]\n").unwrap();
        assert!(matches!(
            not_a_string.storage_url_with(None),
            Err(TroveError::InvalidStorageUrl)
        ));

        let bad_provider = parse("storage: bad://test/trove\n").unwrap();
        match bad_provider.storage_url_with(None) {
            Err(TroveError::InvalidStorageProvider(scheme)) => assert_eq!(scheme, "bad"),
            other => panic!("expected InvalidStorageProvider, got {other:?}"),
        }
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "storage: s3://b/p\n").unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let found = Manifest::discover(&nested).unwrap();
        assert_eq!(found, dir.path().join(MANIFEST_FILE));
    }

    #[test]
    fn test_discover_is_bounded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "storage: s3://b/p\n").unwrap();
        let mut deep = dir.path().to_path_buf();
        for i in 0..MAX_SEARCH_DEPTH {
            deep.push(format!("d{i}"));
        }
        fs::create_dir_all(&deep).unwrap();

        assert!(matches!(
            Manifest::discover(&deep),
            Err(TroveError::ConfigNotFound)
        ));
    }

    #[test]
    fn test_record_version_appends_and_updates_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(
            &path,
            "storage: s3://b/p\nfiles:\n- name: first.txt\n  version: v0\n",
        )
        .unwrap();

        let mut manifest = Manifest::from_path(&path).unwrap();
        manifest.record_version("second.txt", Some("v1".into())).unwrap();
        manifest.record_version("first.txt", Some("v2".into())).unwrap();

        let reloaded = Manifest::from_path(&path).unwrap();
        let names: Vec<_> = reloaded.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first.txt", "second.txt"]);
        assert_eq!(reloaded.recorded_version("first.txt"), Some("v2"));
        assert_eq!(reloaded.recorded_version("second.txt"), Some("v1"));
    }

    #[test]
    fn test_record_version_without_tracking_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let original = "storage: s3://b/p\nvcs: false\n";
        fs::write(&path, original).unwrap();

        let mut manifest = Manifest::from_path(&path).unwrap();
        manifest.record_version("a.txt", Some("v1".into())).unwrap();

        assert_eq!(manifest.recorded_version("a.txt"), Some("v1"));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_save_has_no_document_marker_and_keeps_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "storage: s3://b/p\nowner: data-team\n").unwrap();

        let mut manifest = Manifest::from_path(&path).unwrap();
        manifest.record_version("a.txt", Some("v1".into())).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.starts_with("---"));
        assert!(written.contains("owner: data-team"));
        assert!(written.contains("name: a.txt"));
        assert!(written.contains("version: v1"));
    }

    #[test]
    fn test_save_keeps_key_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(
            &path,
            "files:\n- name: a.txt\n  version: v1\nowner: team\nstorage: s3://b/p\n",
        )
        .unwrap();

        let mut manifest = Manifest::from_path(&path).unwrap();
        manifest.record_version("a.txt", Some("v2".into())).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "files:\n- name: a.txt\n  version: v2\nowner: team\nstorage: s3://b/p\n"
        );
    }

    #[test]
    fn test_files_key_is_appended_when_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "storage: s3://b/p\nroot: data\n").unwrap();

        let mut manifest = Manifest::from_path(&path).unwrap();
        manifest.record_version("a.txt", None).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "storage: s3://b/p\nroot: data\nfiles:\n- name: a.txt\n  version: null\n"
        );
    }
}
