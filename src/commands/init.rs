//! `trove init`: scaffold a project

use crate::config::{DEFAULT_ROOT, MANIFEST_FILE};
use crate::types::TroveError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Manifest written by `init`
pub const MANIFEST_TEMPLATE: &str = "storage: s3://my-bucket/trove\n";

/// Block appended to an existing `.gitignore`
pub const GITIGNORE_BLOCK: &str = "
# Ignore Trove storage
/trove/*
!/trove/.keep
";

/// What `init` did
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Files written
    pub created: Vec<PathBuf>,
    /// Files left alone because they already existed
    pub existing: Vec<PathBuf>,
    /// Whether the ignore block was appended to `.gitignore`
    pub gitignore_updated: bool,
    /// Shown when there is no `.gitignore` to update
    pub hint: Option<String>,
}

/// Create `trove/.keep`, `.trove.yml` and ignore rules under `dir`
///
/// Existing files are never overwritten.
pub fn init_project(dir: &Path) -> Result<InitReport, TroveError> {
    let mut report = InitReport::default();

    let keep = dir.join(DEFAULT_ROOT).join(".keep");
    fs::create_dir_all(dir.join(DEFAULT_ROOT))?;
    create_new(&keep, "", &mut report)?;

    let gitignore = dir.join(".gitignore");
    if gitignore.exists() {
        let contents = fs::read_to_string(&gitignore)?;
        if !contents.contains(GITIGNORE_BLOCK) {
            let mut file = OpenOptions::new().append(true).open(&gitignore)?;
            file.write_all(GITIGNORE_BLOCK.as_bytes())?;
            report.gitignore_updated = true;
        }
    } else {
        report.hint = Some("Check in trove/.keep and ignore trove/*".to_string());
    }

    create_new(&dir.join(MANIFEST_FILE), MANIFEST_TEMPLATE, &mut report)?;
    Ok(report)
}

fn create_new(path: &Path, contents: &str, report: &mut InitReport) -> Result<(), TroveError> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(contents.as_bytes())?;
            report.created.push(path.to_path_buf());
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            report.existing.push(path.to_path_buf());
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_fresh_directory() {
        let dir = TempDir::new().unwrap();
        let report = init_project(dir.path()).unwrap();

        assert!(dir.path().join("trove/.keep").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join(".trove.yml")).unwrap(),
            MANIFEST_TEMPLATE
        );
        assert_eq!(report.created.len(), 2);
        assert!(!report.gitignore_updated);
        assert!(report.hint.is_some());
    }

    #[test]
    fn test_init_appends_gitignore_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/\n").unwrap();

        assert!(init_project(dir.path()).unwrap().gitignore_updated);
        assert!(!init_project(dir.path()).unwrap().gitignore_updated);

        let contents = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(contents.starts_with("target/\n"));
        assert_eq!(contents.matches("/trove/*").count(), 1);
    }

    #[test]
    fn test_init_keeps_existing_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".trove.yml"), "storage: s3://mine/x\n").unwrap();

        let report = init_project(dir.path()).unwrap();

        assert_eq!(report.existing, vec![dir.path().join(".trove.yml")]);
        assert_eq!(
            fs::read_to_string(dir.path().join(".trove.yml")).unwrap(),
            "storage: s3://mine/x\n"
        );
    }
}
