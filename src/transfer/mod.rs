//! Atomic write-then-rename for downloaded content

use crate::types::TroveError;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Chunk size used when streaming file content
pub const CHUNK_SIZE: usize = 128 * 1024;

/// A destination file being written through a temporary sibling
///
/// Content goes to a hidden `.part` file in the destination directory so
/// the final rename never crosses filesystems. The temporary file is
/// removed when a `PartialFile` is dropped without `commit`, which covers
/// every error path between `create` and `commit`.
pub struct PartialFile {
    dest: PathBuf,
    part: NamedTempFile,
    written: u64,
}

impl PartialFile {
    /// Create the temporary file next to `dest`, creating parent directories
    pub fn create(dest: &Path) -> Result<Self, TroveError> {
        let parent = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let part = tempfile::Builder::new()
            .prefix(".trove-")
            .suffix(".part")
            .tempfile_in(parent)?;

        Ok(Self {
            dest: dest.to_path_buf(),
            part,
            written: 0,
        })
    }

    /// Append a chunk, returning the running byte count
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<u64, TroveError> {
        self.part.write_all(chunk)?;
        self.written += chunk.len() as u64;
        Ok(self.written)
    }

    /// Bytes written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Path of the temporary file
    pub fn part_path(&self) -> &Path {
        self.part.path()
    }

    /// Flush to disk and rename over the destination
    ///
    /// The destination keeps its existing permissions; new files get the
    /// regular file mode instead of the private temp-file mode.
    pub fn commit(mut self) -> Result<u64, TroveError> {
        self.part.flush()?;
        self.part.as_file().sync_all()?;

        match fs::metadata(&self.dest) {
            Ok(metadata) => fs::set_permissions(self.part.path(), metadata.permissions())?,
            Err(_) => set_default_mode(self.part.path())?,
        }

        let written = self.written;
        self.part
            .persist(&self.dest)
            .map_err(|err| TroveError::Io(err.error))?;
        Ok(written)
    }
}

#[cfg(unix)]
fn set_default_mode(path: &Path) -> Result<(), TroveError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_default_mode(_path: &Path) -> Result<(), TroveError> {
    Ok(())
}

/// Stream `reader` into `dest` atomically, reporting progress per chunk
pub fn write_atomic(
    dest: &Path,
    reader: &mut dyn Read,
    total: u64,
    on_progress: &mut dyn FnMut(u64, u64),
) -> Result<u64, TroveError> {
    let mut part = PartialFile::create(dest)?;
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        let written = part.write_chunk(&buffer[..bytes_read])?;
        on_progress(written, total);
    }

    part.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn part_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.to_string_lossy().ends_with(".part"))
            .collect()
    }

    #[test]
    fn test_commit_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("data.bin");
        fs::write(&dest, b"old").unwrap();

        let mut part = PartialFile::create(&dest).unwrap();
        part.write_chunk(b"new ").unwrap();
        part.write_chunk(b"content").unwrap();
        assert_eq!(part.written(), 11);
        assert_eq!(fs::read(&dest).unwrap(), b"old");

        assert_eq!(part.commit().unwrap(), 11);
        assert_eq!(fs::read(&dest).unwrap(), b"new content");
        assert!(part_files(dir.path()).is_empty());
    }

    #[test]
    fn test_drop_without_commit_removes_part_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("data.bin");

        let part_path = {
            let mut part = PartialFile::create(&dest).unwrap();
            part.write_chunk(b"partial").unwrap();
            let path = part.part_path().to_path_buf();
            assert!(path.exists());
            path
        };

        assert!(!part_path.exists());
        assert!(!dest.exists());
    }

    #[test]
    fn test_create_makes_parent_directories() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested/deeper/file.txt");

        let part = PartialFile::create(&dest).unwrap();
        part.commit().unwrap();

        assert!(dest.exists());
    }

    #[test]
    fn test_write_atomic_reports_progress() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("big.bin");
        let content = vec![1u8; CHUNK_SIZE * 2 + 10];
        let mut calls = Vec::new();

        let written = write_atomic(
            &dest,
            &mut content.as_slice(),
            content.len() as u64,
            &mut |current, total| calls.push((current, total)),
        )
        .unwrap();

        assert_eq!(written, content.len() as u64);
        assert!(calls.len() >= 3);
        assert_eq!(calls.last(), Some(&(written, written)));
        assert_eq!(fs::read(&dest).unwrap(), content);
    }
}
