//! File-backed substrate
//!
//! Stores each key as its own file inside a directory. Uses atomic writes
//! (write to temp file, then rename) so an entry is never left half-written.
//!
//! Storage location: `~/.local/share/notepad/storage/` (configurable via `Config`)
//!
//! File names are the URL-safe base64 of the key, so keys such as
//! `site:records` are safe on every filesystem.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tempfile::NamedTempFile;

use super::{Substrate, SubstrateError, SubstrateResult};

/// Extension for committed entries
const ENTRY_EXTENSION: &str = "entry";

/// Directory-backed substrate
#[derive(Debug, Clone)]
pub struct FileSubstrate {
    dir: PathBuf,
}

impl FileSubstrate {
    /// Create a substrate rooted at `dir`
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let name = URL_SAFE_NO_PAD.encode(key.as_bytes());
        self.dir.join(format!("{}.{}", name, ENTRY_EXTENSION))
    }
}

impl Substrate for FileSubstrate {
    fn get_item(&self, key: &str) -> SubstrateResult<Option<String>> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SubstrateError::from_io(e, key, path)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> SubstrateResult<()> {
        let path = self.entry_path(key);
        atomic_write(&path, value.as_bytes()).map_err(|e| SubstrateError::from_io(e, key, path))
    }

    fn remove_item(&self, key: &str) -> SubstrateResult<()> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SubstrateError::from_io(e, key, path)),
        }
    }

    fn clear(&self) -> SubstrateResult<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(SubstrateError::from_io(e, "*", self.dir.clone())),
        };

        for entry in entries {
            let path = entry
                .map_err(|e| SubstrateError::from_io(e, "*", self.dir.clone()))?
                .path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                fs::remove_file(&path).map_err(|e| SubstrateError::from_io(e, "*", path))?;
            }
        }
        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a uniquely named temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// Concurrent writers each get their own temp file; the last rename wins.
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let substrate = FileSubstrate::new(temp_dir.path());

        assert_eq!(substrate.get_item("site:records").unwrap(), None);

        substrate.set_item("site:records", r#"[{"id":"x"}]"#).unwrap();
        assert_eq!(
            substrate.get_item("site:records").unwrap().as_deref(),
            Some(r#"[{"id":"x"}]"#)
        );
    }

    #[test]
    fn test_entry_path_is_filesystem_safe() {
        let substrate = FileSubstrate::new("/data");
        let path = substrate.entry_path("site:records");

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(!name.contains(':'));
        assert!(name.ends_with(".entry"));
        assert_ne!(
            substrate.entry_path("site:records"),
            substrate.entry_path("site:theme")
        );
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let substrate = FileSubstrate::new(temp_dir.path());

        substrate.set_item("site:theme", "\"dark\"").unwrap();
        substrate.remove_item("site:theme").unwrap();
        assert_eq!(substrate.get_item("site:theme").unwrap(), None);

        // Removing again is not an error
        substrate.remove_item("site:theme").unwrap();
    }

    #[test]
    fn test_clear_removes_only_entries() {
        let temp_dir = TempDir::new().unwrap();
        let substrate = FileSubstrate::new(temp_dir.path());
        substrate.set_item("site:records", "[]").unwrap();
        substrate.set_item("site:theme", "\"dark\"").unwrap();
        fs::write(temp_dir.path().join("README"), "keep").unwrap();

        substrate.clear().unwrap();

        assert_eq!(substrate.get_item("site:records").unwrap(), None);
        assert_eq!(substrate.get_item("site:theme").unwrap(), None);
        assert!(temp_dir.path().join("README").exists());

        // Clearing a missing directory is not an error
        FileSubstrate::new(temp_dir.path().join("missing")).clear().unwrap();
    }

    #[test]
    fn test_creates_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("a").join("b").join("storage");
        let substrate = FileSubstrate::new(&dir);

        substrate.set_item("k", "v").unwrap();

        assert!(dir.exists());
        // Only the committed entry is left behind
        let names: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(names, vec![substrate.entry_path("k")]);
    }

    #[test]
    fn test_entries_survive_new_handle() {
        let temp_dir = TempDir::new().unwrap();
        FileSubstrate::new(temp_dir.path())
            .set_item("site:records", "[]")
            .unwrap();

        let reopened = FileSubstrate::new(temp_dir.path());
        assert_eq!(
            reopened.get_item("site:records").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_concurrent_writers_both_succeed() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();
        let long_a = "a".repeat(512 * 1024);
        let long_b = "b".repeat(256 * 1024);

        for _ in 0..10 {
            let writers: Vec<_> = [long_a.clone(), long_b.clone()]
                .into_iter()
                .map(|value| {
                    let substrate = FileSubstrate::new(&dir);
                    std::thread::spawn(move || substrate.set_item("site:records", &value))
                })
                .collect();

            for writer in writers {
                assert!(writer.join().unwrap().is_ok());
            }

            // Last writer wins, never a mix of both
            let stored = FileSubstrate::new(&dir)
                .get_item("site:records")
                .unwrap()
                .unwrap();
            assert!(stored == long_a || stored == long_b);
        }
    }
}
