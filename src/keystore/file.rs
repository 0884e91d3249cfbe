//! Keystore file delivery and loading.
//!
//! Creating an account "downloads" the keystore through a [`KeystoreSink`].
//! On the command line that is a directory on disk; embedders and tests can
//! collect files in memory instead.

use anyhow::Context;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AuthError;

/// Destination for a freshly created keystore file.
pub trait KeystoreSink {
    /// Hand over the complete file. Called at most once per created account,
    /// and only after every cryptographic step has succeeded.
    fn deliver(&mut self, file_name: &str, contents: &str) -> io::Result<()>;
}

/// Collects delivered files in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: Vec<(String, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of the most recently delivered file.
    pub fn last(&self) -> Option<&(String, String)> {
        self.files.last()
    }
}

impl KeystoreSink for MemorySink {
    fn deliver(&mut self, file_name: &str, contents: &str) -> io::Result<()> {
        self.files.push((file_name.to_string(), contents.to_string()));
        Ok(())
    }
}

/// Writes keystore files into a directory.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Option<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: None,
        }
    }

    /// Path of the file written by the last successful delivery.
    pub fn written(&self) -> Option<&Path> {
        self.written.as_deref()
    }
}

impl KeystoreSink for DirectorySink {
    fn deliver(&mut self, file_name: &str, contents: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let dest = self.dir.join(file_name);
        // Never clobber an existing keystore: it may be the only copy of a key.
        if dest.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", dest.display()),
            ));
        }
        write_atomic(&dest, contents.as_bytes())?;
        tracing::info!(path = %dest.display(), "keystore file written");
        self.written = Some(dest);
        Ok(())
    }
}

/// Write `contents` to `dest` atomically (temp file then rename) with 0600 permissions.
///
/// The temp file gets a unique name in the destination directory so the rename
/// stays on one filesystem, and it is owner-only before any byte is written.
/// A failed write removes it.
pub fn write_atomic(dest: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent directory"))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".questkey-")
        .suffix(".tmp")
        .tempfile_in(parent)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Read keystore file contents from disk.
///
/// A path that does not exist is the "no file selected" validation error.
pub fn read_keystore_file(path: &Path) -> anyhow::Result<String> {
    if !path.exists() {
        return Err(AuthError::MissingKeystore.into());
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read keystore file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_files() {
        let mut sink = MemorySink::new();
        sink.deliver("a.json", "{}").expect("deliver should succeed");
        sink.deliver("b.json", "[]").expect("deliver should succeed");
        assert_eq!(sink.files.len(), 2);
        assert_eq!(sink.last(), Some(&("b.json".to_string(), "[]".to_string())));
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut sink = DirectorySink::new(dir.path().join("keys"));
        sink.deliver("ks.json", "{\"k\":1}").expect("deliver should succeed");
        let written = sink.written().expect("path should be recorded").to_path_buf();
        assert_eq!(written, dir.path().join("keys").join("ks.json"));
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "{\"k\":1}");
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("keys"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("ks.json")], "temp file must be gone");
    }

    #[test]
    fn test_write_atomic_leaves_unrelated_tmp_files_alone() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let stale = dir.path().join(".ks.json.tmp");
        std::fs::write(&stale, "left over from a crash").unwrap();

        write_atomic(&dir.path().join("ks.json"), b"{}").expect("write should succeed");

        assert_eq!(std::fs::read_to_string(&stale).unwrap(), "left over from a crash");
        assert_eq!(std::fs::read_to_string(dir.path().join("ks.json")).unwrap(), "{}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_write_atomic_missing_directory_leaves_nothing() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dest = dir.path().join("absent").join("ks.json");
        assert!(write_atomic(&dest, b"{}").is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_directory_sink_refuses_overwrite() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("ks.json"), "original").unwrap();
        let mut sink = DirectorySink::new(dir.path());
        let err = sink.deliver("ks.json", "replacement").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read_to_string(dir.path().join("ks.json")).unwrap(), "original");
        assert!(sink.written().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_sets_0600() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("ks.json");
        write_atomic(&path, b"{}").expect("write should succeed");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "Expected 0600 permissions, got {:04o}", mode);
    }

    #[test]
    fn test_read_missing_file_is_validation_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let err = read_keystore_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::MissingKeystore)
        ));
    }
}
