use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

/// A request-scoped upload on disk, removed when the guard drops whether or
/// not analysis succeeded.
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
}

impl StoredUpload {
    /// Persist one uploaded file under a fresh random name, keeping the
    /// client's extension so the format can still be inferred from the name.
    pub fn write(dir: &Path, client_name: &str, bytes: &[u8]) -> std::io::Result<Self> {
        let extension = Path::new(client_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let path = dir.join(format!("{}{}", Uuid::new_v4(), extension));

        // Guard before write: a failed write still removes the partial file.
        let stored = Self { path };
        std::fs::write(&stored.path, bytes)?;
        Ok(stored)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove uploaded file {}: {}",
                    self.path.display(),
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_keeps_the_client_extension_under_a_fresh_name() {
        let dir = tempfile::tempdir().unwrap();
        let stored = StoredUpload::write(dir.path(), "scan.PNG", b"bytes").unwrap();

        let name = stored.path().file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".PNG"));
        assert_ne!(name, "scan.PNG");
        assert_eq!(std::fs::read(stored.path()).unwrap(), b"bytes");
    }

    #[test]
    fn upload_without_extension_gets_a_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        let stored = StoredUpload::write(dir.path(), "scan", b"bytes").unwrap();

        let name = stored.path().file_name().unwrap().to_str().unwrap();
        assert!(!name.contains('.'));
    }

    #[test]
    fn concurrent_uploads_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let first = StoredUpload::write(dir.path(), "scan.png", b"one").unwrap();
        let second = StoredUpload::write(dir.path(), "scan.png", b"two").unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let stored = StoredUpload::write(dir.path(), "scan.png", b"bytes").unwrap();
            stored.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn drop_tolerates_an_already_removed_file() {
        let dir = tempfile::tempdir().unwrap();
        let stored = StoredUpload::write(dir.path(), "scan.png", b"bytes").unwrap();
        std::fs::remove_file(stored.path()).unwrap();
        drop(stored);
    }
}
