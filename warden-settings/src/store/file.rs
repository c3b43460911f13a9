//! JSON file settings backend

use crate::error::{Result, SettingsError};
use crate::settings::{SettingsUpdate, SystemSettings};
use crate::store::SettingsBackend;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Settings backend persisting the record as one JSON file.
///
/// Commits go to a sibling temp file that is fsynced and then renamed over
/// the record, so readers see either the old or the new record, never a
/// partial one.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_record(&self) -> Result<SystemSettings> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SettingsError::RecordNotFound);
            }
            Err(e) => return Err(self.unavailable("read", e)),
        };

        Ok(serde_json::from_str(&content)?)
    }

    async fn persist(&self, settings: &SystemSettings) -> Result<()> {
        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .await
            .map_err(|e| self.unavailable("create directory for", e))?;

        let body = serde_json::to_vec_pretty(settings)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| self.unavailable("create temp file for", e))?;

        let replaced = self.replace_with(&mut file, &tmp_path, &body).await;
        drop(file);
        if let Err(e) = replaced {
            if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove temp file {:?}: {}", tmp_path, cleanup);
                }
            }
            return Err(e);
        }

        sync_dir(&parent)
            .await
            .map_err(|e| self.unavailable("sync directory of", e))?;

        debug!("Persisted system settings v{} to {:?}", settings.version, self.path);
        Ok(())
    }

    async fn replace_with(&self, file: &mut fs::File, tmp_path: &Path, body: &[u8]) -> Result<()> {
        file.write_all(body)
            .await
            .map_err(|e| self.unavailable("write", e))?;
        file.sync_all()
            .await
            .map_err(|e| self.unavailable("sync", e))?;

        fs::rename(tmp_path, &self.path)
            .await
            .map_err(|e| self.unavailable("replace", e))
    }

    fn unavailable(&self, action: &str, err: io::Error) -> SettingsError {
        SettingsError::StoreUnavailable(format!(
            "failed to {} {}: {}",
            action,
            self.path.display(),
            err
        ))
    }
}

/// Flush the directory entry so a completed rename survives a crash
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[async_trait]
impl SettingsBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<SystemSettings> {
        self.read_record().await
    }

    async fn commit(&self, update: &SettingsUpdate) -> Result<SystemSettings> {
        let _guard = self.write_lock.lock().await;

        let base = match self.read_record().await {
            Ok(settings) => settings,
            Err(SettingsError::RecordNotFound) => SystemSettings::default(),
            Err(e) => return Err(e),
        };

        let next = update.apply(&base);
        self.persist(&next).await?;

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_record_not_found() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::new(tmp.path().join("settings.json"));

        assert!(matches!(
            backend.load().await,
            Err(SettingsError::RecordNotFound)
        ));
    }

    #[tokio::test]
    async fn test_commit_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let backend = FileBackend::new(&path);

        let first = backend
            .commit(&SettingsUpdate::new().max_upload_mb(10))
            .await
            .unwrap();
        let second = backend
            .commit(&SettingsUpdate::new().enable_jira(true))
            .await
            .unwrap();

        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(second.max_upload_mb, 10);

        let loaded = backend.load().await.unwrap();
        assert_eq!(loaded, second);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_not_treated_as_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "{ definitely not json").unwrap();
        let backend = FileBackend::new(&path);

        let err = backend.load().await.unwrap_err();
        assert!(matches!(err, SettingsError::SerializationError(_)));

        let err = backend
            .commit(&SettingsUpdate::new().enable_jira(true))
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::SerializationError(_)));
    }

    #[tokio::test]
    async fn test_failed_replace_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();
        let backend = FileBackend::new(&path);

        let err = backend.persist(&SystemSettings::default()).await.unwrap_err();

        assert!(matches!(err, SettingsError::StoreUnavailable(_)));
        assert!(!path.with_extension("json.tmp").exists());
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_persist_syncs_directory_entry() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::new(tmp.path().join("settings.json"));
        backend.persist(&SystemSettings::default()).await.unwrap();

        assert!(sync_dir(Path::new(".")).await.is_ok());
        assert_eq!(backend.load().await.unwrap(), SystemSettings::default());
    }

    #[tokio::test]
    async fn test_directory_in_place_of_record_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::new(tmp.path());

        let err = backend.load().await.unwrap_err();
        assert!(matches!(err, SettingsError::StoreUnavailable(_)));
    }
}
