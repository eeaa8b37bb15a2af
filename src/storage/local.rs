use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{checked_relative, generated_name, validated_extension, FileStore, Upload};
use crate::error::{Error, Result};

/// Files on local disk under a single root, served back at `/uploads`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// A half-written file is removed before the error is returned.
async fn write_or_discard<W>(mut writer: W, target: &Path, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(bytes).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    drop(writer);

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(target).await {
            tracing::warn!(
                "Failed to remove partial upload {}: {}",
                target.display(),
                cleanup
            );
        }
        return Err(Error::Upstream(format!("Failed to save file: {}", e)));
    }
    Ok(())
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(
        &self,
        namespace: &str,
        prefix: &str,
        upload: &Upload,
        allowed: &[&'static str],
    ) -> Result<String> {
        let ext = validated_extension(upload, allowed)?;

        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Upstream(format!("Failed to prepare upload dir: {}", e)))?;

        let file_name = generated_name(prefix, &ext);
        let target = dir.join(&file_name);

        // create_new: a generated name that already exists is an error, never an overwrite
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create upload file {}: {}", target.display(), e);
                Error::Upstream(format!("Failed to save file: {}", e))
            })?;
        write_or_discard(file, &target, &upload.bytes).await?;

        Ok(format!("{}/{}", namespace, file_name))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let relative = checked_relative(path)?;
        match fs::remove_file(self.root.join(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Upstream(format!("Failed to delete {}: {}", path, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RESUME_EXTENSIONS;
    use bytes::Bytes;

    #[tokio::test]
    async fn stores_and_deletes_under_the_namespace() {
        let root = std::env::temp_dir().join(format!("stageconnect-{}", uuid::Uuid::new_v4()));
        let store = LocalFileStore::new(&root);
        let upload = Upload::new("resume", "cv.pdf", Bytes::from_static(b"%PDF-1.7 test"));

        let path = store
            .store("resumes", "resume", &upload, RESUME_EXTENSIONS)
            .await
            .unwrap();
        assert!(path.starts_with("resumes/resume_"));
        assert!(path.ends_with(".pdf"));
        let on_disk = root.join(&path);
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"%PDF-1.7 test");

        store.delete(&path).await.unwrap();
        assert!(!on_disk.exists());
        // already gone is fine
        store.delete(&path).await.unwrap();

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn rejected_uploads_leave_nothing_behind() {
        let root = std::env::temp_dir().join(format!("stageconnect-{}", uuid::Uuid::new_v4()));
        let store = LocalFileStore::new(&root);
        let upload = Upload::new("resume", "cv.exe", Bytes::from_static(b"MZ"));

        assert!(matches!(
            store.store("resumes", "resume", &upload, RESUME_EXTENSIONS).await,
            Err(Error::BadRequest(_))
        ));
        assert!(!root.join("resumes").exists());
    }

    #[tokio::test]
    async fn failed_write_removes_the_partial_file() {
        let root = std::env::temp_dir().join(format!("stageconnect-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        let target = root.join("resume_partial.pdf");
        std::fs::write(&target, b"%PDF").unwrap();

        let writer = tokio_test::io::Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            .build();
        let err = write_or_discard(writer, &target, b"%PDF-1.7 body")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream(msg) if msg.contains("disk full")));
        assert!(!target.exists());
        let _ = std::fs::remove_dir_all(root);
    }
}
