use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{checked_relative, generated_name, validated_extension, FileStore, Upload};
use crate::error::{Error, Result};

/// Keeps uploads in memory. Deletes can be made to fail for cascade tests.
#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<String, Bytes>>,
    fail_deletes: AtomicBool,
    fail_stores: AtomicBool,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn store(
        &self,
        namespace: &str,
        prefix: &str,
        upload: &Upload,
        allowed: &[&'static str],
    ) -> Result<String> {
        let ext = validated_extension(upload, allowed)?;
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(Error::Upstream("injected store failure".into()));
        }
        let path = format!("{}/{}", namespace, generated_name(prefix, &ext));
        let mut files = self
            .files
            .lock()
            .map_err(|_| Error::Upstream("file store poisoned".into()))?;
        if files.contains_key(&path) {
            return Err(Error::Upstream(format!("{} already exists", path)));
        }
        files.insert(path.clone(), upload.bytes.clone());
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let relative = checked_relative(path)?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::Upstream(format!("injected delete failure for {}", path)));
        }
        self.files
            .lock()
            .map_err(|_| Error::Upstream("file store poisoned".into()))?
            .remove(relative);
        Ok(())
    }
}
