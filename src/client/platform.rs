use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::error::ClientError;

/// Small persistent key-value area on the user's device
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// Whole-file text import and export
#[async_trait]
pub trait TextFiles: Send + Sync {
    async fn read_text(&self, path: &Path) -> Result<String, ClientError>;
    async fn write_text(&self, path: &Path, content: &str) -> Result<(), ClientError>;
}

/// Storage that lives as long as the process
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }
}

impl LocalStorage for DirStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        match std::fs::read_to_string(self.root.join(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        std::fs::write(self.root.join(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        match std::fs::remove_file(self.root.join(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Plain filesystem access
pub struct FsTextFiles;

#[async_trait]
impl TextFiles for FsTextFiles {
    async fn read_text(&self, path: &Path) -> Result<String, ClientError> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn write_text(&self, path: &Path, content: &str) -> Result<(), ClientError> {
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
