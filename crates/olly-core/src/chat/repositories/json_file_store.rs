use std::path::{Path, PathBuf};

use super::error::{RepositoryError, RepositoryResult};
use super::key_value_store::{BoxFuture, KeyValueStore};

/// File-backed key-value store.
/// Stores each key as a separate file in ~/.config/olly/<key>.json
pub struct JsonFileKeyValueStore {
    root_dir: PathBuf,
}

impl JsonFileKeyValueStore {
    /// Create store with XDG-compliant path
    pub fn new() -> RepositoryResult<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RepositoryError::InitializationError {
                message: "Could not determine config directory".to_string(),
            })?
            .join("olly");

        Ok(Self {
            root_dir: config_dir,
        })
    }

    /// Create store rooted at a custom directory (for testing and `--config-dir`)
    pub fn with_dir(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers, but never let one escape the root directory
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root_dir.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for JsonFileKeyValueStore {
    fn get(&self, key: &str) -> BoxFuture<'static, RepositoryResult<Option<String>>> {
        let path = self.key_path(key);

        Box::pin(async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(RepositoryError::IoError(e)),
            }
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.key_path(key);
        let root_dir = self.root_dir.clone();

        Box::pin(async move {
            tokio::fs::create_dir_all(&root_dir).await?;

            // Write atomically using temp file + rename
            let temp_path = path.with_extension("json.tmp");
            tokio::fs::write(&temp_path, value).await?;
            tokio::fs::rename(&temp_path, &path).await?;

            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.key_path(key);

        Box::pin(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(RepositoryError::IoError(e)),
            }
        })
    }
}
