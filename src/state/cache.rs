//! Config cache
//!
//! Later stages in the same boot read the rendered user config from here
//! instead of fetching and rendering it again. The file may hold credentials,
//! so it is only ever readable by its owner.

use crate::IgnitionError;
use crate::config::Config;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Single-file store for the rendered user config
#[derive(Debug, Clone)]
pub struct ConfigCache {
    path: PathBuf,
}

impl ConfigCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached config.
    ///
    /// Any read failure, including a missing file, is a miss. Content that
    /// cannot be parsed is an error: once written, the cache is authoritative.
    pub async fn load(&self) -> Result<Option<Config>, IgnitionError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("config cache {:?} not readable: {}", self.path, e);
                return Ok(None);
            }
        };

        let config = serde_json::from_slice(&raw).map_err(|e| IgnitionError::Cache {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!("loaded cached config from {:?}", self.path);
        Ok(Some(config))
    }

    /// Persist a fully rendered config with owner-only permissions
    pub async fn store(&self, config: &Config) -> Result<(), IgnitionError> {
        let json = serde_json::to_vec(config)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        write_private(&tmp, &json).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("wrote config cache {:?}", self.path);
        Ok(())
    }
}

#[cfg(unix)]
async fn write_private(path: &Path, data: &[u8]) -> Result<(), IgnitionError> {
    use std::os::unix::fs::PermissionsExt;
    use tokio::io::AsyncWriteExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    // mode() only applies on creation; tighten a leftover tmp file too
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(not(unix))]
async fn write_private(path: &Path, data: &[u8]) -> Result<(), IgnitionError> {
    fs::write(path, data).await?;
    Ok(())
}
