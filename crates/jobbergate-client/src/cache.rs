use crate::auth::CachedToken;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk copy of the last access token, so restarts skip a token round trip.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: Utf8PathBuf,
}

impl TokenCache {
    /// Create a cache inside the given directory.
    ///
    /// The token is stored at `token.json` within the directory.
    pub fn new(cache_dir: &Utf8Path) -> Self {
        Self {
            path: cache_dir.join("token.json"),
        }
    }

    /// Get the path to the token file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load the cached token.
    ///
    /// Returns None if the file doesn't exist.
    pub fn load(&self) -> Result<Option<CachedToken>, CacheError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Save the token, readable by the owner only.
    ///
    /// Creates parent directories if needed.
    pub fn save(&self, token: &CachedToken) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(token)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // `mode` only applies to new files; tighten an existing one before writing.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Remove the cached token, ignoring a missing file.
    pub fn clear(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
