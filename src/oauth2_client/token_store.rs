// ABOUTME: File-backed persistence for the OAuth2 token pair between process runs
// ABOUTME: Writes go through a temporary file and a rename so a reader never sees a partial token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

use super::client::OAuth2Token;
use crate::errors::{TredictError, TredictResult};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// JSON token file on local disk
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store for the given file location
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted token
    ///
    /// A missing file yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`TredictError::MalformedTokenFile`] if the file exists but is not
    /// a valid token, or an I/O error if it cannot be read
    pub async fn load(&self) -> TredictResult<Option<OAuth2Token>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No token file present");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| TredictError::MalformedTokenFile {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Persist `token`, replacing the whole file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or renamed into place
    pub async fn save(&self, token: &OAuth2Token) -> TredictResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_vec_pretty(token)
            .map_err(|e| TredictError::invalid_response("token serialization", e.to_string()))?;

        let tmp_path = self.tmp_path();
        let written = async {
            write_owner_only(&tmp_path, &content).await?;
            fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        info!(path = %self.path.display(), "Token saved");
        Ok(())
    }

    /// Remove the token file; a missing file is not an error
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file exists but cannot be removed
    pub async fn clear(&self) -> TredictResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Token file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", process::id()));
        self.path.with_file_name(name)
    }
}

// Tokens are credentials: created owner read/write only, never widened first
async fn write_owner_only(path: &Path, content: &[u8]) -> io::Result<()> {
    // A leftover from a crashed run may carry other permissions
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn token() -> OAuth2Token {
        OAuth2Token {
            access_token: "access".to_owned(),
            token_type: "Bearer".to_owned(),
            refresh_token: "refresh".to_owned(),
            expires_at: Utc::now() + Duration::hours(1),
            refresh_token_expires_at: None,
            scope: None,
            user_id: Some("7".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));
        let token = token();

        store.save(&token).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(token));
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{not json").await.unwrap();

        let err = TokenStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, TredictError::MalformedTokenFile { .. }));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&token()).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_no_temporary_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        // A directory in the way makes the final rename fail
        fs::create_dir(&path).await.unwrap();
        let store = TokenStore::new(&path);

        assert!(store.save(&token()).await.is_err());
        assert!(!store.tmp_path().exists());
        assert!(path.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_temporary_file_is_replaced_owner_only() {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        fs::write(store.tmp_path(), "stale").await.unwrap();
        fs::set_permissions(store.tmp_path(), Permissions::from_mode(0o644))
            .await
            .unwrap();

        store.save(&token()).await.unwrap();
        let mode = fs::metadata(store.path()).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&token()).await.unwrap();

        let mode = fs::metadata(store.path()).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
