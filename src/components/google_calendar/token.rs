use super::oauth::{OAuthFlow, DEFAULT_TOKEN_URI};
use crate::error::{credential_error, BotResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tokens expiring within this window are treated as already expired
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Authorized-user credential, persisted in the same JSON shape Google's
/// installed-app libraries write to `token.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl Credential {
    /// Whether the access token is past (or about to pass) its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry,
            None => false,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && !self.is_expired(now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

/// What was found at the token path
#[derive(Debug)]
pub enum StoredToken {
    Missing,
    Corrupted(String),
    Present(Credential),
}

/// File-backed persistence for the authorized-user token
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted token without judging its validity
    pub fn load(&self) -> BotResult<StoredToken> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoredToken::Missing),
            Err(e) => return Err(e.into()),
        };

        // Bytes that are not UTF-8 fail here too
        match serde_json::from_slice::<Credential>(&content) {
            Ok(credential) => Ok(StoredToken::Present(credential)),
            Err(e) => Ok(StoredToken::Corrupted(e.to_string())),
        }
    }

    pub fn save(&self, credential: &Credential) -> BotResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(credential)?;
        fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        debug!("Saved token to {}", self.path.display());
        Ok(())
    }

    /// Remove the persisted token; a missing file is not an error
    pub fn delete(&self) -> BotResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Deleted token at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Where the credential lifecycle currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialStatus {
    Valid(Credential),
    NeedsRefresh(Credential),
    NeedsReauth,
    Unavailable(String),
}

/// Classify a loaded credential at `now`
pub fn classify(credential: Option<Credential>, now: DateTime<Utc>) -> CredentialStatus {
    match credential {
        None => CredentialStatus::NeedsReauth,
        Some(credential) if credential.is_valid(now) => CredentialStatus::Valid(credential),
        Some(credential) if credential.can_refresh() => CredentialStatus::NeedsRefresh(credential),
        Some(_) => CredentialStatus::NeedsReauth,
    }
}

/// Owns the refresh-or-reauthenticate decision for one pipeline run
#[derive(Clone)]
pub struct TokenManager {
    store: TokenStore,
    oauth: Arc<dyn OAuthFlow>,
}

impl TokenManager {
    pub fn new(store: TokenStore, oauth: Arc<dyn OAuthFlow>) -> Self {
        Self { store, oauth }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Load the persisted token and classify it. A corrupted record is
    /// deleted and treated as absent.
    pub fn assess(&self, now: DateTime<Utc>) -> BotResult<CredentialStatus> {
        let stored = self
            .store
            .load()
            .map_err(|e| credential_error(&format!("Failed to read token file: {}", e)))?;

        let credential = match stored {
            StoredToken::Missing => {
                info!("No persisted token at {}", self.store.path().display());
                None
            }
            StoredToken::Corrupted(reason) => {
                warn!("Discarding unreadable token file: {}", reason);
                if let Err(e) = self.store.delete() {
                    warn!("Failed to delete unreadable token file: {}", e);
                }
                None
            }
            StoredToken::Present(credential) => Some(credential),
        };

        Ok(classify(credential, now))
    }

    /// Return a usable credential, refreshing or re-authorizing as needed
    pub async fn ensure_credential(&self) -> BotResult<Credential> {
        let mut status = self.assess(Utc::now())?;

        loop {
            status = match status {
                CredentialStatus::Valid(credential) => return Ok(credential),
                CredentialStatus::Unavailable(reason) => return Err(credential_error(&reason)),
                pending => self.transition(pending).await?,
            };
        }
    }

    /// Run interactive authorization regardless of what is persisted
    pub async fn reauthorize(&self) -> BotResult<Credential> {
        match self.transition(CredentialStatus::NeedsReauth).await? {
            CredentialStatus::Valid(credential) => Ok(credential),
            CredentialStatus::Unavailable(reason) => Err(credential_error(&reason)),
            other => Err(credential_error(&format!(
                "Unexpected credential state after authorization: {:?}",
                other
            ))),
        }
    }

    /// Advance one step of the credential state machine
    pub async fn transition(&self, status: CredentialStatus) -> BotResult<CredentialStatus> {
        match status {
            CredentialStatus::NeedsRefresh(credential) => {
                info!("Access token expired, refreshing");
                match self.oauth.refresh(&credential).await {
                    Ok(refreshed) => {
                        if let Err(e) = self.persist(&refreshed) {
                            warn!("Using refreshed token without persisting it: {}", e);
                        }
                        Ok(CredentialStatus::Valid(refreshed))
                    }
                    Err(e) => {
                        warn!("Token refresh failed, falling back to authorization: {}", e);
                        if let Err(e) = self.store.delete() {
                            warn!("Failed to delete stale token file: {}", e);
                        }
                        Ok(CredentialStatus::NeedsReauth)
                    }
                }
            }
            CredentialStatus::NeedsReauth => {
                info!("Starting interactive authorization");
                match self.oauth.authorize().await {
                    Ok(credential) => {
                        self.persist(&credential)?;
                        Ok(CredentialStatus::Valid(credential))
                    }
                    Err(e) => Ok(CredentialStatus::Unavailable(format!(
                        "Authorization failed: {}",
                        e
                    ))),
                }
            }
            settled => Ok(settled),
        }
    }

    fn persist(&self, credential: &Credential) -> BotResult<()> {
        self.store
            .save(credential)
            .map_err(|e| credential_error(&format!("Failed to save token: {}", e)))
    }
}
