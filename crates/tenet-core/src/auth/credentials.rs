//! Durable credential storage.
//!
//! The token pair lives in the OS keychain; the cached profile is a JSON
//! file in the app cache directory. Reads that fail for any reason degrade
//! to "absent" so the app falls open to an anonymous session; writes that
//! fail surface a `StoreError` to the calling operation.

use std::path::PathBuf;
use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;
use tracing::warn;

use crate::models::UserProfile;

const SERVICE_NAME: &str = "tenet";
const ACCESS_TOKEN_KEY: &str = "access-token";
const REFRESH_TOKEN_KEY: &str = "refresh-token";

/// Cached profile file name in the cache directory
const PROFILE_FILE: &str = "profile.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("keychain access failed: {0}")]
    Keychain(String),

    #[error("profile storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The stored token pair. Both tokens are opaque bearer strings; a pair is
/// only ever written or read as a unit, which is what keeps partial
/// credentials from existing in the first place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

/// Process-wide persistence of the current credential and cached profile.
///
/// One store instance exists per running app. The session gateway is the
/// only writer of the credential besides explicit verify/logout paths.
pub trait CredentialStore: Send + Sync {
    /// Read the stored pair. Partial or unreadable state reads as absent.
    fn credential(&self) -> Option<Credential>;

    /// Replace the stored pair. Atomic from the caller's perspective: no
    /// subsequent read observes one token updated without the other.
    fn set_credential(&self, credential: &Credential) -> Result<(), StoreError>;

    fn user(&self) -> Option<UserProfile>;

    fn set_user(&self, user: &UserProfile) -> Result<(), StoreError>;

    /// Remove the credential and the cached profile together.
    fn clear(&self) -> Result<(), StoreError>;

    /// Convenience accessor for header attachment.
    fn access_token(&self) -> Option<String> {
        self.credential().map(|c| c.access_token)
    }
}

// ============================================================================
// KeyringStore - durable storage via the OS keychain
// ============================================================================

/// Durable store backed by the OS keychain (tokens) and a profile file.
pub struct KeyringStore {
    cache_dir: PathBuf,
    // Serializes pair writes against pair reads within this process
    lock: Mutex<()>,
}

impl KeyringStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            lock: Mutex::new(()),
        }
    }

    fn profile_path(&self) -> PathBuf {
        self.cache_dir.join(PROFILE_FILE)
    }

    fn entry(key: &str) -> Result<Entry, StoreError> {
        Entry::new(SERVICE_NAME, key).map_err(|e| StoreError::Keychain(e.to_string()))
    }

    fn read_secret(key: &str) -> Option<String> {
        let entry = match Self::entry(key) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "Keychain unavailable, treating secret as absent");
                return None;
            }
        };
        match entry.get_password() {
            Ok(secret) => Some(secret),
            Err(keyring::Error::NoEntry) => None,
            Err(err) => {
                warn!(key, error = %err, "Keychain read failed, treating secret as absent");
                None
            }
        }
    }

    fn write_secret(key: &str, value: &str) -> Result<(), StoreError> {
        Self::entry(key)?
            .set_password(value)
            .map_err(|e| StoreError::Keychain(e.to_string()))
    }

    fn delete_secret(key: &str) -> Result<(), StoreError> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StoreError::Keychain(err.to_string())),
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for KeyringStore {
    fn credential(&self) -> Option<Credential> {
        let _guard = self.guard();
        let access_token = Self::read_secret(ACCESS_TOKEN_KEY)?;
        // A lone access token is treated as no credential at all
        let refresh_token = Self::read_secret(REFRESH_TOKEN_KEY)?;
        Some(Credential {
            access_token,
            refresh_token,
        })
    }

    fn set_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        let _guard = self.guard();
        Self::write_secret(ACCESS_TOKEN_KEY, &credential.access_token)?;
        if let Err(err) = Self::write_secret(REFRESH_TOKEN_KEY, &credential.refresh_token) {
            // Roll the first write back rather than leave a split pair behind
            if let Err(rollback) = Self::delete_secret(ACCESS_TOKEN_KEY) {
                warn!(error = %rollback, "Failed to roll back access token after partial write");
            }
            return Err(err);
        }
        Ok(())
    }

    fn user(&self) -> Option<UserProfile> {
        let path = self.profile_path();
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(error = %err, "Failed to read cached profile, treating as absent");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, "Cached profile is unreadable, treating as absent");
                None
            }
        }
    }

    fn set_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        let path = self.profile_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(user)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.guard();
        let mut first_error = None;

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(err) = Self::delete_secret(key) {
                first_error.get_or_insert(err);
            }
        }

        let path = self.profile_path();
        if path.exists() {
            if let Err(err) = std::fs::remove_file(path) {
                first_error.get_or_insert(StoreError::Io(err));
            }
        }

        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

// ============================================================================
// MemoryStore - non-durable storage for tests and ephemeral sessions
// ============================================================================

/// In-memory store. Durability is the only thing it gives up; the locking
/// contract matches `KeyringStore`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    credential: Option<Credential>,
    user: Option<UserProfile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryStore {
    fn credential(&self) -> Option<Credential> {
        self.guard().credential.clone()
    }

    fn set_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        self.guard().credential = Some(credential.clone());
        Ok(())
    }

    fn user(&self) -> Option<UserProfile> {
        self.guard().user.clone()
    }

    fn set_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        self.guard().user = Some(user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.guard();
        inner.credential = None;
        inner.user = None;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
