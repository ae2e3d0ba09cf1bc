use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use keyring::Entry;
use tracing::{debug, warn};

use super::StorageError;

/// Keychain service name for stored tokens
const SERVICE_NAME: &str = "kozalma";

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Persistent key-value backend for secrets.
pub trait SecureStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// OS keychain backend
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl SecureStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local backend, used in tests and when no keychain is available
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl SecureStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

/// Access/refresh token pair. Both halves are always present together.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Token pair persisted under two fixed keys.
///
/// Reads treat a missing half as "no credentials". Storage read errors are
/// logged and reported as absence, so callers fall back to the login flow.
/// There is no lock around read-modify-write sequences; concurrent writers
/// are serialized one level up in `AuthSessionManager::refresh`.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn SecureStorage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    /// Store backed by the OS keychain
    pub fn keychain() -> Self {
        Self::new(Arc::new(KeyringStorage::new(SERVICE_NAME)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::default()))
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read from secure storage");
                None
            }
        }
    }

    /// Both tokens, or `None` if either is missing
    pub fn credentials(&self) -> Option<CredentialPair> {
        let access_token = self.read(ACCESS_TOKEN_KEY)?;
        let refresh_token = self.read(REFRESH_TOKEN_KEY)?;
        Some(CredentialPair {
            access_token,
            refresh_token,
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.credentials().map(|c| c.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.credentials().map(|c| c.refresh_token)
    }

    /// True iff a non-empty access token (and its refresh token) is stored
    pub fn has_tokens(&self) -> bool {
        self.credentials().is_some()
    }

    /// Replace the stored pair. If the second write fails the first is rolled back.
    pub fn save_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), StorageError> {
        self.storage.set(REFRESH_TOKEN_KEY, refresh_token)?;
        if let Err(e) = self.storage.set(ACCESS_TOKEN_KEY, access_token) {
            let _ = self.storage.remove(REFRESH_TOKEN_KEY);
            let _ = self.storage.remove(ACCESS_TOKEN_KEY);
            return Err(e);
        }
        debug!("Saved credential pair");
        Ok(())
    }

    /// Remove both tokens. Never fails; storage errors are logged.
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to remove from secure storage");
            }
        }
        debug!("Cleared credential pair");
    }
}
