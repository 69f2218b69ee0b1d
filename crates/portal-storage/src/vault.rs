//! High-level API for the persisted session and OAuth verifier.

use crate::{SecureStorage, StorageError, StorageKeys, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Typed access to the values the auth service persists between runs.
pub struct SessionVault {
    storage: Box<dyn SecureStorage>,
}

impl SessionVault {
    /// Create a new vault over the given storage backend
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Session
    // ==========================================

    /// Store the current session, replacing any previous one
    pub fn store_session<T: Serialize>(&self, session: &T) -> StorageResult<()> {
        let json =
            serde_json::to_string(session).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(StorageKeys::AUTH_SESSION, &json)
    }

    /// Retrieve the stored session
    pub fn load_session<T: DeserializeOwned>(&self) -> StorageResult<Option<T>> {
        match self.storage.get(StorageKeys::AUTH_SESSION)? {
            Some(json) => {
                let session =
                    serde_json::from_str(&json).map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Check if a session is stored
    pub fn has_session(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::AUTH_SESSION)
    }

    /// Remove the stored session
    pub fn clear_session(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::AUTH_SESSION)?;
        Ok(())
    }

    // ==========================================
    // OAuth (PKCE)
    // ==========================================

    /// Remember the code verifier for the redirect in flight
    pub fn store_code_verifier(&self, verifier: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::PKCE_CODE_VERIFIER, verifier)
    }

    /// Retrieve and forget the code verifier; each verifier is single-use
    pub fn take_code_verifier(&self) -> StorageResult<Option<String>> {
        let verifier = self.storage.get(StorageKeys::PKCE_CODE_VERIFIER)?;
        if verifier.is_some() {
            self.storage.delete(StorageKeys::PKCE_CODE_VERIFIER)?;
        }
        Ok(verifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct StoredSession {
        access_token: String,
        refresh_token: String,
    }

    fn vault() -> SessionVault {
        SessionVault::new(Box::new(MemoryStorage::new()))
    }

    #[test]
    fn test_session_lifecycle() {
        let vault = vault();
        assert!(!vault.has_session().unwrap());
        assert!(vault.load_session::<StoredSession>().unwrap().is_none());

        let session = StoredSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        };
        vault.store_session(&session).unwrap();

        assert!(vault.has_session().unwrap());
        assert_eq!(vault.load_session::<StoredSession>().unwrap(), Some(session));

        vault.clear_session().unwrap();
        assert!(!vault.has_session().unwrap());
    }

    #[test]
    fn test_store_replaces_wholesale() {
        let vault = vault();
        vault
            .store_session(&StoredSession {
                access_token: "first".to_string(),
                refresh_token: "r1".to_string(),
            })
            .unwrap();
        vault
            .store_session(&StoredSession {
                access_token: "second".to_string(),
                refresh_token: "r2".to_string(),
            })
            .unwrap();

        let loaded: StoredSession = vault.load_session().unwrap().unwrap();
        assert_eq!(loaded.access_token, "second");
    }

    #[test]
    fn test_undecodable_session_is_an_encoding_error() {
        let storage = MemoryStorage::new();
        storage.set(StorageKeys::AUTH_SESSION, "{broken").unwrap();
        let vault = SessionVault::new(Box::new(storage));

        assert!(matches!(
            vault.load_session::<StoredSession>(),
            Err(StorageError::Encoding(_))
        ));
    }

    #[test]
    fn test_code_verifier_is_single_use() {
        let vault = vault();
        assert!(vault.take_code_verifier().unwrap().is_none());

        vault.store_code_verifier("verifier-123").unwrap();
        assert_eq!(
            vault.take_code_verifier().unwrap(),
            Some("verifier-123".to_string())
        );
        assert!(vault.take_code_verifier().unwrap().is_none());
    }

    #[test]
    fn test_clearing_session_keeps_verifier() {
        let vault = vault();
        vault.store_code_verifier("v").unwrap();
        vault
            .store_session(&StoredSession {
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
            })
            .unwrap();

        vault.clear_session().unwrap();
        assert_eq!(vault.take_code_verifier().unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_file_vault_opens_over_truncated_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{\"auth_session\": trunc").unwrap();

        let vault = crate::create_file_vault(&path).unwrap();
        assert!(!vault.has_session().unwrap());
        assert!(vault.load_session::<StoredSession>().unwrap().is_none());
    }
}
