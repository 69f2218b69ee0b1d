//! Session persistence for the auth portal.
//!
//! The provider's session bundle is opaque to this crate: it is stored as
//! serialized JSON under fixed keys and handed back unchanged. Two backends
//! are provided:
//! - **Memory**: process-local, used by tests and ephemeral runs
//! - **File**: a single JSON document on disk (owner-only permissions on unix)

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::SecureStorage;
pub use vault::SessionVault;

use std::path::Path;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create a vault persisting to the given file.
pub fn create_file_vault(path: &Path) -> StorageResult<SessionVault> {
    let storage = FileStorage::open(path)?;
    Ok(SessionVault::new(Box::new(storage)))
}

/// Create a vault that forgets everything when dropped.
pub fn create_memory_vault() -> SessionVault {
    SessionVault::new(Box::new(MemoryStorage::new()))
}
