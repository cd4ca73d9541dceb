use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The underlying substrate failed to read, write or remove a value.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The value stored under a key could not be read back as text.
    #[error("Value under {key} is not valid UTF-8")]
    InvalidValue {
        /// The logical key.
        key: String,
    },
}

/// Errors raised by the [`CredentialLedger`](crate::CredentialLedger).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The store rejected a write.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A ledger entry could not be serialized.
    #[error("Failed to encode ledger entry: {0}")]
    EncodeFailed(String),

    /// The DID does not belong to any stored credential.
    #[error("No stored credential has DID {0}")]
    UnknownDid(String),

    /// No stored credential has this id.
    #[error("No stored credential has id {0}")]
    UnknownCredential(String),
}
