/// The four logical keys the [`CredentialLedger`](crate::CredentialLedger)
/// occupies in a [`KeyValueStore`](crate::KeyValueStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// JSON array of stored credentials.
    pub credentials: String,
    /// The active DID, as a bare string.
    pub active_did: String,
    /// JSON object mapping DIDs to their public-key backup.
    pub public_keys: String,
    /// JSON record of the most recent successful authentication.
    pub last_auth: String,
}

impl StorageKeys {
    /// Credential list key without a prefix.
    pub const CREDENTIALS: &'static str = "erynoa_passkey_credentials";
    /// Active DID key without a prefix.
    pub const ACTIVE_DID: &'static str = "erynoa_passkey_did";
    /// Public-key backup key without a prefix.
    pub const PUBLIC_KEYS: &'static str = "erynoa_passkey_pubkeys";
    /// Last-authentication key without a prefix.
    pub const LAST_AUTH: &'static str = "erynoa_passkey_last_auth";

    /// Keys namespaced under `prefix`, so several profiles can share a store.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            credentials: format!("{prefix}:{}", Self::CREDENTIALS),
            active_did: format!("{prefix}:{}", Self::ACTIVE_DID),
            public_keys: format!("{prefix}:{}", Self::PUBLIC_KEYS),
            last_auth: format!("{prefix}:{}", Self::LAST_AUTH),
        }
    }

    /// Keys with an optional prefix.
    pub fn new(prefix: Option<&str>) -> Self {
        prefix.map(Self::with_prefix).unwrap_or_default()
    }

    /// All four keys.
    pub fn all(&self) -> [&str; 4] {
        [
            self.credentials.as_str(),
            self.active_did.as_str(),
            self.public_keys.as_str(),
            self.last_auth.as_str(),
        ]
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            credentials: Self::CREDENTIALS.to_string(),
            active_did: Self::ACTIVE_DID.to_string(),
            public_keys: Self::PUBLIC_KEYS.to_string(),
            last_auth: Self::LAST_AUTH.to_string(),
        }
    }
}
