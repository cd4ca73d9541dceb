use chrono::{DateTime, Utc};
use erynoa_credentials::{CoseAlgorithm, Namespace, PublicKey, StoredCredential};
use serde::{Deserialize, Serialize};

/// Offline copy of a DID's public key, kept so an identity can be verified
/// without the credential list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyBackup {
    /// The key as reported at registration.
    pub public_key: PublicKey,
    /// Its COSE algorithm.
    pub algorithm: CoseAlgorithm,
    /// The namespace the DID was derived under.
    pub namespace: Namespace,
}

impl From<&StoredCredential> for PublicKeyBackup {
    fn from(credential: &StoredCredential) -> Self {
        Self {
            public_key: credential.public_key.clone(),
            algorithm: credential.algorithm,
            namespace: credential.namespace,
        }
    }
}

/// The most recent successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastAuthentication {
    /// Credential that was asserted.
    pub credential_id: String,
    /// DID it belongs to.
    pub did: String,
    /// When it happened.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}
