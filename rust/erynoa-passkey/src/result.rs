use erynoa_credentials::{PasskeyDid, StoredCredential};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use thiserror::Error;

use crate::{AssertionResponse, CeremonyState, PasskeyErrorCode};

/// The outcome of a ceremony.
pub type CeremonyResult<T> = Result<T, CeremonyFailure>;

/// A successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationSuccess {
    /// The identity derived from the new credential.
    pub identity: PasskeyDid,
    /// The credential as stored in the ledger.
    pub credential: StoredCredential,
    /// Whether the backend accepted the credential, when it was asked.
    pub remote_registered: Option<bool>,
}

/// A successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationSuccess {
    /// The DID of the credential used. `None` when the authenticator picked
    /// a credential this device does not know.
    pub did: Option<String>,
    /// Base64url id of the credential used.
    pub credential_id: String,
    /// Raw assertion signature.
    pub signature: Vec<u8>,
    /// The raw assertion.
    pub assertion: AssertionResponse,
    /// Whether the backend verified the assertion, when it was asked.
    pub remote_verified: Option<bool>,
}

/// A successful signature over a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSuccess {
    /// Raw signature.
    pub signature_bytes: Vec<u8>,
    /// Lowercase hex of the signature.
    pub signature_hex: String,
    /// Unpadded base64url of the signature.
    pub signature_base64url: String,
    /// The DID of the signing credential, if known.
    pub did: Option<String>,
    /// The challenge the authenticator signed.
    pub challenge: Vec<u8>,
    /// Unpadded base64url of `challenge`.
    pub challenge_base64url: String,
    /// The raw assertion.
    pub assertion: AssertionResponse,
}

/// A failed ceremony.
///
/// Serializes as `{"success": false, "error": ..., "error_code": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error_code}: {error}")]
pub struct CeremonyFailure {
    /// Human-readable description.
    pub error: String,
    /// Normalized failure category.
    pub error_code: PasskeyErrorCode,
    /// The terminal state the ceremony ended in.
    pub state: CeremonyState,
}

impl CeremonyFailure {
    /// A failure with `code`, ending in the matching terminal state.
    pub fn new(error_code: PasskeyErrorCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_code,
            state: CeremonyState::terminal_for(error_code),
        }
    }
}

impl Serialize for CeremonyFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut failure = serializer.serialize_struct("CeremonyFailure", 3)?;
        failure.serialize_field("success", &false)?;
        failure.serialize_field("error", &self.error)?;
        failure.serialize_field("error_code", &self.error_code)?;
        failure.end()
    }
}
