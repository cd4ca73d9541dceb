use erynoa_credentials::KeyExtractionError;
use erynoa_storage::LedgerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::InvalidTransition;

/// The closed set of reasons a ceremony can fail.
///
/// Serializes as the variant name, e.g. `"Timeout"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PasskeyErrorCode {
    /// No WebAuthn capability on this platform.
    NotSupported,
    /// The user dismissed the prompt or the operation was not allowed.
    UserCancelled,
    /// The authenticator already holds a credential for this account.
    CredentialExists,
    /// No stored credential matches the request.
    CredentialNotFound,
    /// The challenge was rejected.
    InvalidChallenge,
    /// The challenge service could not be reached.
    ChallengeFetchFailed,
    /// The authenticator or relying party refused the ceremony.
    VerificationFailed,
    /// No usable authenticator is present.
    AuthenticatorNotAvailable,
    /// The ceremony did not complete in time.
    Timeout,
    /// None of the offered algorithms is supported.
    UnsupportedAlgorithm,
    /// Ed25519 was required but is not supported.
    Ed25519NotSupported,
    /// A network request failed.
    NetworkError,
    /// The credential ledger could not be written.
    StorageError,
    /// Anything else.
    Unknown,
}

impl PasskeyErrorCode {
    /// The serialized name.
    pub const fn as_str(self) -> &'static str {
        match self {
            PasskeyErrorCode::NotSupported => "NotSupported",
            PasskeyErrorCode::UserCancelled => "UserCancelled",
            PasskeyErrorCode::CredentialExists => "CredentialExists",
            PasskeyErrorCode::CredentialNotFound => "CredentialNotFound",
            PasskeyErrorCode::InvalidChallenge => "InvalidChallenge",
            PasskeyErrorCode::ChallengeFetchFailed => "ChallengeFetchFailed",
            PasskeyErrorCode::VerificationFailed => "VerificationFailed",
            PasskeyErrorCode::AuthenticatorNotAvailable => "AuthenticatorNotAvailable",
            PasskeyErrorCode::Timeout => "Timeout",
            PasskeyErrorCode::UnsupportedAlgorithm => "UnsupportedAlgorithm",
            PasskeyErrorCode::Ed25519NotSupported => "Ed25519NotSupported",
            PasskeyErrorCode::NetworkError => "NetworkError",
            PasskeyErrorCode::StorageError => "StorageError",
            PasskeyErrorCode::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for PasskeyErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by the platform authenticator.
///
/// `name` follows the DOMException naming WebAuthn uses (`NotAllowedError`,
/// `AbortError`, ...); it decides the [`PasskeyErrorCode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct AuthenticatorError {
    /// Exception name.
    pub name: String,
    /// Human-readable detail.
    pub message: String,
}

impl AuthenticatorError {
    /// Operation aborted, usually because its timeout elapsed.
    pub const ABORT: &'static str = "AbortError";
    /// The user cancelled, or the request was not allowed.
    pub const NOT_ALLOWED: &'static str = "NotAllowedError";
    /// A matching credential already exists on the authenticator.
    pub const INVALID_STATE: &'static str = "InvalidStateError";
    /// The requested operation is not supported.
    pub const NOT_SUPPORTED: &'static str = "NotSupportedError";
    /// The relying party id is not valid for this origin.
    pub const SECURITY: &'static str = "SecurityError";
    /// No offered algorithm could be satisfied.
    pub const CONSTRAINT: &'static str = "ConstraintError";

    /// An error with the given exception name.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The normalized code for this error.
    pub fn code(&self) -> PasskeyErrorCode {
        match self.name.as_str() {
            Self::ABORT => PasskeyErrorCode::Timeout,
            Self::NOT_ALLOWED => PasskeyErrorCode::UserCancelled,
            Self::INVALID_STATE => PasskeyErrorCode::CredentialExists,
            Self::NOT_SUPPORTED => PasskeyErrorCode::NotSupported,
            Self::SECURITY => PasskeyErrorCode::VerificationFailed,
            Self::CONSTRAINT => PasskeyErrorCode::UnsupportedAlgorithm,
            _ => PasskeyErrorCode::Unknown,
        }
    }
}

/// Errors from fetching a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    /// The request never produced a response.
    #[error("Challenge request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Challenge fetch failed: {0}")]
    Status(u16),

    /// The response body was not a challenge.
    #[error("Failed to decode challenge response: {0}")]
    Decode(String),

    /// The service endpoint could not be built.
    #[error("Invalid challenge endpoint: {0}")]
    Endpoint(String),

    /// Random bytes could not be produced locally.
    #[error("Failed to generate local challenge: {0}")]
    Entropy(String),
}

impl From<reqwest::Error> for ChallengeError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ChallengeError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            ChallengeError::Status(status.as_u16())
        } else {
            ChallengeError::Transport(error.to_string())
        }
    }
}

/// Internal failure of a ceremony step, before it is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum CeremonyError {
    #[error(transparent)]
    Authenticator(#[from] AuthenticatorError),

    #[error("{message}")]
    Coded {
        code: PasskeyErrorCode,
        message: String,
    },
}

impl CeremonyError {
    pub(crate) fn coded(code: PasskeyErrorCode, message: impl Into<String>) -> Self {
        CeremonyError::Coded {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn code(&self) -> PasskeyErrorCode {
        match self {
            CeremonyError::Authenticator(error) => error.code(),
            CeremonyError::Coded { code, .. } => *code,
        }
    }
}

impl From<LedgerError> for CeremonyError {
    fn from(error: LedgerError) -> Self {
        CeremonyError::coded(PasskeyErrorCode::StorageError, error.to_string())
    }
}

impl From<InvalidTransition> for CeremonyError {
    fn from(error: InvalidTransition) -> Self {
        CeremonyError::coded(PasskeyErrorCode::Unknown, error.to_string())
    }
}

impl From<KeyExtractionError> for CeremonyError {
    fn from(error: KeyExtractionError) -> Self {
        CeremonyError::coded(PasskeyErrorCode::Unknown, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_maps_exception_names_to_codes() {
        for (name, code) in [
            ("AbortError", PasskeyErrorCode::Timeout),
            ("NotAllowedError", PasskeyErrorCode::UserCancelled),
            ("InvalidStateError", PasskeyErrorCode::CredentialExists),
            ("NotSupportedError", PasskeyErrorCode::NotSupported),
            ("SecurityError", PasskeyErrorCode::VerificationFailed),
            ("ConstraintError", PasskeyErrorCode::UnsupportedAlgorithm),
            ("TypeError", PasskeyErrorCode::Unknown),
            ("", PasskeyErrorCode::Unknown),
        ] {
            assert_eq!(AuthenticatorError::new(name, "").code(), code, "{name}");
        }
    }

    #[test]
    fn it_serializes_codes_by_name() {
        assert_eq!(
            serde_json::to_string(&PasskeyErrorCode::Timeout).unwrap(),
            "\"Timeout\""
        );
        assert_eq!(PasskeyErrorCode::StorageError.to_string(), "StorageError");
    }

    #[test]
    fn it_reports_ledger_failures_as_storage_errors() {
        let error = CeremonyError::from(LedgerError::EncodeFailed("boom".into()));
        assert_eq!(error.code(), PasskeyErrorCode::StorageError);
    }
}
