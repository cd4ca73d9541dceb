//! The platform capability a ceremony drives.
//!
//! An [`Authenticator`] stands in for `navigator.credentials` (or a native
//! FIDO2 stack): it reports what the platform supports, creates credentials
//! and produces assertions. Failures are reported as [`AuthenticatorError`]s
//! named after the DOMExceptions WebAuthn raises.

use std::{future::Future, time::Duration};

use erynoa_common::{ConditionalSend, ConditionalSync};
use erynoa_credentials::{CoseAlgorithm, StoredCredential, Transport};
use serde::{Deserialize, Serialize};

use crate::AuthenticatorError;

/// What the platform can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSupport {
    /// The WebAuthn API exists.
    pub webauthn_available: bool,
    /// A built-in authenticator (Touch ID, Windows Hello, ...) is present.
    pub platform_authenticator_available: bool,
    /// Credentials can be offered through autofill.
    #[serde(rename = "conditionalUIAvailable")]
    pub conditional_ui_available: bool,
    /// Ed25519 credentials can be created.
    pub ed25519_supported: bool,
    /// A user-verifying platform authenticator is available.
    pub uvpa_available: bool,
}

/// User verification requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    /// The ceremony fails without user verification.
    Required,
    /// Verify the user when the authenticator can.
    #[default]
    Preferred,
    /// Do not verify the user.
    Discouraged,
}

/// Whether the credential must be discoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKey {
    /// A discoverable credential is required.
    #[default]
    Required,
    /// Create a discoverable credential when possible.
    Preferred,
    /// Create a server-side credential when possible.
    Discouraged,
}

/// Where the authenticator lives relative to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    /// Built into the device.
    Platform,
    /// A roaming authenticator such as a security key.
    CrossPlatform,
}

/// Attestation conveyance preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attestation {
    /// No attestation statement.
    None,
    /// An anonymized attestation statement is acceptable.
    Indirect,
    /// The authenticator's own attestation statement.
    #[default]
    Direct,
    /// Attestation that may identify the individual device.
    Enterprise,
}

/// The relying party a credential is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    /// Effective domain, e.g. `erynoa.org`.
    pub id: String,
    /// Shown to the user.
    pub name: String,
}

/// The account a new credential is created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    /// Opaque user handle.
    pub id: Vec<u8>,
    /// Account name.
    pub name: String,
    /// Shown to the user.
    pub display_name: String,
}

/// Identifies a credential the authenticator may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    /// Raw credential id.
    pub id: Vec<u8>,
    /// How the authenticator can be reached.
    pub transports: Option<Vec<Transport>>,
}

impl CredentialDescriptor {
    /// A descriptor for a credential id with no known transports. Ids that
    /// are not base64url are passed through as their UTF-8 bytes.
    pub fn from_id(credential_id: &str) -> Self {
        Self {
            id: erynoa_common::base64url_decode(credential_id)
                .unwrap_or_else(|_| credential_id.as_bytes().to_vec()),
            transports: None,
        }
    }

    /// A descriptor for a stored credential.
    pub fn from_stored(credential: &StoredCredential) -> Self {
        Self {
            transports: credential.transports.clone(),
            ..Self::from_id(&credential.credential_id)
        }
    }
}

/// Options for creating a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationOptions {
    /// Bytes the authenticator signs.
    pub challenge: Vec<u8>,
    /// The relying party.
    pub rp: RelyingParty,
    /// The account the credential is for.
    pub user: UserEntity,
    /// Acceptable algorithms, most preferred first.
    pub algorithms: Vec<CoseAlgorithm>,
    /// Discoverable credential requirement.
    pub resident_key: ResidentKey,
    /// User verification requirement.
    pub user_verification: UserVerification,
    /// `None` accepts any attachment.
    pub attachment: Option<AuthenticatorAttachment>,
    /// Attestation conveyance.
    pub attestation: Attestation,
    /// Give up after this long.
    pub timeout: Duration,
}

/// Options for requesting an assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// Bytes the authenticator signs.
    pub challenge: Vec<u8>,
    /// Relying party id the credential is scoped to.
    pub rp_id: String,
    /// Empty means any discoverable credential.
    pub allow_credentials: Vec<CredentialDescriptor>,
    /// User verification requirement.
    pub user_verification: UserVerification,
    /// Give up after this long.
    pub timeout: Duration,
}

/// What the authenticator returns from registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResponse {
    /// Raw credential id.
    pub credential_id: Vec<u8>,
    /// Client data JSON as signed.
    pub client_data_json: Vec<u8>,
    /// Authenticator data with attested credential data, when exposed.
    pub authenticator_data: Option<Vec<u8>>,
    /// Raw public key, when the platform reports it directly.
    pub public_key: Option<Vec<u8>>,
    /// The algorithm the authenticator picked.
    pub algorithm: CoseAlgorithm,
    /// How the authenticator can be reached.
    pub transports: Vec<Transport>,
}

/// What the authenticator returns from an assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResponse {
    /// Raw credential id.
    pub credential_id: Vec<u8>,
    /// Client data JSON as signed.
    pub client_data_json: Vec<u8>,
    /// Authenticator data as signed.
    pub authenticator_data: Vec<u8>,
    /// Signature over `authenticator_data ‖ SHA-256(client_data_json)`.
    pub signature: Vec<u8>,
    /// User handle of a discoverable credential.
    pub user_handle: Option<Vec<u8>>,
}

/// A platform authenticator.
pub trait Authenticator: ConditionalSync {
    /// Report what the platform supports.
    fn support(&self) -> impl Future<Output = PlatformSupport> + ConditionalSend;

    /// Create a credential (`navigator.credentials.create`).
    fn create(
        &self,
        options: CreationOptions,
    ) -> impl Future<Output = Result<RegistrationResponse, AuthenticatorError>> + ConditionalSend;

    /// Produce an assertion (`navigator.credentials.get`).
    fn get(
        &self,
        options: RequestOptions,
    ) -> impl Future<Output = Result<AssertionResponse, AuthenticatorError>> + ConditionalSend;
}
