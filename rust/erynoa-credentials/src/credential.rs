use chrono::{DateTime, Utc};
use erynoa_common::{CodecError, base64url_decode, base64url_encode, hex_encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{CoseAlgorithm, Namespace, PasskeyDid};

/// Raw public-key bytes as reported by an authenticator.
///
/// Serializes as an unpadded base64url string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a base64url-encoded key.
    pub fn from_base64url(encoded: &str) -> Result<Self, CodecError> {
        base64url_decode(encoded).map(Self)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    /// Unpadded base64url form.
    pub fn to_base64url(&self) -> String {
        base64url_encode(&self.0)
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl From<Vec<u8>> for PublicKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        crate::serde_base64url::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        crate::serde_base64url::deserialize(deserializer).map(Self)
    }
}

/// How an authenticator can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// USB.
    Usb,
    /// NFC.
    Nfc,
    /// Bluetooth Low Energy.
    Ble,
    /// Built into the client device.
    Internal,
    /// Cross-device, via a phone.
    Hybrid,
    /// Smart card.
    SmartCard,
    /// A transport this client does not know.
    #[serde(other)]
    Unknown,
}

/// A passkey credential as persisted by the credential ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    /// Base64url credential id. Unique within a ledger.
    #[serde(rename = "id")]
    pub credential_id: String,
    /// Raw public-key bytes.
    pub public_key: PublicKey,
    /// COSE algorithm of the key.
    pub algorithm: CoseAlgorithm,
    /// The `did:erynoa` identifier derived from the key.
    pub did: String,
    /// Namespace of `did`.
    pub namespace: Namespace,
    /// Registration time.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    /// Last successful authentication with this credential.
    pub last_used_at: Option<DateTime<Utc>>,
    /// How the authenticator can be reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<Transport>>,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Hex AAGUID of the authenticator model, when attested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aaguid: Option<String>,
    /// Set on credentials registered as primary.
    #[serde(default)]
    pub is_primary: bool,
}

impl StoredCredential {
    /// A fresh record for `identity`, created at the identity's derivation time.
    pub fn new(credential_id: impl Into<String>, identity: &PasskeyDid) -> Self {
        Self {
            credential_id: credential_id.into(),
            public_key: PublicKey::new(identity.public_key_bytes.clone()),
            algorithm: identity.algorithm,
            did: identity.did.clone(),
            namespace: identity.namespace,
            created_at: identity.created_at,
            last_used_at: None,
            transports: None,
            display_name: None,
            aaguid: None,
            is_primary: false,
        }
    }

    /// Set the reachable transports.
    pub fn with_transports(mut self, transports: Vec<Transport>) -> Self {
        self.transports = Some(transports);
        self
    }

    /// Set a human-readable label.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Record the authenticator model.
    pub fn with_aaguid(mut self, aaguid: &[u8]) -> Self {
        self.aaguid = Some(hex_encode(aaguid));
        self
    }

    /// Mark as the primary credential.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}
