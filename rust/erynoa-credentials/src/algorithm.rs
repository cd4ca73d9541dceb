use serde::{Deserialize, Serialize};

/// A COSE algorithm identifier, as negotiated during a passkey ceremony.
///
/// See the [IANA COSE algorithms registry](https://www.iana.org/assignments/cose/cose.xhtml#algorithms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoseAlgorithm(pub i64);

impl CoseAlgorithm {
    /// EdDSA over Ed25519. The preferred algorithm for Erynoa identities.
    pub const EDDSA: Self = Self(-8);
    /// ECDSA with SHA-256 over P-256.
    pub const ES256: Self = Self(-7);
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    pub const RS256: Self = Self(-257);

    /// The raw COSE identifier.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Whether this is EdDSA, the algorithm Erynoa DIDs are designed around.
    #[must_use]
    pub const fn is_eddsa(self) -> bool {
        self.0 == Self::EDDSA.0
    }

    /// The registry name for well-known identifiers.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            -8 => Some("EdDSA"),
            -7 => Some("ES256"),
            -257 => Some("RS256"),
            _ => None,
        }
    }
}

impl Default for CoseAlgorithm {
    fn default() -> Self {
        Self::EDDSA
    }
}

impl From<i64> for CoseAlgorithm {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}
