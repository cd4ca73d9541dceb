//! WebAuthn authenticator data, as returned by a registration ceremony.
//!
//! ```text
//! rpIdHash (32) | flags (1) | signCount (4) | aaguid (16) | credIdLen (2, BE) | credId | COSE key
//! ```

use crate::{KeyExtractionError, public_key_from_cose};

const RP_ID_HASH_LEN: usize = 32;
const HEADER_LEN: usize = RP_ID_HASH_LEN + 1 + 4;
const AAGUID_OFFSET: usize = HEADER_LEN;
const CREDENTIAL_ID_LENGTH_OFFSET: usize = AAGUID_OFFSET + 16;
const CREDENTIAL_ID_OFFSET: usize = CREDENTIAL_ID_LENGTH_OFFSET + 2;

/// Flag byte of the authenticator data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthenticatorFlags(pub u8);

impl AuthenticatorFlags {
    /// User present.
    pub const UP: u8 = 0x01;
    /// User verified.
    pub const UV: u8 = 0x04;
    /// Attested credential data included.
    pub const AT: u8 = 0x40;
    /// Extension data included.
    pub const ED: u8 = 0x80;

    /// Whether the user was present.
    pub fn user_present(self) -> bool {
        self.0 & Self::UP != 0
    }

    /// Whether the user was verified.
    pub fn user_verified(self) -> bool {
        self.0 & Self::UV != 0
    }

    /// Whether attested credential data follows the header.
    pub fn attested_credential_data(self) -> bool {
        self.0 & Self::AT != 0
    }

    /// Whether CBOR extension data follows the credential.
    pub fn extension_data(self) -> bool {
        self.0 & Self::ED != 0
    }
}

/// The credential section of authenticator data produced at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    /// Authenticator model identifier.
    pub aaguid: [u8; 16],
    /// Raw credential id.
    pub credential_id: Vec<u8>,
    /// Everything after the credential id. Starts with the COSE public key;
    /// extension data, if any, trails it.
    pub cose_key: Vec<u8>,
}

/// Parsed authenticator data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    /// SHA-256 of the relying party id.
    pub rp_id_hash: [u8; 32],
    /// Flag byte.
    pub flags: AuthenticatorFlags,
    /// Signature counter.
    pub sign_count: u32,
    /// Present when the AT flag is set.
    pub attested_credential: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    /// Parse authenticator data, honouring the AT flag.
    pub fn parse(bytes: &[u8]) -> Result<Self, KeyExtractionError> {
        require(bytes, HEADER_LEN)?;

        let mut rp_id_hash = [0u8; RP_ID_HASH_LEN];
        rp_id_hash.copy_from_slice(&bytes[..RP_ID_HASH_LEN]);
        let flags = AuthenticatorFlags(bytes[RP_ID_HASH_LEN]);
        let sign_count = u32::from_be_bytes([
            bytes[RP_ID_HASH_LEN + 1],
            bytes[RP_ID_HASH_LEN + 2],
            bytes[RP_ID_HASH_LEN + 3],
            bytes[RP_ID_HASH_LEN + 4],
        ]);

        let attested_credential = if flags.attested_credential_data() {
            Some(parse_attested_credential(bytes)?)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
        })
    }
}

fn require(bytes: &[u8], expected: usize) -> Result<(), KeyExtractionError> {
    if bytes.len() < expected {
        return Err(KeyExtractionError::TooShort {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn parse_attested_credential(bytes: &[u8]) -> Result<AttestedCredentialData, KeyExtractionError> {
    require(bytes, CREDENTIAL_ID_OFFSET)?;

    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&bytes[AAGUID_OFFSET..CREDENTIAL_ID_LENGTH_OFFSET]);

    let credential_id_len = u16::from_be_bytes([
        bytes[CREDENTIAL_ID_LENGTH_OFFSET],
        bytes[CREDENTIAL_ID_LENGTH_OFFSET + 1],
    ]) as usize;
    let cose_offset = CREDENTIAL_ID_OFFSET + credential_id_len;
    require(bytes, cose_offset)?;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id: bytes[CREDENTIAL_ID_OFFSET..cose_offset].to_vec(),
        cose_key: bytes[cose_offset..].to_vec(),
    })
}

/// Recover the public key from registration authenticator data.
///
/// The attested credential section is read at fixed offsets whether or not
/// the AT flag is set. Fewer than 55 bytes, or a credential id length that
/// runs past the end of the buffer, is [`KeyExtractionError::TooShort`].
pub fn extract_public_key_from_authenticator_data(
    auth_data: &[u8],
) -> Result<Vec<u8>, KeyExtractionError> {
    let credential = parse_attested_credential(auth_data)?;
    public_key_from_cose(&credential.cose_key)
}
