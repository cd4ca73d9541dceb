//! Decentralized identifiers derived from passkey public keys.
//!
//! Two methods are produced:
//!
//! - `did:erynoa:<namespace>:<id>`, where `<id>` is the first 16 hex
//!   characters of the public key.
//! - `did:key:z<base58btc(0xed 0x01 || key)>` for 32-byte Ed25519 keys.
//!
//! Both are pure functions of their inputs. Two keys sharing an 8-byte prefix
//! in the same namespace would collide on the `did:erynoa` form; with keys
//! produced by an authenticator that is not expected to happen and no
//! disambiguation is attempted.

use chrono::{DateTime, Utc};
use erynoa_common::{base58btc_decode, base58btc_encode, hex_encode};
use serde::{Deserialize, Serialize};

use crate::{CoseAlgorithm, DidError, Namespace};

const DID_SCHEME: &str = "did";
const ERYNOA_METHOD: &str = "erynoa";
const KEY_METHOD: &str = "key";
const KEY_DID_PREFIX: &str = "did:key:";
const BASE58BTC_PREFIX: char = 'z';
const ED25519_PUB_MULTICODEC: [u8; 2] = [0xed, 0x01];
const ED25519_KEY_LEN: usize = 32;
const UNIQUE_ID_HEX_CHARS: usize = 16;

/// `did:erynoa:<namespace>:<first 16 hex chars of the key>`.
///
/// Keys shorter than 8 bytes yield a shorter identifier.
pub fn generate_namespaced_did(public_key: &[u8], namespace: Namespace) -> String {
    format!("did:{ERYNOA_METHOD}:{namespace}:{}", unique_id(public_key))
}

fn unique_id(public_key: &[u8]) -> String {
    let mut encoded = hex_encode(public_key);
    encoded.truncate(UNIQUE_ID_HEX_CHARS);
    encoded
}

/// `did:key` for a 32-byte Ed25519 public key.
pub fn generate_key_did(public_key: &[u8]) -> Result<String, DidError> {
    if public_key.len() != ED25519_KEY_LEN {
        return Err(DidError::InvalidKeyLength(public_key.len()));
    }

    let mut tagged = Vec::with_capacity(ED25519_PUB_MULTICODEC.len() + ED25519_KEY_LEN);
    tagged.extend_from_slice(&ED25519_PUB_MULTICODEC);
    tagged.extend_from_slice(public_key);

    Ok(format!(
        "{KEY_DID_PREFIX}{BASE58BTC_PREFIX}{}",
        base58btc_encode(&tagged)
    ))
}

/// Recover the Ed25519 public key from a `did:key` string.
pub fn decode_key_did(did: &str) -> Result<[u8; 32], DidError> {
    let encoded = did
        .strip_prefix(KEY_DID_PREFIX)
        .ok_or(DidError::InvalidDidHeader)?;
    let encoded = encoded
        .strip_prefix(BASE58BTC_PREFIX)
        .ok_or(DidError::MissingBase58Prefix)?;
    let decoded = base58btc_decode(encoded)?;

    let key = decoded
        .strip_prefix(&ED25519_PUB_MULTICODEC[..])
        .ok_or(DidError::InvalidMulticodec)?;
    key.try_into()
        .map_err(|_| DidError::InvalidKeyLength(key.len()))
}

/// A DID method this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DidMethod {
    /// `did:erynoa`
    Erynoa,
    /// `did:key`
    Key,
}

impl std::fmt::Display for DidMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DidMethod::Erynoa => ERYNOA_METHOD,
            DidMethod::Key => KEY_METHOD,
        })
    }
}

/// The segments of a DID accepted by [`parse_did`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDid {
    /// The DID method.
    pub method: DidMethod,
    /// Present for `did:erynoa` only. Not checked against [`Namespace`].
    pub namespace: Option<String>,
    /// Method-specific identifier.
    pub identifier: String,
}

/// Split a DID into its segments.
///
/// `did:erynoa` needs exactly four colon-separated segments. `did:key` needs
/// exactly three and an identifier starting with `z`. Anything else is `None`.
pub fn parse_did(did: &str) -> Option<ParsedDid> {
    let segments: Vec<&str> = did.split(':').collect();
    if segments.first() != Some(&DID_SCHEME) {
        return None;
    }

    match segments.as_slice() {
        [_, ERYNOA_METHOD, namespace, identifier] => Some(ParsedDid {
            method: DidMethod::Erynoa,
            namespace: Some((*namespace).to_string()),
            identifier: (*identifier).to_string(),
        }),
        [_, KEY_METHOD, identifier] if identifier.starts_with(BASE58BTC_PREFIX) => {
            Some(ParsedDid {
                method: DidMethod::Key,
                namespace: None,
                identifier: (*identifier).to_string(),
            })
        }
        _ => None,
    }
}

/// Whether `did` parses and, for `did:erynoa`, names one of the ten namespaces.
pub fn is_valid_did(did: &str) -> bool {
    let Some(parsed) = parse_did(did) else {
        return false;
    };
    match parsed.method {
        DidMethod::Erynoa => parsed
            .namespace
            .is_some_and(|namespace| namespace.parse::<Namespace>().is_ok()),
        DidMethod::Key => parsed.identifier.starts_with(BASE58BTC_PREFIX),
    }
}

/// A display form of `did` no longer than needed.
///
/// DIDs within `max_len` characters come back unchanged. Longer ones keep
/// their method (and namespace) and elide the middle of the identifier:
/// `did:erynoa:self:abcd...wxyz`, `did:key:z6Mkabcd...wxyz`. Unrecognized
/// shapes are cut to `max_len` including a trailing `...`.
pub fn format_did_short(did: &str, max_len: usize) -> String {
    if did.chars().count() <= max_len {
        return did.to_string();
    }

    let segments: Vec<&str> = did.split(':').collect();
    match segments.as_slice() {
        [DID_SCHEME, ERYNOA_METHOD, namespace, identifier] => format!(
            "did:{ERYNOA_METHOD}:{namespace}:{}...{}",
            head(identifier, 4),
            tail(identifier, 4)
        ),
        [DID_SCHEME, KEY_METHOD, identifier] => format!(
            "did:{KEY_METHOD}:{}...{}",
            head(identifier, 8),
            tail(identifier, 4)
        ),
        _ => format!("{}...", head(did, max_len.saturating_sub(3))),
    }
}

fn head(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

fn tail(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    match s.char_indices().nth(count - n) {
        Some((index, _)) => &s[index..],
        None => s,
    }
}

/// Everything derived from a passkey public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyDid {
    /// The full `did:erynoa:<namespace>:<id>` string.
    pub did: String,
    /// The namespace segment.
    pub namespace: Namespace,
    /// The first 16 lowercase hex characters of the public key.
    pub unique_id: String,
    /// Lowercase hex of the public key.
    pub public_key_hex: String,
    /// Raw public key.
    #[serde(with = "crate::serde_base64url")]
    pub public_key_bytes: Vec<u8>,
    /// COSE algorithm of the key.
    pub algorithm: CoseAlgorithm,
    /// When the identity was derived.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl PasskeyDid {
    /// The `did:key` form, for 32-byte Ed25519 keys.
    pub fn key_did(&self) -> Result<String, DidError> {
        generate_key_did(&self.public_key_bytes)
    }
}

/// Derive the namespaced identity for `public_key`.
///
/// `created_at` is the only field that is not a function of the inputs.
pub fn create_identity(
    public_key: &[u8],
    namespace: Namespace,
    algorithm: CoseAlgorithm,
) -> PasskeyDid {
    PasskeyDid {
        did: generate_namespaced_did(public_key, namespace),
        namespace,
        unique_id: unique_id(public_key),
        public_key_hex: hex_encode(public_key),
        public_key_bytes: public_key.to_vec(),
        algorithm,
        created_at: erynoa_common::now(),
    }
}
