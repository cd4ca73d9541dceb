//! Error types for key extraction and DID handling.

use erynoa_common::CodecError;
use thiserror::Error;

/// Errors from recovering public-key bytes out of authenticator output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyExtractionError {
    /// The authenticator data is shorter than its fixed-width header requires.
    #[error("authenticator data too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum number of bytes needed at the point parsing stopped.
        expected: usize,
        /// Number of bytes actually available.
        actual: usize,
    },

    /// The COSE key blob is too small to hold a 32-byte public key.
    #[error("could not extract a public key from a {0}-byte COSE key")]
    ExtractionFailed(usize),

    /// The COSE key is not a well-formed CBOR map.
    #[error("malformed COSE key: {0}")]
    MalformedCose(String),

    /// A label required for the key type is absent.
    #[error("COSE key is missing label {0}")]
    MissingLabel(i64),

    /// The COSE key type (label 1) is neither OKP nor EC2.
    #[error("unsupported COSE key type {0}")]
    UnsupportedKeyType(i64),
}

/// Errors from generating or decoding DIDs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DidError {
    /// `did:key` derivation requires a 32-byte Ed25519 public key.
    #[error("invalid Ed25519 public key length: {0}, expected 32")]
    InvalidKeyLength(usize),

    /// The namespace is not one of the ten fixed Erynoa namespaces.
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// The DID header is invalid.
    #[error("invalid did header")]
    InvalidDidHeader,

    /// The base58 prefix 'z' is missing.
    #[error("missing base58 prefix 'z'")]
    MissingBase58Prefix,

    /// The base58 encoding is invalid.
    #[error("invalid base58 encoding: {0}")]
    InvalidBase58(#[from] CodecError),

    /// The decoded key does not carry the Ed25519 multicodec tag.
    #[error("not an ed25519-pub multicodec key")]
    InvalidMulticodec,
}
