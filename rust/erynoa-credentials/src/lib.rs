#![warn(missing_docs)]

//! Passkey-bound identity types for Erynoa.
//!
//! This crate turns what an authenticator reports during a registration
//! ceremony into a decentralized identifier:
//!
//! - [`extract_public_key_from_authenticator_data`] and [`CoseKey`] recover
//!   raw public-key bytes from authenticator data and COSE keys.
//! - [`generate_namespaced_did`], [`generate_key_did`] and [`create_identity`]
//!   derive `did:erynoa:<namespace>:<id>` and `did:key:z...` identifiers.
//!   Derivation is a pure function of the key bytes and the namespace.
//! - [`StoredCredential`] is the record the credential ledger persists.

mod algorithm;
mod authenticator_data;
mod cose;
mod credential;
mod did;
mod error;
mod namespace;
mod serde_base64url;

pub use algorithm::CoseAlgorithm;
pub use authenticator_data::{
    AttestedCredentialData, AuthenticatorData, AuthenticatorFlags,
    extract_public_key_from_authenticator_data,
};
pub use cose::{CoseKey, extract_public_key_from_cose, public_key_from_cose};
pub use credential::{PublicKey, StoredCredential, Transport};
pub use did::{
    DidMethod, ParsedDid, PasskeyDid, create_identity, decode_key_did, format_did_short,
    generate_key_did, generate_namespaced_did, is_valid_did, parse_did,
};
pub use error::{DidError, KeyExtractionError};
pub use namespace::Namespace;
