//! Multibase codecs for byte/string conversion.
//!
//! Every byte buffer that crosses a string boundary in Erynoa (credential
//! ids, public keys, challenges, signatures, `did:key` identifiers) is
//! converted with one of these codecs:
//!
//! - **base64url**: URL-safe alphabet, unpadded on encode, padding optional
//!   on decode.
//! - **hex**: lowercase on encode, optional `0x` prefix on decode.
//! - **base58btc**: Bitcoin alphabet (no `0OIl`), leading zero bytes
//!   preserved as leading `'1'` characters.
//!
//! ```rust
//! use erynoa_common::codec::{base58btc_encode, base64url_encode, hex_encode};
//!
//! assert_eq!(base64url_encode(b"Hello"), "SGVsbG8");
//! assert_eq!(hex_encode(&[0, 15, 255]), "000fff");
//! assert!(base58btc_encode(&[0, 0, 1]).starts_with("11"));
//! ```

mod base58;
mod base64url;
mod error;
mod hex;

pub use self::base58::{BASE58_ALPHABET, base58btc_decode, base58btc_encode};
pub use base64url::{base64url_decode, base64url_encode};
pub use error::CodecError;
pub use self::hex::{hex_decode, hex_encode};

/// Re-encode a base64url string as lowercase hex.
///
/// # Errors
///
/// Returns an error if `value` is not valid base64url.
pub fn base64url_to_hex(value: &str) -> Result<String, CodecError> {
    Ok(hex_encode(&base64url_decode(value)?))
}

/// Re-encode a hex string (optionally `0x`-prefixed) as base64url.
///
/// # Errors
///
/// Returns an error if `value` is not valid hex.
pub fn hex_to_base64url(value: &str) -> Result<String, CodecError> {
    Ok(base64url_encode(&hex_decode(value)?))
}
