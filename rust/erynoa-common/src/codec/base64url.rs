use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

use super::CodecError;

/// URL-safe engine that never emits padding but tolerates it on input, so
/// both `SGVsbG8` and `SGVsbG8=` decode to the same bytes.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded base64url.
pub fn base64url_encode(bytes: &[u8]) -> String {
    BASE64URL.encode(bytes)
}

/// Decode a base64url string, with or without trailing `=` padding.
///
/// # Errors
///
/// Returns [`CodecError::InvalidBase64`] if the input contains characters
/// outside the URL-safe alphabet or has an impossible length.
pub fn base64url_decode(value: &str) -> Result<Vec<u8>, CodecError> {
    BASE64URL
        .decode(value)
        .map_err(|error| CodecError::InvalidBase64(error.to_string()))
}
