use super::CodecError;

/// The Bitcoin base58 alphabet. `0`, `O`, `I` and `l` are omitted to avoid
/// visual ambiguity.
pub const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Encode bytes as base58btc.
///
/// The buffer is read as a big-endian unsigned integer and repeatedly divided
/// by 58. Each leading zero byte is emitted as a leading `'1'`.
pub fn base58btc_encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode a base58btc string of any length, restoring one zero byte per
/// leading `'1'`.
///
/// # Errors
///
/// Returns [`CodecError::InvalidBase58Character`] on any character outside
/// [`BASE58_ALPHABET`].
pub fn base58btc_decode(value: &str) -> Result<Vec<u8>, CodecError> {
    bs58::decode(value).into_vec().map_err(|error| match error {
        bs58::decode::Error::InvalidCharacter { character, index } => {
            CodecError::InvalidBase58Character { character, index }
        }
        bs58::decode::Error::NonAsciiCharacter { index } => CodecError::InvalidBase58Character {
            character: value
                .get(index..)
                .and_then(|rest| rest.chars().next())
                .unwrap_or(char::REPLACEMENT_CHARACTER),
            index,
        },
        _ => CodecError::InvalidBase58Length,
    })
}
