use thiserror::Error;

/// Errors produced when decoding a multibase string back into bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The input is not valid base64url.
    #[error("invalid base64url: {0}")]
    InvalidBase64(String),

    /// The hex string (after stripping any `0x` prefix) has odd length.
    #[error("hex string must have even length, got {0} characters")]
    OddLengthHex(usize),

    /// The hex string contains a character outside `[0-9a-fA-F]`.
    #[error("invalid hex character {character:?} at index {index}")]
    InvalidHexCharacter {
        /// The offending character.
        character: char,
        /// Its position in the (prefix-stripped) input.
        index: usize,
    },

    /// The base58btc string contains a character outside the alphabet.
    #[error("invalid base58 character {character:?} at index {index}")]
    InvalidBase58Character {
        /// The offending character.
        character: char,
        /// Its position in the input.
        index: usize,
    },

    /// The base58btc string could not be decoded for a reason other than a
    /// bad character. Decoding is not bounded by input length.
    #[error("invalid base58 length")]
    InvalidBase58Length,
}
