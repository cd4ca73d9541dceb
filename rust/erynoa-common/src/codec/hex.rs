use hex::FromHexError;

use super::CodecError;

/// Encode bytes as lowercase hex, two digits per byte.
pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string, tolerating an optional `0x` prefix.
///
/// # Errors
///
/// Returns [`CodecError::OddLengthHex`] if the prefix-stripped string has odd
/// length and [`CodecError::InvalidHexCharacter`] on a non-hex digit.
pub fn hex_decode(value: &str) -> Result<Vec<u8>, CodecError> {
    let clean = value.strip_prefix("0x").unwrap_or(value);
    if clean.len() % 2 != 0 {
        return Err(CodecError::OddLengthHex(clean.len()));
    }

    hex::decode(clean).map_err(|error| match error {
        FromHexError::InvalidHexCharacter { c, index } => CodecError::InvalidHexCharacter {
            character: c,
            index,
        },
        FromHexError::OddLength | FromHexError::InvalidStringLength => {
            CodecError::OddLengthHex(clean.len())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_encodes_two_lowercase_digits_per_byte() {
        assert_eq!(hex_encode(&[0, 15, 255]), "000fff");
        assert_eq!(hex_encode(&[0xDE, 0xAD]), "dead");
    }

    #[test]
    fn it_ignores_a_0x_prefix() {
        assert_eq!(
            hex_decode("0xdeadbeef").unwrap(),
            hex_decode("deadbeef").unwrap()
        );
        assert_eq!(hex_decode("deadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn it_accepts_uppercase_digits() {
        assert_eq!(hex_decode("000FFF").unwrap(), vec![0, 15, 255]);
    }

    #[test]
    fn it_rejects_odd_length() {
        assert_eq!(hex_decode("0xabc"), Err(CodecError::OddLengthHex(3)));
    }

    #[test]
    fn it_rejects_non_hex_characters() {
        assert_eq!(
            hex_decode("zz"),
            Err(CodecError::InvalidHexCharacter {
                character: 'z',
                index: 0
            })
        );
    }
}
