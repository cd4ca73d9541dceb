//! Round-trip properties for the multibase codecs.

use erynoa_common::codec::{
    base58btc_decode, base58btc_encode, base64url_decode, base64url_encode, hex_decode,
    hex_encode,
};
use proptest::prelude::*;
use testresult::TestResult;

proptest! {
    #[test]
    fn base64url_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let encoded = base64url_encode(&bytes);
        prop_assert!(!encoded.contains('='));
        prop_assert_eq!(base64url_decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn hex_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let encoded = hex_encode(&bytes);
        prop_assert_eq!(encoded.len(), bytes.len() * 2);
        prop_assert_eq!(hex_decode(&encoded).unwrap(), bytes.clone());
        prop_assert_eq!(hex_decode(&format!("0x{encoded}")).unwrap(), bytes);
    }

    #[test]
    fn base58btc_round_trips_any_buffer(bytes in proptest::collection::vec(any::<u8>(), 0..1024)) {
        prop_assert_eq!(base58btc_decode(&base58btc_encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn base58btc_round_trips_with_leading_zeros(
        zeros in 0usize..32,
        tail in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let mut bytes = vec![0u8; zeros];
        bytes.extend(tail);

        let encoded = base58btc_encode(&bytes);
        let leading_zeros = bytes.iter().take_while(|b| **b == 0).count();
        let leading_ones = encoded.chars().take_while(|c| *c == '1').count();

        prop_assert_eq!(leading_ones, leading_zeros);
        prop_assert_eq!(base58btc_decode(&encoded).unwrap(), bytes);
    }
}

#[test]
fn it_round_trips_a_did_key_payload() -> TestResult {
    let mut payload = vec![0xed, 0x01];
    payload.extend_from_slice(&[0xAA; 32]);

    let encoded = base58btc_encode(&payload);
    assert_eq!(base58btc_decode(&encoded)?, payload);

    Ok(())
}
