//! `#[serde(with = ...)]` adapter that renders byte vectors as unpadded
//! base64url strings.

use erynoa_common::{base64url_decode, base64url_encode};
use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

/// Serialize bytes as unpadded base64url.
pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&base64url_encode(bytes))
}

/// Deserialize unpadded base64url into bytes.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    base64url_decode(&encoded).map_err(D::Error::custom)
}
