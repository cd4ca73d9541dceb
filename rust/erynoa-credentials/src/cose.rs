//! COSE public keys (RFC 9053) as carried in attested credential data.
//!
//! Two readers are offered. [`CoseKey::parse`] understands the handful of map
//! labels a passkey public key uses. [`extract_public_key_from_cose`] is a
//! trailing-bytes heuristic that only holds for OKP keys whose `x` coordinate
//! is the last map entry; it is kept as the fallback for blobs the parser
//! rejects.

use ciborium::Value;
use tracing::debug;

use crate::{CoseAlgorithm, KeyExtractionError};

const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV: i64 = -1;
const LABEL_X: i64 = -2;
const LABEL_Y: i64 = -3;

const ED25519_KEY_LEN: usize = 32;

/// A decoded COSE key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoseKey {
    /// Key type (label 1).
    pub kty: i64,
    /// Algorithm (label 3).
    pub alg: Option<CoseAlgorithm>,
    /// Curve (label -1).
    pub crv: Option<i64>,
    /// X coordinate, or the whole public key for OKP (label -2).
    pub x: Option<Vec<u8>>,
    /// Y coordinate for EC2 (label -3).
    pub y: Option<Vec<u8>>,
}

impl CoseKey {
    /// Octet key pair.
    pub const KTY_OKP: i64 = 1;
    /// Elliptic curve with x and y coordinates.
    pub const KTY_EC2: i64 = 2;
    /// NIST P-256.
    pub const CRV_P256: i64 = 1;
    /// Ed25519.
    pub const CRV_ED25519: i64 = 6;

    /// An Ed25519 OKP key.
    pub fn ed25519(public_key: [u8; 32]) -> Self {
        Self {
            kty: Self::KTY_OKP,
            alg: Some(CoseAlgorithm::EDDSA),
            crv: Some(Self::CRV_ED25519),
            x: Some(public_key.to_vec()),
            y: None,
        }
    }

    /// Decode the first CBOR item of `bytes` as a COSE key map.
    ///
    /// Bytes after the map (extension data) are ignored. Labels other than
    /// kty, alg, crv, x and y are skipped.
    pub fn parse(bytes: &[u8]) -> Result<Self, KeyExtractionError> {
        let value: Value = ciborium::from_reader(bytes)
            .map_err(|error| KeyExtractionError::MalformedCose(error.to_string()))?;
        let Value::Map(entries) = value else {
            return Err(KeyExtractionError::MalformedCose(
                "expected a CBOR map".to_string(),
            ));
        };

        let mut kty = None;
        let mut alg = None;
        let mut crv = None;
        let mut x = None;
        let mut y = None;

        for (key, value) in entries {
            let Some(label) = key.as_integer().and_then(|i| i64::try_from(i).ok()) else {
                continue;
            };
            match label {
                LABEL_KTY => kty = integer(&value, label)?,
                LABEL_ALG => alg = integer(&value, label)?.map(CoseAlgorithm),
                LABEL_CRV => crv = integer(&value, label)?,
                LABEL_X => x = value.into_bytes().ok(),
                LABEL_Y => y = value.into_bytes().ok(),
                _ => {}
            }
        }

        Ok(Self {
            kty: kty.ok_or(KeyExtractionError::MissingLabel(LABEL_KTY))?,
            alg,
            crv,
            x,
            y,
        })
    }

    /// The raw public key: `x` for OKP keys, `0x04 || x || y` for EC2 keys.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, KeyExtractionError> {
        let x = self
            .x
            .as_ref()
            .ok_or(KeyExtractionError::MissingLabel(LABEL_X))?;
        match self.kty {
            Self::KTY_OKP => Ok(x.clone()),
            Self::KTY_EC2 => {
                let y = self
                    .y
                    .as_ref()
                    .ok_or(KeyExtractionError::MissingLabel(LABEL_Y))?;
                let mut point = Vec::with_capacity(1 + x.len() + y.len());
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                Ok(point)
            }
            other => Err(KeyExtractionError::UnsupportedKeyType(other)),
        }
    }

    /// Encode as a CBOR map with integer labels in the order kty, alg, crv, x, y.
    pub fn to_cbor(&self) -> Result<Vec<u8>, KeyExtractionError> {
        let mut entries = vec![(Value::Integer(LABEL_KTY.into()), Value::Integer(self.kty.into()))];
        if let Some(alg) = self.alg {
            entries.push((Value::Integer(LABEL_ALG.into()), Value::Integer(alg.0.into())));
        }
        if let Some(crv) = self.crv {
            entries.push((Value::Integer(LABEL_CRV.into()), Value::Integer(crv.into())));
        }
        if let Some(x) = &self.x {
            entries.push((Value::Integer(LABEL_X.into()), Value::Bytes(x.clone())));
        }
        if let Some(y) = &self.y {
            entries.push((Value::Integer(LABEL_Y.into()), Value::Bytes(y.clone())));
        }

        let mut bytes = Vec::new();
        ciborium::into_writer(&Value::Map(entries), &mut bytes)
            .map_err(|error| KeyExtractionError::MalformedCose(error.to_string()))?;
        Ok(bytes)
    }
}

fn integer(value: &Value, label: i64) -> Result<Option<i64>, KeyExtractionError> {
    match value.as_integer() {
        Some(integer) => i64::try_from(integer).map(Some).map_err(|_| {
            KeyExtractionError::MalformedCose(format!("label {label} is out of range"))
        }),
        None => Err(KeyExtractionError::MalformedCose(format!(
            "label {label} is not an integer"
        ))),
    }
}

/// Heuristic extraction: the trailing 32 bytes of the blob.
///
/// Only correct for Ed25519 OKP keys encoded with `x` last. Fails with
/// [`KeyExtractionError::ExtractionFailed`] under 32 bytes.
pub fn extract_public_key_from_cose(cose_key: &[u8]) -> Result<Vec<u8>, KeyExtractionError> {
    if cose_key.len() < ED25519_KEY_LEN {
        return Err(KeyExtractionError::ExtractionFailed(cose_key.len()));
    }
    Ok(cose_key[cose_key.len() - ED25519_KEY_LEN..].to_vec())
}

/// Structured parse first, heuristic second.
pub fn public_key_from_cose(cose_key: &[u8]) -> Result<Vec<u8>, KeyExtractionError> {
    match CoseKey::parse(cose_key).and_then(|key| key.public_key_bytes()) {
        Ok(public_key) => Ok(public_key),
        Err(error) => {
            debug!(%error, "COSE key not understood, using trailing bytes");
            extract_public_key_from_cose(cose_key)
        }
    }
}
