//! Challenges for passkey ceremonies.
//!
//! A challenge normally comes from the authentication API, which also
//! enforces replay protection. When the API cannot be reached, ceremonies
//! fall back to a locally generated challenge: 32 random bytes with a
//! nominal expiry. Nothing on the client enforces that expiry.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use erynoa_common::{ConditionalSync, base64url_decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Attestation, ChallengeError, PasskeyConfig, UserVerification, http::ApiClient};

/// Number of random bytes in a locally generated challenge.
pub const LOCAL_CHALLENGE_LEN: usize = 32;

/// Where a challenge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeOrigin {
    /// Issued by the authentication API.
    Remote,
    /// Generated on this device.
    Local,
}

/// Overrides the server may attach to a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeOptions {
    /// Relying party id override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    /// Ceremony timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Attestation override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Attestation>,
    /// User verification override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerification>,
}

/// A ceremony challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Raw challenge bytes.
    pub bytes: Vec<u8>,
    /// Server-assigned id, echoed back on verification.
    pub id: Option<String>,
    /// Nominal expiry. Not enforced locally.
    pub expires_at: Option<DateTime<Utc>>,
    /// Server overrides for the ceremony.
    pub options: Option<ChallengeOptions>,
    /// Where the challenge was generated.
    pub origin: ChallengeOrigin,
}

impl Challenge {
    /// 32 fresh random bytes, nominally valid for `max_age`.
    pub fn local(max_age: Duration) -> Result<Self, ChallengeError> {
        let mut bytes = vec![0u8; LOCAL_CHALLENGE_LEN];
        getrandom::getrandom(&mut bytes)
            .map_err(|error| ChallengeError::Entropy(error.to_string()))?;
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
        Ok(Self {
            bytes,
            id: None,
            expires_at: Some(erynoa_common::now() + max_age),
            options: None,
            origin: ChallengeOrigin::Local,
        })
    }

    /// Whether the nominal expiry has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// The body of `GET {api_base}/challenge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    /// Base64url challenge bytes.
    pub challenge: String,
    /// Server-assigned challenge id.
    #[serde(default)]
    pub challenge_id: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Server overrides for the ceremony.
    #[serde(default)]
    pub options: Option<ChallengeOptions>,
}

impl TryFrom<ChallengeResponse> for Challenge {
    type Error = ChallengeError;

    fn try_from(response: ChallengeResponse) -> Result<Self, Self::Error> {
        let bytes = base64url_decode(&response.challenge)
            .map_err(|error| ChallengeError::Decode(error.to_string()))?;
        if bytes.is_empty() {
            return Err(ChallengeError::Decode("empty challenge".to_string()));
        }
        Ok(Self {
            bytes,
            id: response.challenge_id,
            expires_at: response
                .expires_at
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
            options: response.options,
            origin: ChallengeOrigin::Remote,
        })
    }
}

/// A source of ceremony challenges.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ChallengeSource: ConditionalSync {
    /// Obtain a fresh challenge.
    async fn fetch(&self) -> Result<Challenge, ChallengeError>;
}

/// Generates every challenge locally. For offline use and development.
#[derive(Debug, Clone)]
pub struct LocalChallengeSource {
    max_age: Duration,
}

impl LocalChallengeSource {
    /// Challenges nominally valid for `max_age`.
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }
}

impl Default for LocalChallengeSource {
    fn default() -> Self {
        Self::new(PasskeyConfig::default().challenge_max_age())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ChallengeSource for LocalChallengeSource {
    async fn fetch(&self) -> Result<Challenge, ChallengeError> {
        Challenge::local(self.max_age)
    }
}

/// Fetches challenges from `GET {api_base}/challenge`.
#[derive(Debug, Clone)]
pub struct HttpChallengeService {
    client: ApiClient,
}

impl HttpChallengeService {
    /// A service for the API configured in `config`.
    pub fn new(config: &PasskeyConfig) -> Result<Self, reqwest::Error> {
        let client = ApiClient::new(config)?;
        Ok(Self { client })
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ChallengeSource for HttpChallengeService {
    async fn fetch(&self) -> Result<Challenge, ChallengeError> {
        let url = self
            .client
            .endpoint("challenge")
            .map_err(|error| ChallengeError::Endpoint(error.to_string()))?;
        debug!(%url, "Fetching challenge");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChallengeError::Status(status.as_u16()));
        }

        let body: ChallengeResponse = response.json().await?;
        Challenge::try_from(body)
    }
}
