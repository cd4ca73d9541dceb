use std::time::Duration;

use erynoa_credentials::Namespace;
use erynoa_storage::{CredentialLedger, KeyValueStore, StorageKeys};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Attestation;

/// Configuration for passkey ceremonies and the services they talk to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasskeyConfig {
    /// Relying party identifier, typically the bare host name.
    pub rp_id: String,

    /// Relying party name shown by the authenticator.
    pub rp_name: String,

    /// Base URL of the authentication API (`/challenge`, `/passkey/...`).
    pub api_base_url: String,

    /// Optional API key sent as a bearer token.
    pub api_key: Option<String>,

    /// How long the authenticator may take, in milliseconds.
    pub ceremony_timeout_ms: u64,

    /// Nominal lifetime of a locally generated challenge, in seconds.
    pub challenge_max_age_secs: u64,

    /// Timeout for requests to the authentication API, in seconds.
    pub request_timeout_secs: u64,

    /// Namespace new identities are created in unless one is given.
    pub default_namespace: Namespace,

    /// Attestation conveyance requested at registration.
    pub attestation: Attestation,

    /// Optional prefix for the ledger's storage keys.
    pub storage_prefix: Option<String>,
}

impl Default for PasskeyConfig {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_name: "Erynoa".to_string(),
            api_base_url: "http://localhost:3000/api/v1/auth".to_string(),
            api_key: None,
            ceremony_timeout_ms: 120_000,
            challenge_max_age_secs: 300,
            request_timeout_secs: 10,
            default_namespace: Namespace::Personal,
            attestation: Attestation::Direct,
            storage_prefix: None,
        }
    }
}

impl PasskeyConfig {
    /// [`ceremony_timeout_ms`](Self::ceremony_timeout_ms) as a [`Duration`].
    pub fn ceremony_timeout(&self) -> Duration {
        Duration::from_millis(self.ceremony_timeout_ms)
    }

    /// [`challenge_max_age_secs`](Self::challenge_max_age_secs) as a [`Duration`].
    pub fn challenge_max_age(&self) -> Duration {
        Duration::from_secs(self.challenge_max_age_secs)
    }

    /// [`request_timeout_secs`](Self::request_timeout_secs) as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// A ledger over `store`, with keys under [`storage_prefix`](Self::storage_prefix).
    pub fn open_ledger<S: KeyValueStore>(&self, store: S) -> CredentialLedger<S> {
        CredentialLedger::with_keys(store, StorageKeys::new(self.storage_prefix.as_deref()))
    }

    /// `path` resolved against [`api_base_url`](Self::api_base_url).
    ///
    /// The base is treated as a directory, so `endpoint("challenge")` on
    /// `http://host/api/v1/auth` is `http://host/api/v1/auth/challenge`.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = format!("{}/", self.api_base_url.trim_end_matches('/'));
        Url::parse(&base)?.join(path.trim_start_matches('/'))
    }
}
