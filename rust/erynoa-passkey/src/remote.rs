//! Best-effort registration with, and verification by, the backend.
//!
//! Remote calls never affect the local ledger. Every outcome collapses to a
//! boolean; failures are logged and reported as `false`.

use async_trait::async_trait;
use erynoa_common::{ConditionalSync, base64url_encode};
use erynoa_credentials::{CoseAlgorithm, Namespace, PublicKey, StoredCredential};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{AssertionResponse, PasskeyConfig, http::ApiClient};

/// A backend that learns about credentials and checks assertions.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait RemoteRegistry: ConditionalSync {
    /// Share a freshly registered credential's public key.
    async fn register(&self, credential: &StoredCredential) -> bool;

    /// Ask the backend to verify an assertion.
    async fn verify(&self, assertion: &AssertionResponse) -> bool;
}

/// No backend: every call reports `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnly;

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl RemoteRegistry for LocalOnly {
    async fn register(&self, _credential: &StoredCredential) -> bool {
        false
    }

    async fn verify(&self, _assertion: &AssertionResponse) -> bool {
        false
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    credential_id: &'a str,
    public_key: &'a PublicKey,
    algorithm: CoseAlgorithm,
    did: &'a str,
    namespace: Namespace,
}

impl<'a> From<&'a StoredCredential> for RegisterRequest<'a> {
    fn from(credential: &'a StoredCredential) -> Self {
        Self {
            credential_id: &credential.credential_id,
            public_key: &credential.public_key,
            algorithm: credential.algorithm,
            did: &credential.did,
            namespace: credential.namespace,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest {
    credential_id: String,
    signature: String,
    authenticator_data: String,
    #[serde(rename = "clientDataJSON")]
    client_data_json: String,
}

impl From<&AssertionResponse> for VerifyRequest {
    fn from(assertion: &AssertionResponse) -> Self {
        Self {
            credential_id: base64url_encode(&assertion.credential_id),
            signature: base64url_encode(&assertion.signature),
            authenticator_data: base64url_encode(&assertion.authenticator_data),
            client_data_json: base64url_encode(&assertion.client_data_json),
        }
    }
}

/// Talks to `POST {api_base}/passkey/register` and `POST {api_base}/passkey/verify`.
#[derive(Debug, Clone)]
pub struct HttpRemoteRegistry {
    client: ApiClient,
}

impl HttpRemoteRegistry {
    /// A registry for the API configured in `config`.
    pub fn new(config: &PasskeyConfig) -> Result<Self, reqwest::Error> {
        let client = ApiClient::new(config)?;
        Ok(Self { client })
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> bool {
        let url = match self.client.endpoint(path) {
            Ok(url) => url,
            Err(error) => {
                warn!(path, %error, "Invalid remote registry endpoint");
                return false;
            }
        };
        debug!(%url, "Calling remote registry");

        match self.client.post(url).json(body).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(path, status = response.status().as_u16(), "Remote registry rejected request");
                false
            }
            Err(error) => {
                warn!(path, %error, "Remote registry request failed");
                false
            }
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl RemoteRegistry for HttpRemoteRegistry {
    async fn register(&self, credential: &StoredCredential) -> bool {
        self.post("passkey/register", &RegisterRequest::from(credential))
            .await
    }

    async fn verify(&self, assertion: &AssertionResponse) -> bool {
        self.post("passkey/verify", &VerifyRequest::from(assertion))
            .await
    }
}
