//! A software [`Authenticator`] backed by in-memory Ed25519 keys.
//!
//! It produces real WebAuthn artifacts (authenticator data with an attested
//! COSE key, client data JSON, signatures over
//! `authData ‖ SHA-256(clientDataJSON)`), so the orchestrator can be driven
//! end to end without a platform authenticator. Failures, delays and
//! platform support can be scripted.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use ed25519_dalek::{Signer, SigningKey};
use erynoa_common::base64url_encode;
use erynoa_credentials::{AuthenticatorFlags, CoseAlgorithm, CoseKey, Transport};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{
    AssertionResponse, Authenticator, AuthenticatorError, CreationOptions, PlatformSupport,
    RegistrationResponse, RequestOptions,
};

/// AAGUID reported by [`VirtualAuthenticator`].
pub const VIRTUAL_AAGUID: [u8; 16] = *b"erynoa-virtual01";

const UNKNOWN_ERROR: &str = "UnknownError";

#[derive(Clone)]
struct VirtualCredential {
    credential_id: Vec<u8>,
    rp_id: String,
    user_handle: Vec<u8>,
    signing_key: SigningKey,
    sign_count: u32,
}

struct State {
    credentials: Vec<VirtualCredential>,
    failures: VecDeque<AuthenticatorError>,
    delay: Option<Duration>,
    omit_public_key: bool,
    support: PlatformSupport,
    last_creation: Option<CreationOptions>,
    last_request: Option<RequestOptions>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
            failures: VecDeque::new(),
            delay: None,
            omit_public_key: false,
            support: PlatformSupport {
                webauthn_available: true,
                platform_authenticator_available: true,
                conditional_ui_available: true,
                ed25519_supported: true,
                uvpa_available: true,
            },
            last_creation: None,
            last_request: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientData<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    challenge: String,
    origin: String,
    cross_origin: bool,
}

/// An Ed25519 authenticator that lives in memory.
///
/// Clones share their credentials and script.
#[derive(Clone, Default)]
pub struct VirtualAuthenticator {
    state: Arc<Mutex<State>>,
}

impl VirtualAuthenticator {
    /// An authenticator with no credentials that reports full support.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `support` instead of full support.
    pub fn with_support(self, support: PlatformSupport) -> Self {
        self.state.lock().support = support;
        self
    }

    /// Fail the next ceremony with `error`. Queued failures are used in order.
    pub fn fail_next(&self, error: AuthenticatorError) {
        self.state.lock().failures.push_back(error);
    }

    /// Wait this long before answering each ceremony.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    /// Leave [`RegistrationResponse::public_key`] empty, forcing callers to
    /// read the key from the authenticator data.
    pub fn omit_public_key(&self, omit: bool) {
        self.state.lock().omit_public_key = omit;
    }

    /// Raw ids of all credentials created so far.
    pub fn credential_ids(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .credentials
            .iter()
            .map(|credential| credential.credential_id.clone())
            .collect()
    }

    /// The Ed25519 public key of a credential.
    pub fn public_key(&self, credential_id: &[u8]) -> Option<[u8; 32]> {
        self.state
            .lock()
            .credentials
            .iter()
            .find(|credential| credential.credential_id == credential_id)
            .map(|credential| credential.signing_key.verifying_key().to_bytes())
    }

    /// The options of the most recent registration.
    pub fn last_creation(&self) -> Option<CreationOptions> {
        self.state.lock().last_creation.clone()
    }

    /// The options of the most recent assertion.
    pub fn last_request(&self) -> Option<RequestOptions> {
        self.state.lock().last_request.clone()
    }

    /// Apply the scripted delay, then pop a scripted failure.
    async fn script(&self) -> Result<(), AuthenticatorError> {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.state.lock().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn random_bytes<const N: usize>() -> Result<[u8; N], AuthenticatorError> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes)
        .map_err(|error| AuthenticatorError::new(UNKNOWN_ERROR, error.to_string()))?;
    Ok(bytes)
}

fn client_data(kind: &str, challenge: &[u8], rp_id: &str) -> Result<Vec<u8>, AuthenticatorError> {
    serde_json::to_vec(&ClientData {
        kind,
        challenge: base64url_encode(challenge),
        origin: format!("https://{rp_id}"),
        cross_origin: false,
    })
    .map_err(|error| AuthenticatorError::new(UNKNOWN_ERROR, error.to_string()))
}

fn authenticator_data_header(rp_id: &str, flags: u8, sign_count: u32) -> Vec<u8> {
    let mut data = Sha256::digest(rp_id.as_bytes()).to_vec();
    data.push(flags);
    data.extend_from_slice(&sign_count.to_be_bytes());
    data
}

impl Authenticator for VirtualAuthenticator {
    async fn support(&self) -> PlatformSupport {
        self.state.lock().support
    }

    async fn create(
        &self,
        options: CreationOptions,
    ) -> Result<RegistrationResponse, AuthenticatorError> {
        self.state.lock().last_creation = Some(options.clone());
        self.script().await?;

        if !options.algorithms.contains(&CoseAlgorithm::EDDSA) {
            return Err(AuthenticatorError::new(
                AuthenticatorError::NOT_SUPPORTED,
                "Only EdDSA credentials can be created",
            ));
        }

        let signing_key = SigningKey::from_bytes(&random_bytes::<32>()?);
        let credential_id = random_bytes::<16>()?.to_vec();
        let public_key = signing_key.verifying_key().to_bytes();
        let cose_key = CoseKey::ed25519(public_key)
            .to_cbor()
            .map_err(|error| AuthenticatorError::new(UNKNOWN_ERROR, error.to_string()))?;

        let mut authenticator_data = authenticator_data_header(
            &options.rp.id,
            AuthenticatorFlags::UP | AuthenticatorFlags::UV | AuthenticatorFlags::AT,
            0,
        );
        authenticator_data.extend_from_slice(&VIRTUAL_AAGUID);
        authenticator_data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        authenticator_data.extend_from_slice(&credential_id);
        authenticator_data.extend_from_slice(&cose_key);

        let client_data_json = client_data("webauthn.create", &options.challenge, &options.rp.id)?;

        let mut state = self.state.lock();
        state.credentials.push(VirtualCredential {
            credential_id: credential_id.clone(),
            rp_id: options.rp.id,
            user_handle: options.user.id,
            signing_key,
            sign_count: 0,
        });

        Ok(RegistrationResponse {
            credential_id,
            client_data_json,
            authenticator_data: Some(authenticator_data),
            public_key: (!state.omit_public_key).then(|| public_key.to_vec()),
            algorithm: CoseAlgorithm::EDDSA,
            transports: vec![Transport::Internal, Transport::Hybrid],
        })
    }

    async fn get(&self, options: RequestOptions) -> Result<AssertionResponse, AuthenticatorError> {
        self.state.lock().last_request = Some(options.clone());
        self.script().await?;

        let client_data_json = client_data("webauthn.get", &options.challenge, &options.rp_id)?;

        let mut state = self.state.lock();
        let credential = state
            .credentials
            .iter_mut()
            .rev()
            .filter(|credential| credential.rp_id == options.rp_id)
            .find(|credential| {
                options.allow_credentials.is_empty()
                    || options
                        .allow_credentials
                        .iter()
                        .any(|allowed| allowed.id == credential.credential_id)
            })
            .ok_or_else(|| {
                AuthenticatorError::new(
                    AuthenticatorError::NOT_ALLOWED,
                    "No matching credential on this authenticator",
                )
            })?;

        credential.sign_count += 1;
        let authenticator_data = authenticator_data_header(
            &options.rp_id,
            AuthenticatorFlags::UP | AuthenticatorFlags::UV,
            credential.sign_count,
        );

        let mut signed = authenticator_data.clone();
        signed.extend_from_slice(&Sha256::digest(&client_data_json));
        let signature = credential.signing_key.sign(&signed).to_bytes().to_vec();

        Ok(AssertionResponse {
            credential_id: credential.credential_id.clone(),
            client_data_json,
            authenticator_data,
            signature,
            user_handle: Some(credential.user_handle.clone()),
        })
    }
}
