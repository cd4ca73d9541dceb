//! Registration, authentication and signing ceremonies.
//!
//! Each ceremony is tracked by a [`Ceremony`] and ends in a
//! [`CeremonyResult`]. The authenticator call is the only long suspension
//! point and is bounded by the ceremony timeout. Challenge and remote
//! failures degrade instead of failing the ceremony: a local challenge is
//! used, and remote outcomes are reported as booleans.

use std::{future::Future, sync::Arc, time::Duration};

use erynoa_common::{base64url_encode, hex_encode};
use erynoa_credentials::{
    AuthenticatorData, CoseAlgorithm, Namespace, StoredCredential, create_identity,
    extract_public_key_from_authenticator_data,
};
use erynoa_storage::{Activation, CredentialLedger, KeyValueStore};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    Attestation, AuthenticationSuccess, Authenticator, AuthenticatorAttachment,
    AuthenticatorError, Ceremony, CeremonyError, CeremonyFailure, CeremonyKind, CeremonyResult,
    CeremonyState, Challenge, ChallengeSource, CreationOptions, CredentialDescriptor,
    HttpChallengeService, HttpRemoteRegistry, LocalChallengeSource, LocalOnly, PasskeyConfig,
    PasskeyErrorCode, PlatformSupport, RegistrationSuccess, RelyingParty, RemoteRegistry,
    RequestOptions, ResidentKey, SignatureSuccess, UserEntity, UserVerification,
};

/// Length of the random user handle generated at registration.
pub const USER_HANDLE_LEN: usize = 16;

const DEFAULT_DISPLAY_NAME: &str = "Erynoa User";

/// Options for [`PasskeyOrchestrator::register`].
#[derive(Debug, Clone, Default)]
pub struct RegistrationOptions {
    /// Account name; `erynoa-user-<millis>` when unset.
    pub username: Option<String>,
    /// Shown by the authenticator and stored as the credential label.
    pub display_name: Option<String>,
    /// Namespace of the new DID; the configured default when unset.
    pub namespace: Option<Namespace>,
    /// Offer only EdDSA, and fail unless the authenticator used it.
    pub force_ed25519: bool,
    /// Ask for a built-in authenticator.
    pub prefer_platform_authenticator: bool,
    /// `direct` when unset.
    pub attestation: Option<Attestation>,
    /// The configured ceremony timeout when unset.
    pub timeout: Option<Duration>,
    /// Mark the credential primary and make its DID active.
    pub set_primary: bool,
    /// Share the new public key with the backend.
    pub sync_remote: bool,
}

/// Options for [`PasskeyOrchestrator::authenticate`].
#[derive(Debug, Clone, Default)]
pub struct AuthenticationOptions {
    /// Allow only this credential.
    pub credential_id: Option<String>,
    /// Allow only the credentials bound to this DID. An unknown DID allows any.
    pub did: Option<String>,
    /// Require user verification instead of preferring it.
    pub require_user_verification: bool,
    /// The configured ceremony timeout when unset.
    pub timeout: Option<Duration>,
    /// Ask the backend to verify the assertion.
    pub verify_remote: bool,
}

/// Options for [`PasskeyOrchestrator::sign`].
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    /// Sign these bytes instead of a digest of the message.
    pub challenge: Option<Vec<u8>>,
    /// Sign with this credential.
    pub credential_id: Option<String>,
    /// Sign with a credential bound to this DID. An unknown DID allows any.
    pub did: Option<String>,
    /// Require user verification instead of preferring it.
    pub require_user_verification: bool,
}

/// `SHA-256(message ‖ timestamp)`, where the timestamp is decimal
/// milliseconds since the epoch.
pub fn message_challenge(message: &[u8], timestamp_millis: i64) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.update(timestamp_millis.to_string().as_bytes());
    hasher.finalize().to_vec()
}

/// Runs passkey ceremonies against an [`Authenticator`] and records their
/// outcome in a [`CredentialLedger`].
pub struct PasskeyOrchestrator<A, S> {
    authenticator: A,
    ledger: Arc<CredentialLedger<S>>,
    challenges: Arc<dyn ChallengeSource>,
    remote: Arc<dyn RemoteRegistry>,
    config: PasskeyConfig,
    support: OnceCell<PlatformSupport>,
}

impl<A, S> PasskeyOrchestrator<A, S>
where
    A: Authenticator,
    S: KeyValueStore,
{
    /// An orchestrator with no backend: challenges are generated locally and
    /// nothing is shared remotely.
    pub fn new(authenticator: A, ledger: Arc<CredentialLedger<S>>, config: PasskeyConfig) -> Self {
        Self {
            authenticator,
            ledger,
            challenges: Arc::new(LocalChallengeSource::new(config.challenge_max_age())),
            remote: Arc::new(LocalOnly),
            config,
            support: OnceCell::new(),
        }
    }

    /// An orchestrator that talks to the API at
    /// [`PasskeyConfig::api_base_url`].
    pub fn connected(
        authenticator: A,
        ledger: Arc<CredentialLedger<S>>,
        config: PasskeyConfig,
    ) -> Result<Self, reqwest::Error> {
        let challenges = HttpChallengeService::new(&config)?;
        let remote = HttpRemoteRegistry::new(&config)?;
        Ok(Self::new(authenticator, ledger, config)
            .with_challenge_source(challenges)
            .with_remote_registry(remote))
    }

    /// Replace where challenges come from.
    pub fn with_challenge_source<C>(mut self, challenges: C) -> Self
    where
        C: ChallengeSource + 'static,
    {
        self.challenges = Arc::new(challenges);
        self
    }

    /// Replace the backend public keys and assertions are shared with.
    pub fn with_remote_registry<R>(mut self, remote: R) -> Self
    where
        R: RemoteRegistry + 'static,
    {
        self.remote = Arc::new(remote);
        self
    }

    /// The authenticator ceremonies run against.
    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// The ledger credentials are recorded in.
    pub fn ledger(&self) -> &Arc<CredentialLedger<S>> {
        &self.ledger
    }

    /// The configuration in use.
    pub fn config(&self) -> &PasskeyConfig {
        &self.config
    }

    /// Platform support, queried once and then cached for the lifetime of
    /// this orchestrator.
    pub async fn support(&self) -> PlatformSupport {
        *self
            .support
            .get_or_init(|| self.authenticator.support())
            .await
    }

    /// Query platform support again, bypassing the cache.
    pub async fn detect_support(&self) -> PlatformSupport {
        self.authenticator.support().await
    }

    /// Create a passkey, derive its DID and store it.
    pub async fn register(&self, options: RegistrationOptions) -> CeremonyResult<RegistrationSuccess> {
        let mut ceremony = Ceremony::new(CeremonyKind::Registration);
        let result = self.run_registration(&mut ceremony, options).await;
        conclude(ceremony, result)
    }

    /// Authenticate with a stored (or discoverable) passkey and make its DID
    /// active.
    pub async fn authenticate(
        &self,
        options: AuthenticationOptions,
    ) -> CeremonyResult<AuthenticationSuccess> {
        let mut ceremony = Ceremony::new(CeremonyKind::Authentication);
        let result = self.run_authentication(&mut ceremony, options).await;
        conclude(ceremony, result)
    }

    /// Sign `message` with a passkey.
    ///
    /// Unless the caller supplies the challenge, the authenticator signs
    /// [`message_challenge`] of the message and the current time.
    pub async fn sign(
        &self,
        message: impl AsRef<[u8]>,
        options: SignOptions,
    ) -> CeremonyResult<SignatureSuccess> {
        let mut ceremony = Ceremony::new(CeremonyKind::Signing);
        let result = self
            .run_signing(&mut ceremony, message.as_ref(), options)
            .await;
        conclude(ceremony, result)
    }

    async fn run_registration(
        &self,
        ceremony: &mut Ceremony,
        options: RegistrationOptions,
    ) -> Result<RegistrationSuccess, CeremonyError> {
        let support = self.support().await;
        if !support.webauthn_available {
            return Err(CeremonyError::coded(
                PasskeyErrorCode::NotSupported,
                "WebAuthn is not available on this platform",
            ));
        }

        let challenge = self.acquire_challenge().await?;
        ceremony.advance(CeremonyState::ChallengeAcquired)?;

        let creation = self.creation_options(&challenge, &options)?;
        let timeout = creation.timeout;
        info!(
            rp_id = %creation.rp.id,
            username = %creation.user.name,
            algorithms = ?creation.algorithms,
            "Starting passkey registration"
        );

        ceremony.advance(CeremonyState::InProgress)?;
        let response = bounded(
            CeremonyKind::Registration,
            timeout,
            self.authenticator.create(creation),
        )
        .await?;

        let public_key = match (&response.public_key, &response.authenticator_data) {
            (Some(public_key), _) => public_key.clone(),
            (None, Some(authenticator_data)) => {
                debug!("No public key reported, extracting it from authenticator data");
                extract_public_key_from_authenticator_data(authenticator_data)?
            }
            (None, None) => {
                return Err(CeremonyError::coded(
                    PasskeyErrorCode::Unknown,
                    "Could not extract public key from registration response",
                ));
            }
        };

        if !response.algorithm.is_eddsa() {
            if options.force_ed25519 {
                return Err(CeremonyError::coded(
                    PasskeyErrorCode::Ed25519NotSupported,
                    format!("Authenticator used {} instead of EdDSA", response.algorithm),
                ));
            }
            warn!(
                algorithm = %response.algorithm,
                "Authenticator did not use Ed25519, DID compatibility may be limited"
            );
        }

        let namespace = options.namespace.unwrap_or(self.config.default_namespace);
        let identity = create_identity(&public_key, namespace, response.algorithm);

        let mut credential =
            StoredCredential::new(base64url_encode(&response.credential_id), &identity);
        if !response.transports.is_empty() {
            credential = credential.with_transports(response.transports.clone());
        }
        if let Some(display_name) = &options.display_name {
            credential = credential.with_display_name(display_name.clone());
        }
        if let Some(attested) = response
            .authenticator_data
            .as_deref()
            .and_then(|data| AuthenticatorData::parse(data).ok())
            .and_then(|data| data.attested_credential)
        {
            credential = credential.with_aaguid(&attested.aaguid);
        }
        if options.set_primary {
            credential = credential.primary();
        }

        let activation = if options.set_primary {
            Activation::Always
        } else {
            Activation::IfNone
        };
        self.ledger.save_and_activate(credential.clone(), activation)?;

        let remote_registered = if options.sync_remote {
            Some(self.remote.register(&credential).await)
        } else {
            None
        };

        ceremony.advance(CeremonyState::Success)?;
        info!(
            did = %identity.did,
            algorithm = %response.algorithm,
            credential_id = %short_id(&credential.credential_id),
            "Passkey registration successful"
        );

        Ok(RegistrationSuccess {
            identity,
            credential,
            remote_registered,
        })
    }

    async fn run_authentication(
        &self,
        ceremony: &mut Ceremony,
        options: AuthenticationOptions,
    ) -> Result<AuthenticationSuccess, CeremonyError> {
        let challenge = self.acquire_challenge().await?;
        ceremony.advance(CeremonyState::ChallengeAcquired)?;

        let timeout = options
            .timeout
            .unwrap_or_else(|| self.config.ceremony_timeout());
        let request = RequestOptions {
            challenge: challenge.bytes,
            rp_id: self.config.rp_id.clone(),
            allow_credentials: self
                .allow_list(options.credential_id.as_deref(), options.did.as_deref()),
            user_verification: user_verification(options.require_user_verification),
            timeout,
        };
        info!(
            allowed = request.allow_credentials.len(),
            "Starting passkey authentication"
        );

        ceremony.advance(CeremonyState::InProgress)?;
        let assertion = bounded(
            CeremonyKind::Authentication,
            timeout,
            self.authenticator.get(request),
        )
        .await?;

        let (credential_id, did) = match self.resolve_credential(&assertion.credential_id) {
            Some(credential) => {
                let touched = self
                    .ledger
                    .touch(&credential.credential_id, erynoa_common::now())?;
                (touched.credential_id, Some(touched.did))
            }
            None => {
                let credential_id = base64url_encode(&assertion.credential_id);
                warn!(
                    credential_id = %short_id(&credential_id),
                    "Authenticator used a credential this device does not know"
                );
                (credential_id, None)
            }
        };

        let remote_verified = if options.verify_remote {
            Some(self.remote.verify(&assertion).await)
        } else {
            None
        };

        ceremony.advance(CeremonyState::Success)?;
        info!(
            did = ?did,
            credential_id = %short_id(&credential_id),
            "Passkey authentication successful"
        );

        Ok(AuthenticationSuccess {
            did,
            credential_id,
            signature: assertion.signature.clone(),
            assertion,
            remote_verified,
        })
    }

    async fn run_signing(
        &self,
        ceremony: &mut Ceremony,
        message: &[u8],
        options: SignOptions,
    ) -> Result<SignatureSuccess, CeremonyError> {
        let challenge = match options.challenge {
            Some(challenge) => challenge,
            None => message_challenge(message, erynoa_common::now_millis()),
        };
        ceremony.advance(CeremonyState::ChallengeAcquired)?;

        let timeout = self.config.ceremony_timeout();
        let request = RequestOptions {
            challenge: challenge.clone(),
            rp_id: self.config.rp_id.clone(),
            allow_credentials: self
                .allow_list(options.credential_id.as_deref(), options.did.as_deref()),
            user_verification: user_verification(options.require_user_verification),
            timeout,
        };
        debug!(bytes = message.len(), "Signing message with passkey");

        ceremony.advance(CeremonyState::InProgress)?;
        let assertion = bounded(CeremonyKind::Signing, timeout, self.authenticator.get(request))
            .await?;

        let did = self
            .resolve_credential(&assertion.credential_id)
            .map(|credential| credential.did);
        ceremony.advance(CeremonyState::Success)?;

        Ok(SignatureSuccess {
            signature_hex: hex_encode(&assertion.signature),
            signature_base64url: base64url_encode(&assertion.signature),
            signature_bytes: assertion.signature.clone(),
            did,
            challenge_base64url: base64url_encode(&challenge),
            challenge,
            assertion,
        })
    }

    async fn acquire_challenge(&self) -> Result<Challenge, CeremonyError> {
        match self.challenges.fetch().await {
            Ok(challenge) => Ok(challenge),
            Err(error) => {
                warn!(%error, "Challenge service unavailable, using a local challenge");
                Challenge::local(self.config.challenge_max_age()).map_err(|error| {
                    CeremonyError::coded(PasskeyErrorCode::ChallengeFetchFailed, error.to_string())
                })
            }
        }
    }

    fn creation_options(
        &self,
        challenge: &Challenge,
        options: &RegistrationOptions,
    ) -> Result<CreationOptions, CeremonyError> {
        let mut user_id = vec![0u8; USER_HANDLE_LEN];
        getrandom::getrandom(&mut user_id).map_err(|error| {
            CeremonyError::coded(
                PasskeyErrorCode::Unknown,
                format!("Failed to generate user handle: {error}"),
            )
        })?;

        let algorithms = if options.force_ed25519 {
            vec![CoseAlgorithm::EDDSA]
        } else {
            vec![CoseAlgorithm::EDDSA, CoseAlgorithm::ES256]
        };

        let mut creation = CreationOptions {
            challenge: challenge.bytes.clone(),
            rp: RelyingParty {
                id: self.config.rp_id.clone(),
                name: self.config.rp_name.clone(),
            },
            user: UserEntity {
                id: user_id,
                name: options
                    .username
                    .clone()
                    .unwrap_or_else(|| format!("erynoa-user-{}", erynoa_common::now_millis())),
                display_name: options
                    .display_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            },
            algorithms,
            resident_key: ResidentKey::Required,
            user_verification: UserVerification::Preferred,
            attachment: options
                .prefer_platform_authenticator
                .then_some(AuthenticatorAttachment::Platform),
            attestation: options.attestation.unwrap_or(self.config.attestation),
            timeout: options
                .timeout
                .unwrap_or_else(|| self.config.ceremony_timeout()),
        };

        // Server-provided options win
        if let Some(server) = &challenge.options {
            if let Some(rp_id) = &server.rp_id {
                creation.rp.id = rp_id.clone();
            }
            if let Some(timeout) = server.timeout {
                creation.timeout = Duration::from_millis(timeout);
            }
            if let Some(attestation) = server.attestation {
                creation.attestation = attestation;
            }
            if let Some(user_verification) = server.user_verification {
                creation.user_verification = user_verification;
            }
        }

        Ok(creation)
    }

    /// Explicit credential id, else the credential for an explicit DID, else
    /// every stored credential. Empty lets the authenticator offer any
    /// discoverable credential; a DID with no stored credential gives an
    /// empty list, and the returned credential decides the outcome.
    fn allow_list(
        &self,
        credential_id: Option<&str>,
        did: Option<&str>,
    ) -> Vec<CredentialDescriptor> {
        if let Some(credential_id) = credential_id {
            let descriptor = match self.ledger.credential(credential_id) {
                Some(credential) => CredentialDescriptor::from_stored(&credential),
                None => CredentialDescriptor::from_id(credential_id),
            };
            return vec![descriptor];
        }

        if let Some(did) = did {
            return match self.ledger.credential_for(did) {
                Some(credential) => vec![CredentialDescriptor::from_stored(&credential)],
                None => {
                    debug!(%did, "No passkey stored for DID, allowing any credential");
                    Vec::new()
                }
            };
        }

        self.ledger
            .list()
            .iter()
            .map(CredentialDescriptor::from_stored)
            .collect()
    }

    fn resolve_credential(&self, raw_id: &[u8]) -> Option<StoredCredential> {
        self.ledger
            .credential(&base64url_encode(raw_id))
            .or_else(|| {
                std::str::from_utf8(raw_id)
                    .ok()
                    .and_then(|credential_id| self.ledger.credential(credential_id))
            })
    }
}

async fn bounded<T>(
    kind: CeremonyKind,
    timeout: Duration,
    operation: impl Future<Output = Result<T, AuthenticatorError>>,
) -> Result<T, CeremonyError> {
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CeremonyError::coded(
            PasskeyErrorCode::Timeout,
            format!("Passkey {kind} timed out after {}ms", timeout.as_millis()),
        )),
    }
}

fn conclude<T>(mut ceremony: Ceremony, result: Result<T, CeremonyError>) -> CeremonyResult<T> {
    result.map_err(|error| {
        let error_code = error.code();
        let state = ceremony.fail(error_code);
        warn!(ceremony = %ceremony.kind(), %error_code, %error, "Passkey ceremony failed");
        CeremonyFailure {
            error: error.to_string(),
            error_code,
            state,
        }
    })
}

fn user_verification(required: bool) -> UserVerification {
    if required {
        UserVerification::Required
    } else {
        UserVerification::Preferred
    }
}

fn short_id(credential_id: &str) -> &str {
    credential_id.get(..16).unwrap_or(credential_id)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use erynoa_credentials::{PublicKey, Transport, generate_namespaced_did};
    use erynoa_storage::MemoryStore;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::{AssertionResponse, ChallengeError, ChallengeOptions, RegistrationResponse};

    const KEY: [u8; 32] = [0x42; 32];

    struct Scripted {
        support: PlatformSupport,
        registration: Result<RegistrationResponse, AuthenticatorError>,
        assertion: Result<AssertionResponse, AuthenticatorError>,
        hang: bool,
        last_creation: Mutex<Option<CreationOptions>>,
        last_request: Mutex<Option<RequestOptions>>,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                support: PlatformSupport {
                    webauthn_available: true,
                    ed25519_supported: true,
                    ..Default::default()
                },
                registration: Ok(RegistrationResponse {
                    credential_id: b"cred-1".to_vec(),
                    client_data_json: b"{}".to_vec(),
                    authenticator_data: None,
                    public_key: Some(KEY.to_vec()),
                    algorithm: CoseAlgorithm::EDDSA,
                    transports: vec![Transport::Internal],
                }),
                assertion: Ok(AssertionResponse {
                    credential_id: b"cred-1".to_vec(),
                    client_data_json: b"{}".to_vec(),
                    authenticator_data: vec![0; 37],
                    signature: vec![0xAB, 0xCD],
                    user_handle: None,
                }),
                hang: false,
                last_creation: Mutex::new(None),
                last_request: Mutex::new(None),
            }
        }
    }

    impl Authenticator for Scripted {
        async fn support(&self) -> PlatformSupport {
            self.support
        }

        async fn create(
            &self,
            options: CreationOptions,
        ) -> Result<RegistrationResponse, AuthenticatorError> {
            *self.last_creation.lock() = Some(options);
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.registration.clone()
        }

        async fn get(&self, options: RequestOptions) -> Result<AssertionResponse, AuthenticatorError> {
            *self.last_request.lock() = Some(options);
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.assertion.clone()
        }
    }

    struct ServerChallenge(Result<Challenge, ChallengeError>);

    #[async_trait]
    impl ChallengeSource for ServerChallenge {
        async fn fetch(&self) -> Result<Challenge, ChallengeError> {
            self.0.clone()
        }
    }

    fn orchestrator(authenticator: Scripted) -> PasskeyOrchestrator<Scripted, MemoryStore> {
        let ledger = Arc::new(CredentialLedger::new(MemoryStore::default()));
        PasskeyOrchestrator::new(authenticator, ledger, PasskeyConfig::default())
    }

    fn cred_1() -> String {
        base64url_encode(b"cred-1")
    }

    #[tokio::test]
    async fn it_registers_and_activates_the_first_credential() {
        let orchestrator = orchestrator(Scripted::new());

        let success = orchestrator
            .register(RegistrationOptions::default())
            .await
            .unwrap();

        let did = generate_namespaced_did(&KEY, Namespace::Personal);
        assert_eq!(success.identity.did, did);
        assert_eq!(success.credential.credential_id, cred_1());
        assert_eq!(success.credential.public_key, PublicKey::new(KEY.to_vec()));
        assert_eq!(success.credential.transports, Some(vec![Transport::Internal]));
        assert!(!success.credential.is_primary);
        assert_eq!(success.remote_registered, None);
        assert_eq!(orchestrator.ledger().active(), Some(did));

        let creation = orchestrator.authenticator().last_creation.lock().clone().unwrap();
        assert_eq!(creation.algorithms, vec![CoseAlgorithm::EDDSA, CoseAlgorithm::ES256]);
        assert_eq!(creation.user.id.len(), USER_HANDLE_LEN);
        assert_eq!(creation.user.display_name, "Erynoa User");
        assert!(creation.user.name.starts_with("erynoa-user-"));
        assert_eq!(creation.resident_key, ResidentKey::Required);
        assert_eq!(creation.attestation, Attestation::Direct);
        assert_eq!(creation.timeout, Duration::from_secs(120));
        assert_eq!(creation.challenge.len(), 32);
    }

    #[tokio::test]
    async fn it_keeps_the_active_did_unless_asked_to_switch() {
        let orchestrator = orchestrator(Scripted::new());
        let other = create_identity(&[1; 32], Namespace::Guild, CoseAlgorithm::EDDSA);
        orchestrator
            .ledger()
            .save_and_activate(StoredCredential::new("other", &other), Activation::Always)
            .unwrap();

        orchestrator
            .register(RegistrationOptions {
                namespace: Some(Namespace::Vault),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(orchestrator.ledger().active(), Some(other.did.clone()));

        let success = orchestrator
            .register(RegistrationOptions {
                namespace: Some(Namespace::Vault),
                set_primary: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(success.credential.is_primary);
        assert_eq!(orchestrator.ledger().active(), Some(success.identity.did));
    }

    #[tokio::test]
    async fn it_lets_server_options_override_defaults() {
        let mut challenge = Challenge::local(Duration::from_secs(300)).unwrap();
        challenge.options = Some(ChallengeOptions {
            rp_id: Some("erynoa.example".into()),
            timeout: Some(5_000),
            attestation: Some(Attestation::None),
            user_verification: Some(UserVerification::Required),
        });
        let orchestrator =
            orchestrator(Scripted::new()).with_challenge_source(ServerChallenge(Ok(challenge)));

        orchestrator
            .register(RegistrationOptions {
                force_ed25519: true,
                prefer_platform_authenticator: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let creation = orchestrator.authenticator().last_creation.lock().clone().unwrap();
        assert_eq!(creation.rp.id, "erynoa.example");
        assert_eq!(creation.timeout, Duration::from_secs(5));
        assert_eq!(creation.attestation, Attestation::None);
        assert_eq!(creation.user_verification, UserVerification::Required);
        assert_eq!(creation.algorithms, vec![CoseAlgorithm::EDDSA]);
        assert_eq!(creation.attachment, Some(AuthenticatorAttachment::Platform));
    }

    #[tokio::test]
    async fn it_falls_back_to_a_local_challenge() {
        let orchestrator = orchestrator(Scripted::new())
            .with_challenge_source(ServerChallenge(Err(ChallengeError::Status(503))));

        assert!(orchestrator.register(RegistrationOptions::default()).await.is_ok());
        let creation = orchestrator.authenticator().last_creation.lock().clone().unwrap();
        assert_eq!(creation.challenge.len(), 32);
    }

    #[tokio::test]
    async fn it_refuses_to_register_without_webauthn() {
        let mut authenticator = Scripted::new();
        authenticator.support.webauthn_available = false;
        let orchestrator = orchestrator(authenticator);

        let failure = orchestrator
            .register(RegistrationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(failure.error_code, PasskeyErrorCode::NotSupported);
        assert_eq!(failure.state, CeremonyState::Failed);
        assert!(orchestrator.ledger().list().is_empty());
    }

    #[tokio::test]
    async fn it_requires_ed25519_in_strict_mode() {
        let mut authenticator = Scripted::new();
        if let Ok(response) = &mut authenticator.registration {
            response.algorithm = CoseAlgorithm::ES256;
        }
        let orchestrator = orchestrator(authenticator);

        let failure = orchestrator
            .register(RegistrationOptions {
                force_ed25519: true,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(failure.error_code, PasskeyErrorCode::Ed25519NotSupported);

        // Without strict mode a non-EdDSA key is accepted
        assert!(orchestrator.register(RegistrationOptions::default()).await.is_ok());
    }

    #[tokio::test]
    async fn it_fails_without_any_public_key_material() {
        let mut authenticator = Scripted::new();
        if let Ok(response) = &mut authenticator.registration {
            response.public_key = None;
        }

        let failure = orchestrator(authenticator)
            .register(RegistrationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(failure.error_code, PasskeyErrorCode::Unknown);
    }

    #[tokio::test]
    async fn it_reports_an_abort_as_a_timeout() {
        let mut authenticator = Scripted::new();
        authenticator.registration = Err(AuthenticatorError::new(
            AuthenticatorError::ABORT,
            "The operation was aborted",
        ));

        let failure = orchestrator(authenticator)
            .register(RegistrationOptions::default())
            .await
            .unwrap_err();

        assert_eq!(failure.state, CeremonyState::TimedOut);
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({
                "success": false,
                "error": "AbortError: The operation was aborted",
                "error_code": "Timeout",
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn it_times_out_a_stalled_authenticator() {
        let mut authenticator = Scripted::new();
        authenticator.hang = true;

        let failure = orchestrator(authenticator)
            .authenticate(AuthenticationOptions {
                timeout: Some(Duration::from_secs(30)),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(failure.error_code, PasskeyErrorCode::Timeout);
        assert_eq!(failure.state, CeremonyState::TimedOut);
    }

    #[tokio::test]
    async fn it_touches_and_activates_on_authentication() {
        let orchestrator = orchestrator(Scripted::new());
        let registered = orchestrator
            .register(RegistrationOptions::default())
            .await
            .unwrap();
        orchestrator.ledger().clear_active().unwrap();

        let success = orchestrator
            .authenticate(AuthenticationOptions {
                require_user_verification: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(success.did.as_deref(), Some(registered.identity.did.as_str()));
        assert_eq!(success.credential_id, cred_1());
        assert_eq!(success.signature, vec![0xAB, 0xCD]);
        assert_eq!(orchestrator.ledger().active(), success.did);
        assert!(
            orchestrator
                .ledger()
                .credential(&cred_1())
                .unwrap()
                .last_used_at
                .is_some()
        );

        let request = orchestrator.authenticator().last_request.lock().clone().unwrap();
        assert_eq!(request.user_verification, UserVerification::Required);
        assert_eq!(request.allow_credentials.len(), 1);
        assert_eq!(request.allow_credentials[0].id, b"cred-1".to_vec());
    }

    #[tokio::test]
    async fn it_accepts_unknown_credentials_without_a_did() {
        let orchestrator = orchestrator(Scripted::new());

        let success = orchestrator
            .authenticate(AuthenticationOptions::default())
            .await
            .unwrap();

        assert_eq!(success.did, None);
        assert_eq!(orchestrator.ledger().active(), None);
        let request = orchestrator.authenticator().last_request.lock().clone().unwrap();
        assert!(request.allow_credentials.is_empty());
    }

    #[tokio::test]
    async fn it_offers_any_credential_for_an_unknown_did() {
        let orchestrator = orchestrator(Scripted::new());
        let registered = orchestrator
            .register(RegistrationOptions::default())
            .await
            .unwrap();
        orchestrator.ledger().clear_active().unwrap();

        let success = orchestrator
            .authenticate(AuthenticationOptions {
                did: Some("did:erynoa:self:0000000000000000".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let request = orchestrator.authenticator().last_request.lock().clone().unwrap();
        assert!(request.allow_credentials.is_empty());
        assert_eq!(success.did, Some(registered.identity.did.clone()));
        assert_eq!(orchestrator.ledger().active(), Some(registered.identity.did));
    }

    #[tokio::test]
    async fn it_signs_a_digest_of_the_message_by_default() {
        let orchestrator = orchestrator(Scripted::new());
        let registered = orchestrator
            .register(RegistrationOptions::default())
            .await
            .unwrap();

        let before = erynoa_common::now_millis();
        let success = orchestrator
            .sign(b"hello", SignOptions::default())
            .await
            .unwrap();
        let after = erynoa_common::now_millis();

        assert!(
            (before..=after).any(|millis| message_challenge(b"hello", millis) == success.challenge)
        );
        assert_eq!(success.challenge_base64url, base64url_encode(&success.challenge));
        assert_eq!(success.signature_hex, "abcd");
        assert_eq!(success.signature_base64url, "q80");
        assert_eq!(success.did, Some(registered.identity.did));
    }

    #[tokio::test]
    async fn it_signs_caller_supplied_challenges_verbatim() {
        let orchestrator = orchestrator(Scripted::new());

        let success = orchestrator
            .sign(
                b"ignored",
                SignOptions {
                    challenge: Some(vec![9, 9, 9]),
                    credential_id: Some(cred_1()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(success.challenge, vec![9, 9, 9]);
        let request = orchestrator.authenticator().last_request.lock().clone().unwrap();
        assert_eq!(request.challenge, vec![9, 9, 9]);
        assert_eq!(request.allow_credentials[0].id, b"cred-1".to_vec());
    }

    #[test]
    fn it_hashes_the_message_with_the_decimal_timestamp() {
        let expected: Vec<u8> = Sha256::digest(b"hello1700000000000").to_vec();
        assert_eq!(message_challenge(b"hello", 1_700_000_000_000), expected);
    }
}
