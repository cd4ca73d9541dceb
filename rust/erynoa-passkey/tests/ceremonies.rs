use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use erynoa_common::base64url_encode;
use erynoa_credentials::{Namespace, StoredCredential, generate_namespaced_did};
use erynoa_passkey::{
    AssertionResponse, AuthenticationOptions, AuthenticatorError, CeremonyState, PasskeyConfig,
    PasskeyErrorCode, PasskeyOrchestrator, RegistrationOptions, RemoteRegistry, SignOptions,
    helpers::{VIRTUAL_AAGUID, VirtualAuthenticator},
    message_challenge,
};
use erynoa_storage::{CredentialLedger, FileSystemStore, MemoryStore};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};
use testresult::TestResult;

type Orchestrator<S> = PasskeyOrchestrator<VirtualAuthenticator, S>;

fn in_memory(authenticator: &VirtualAuthenticator) -> Orchestrator<MemoryStore> {
    let config = PasskeyConfig::default();
    let ledger = Arc::new(config.open_ledger(MemoryStore::default()));
    PasskeyOrchestrator::new(authenticator.clone(), ledger, config)
}

/// Records what it is asked and refuses everything.
#[derive(Clone, Default)]
struct RecordingRegistry {
    accept: bool,
    registered: Arc<Mutex<Vec<String>>>,
    verified: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait]
impl RemoteRegistry for RecordingRegistry {
    async fn register(&self, credential: &StoredCredential) -> bool {
        self.registered.lock().push(credential.did.clone());
        self.accept
    }

    async fn verify(&self, assertion: &AssertionResponse) -> bool {
        self.verified.lock().push(assertion.credential_id.clone());
        self.accept
    }
}

#[tokio::test]
async fn it_registers_an_ed25519_passkey_as_a_namespaced_did() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    let orchestrator = in_memory(&authenticator);

    let success = orchestrator
        .register(RegistrationOptions {
            namespace: Some(Namespace::Guild),
            display_name: Some("Laptop".into()),
            ..Default::default()
        })
        .await?;

    let raw_id = authenticator.credential_ids().remove(0);
    let public_key = authenticator.public_key(&raw_id).ok_or("missing key")?;
    assert_eq!(
        success.identity.did,
        generate_namespaced_did(&public_key, Namespace::Guild)
    );
    assert_eq!(success.credential.credential_id, base64url_encode(&raw_id));
    assert_eq!(success.credential.display_name.as_deref(), Some("Laptop"));
    assert_eq!(
        success.credential.aaguid.as_deref(),
        Some(erynoa_common::hex_encode(&VIRTUAL_AAGUID).as_str())
    );
    assert!(success.identity.key_did()?.starts_with("did:key:z6Mk"));

    let ledger = orchestrator.ledger();
    assert_eq!(ledger.list(), vec![success.credential.clone()]);
    assert_eq!(ledger.active(), Some(success.identity.did.clone()));
    assert!(ledger.public_key_backup(&success.identity.did).is_some());
    Ok(())
}

#[tokio::test]
async fn it_reads_the_key_from_authenticator_data_when_none_is_reported() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    authenticator.omit_public_key(true);
    let orchestrator = in_memory(&authenticator);

    let success = orchestrator.register(RegistrationOptions::default()).await?;

    let raw_id = authenticator.credential_ids().remove(0);
    let public_key = authenticator.public_key(&raw_id).ok_or("missing key")?;
    assert_eq!(success.identity.public_key_bytes, public_key.to_vec());
    assert_eq!(
        success.identity.did,
        generate_namespaced_did(&public_key, Namespace::Personal)
    );
    Ok(())
}

#[tokio::test]
async fn it_authenticates_and_switches_the_active_identity() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    let orchestrator = in_memory(&authenticator);

    let first = orchestrator
        .register(RegistrationOptions {
            namespace: Some(Namespace::Personal),
            ..Default::default()
        })
        .await?;
    let second = orchestrator
        .register(RegistrationOptions {
            namespace: Some(Namespace::Vault),
            ..Default::default()
        })
        .await?;
    assert_eq!(orchestrator.ledger().active(), Some(first.identity.did.clone()));

    let success = orchestrator
        .authenticate(AuthenticationOptions {
            did: Some(second.identity.did.clone()),
            ..Default::default()
        })
        .await?;

    assert_eq!(success.did, Some(second.identity.did.clone()));
    assert_eq!(success.credential_id, second.credential.credential_id);
    assert_eq!(orchestrator.ledger().active(), Some(second.identity.did.clone()));

    let touched = orchestrator
        .ledger()
        .credential(&second.credential.credential_id)
        .ok_or("missing credential")?;
    assert!(touched.last_used_at.is_some());
    let last = orchestrator
        .ledger()
        .last_authentication()
        .ok_or("missing marker")?;
    assert_eq!(last.did, second.identity.did);

    let request = authenticator.last_request().ok_or("no request")?;
    assert_eq!(request.allow_credentials.len(), 1);
    Ok(())
}

#[tokio::test]
async fn it_offers_every_stored_credential_by_default() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    let orchestrator = in_memory(&authenticator);
    for _ in 0..3 {
        orchestrator.register(RegistrationOptions::default()).await?;
    }

    orchestrator
        .authenticate(AuthenticationOptions::default())
        .await?;

    let request = authenticator.last_request().ok_or("no request")?;
    assert_eq!(request.allow_credentials.len(), 3);
    Ok(())
}

#[tokio::test]
async fn it_produces_verifiable_signatures() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    let orchestrator = in_memory(&authenticator);
    let registered = orchestrator.register(RegistrationOptions::default()).await?;

    let before = erynoa_common::now_millis();
    let signed = orchestrator
        .sign(
            "transfer 10 tokens",
            SignOptions {
                did: Some(registered.identity.did.clone()),
                ..Default::default()
            },
        )
        .await?;
    let after = erynoa_common::now_millis();

    assert!(
        (before..=after)
            .any(|millis| message_challenge(b"transfer 10 tokens", millis) == signed.challenge)
    );
    assert_eq!(signed.did, Some(registered.identity.did.clone()));
    assert_eq!(signed.signature_hex, erynoa_common::hex_encode(&signed.signature_bytes));

    let key = VerifyingKey::from_bytes(&registered.identity.public_key_bytes[..].try_into()?)?;
    let mut message = signed.assertion.authenticator_data.clone();
    message.extend_from_slice(&Sha256::digest(&signed.assertion.client_data_json));
    key.verify(&message, &Signature::from_slice(&signed.signature_bytes)?)?;

    let client_data: serde_json::Value = serde_json::from_slice(&signed.assertion.client_data_json)?;
    assert_eq!(client_data["challenge"], signed.challenge_base64url.as_str());
    Ok(())
}

#[tokio::test]
async fn it_reports_an_aborted_ceremony_as_a_timeout() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    authenticator.fail_next(AuthenticatorError::new(
        AuthenticatorError::ABORT,
        "The operation either timed out or was not allowed",
    ));
    let orchestrator = in_memory(&authenticator);

    let failure = orchestrator
        .register(RegistrationOptions::default())
        .await
        .err()
        .ok_or("registration should fail")?;

    let reported = serde_json::to_value(&failure)?;
    assert_eq!(reported["success"], false);
    assert_eq!(reported["error_code"], "Timeout");
    assert_eq!(failure.state, CeremonyState::TimedOut);
    assert!(orchestrator.ledger().list().is_empty());
    Ok(())
}

#[tokio::test]
async fn it_maps_a_declined_prompt_to_user_cancelled() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    let orchestrator = in_memory(&authenticator);
    orchestrator.register(RegistrationOptions::default()).await?;
    authenticator.fail_next(AuthenticatorError::new(
        AuthenticatorError::NOT_ALLOWED,
        "The user declined",
    ));

    let failure = orchestrator
        .authenticate(AuthenticationOptions::default())
        .await
        .err()
        .ok_or("authentication should fail")?;

    assert_eq!(failure.error_code, PasskeyErrorCode::UserCancelled);
    assert_eq!(failure.state, CeremonyState::Cancelled);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn it_bounds_the_ceremony_by_its_timeout() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    authenticator.set_delay(Some(Duration::from_secs(600)));
    let orchestrator = in_memory(&authenticator);

    let failure = orchestrator
        .register(RegistrationOptions {
            timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        })
        .await
        .err()
        .ok_or("registration should time out")?;

    assert_eq!(failure.error_code, PasskeyErrorCode::Timeout);
    assert!(orchestrator.ledger().list().is_empty());
    Ok(())
}

#[tokio::test]
async fn it_keeps_local_registrations_when_the_backend_refuses_them() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    let registry = RecordingRegistry::default();
    let orchestrator = in_memory(&authenticator).with_remote_registry(registry.clone());

    let success = orchestrator
        .register(RegistrationOptions {
            sync_remote: true,
            ..Default::default()
        })
        .await?;
    assert_eq!(success.remote_registered, Some(false));
    assert_eq!(*registry.registered.lock(), vec![success.identity.did.clone()]);
    assert_eq!(orchestrator.ledger().list().len(), 1);

    let authenticated = orchestrator
        .authenticate(AuthenticationOptions {
            verify_remote: true,
            ..Default::default()
        })
        .await?;
    assert_eq!(authenticated.remote_verified, Some(false));
    assert_eq!(registry.verified.lock().len(), 1);
    Ok(())
}

#[tokio::test]
async fn it_falls_back_to_local_challenges_without_a_backend() -> TestResult {
    let authenticator = VirtualAuthenticator::new();
    let config = PasskeyConfig {
        api_base_url: "http://127.0.0.1:9/api/v1/auth".into(),
        request_timeout_secs: 2,
        ..Default::default()
    };
    let ledger = Arc::new(config.open_ledger(MemoryStore::default()));
    let orchestrator = PasskeyOrchestrator::connected(authenticator.clone(), ledger, config)?;

    let success = orchestrator
        .register(RegistrationOptions {
            sync_remote: true,
            ..Default::default()
        })
        .await?;

    assert_eq!(success.remote_registered, Some(false));
    let creation = authenticator.last_creation().ok_or("no creation")?;
    assert_eq!(creation.challenge.len(), 32);
    Ok(())
}

#[tokio::test]
async fn it_persists_identities_across_restarts() -> TestResult {
    let root = tempfile::tempdir()?;
    let authenticator = VirtualAuthenticator::new();
    let config = PasskeyConfig {
        storage_prefix: Some("profile".into()),
        ..Default::default()
    };

    let registered = {
        let ledger = Arc::new(config.open_ledger(FileSystemStore::new(root.path())?));
        let orchestrator =
            PasskeyOrchestrator::new(authenticator.clone(), ledger, config.clone());
        orchestrator.register(RegistrationOptions::default()).await?
    };

    let ledger: Arc<CredentialLedger<FileSystemStore>> =
        Arc::new(config.open_ledger(FileSystemStore::new(root.path())?));
    let orchestrator = PasskeyOrchestrator::new(authenticator, ledger, config);
    assert_eq!(orchestrator.ledger().active(), Some(registered.identity.did.clone()));

    let success = orchestrator
        .authenticate(AuthenticationOptions::default())
        .await?;
    assert_eq!(success.did, Some(registered.identity.did));
    Ok(())
}
