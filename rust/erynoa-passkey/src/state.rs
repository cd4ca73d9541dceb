//! A publish/subscribe view of passkey state for UI consumers.
//!
//! [`PasskeyManager`] wraps an orchestrator and keeps a [`PasskeyState`]
//! snapshot in sync with the ledger. Every change is pushed to subscribers;
//! consumers never touch the ledger themselves.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use erynoa_credentials::StoredCredential;
use erynoa_storage::{KeyValueStore, LedgerError};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    AuthenticationOptions, AuthenticationSuccess, Authenticator, CeremonyResult, PasskeyErrorCode,
    PasskeyOrchestrator, PlatformSupport, RegistrationOptions, RegistrationSuccess, SignOptions,
    SignatureSuccess,
};

/// A snapshot of everything a consumer may render.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyState {
    /// `None` until support is known.
    pub support: Option<PlatformSupport>,
    /// Every stored credential, oldest first.
    pub credentials: Vec<StoredCredential>,
    /// The DID of the active identity.
    pub active_did: Option<String>,
    /// The credential bound to `active_did`.
    pub active_credential: Option<StoredCredential>,
    /// [`PasskeyManager::init`] has completed.
    pub initialized: bool,
    /// A ceremony or load is in flight.
    pub loading: bool,
    /// Message of the last failure.
    pub error: Option<String>,
    /// Code of the last failure.
    pub error_code: Option<PasskeyErrorCode>,
}

impl PasskeyState {
    /// An active DID backed by a stored credential.
    pub fn is_authenticated(&self) -> bool {
        self.active_did.is_some() && self.active_credential.is_some()
    }

    /// At least one credential is stored.
    pub fn has_registered(&self) -> bool {
        !self.credentials.is_empty()
    }

    /// Number of stored credentials.
    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }

    /// The first credential marked primary.
    pub fn primary_credential(&self) -> Option<&StoredCredential> {
        self.credentials.iter().find(|credential| credential.is_primary)
    }

    /// WebAuthn is available. `false` until support is known.
    pub fn is_available(&self) -> bool {
        self.support
            .is_some_and(|support| support.webauthn_available)
    }

    /// A built-in authenticator is available.
    pub fn has_platform_authenticator(&self) -> bool {
        self.support
            .is_some_and(|support| support.platform_authenticator_available)
    }

    /// Ed25519 credentials can be created.
    pub fn supports_ed25519(&self) -> bool {
        self.support
            .is_some_and(|support| support.ed25519_supported)
    }
}

/// Handle returned by [`PasskeyManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&PasskeyState) + Send + Sync>;

/// Owns the passkey state and notifies subscribers of every change.
pub struct PasskeyManager<A, S> {
    orchestrator: PasskeyOrchestrator<A, S>,
    state: RwLock<PasskeyState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
    initialized: OnceCell<()>,
}

impl<A, S> PasskeyManager<A, S>
where
    A: Authenticator,
    S: KeyValueStore,
{
    /// An uninitialized manager. Call [`init`](Self::init) to load state.
    pub fn new(orchestrator: PasskeyOrchestrator<A, S>) -> Self {
        Self {
            orchestrator,
            state: RwLock::new(PasskeyState::default()),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            initialized: OnceCell::new(),
        }
    }

    /// The orchestrator ceremonies run on.
    pub fn orchestrator(&self) -> &PasskeyOrchestrator<A, S> {
        &self.orchestrator
    }

    /// The current snapshot.
    pub fn state(&self) -> PasskeyState {
        self.state.read().clone()
    }

    /// Register `listener`. It is called right away with the current
    /// snapshot, then after every change.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PasskeyState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        self.listeners.lock().push((id, listener.clone()));
        listener(&self.state());
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .lock()
            .retain(|(subscription, _)| *subscription != id);
    }

    /// Query support and load the ledger. Does nothing once initialized;
    /// concurrent callers wait for the first one to finish.
    pub async fn init(&self) {
        if self.initialized.initialized() {
            debug!("Passkey state already initialized, skipping");
            return;
        }
        self.initialized
            .get_or_init(|| async {
                self.update(|state| {
                    state.loading = true;
                    state.error = None;
                    state.error_code = None;
                });

                let support = self.orchestrator.support().await;
                self.update(|state| {
                    state.support = Some(support);
                    self.load_ledger(state);
                    state.initialized = true;
                    state.loading = false;
                });
                debug!(
                    credentials = self.state.read().credentials.len(),
                    "Passkey state initialized"
                );
            })
            .await;
    }

    /// Run [`PasskeyOrchestrator::register`] and publish the outcome.
    pub async fn register(
        &self,
        options: RegistrationOptions,
    ) -> CeremonyResult<RegistrationSuccess> {
        self.begin();
        let result = self.orchestrator.register(options).await;
        self.settle(&result);
        result
    }

    /// Run [`PasskeyOrchestrator::authenticate`] and publish the outcome.
    pub async fn authenticate(
        &self,
        options: AuthenticationOptions,
    ) -> CeremonyResult<AuthenticationSuccess> {
        self.begin();
        let result = self.orchestrator.authenticate(options).await;
        self.settle(&result);
        result
    }

    /// Run [`PasskeyOrchestrator::sign`] and publish the outcome.
    pub async fn sign(
        &self,
        message: impl AsRef<[u8]>,
        options: SignOptions,
    ) -> CeremonyResult<SignatureSuccess> {
        self.begin();
        let result = self.orchestrator.sign(message, options).await;
        self.settle(&result);
        result
    }

    /// Switch the active identity to a stored DID.
    pub fn set_active_did(&self, did: &str) -> Result<(), LedgerError> {
        self.orchestrator.ledger().set_active(did)?;
        self.refresh();
        Ok(())
    }

    /// Log out: forget the active DID, keep the credentials.
    pub fn clear_active_did(&self) -> Result<(), LedgerError> {
        self.orchestrator.ledger().clear_active()?;
        self.update(|state| {
            state.active_did = None;
            state.active_credential = None;
        });
        Ok(())
    }

    /// Delete a credential and reload the state.
    pub fn delete_credential(&self, credential_id: &str) -> Result<(), LedgerError> {
        self.orchestrator.ledger().delete(credential_id)?;
        self.refresh();
        Ok(())
    }

    /// Erase the ledger and reset the state. The reset state stays
    /// initialized.
    pub fn clear_all(&self) -> Result<(), LedgerError> {
        self.orchestrator.ledger().clear_all()?;
        self.update(|state| {
            *state = PasskeyState {
                initialized: true,
                ..PasskeyState::default()
            };
        });
        Ok(())
    }

    /// Forget the last failure.
    pub fn clear_error(&self) {
        self.update(|state| {
            state.error = None;
            state.error_code = None;
        });
    }

    /// Query support again and publish the result.
    pub async fn refresh_support(&self) -> PlatformSupport {
        let support = self.orchestrator.detect_support().await;
        self.update(|state| state.support = Some(support));
        support
    }

    /// Reload credentials and the active DID from the ledger.
    pub fn refresh(&self) {
        self.update(|state| self.load_ledger(state));
    }

    fn begin(&self) {
        self.update(|state| {
            state.loading = true;
            state.error = None;
            state.error_code = None;
        });
    }

    fn settle<T>(&self, result: &CeremonyResult<T>) {
        self.update(|state| {
            match result {
                Ok(_) => self.load_ledger(state),
                Err(failure) => {
                    state.error = Some(failure.error.clone());
                    state.error_code = Some(failure.error_code);
                }
            }
            state.loading = false;
        });
    }

    fn load_ledger(&self, state: &mut PasskeyState) {
        let snapshot = self.orchestrator.ledger().snapshot();
        state.credentials = snapshot.credentials;
        state.active_did = snapshot.active.as_ref().map(|credential| credential.did.clone());
        state.active_credential = snapshot.active;
    }

    fn update(&self, change: impl FnOnce(&mut PasskeyState)) {
        let snapshot = {
            let mut state = self.state.write();
            change(&mut state);
            state.clone()
        };
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}
