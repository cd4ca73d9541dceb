use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use erynoa_credentials::StoredCredential;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{
    KeyValueStore, LastAuthentication, LedgerError, PublicKeyBackup, StorageError, StorageKeys,
};

/// Whether [`CredentialLedger::save_and_activate`] moves the active pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    /// Leave the active pointer as it is.
    #[default]
    Keep,
    /// Make the saved credential active only if no identity is active.
    IfNone,
    /// Make the saved credential active.
    Always,
}

/// The credential list and the active credential, read together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerSnapshot {
    /// Every stored credential, in insertion order.
    pub credentials: Vec<StoredCredential>,
    /// The credential the active DID points to.
    pub active: Option<StoredCredential>,
}

/// The local record of registered passkeys and which one is active.
///
/// Every public operation runs inside one critical section, so a concurrent
/// caller never observes a credential list and active pointer that disagree.
/// Reads degrade: a missing, unreadable or corrupt entry reads as empty and
/// is reported with a warning. Writes propagate their errors; an operation
/// that touches several keys either lands completely or leaves every key as
/// it was.
pub struct CredentialLedger<S> {
    store: S,
    keys: StorageKeys,
    lock: Mutex<()>,
}

impl<S> CredentialLedger<S>
where
    S: KeyValueStore,
{
    /// A ledger over `store` using the default, unprefixed keys.
    pub fn new(store: S) -> Self {
        Self::with_keys(store, StorageKeys::default())
    }

    /// A ledger over `store` using `keys`.
    pub fn with_keys(store: S, keys: StorageKeys) -> Self {
        Self {
            store,
            keys,
            lock: Mutex::new(()),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The keys this ledger occupies.
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Every stored credential, in insertion order.
    pub fn list(&self) -> Vec<StoredCredential> {
        let _guard = self.lock.lock();
        self.read_credentials()
    }

    /// The credential list and active credential from one critical section.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let _guard = self.lock.lock();
        let active = self.resolve_active();
        LedgerSnapshot {
            credentials: self.read_credentials(),
            active,
        }
    }

    /// The credential with `credential_id`.
    pub fn credential(&self, credential_id: &str) -> Option<StoredCredential> {
        let _guard = self.lock.lock();
        self.read_credentials()
            .into_iter()
            .find(|credential| credential.credential_id == credential_id)
    }

    /// The first credential bound to `did`.
    pub fn credential_for(&self, did: &str) -> Option<StoredCredential> {
        let _guard = self.lock.lock();
        self.read_credentials()
            .into_iter()
            .find(|credential| credential.did == did)
    }

    /// Insert `credential`, or replace the stored one with the same id.
    pub fn save(&self, credential: StoredCredential) -> Result<(), LedgerError> {
        self.save_and_activate(credential, Activation::Keep)
    }

    /// [`save`](Self::save), then move the active pointer to the
    /// credential's DID as `activation` says. The decision and the writes
    /// happen in one critical section.
    pub fn save_and_activate(
        &self,
        credential: StoredCredential,
        activation: Activation,
    ) -> Result<(), LedgerError> {
        let _guard = self.lock.lock();

        let mut credentials = self.read_credentials();
        match credentials
            .iter_mut()
            .find(|stored| stored.credential_id == credential.credential_id)
        {
            Some(stored) => *stored = credential.clone(),
            None => credentials.push(credential.clone()),
        }

        let mut backups = self.read_public_keys();
        backups.insert(credential.did.clone(), PublicKeyBackup::from(&credential));

        let activate = match activation {
            Activation::Keep => false,
            Activation::IfNone => self.resolve_active().is_none(),
            Activation::Always => true,
        };

        let mut writes = vec![
            (self.keys.credentials.as_str(), Some(encode(&credentials)?)),
            (self.keys.public_keys.as_str(), Some(encode(&backups)?)),
        ];
        if activate {
            writes.push((self.keys.active_did.as_str(), Some(credential.did)));
        }
        self.commit(&writes)
    }

    /// Remove the credential with `credential_id`. If its DID is the active
    /// one, the pointer is cleared as part of the same operation. Unknown ids
    /// are ignored.
    pub fn delete(&self, credential_id: &str) -> Result<(), LedgerError> {
        let _guard = self.lock.lock();

        let mut credentials = self.read_credentials();
        let Some(position) = credentials
            .iter()
            .position(|credential| credential.credential_id == credential_id)
        else {
            return Ok(());
        };
        let removed = credentials.remove(position);
        let mut writes = vec![(self.keys.credentials.as_str(), Some(encode(&credentials)?))];

        if !credentials.iter().any(|credential| credential.did == removed.did) {
            let mut backups = self.read_public_keys();
            if backups.remove(&removed.did).is_some() {
                writes.push((self.keys.public_keys.as_str(), Some(encode(&backups)?)));
            }
        }

        if self.read_active().as_deref() == Some(removed.did.as_str()) {
            writes.push((self.keys.active_did.as_str(), None));
        }
        self.commit(&writes)
    }

    /// Remove every key the ledger occupies.
    pub fn clear_all(&self) -> Result<(), LedgerError> {
        let _guard = self.lock.lock();
        let writes: Vec<(&str, Option<String>)> =
            self.keys.all().into_iter().map(|key| (key, None)).collect();
        self.commit(&writes)
    }

    /// Point the active identity at `did`, which must belong to a stored
    /// credential.
    pub fn set_active(&self, did: &str) -> Result<(), LedgerError> {
        let _guard = self.lock.lock();
        if !self
            .read_credentials()
            .iter()
            .any(|credential| credential.did == did)
        {
            return Err(LedgerError::UnknownDid(did.to_string()));
        }
        self.store.set(&self.keys.active_did, did)?;
        Ok(())
    }

    /// The active DID. A pointer that no longer matches a stored credential
    /// is cleared and reads as `None`.
    pub fn active(&self) -> Option<String> {
        let _guard = self.lock.lock();
        self.resolve_active()
            .map(|credential| credential.did)
    }

    /// The credential the active DID points to.
    pub fn active_credential(&self) -> Option<StoredCredential> {
        let _guard = self.lock.lock();
        self.resolve_active()
    }

    /// Forget the active DID.
    pub fn clear_active(&self) -> Result<(), LedgerError> {
        let _guard = self.lock.lock();
        self.store.remove(&self.keys.active_did)?;
        Ok(())
    }

    /// Record a successful authentication with `credential_id` at `at`:
    /// stamp `last_used_at`, make its DID active and update the
    /// last-authentication marker.
    pub fn touch(
        &self,
        credential_id: &str,
        at: DateTime<Utc>,
    ) -> Result<StoredCredential, LedgerError> {
        let _guard = self.lock.lock();

        let mut credentials = self.read_credentials();
        let credential = credentials
            .iter_mut()
            .find(|credential| credential.credential_id == credential_id)
            .ok_or_else(|| LedgerError::UnknownCredential(credential_id.to_string()))?;
        credential.last_used_at = Some(at);
        let touched = credential.clone();
        let marker = LastAuthentication {
            credential_id: touched.credential_id.clone(),
            did: touched.did.clone(),
            at,
        };

        self.commit(&[
            (self.keys.credentials.as_str(), Some(encode(&credentials)?)),
            (self.keys.active_did.as_str(), Some(touched.did.clone())),
            (self.keys.last_auth.as_str(), Some(encode(&marker)?)),
        ])?;
        Ok(touched)
    }

    /// Set or clear the human-readable label of a credential.
    pub fn rename(
        &self,
        credential_id: &str,
        display_name: Option<String>,
    ) -> Result<StoredCredential, LedgerError> {
        let _guard = self.lock.lock();

        let mut credentials = self.read_credentials();
        let credential = credentials
            .iter_mut()
            .find(|credential| credential.credential_id == credential_id)
            .ok_or_else(|| LedgerError::UnknownCredential(credential_id.to_string()))?;
        credential.display_name = display_name;
        let renamed = credential.clone();
        self.store
            .set(&self.keys.credentials, &encode(&credentials)?)?;
        Ok(renamed)
    }

    /// The backed-up public key for `did`.
    pub fn public_key_backup(&self, did: &str) -> Option<PublicKeyBackup> {
        let _guard = self.lock.lock();
        self.read_public_keys().remove(did)
    }

    /// The most recent successful authentication.
    pub fn last_authentication(&self) -> Option<LastAuthentication> {
        let _guard = self.lock.lock();
        self.read_json(&self.keys.last_auth)
    }

    fn resolve_active(&self) -> Option<StoredCredential> {
        let did = self.read_active()?;
        let credential = self
            .read_credentials()
            .into_iter()
            .find(|credential| credential.did == did);

        if credential.is_none() {
            warn!(%did, "Clearing active DID with no stored credential");
            if let Err(error) = self.store.remove(&self.keys.active_did) {
                warn!(%error, "Failed to clear stale active DID");
            }
        }
        credential
    }

    fn read_active(&self) -> Option<String> {
        match self.store.get(&self.keys.active_did) {
            Ok(did) => did.filter(|did| !did.is_empty()),
            Err(error) => {
                warn!(%error, "Failed to read active DID");
                None
            }
        }
    }

    fn read_credentials(&self) -> Vec<StoredCredential> {
        self.read_json(&self.keys.credentials).unwrap_or_default()
    }

    fn read_public_keys(&self) -> BTreeMap<String, PublicKeyBackup> {
        self.read_json(&self.keys.public_keys).unwrap_or_default()
    }

    fn read_json<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(error) => {
                warn!(key, %error, "Failed to read ledger entry");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, %error, "Ignoring corrupt ledger entry");
                None
            }
        }
    }

    /// Apply `writes` in order, `None` meaning removal. If one fails, the
    /// keys already written are put back to what they held before and the
    /// failure is returned.
    fn commit(&self, writes: &[(&str, Option<String>)]) -> Result<(), LedgerError> {
        let previous = writes
            .iter()
            .map(|(key, _)| self.store.get(key))
            .collect::<Result<Vec<_>, _>>()?;

        for (applied, (key, value)) in writes.iter().enumerate() {
            if let Err(error) = self.apply(key, value.as_deref()) {
                for ((key, _), value) in writes[..applied].iter().zip(&previous[..applied]).rev() {
                    if let Err(error) = self.apply(key, value.as_deref()) {
                        warn!(key, %error, "Failed to restore ledger entry");
                    }
                }
                return Err(error.into());
            }
        }
        Ok(())
    }

    fn apply(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        match value {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        }
    }
}

fn encode<T>(value: &T) -> Result<String, LedgerError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string(value).map_err(|error| LedgerError::EncodeFailed(format!("{error}")))
}
