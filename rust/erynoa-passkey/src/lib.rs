#![warn(missing_docs)]

//! Passkey ceremonies that issue and use Erynoa identities.
//!
//! A [`PasskeyOrchestrator`] drives an [`Authenticator`] through
//! registration, authentication and signing. Registration derives a
//! `did:erynoa` identifier from the new credential's public key and records
//! it in a [`CredentialLedger`](erynoa_storage::CredentialLedger);
//! authentication makes a stored identity active. Every ceremony returns a
//! [`CeremonyResult`], with failures normalized to a [`PasskeyErrorCode`].
//!
//! [`PasskeyManager`] exposes the resulting state to UI consumers through
//! subscriptions.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use erynoa_passkey::{Authenticator, PasskeyConfig, PasskeyOrchestrator, RegistrationOptions};
//! # use erynoa_storage::MemoryStore;
//! # async fn example(authenticator: impl Authenticator) {
//! let config = PasskeyConfig::default();
//! let ledger = Arc::new(config.open_ledger(MemoryStore::default()));
//! let orchestrator = PasskeyOrchestrator::new(authenticator, ledger, config);
//!
//! match orchestrator.register(RegistrationOptions::default()).await {
//!     Ok(success) => println!("registered {}", success.identity.did),
//!     Err(failure) => println!("{}: {}", failure.error_code, failure.error),
//! }
//! # }
//! ```

mod authenticator;
pub use authenticator::*;

mod ceremony;
pub use ceremony::*;

mod challenge;
pub use challenge::*;

mod config;
pub use config::*;

mod error;
pub(crate) use error::CeremonyError;
pub use error::{AuthenticatorError, ChallengeError, PasskeyErrorCode};

mod http;

mod orchestrator;
pub use orchestrator::*;

mod remote;
pub use remote::*;

mod result;
pub use result::*;

mod state;
pub use state::*;

/// Test doubles for driving ceremonies without a platform authenticator.
#[cfg(feature = "helpers")]
pub mod helpers;
