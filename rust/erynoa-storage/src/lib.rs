#![warn(missing_docs)]

//! Durable storage for passkey credentials.
//!
//! [`KeyValueStore`] is the substrate: a synchronous string-to-string map
//! such as browser local storage or a directory of files. The
//! [`CredentialLedger`] builds the credential list, the active identity
//! pointer, the public-key backup and the last-authentication marker on top
//! of four fixed keys in that store.

mod backend;
pub use backend::*;

mod error;
pub use error::*;

mod keys;
pub use keys::*;

mod ledger;
pub use ledger::*;

mod records;
pub use records::*;
