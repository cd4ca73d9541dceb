use std::sync::Arc;

use erynoa_common::{ConditionalSend, ConditionalSync};

use crate::StorageError;

mod memory;
pub use memory::*;

#[cfg(not(target_arch = "wasm32"))]
mod fs;
#[cfg(not(target_arch = "wasm32"))]
pub use fs::*;

/// A [KeyValueStore] is a facade over some string-keyed storage substrate,
/// such as browser local storage or a directory on disk.
///
/// Calls are synchronous and expected to complete without blocking on the
/// network. Implementations use interior mutability so a store can be shared
/// behind an [`Arc`].
pub trait KeyValueStore: ConditionalSend + ConditionalSync {
    /// Retrieve the value (if any) stored against `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` against `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored against `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T> KeyValueStore for Arc<T>
where
    T: KeyValueStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.as_ref().get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.as_ref().set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.as_ref().remove(key)
    }
}
