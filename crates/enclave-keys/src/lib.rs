//! Key derivation for sealing and reporting.
//!
//! A [`KeyDeriver`] turns a [`KeyRequest`] into a [`DerivedKey`] bound to the
//! identity of the running enclave. The [`SimulatedKeyDeriver`] derives keys
//! in software from a platform secret, the [`HardwareKeyDeriver`] asks the
//! CPU (`EGETKEY`) when built with the `sgx-hw` feature.

mod error;
mod hardware;
mod key;
mod policy;
mod request;
mod simulated;

use std::sync::Arc;

use calimero_enclave_primitives::identity::EnclaveIdentity;

pub use error::KeyDerivationError;
pub use hardware::HardwareKeyDeriver;
pub use key::{DerivedKey, KEY_SIZE};
pub use policy::{KeyBinding, KeyId, KeyPolicy, KEY_ID_SIZE};
pub use request::{KeyName, KeyRequest, KEY_REQUEST_SIZE};
pub use simulated::SimulatedKeyDeriver;

pub trait KeyDeriver: Send + Sync {
    /// The identity keys are bound to.
    fn identity(&self) -> EnclaveIdentity;

    fn derive_key(&self, request: &KeyRequest) -> Result<DerivedKey, KeyDerivationError>;

    fn is_simulation(&self) -> bool;
}

impl<T: KeyDeriver + ?Sized> KeyDeriver for Arc<T> {
    fn identity(&self) -> EnclaveIdentity {
        (**self).identity()
    }

    fn derive_key(&self, request: &KeyRequest) -> Result<DerivedKey, KeyDerivationError> {
        (**self).derive_key(request)
    }

    fn is_simulation(&self) -> bool {
        (**self).is_simulation()
    }
}
