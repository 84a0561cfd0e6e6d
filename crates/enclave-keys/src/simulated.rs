use core::fmt;

use calimero_enclave_primitives::identity::{EnclaveIdentity, Measurement};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::KeyDerivationError;
use crate::key::{DerivedKey, KEY_SIZE};
use crate::policy::{KeyBinding, KeyId, KEY_ID_SIZE};
use crate::request::{KeyName, KeyRequest};
use crate::KeyDeriver;

const PLATFORM_SECRET_SIZE: usize = 32;

const DEFAULT_PLATFORM_SEED: &[u8] = b"calimero-enclave-simulation-platform";

const KEY_LABEL: &[u8] = b"calimero-enclave-key-v1";

/// Software key derivation standing in for the CPU's key hierarchy.
///
/// Keys are derived with HKDF-SHA256 from a platform secret, salted with the
/// request's key id and bound to the selected measurement, product id and
/// security versions. Anyone holding the platform secret can derive every
/// key, so simulated sealing only protects against accidents, not attackers.
pub struct SimulatedKeyDeriver {
    identity: EnclaveIdentity,
    platform_secret: Zeroizing<[u8; PLATFORM_SECRET_SIZE]>,
}

impl fmt::Debug for SimulatedKeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedKeyDeriver")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl SimulatedKeyDeriver {
    /// Uses the well-known default platform secret, so keys are stable across
    /// processes and machines.
    #[must_use]
    pub fn new(identity: EnclaveIdentity) -> Self {
        Self::with_platform_secret(identity, Sha256::digest(DEFAULT_PLATFORM_SEED).into())
    }

    #[must_use]
    pub fn with_platform_secret(
        identity: EnclaveIdentity,
        platform_secret: [u8; PLATFORM_SECRET_SIZE],
    ) -> Self {
        Self {
            identity,
            platform_secret: Zeroizing::new(platform_secret),
        }
    }

    /// The report key of the enclave measured as `target`.
    ///
    /// Report keys ignore the key policy: they are always bound to the
    /// measurement of the enclave that will verify the report.
    pub fn report_key_for(&self, target: &Measurement) -> Result<DerivedKey, KeyDerivationError> {
        self.expand(KeyName::Report, &[0; KEY_ID_SIZE], |info| {
            info.extend_from_slice(target.as_bytes());
        })
    }

    fn seal_key(&self, request: &KeyRequest) -> Result<DerivedKey, KeyDerivationError> {
        let policy = request.policy();

        let bound_to = match policy.binding() {
            KeyBinding::Signer => &self.identity.mr_signer,
            KeyBinding::Measurement => &self.identity.mr_enclave,
        };

        self.expand(KeyName::Seal, policy.key_id(), |info| {
            info.extend_from_slice(&policy.binding().to_bits().to_le_bytes());
            info.extend_from_slice(bound_to.as_bytes());
            info.extend_from_slice(&self.identity.isv_prod_id.to_le_bytes());
            info.extend_from_slice(&request.isv_svn().to_le_bytes());
            info.extend_from_slice(request.cpu_svn());
        })
    }

    fn expand(
        &self,
        name: KeyName,
        key_id: &KeyId,
        bind: impl FnOnce(&mut Vec<u8>),
    ) -> Result<DerivedKey, KeyDerivationError> {
        let mut info = Vec::with_capacity(128);
        info.extend_from_slice(KEY_LABEL);
        info.extend_from_slice(&name.to_u16().to_le_bytes());
        bind(&mut info);

        let hkdf = Hkdf::<Sha256>::new(Some(&key_id[..]), &self.platform_secret[..]);

        let mut key = Zeroizing::new([0_u8; KEY_SIZE]);
        hkdf.expand(&info, &mut key[..])
            .map_err(|_| KeyDerivationError::Platform("HKDF expansion failed".to_owned()))?;

        Ok(DerivedKey::new(*key))
    }
}

impl KeyDeriver for SimulatedKeyDeriver {
    fn identity(&self) -> EnclaveIdentity {
        self.identity
    }

    fn derive_key(&self, request: &KeyRequest) -> Result<DerivedKey, KeyDerivationError> {
        if request.isv_svn() > self.identity.isv_svn || request.cpu_svn() > &self.identity.cpu_svn {
            return Err(KeyDerivationError::SvnTooHigh);
        }

        debug!(name=?request.name(), binding=?request.policy().binding(), "Deriving simulated key");

        match request.name() {
            KeyName::Seal => self.seal_key(request),
            KeyName::Report => self.report_key_for(&self.identity.mr_enclave),
        }
    }

    fn is_simulation(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use calimero_enclave_primitives::identity::Measurement;

    use super::*;
    use crate::policy::KeyPolicy;

    fn identity(mr_enclave: u8, mr_signer: u8) -> EnclaveIdentity {
        EnclaveIdentity::new(
            Measurement::new([mr_enclave; 32]),
            Measurement::new([mr_signer; 32]),
            1,
            5,
        )
    }

    fn seal_key(deriver: &SimulatedKeyDeriver, policy: KeyPolicy) -> [u8; KEY_SIZE] {
        let request = KeyRequest::seal(policy, &deriver.identity());
        *deriver.derive_key(&request).unwrap().as_bytes()
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let deriver = SimulatedKeyDeriver::new(identity(1, 2));

        assert_eq!(
            seal_key(&deriver, KeyPolicy::signer()),
            seal_key(&deriver, KeyPolicy::signer())
        );
    }

    #[test]
    fn test_signer_binding_survives_new_measurement() {
        let v1 = SimulatedKeyDeriver::new(identity(1, 2));
        let v2 = SimulatedKeyDeriver::new(identity(3, 2));

        assert_eq!(
            seal_key(&v1, KeyPolicy::signer()),
            seal_key(&v2, KeyPolicy::signer())
        );
        assert_ne!(
            seal_key(&v1, KeyPolicy::measurement()),
            seal_key(&v2, KeyPolicy::measurement())
        );
    }

    #[test]
    fn test_key_id_and_binding_separate_keys() {
        let deriver = SimulatedKeyDeriver::new(identity(1, 2));

        let signer = seal_key(&deriver, KeyPolicy::signer());
        let measurement = seal_key(&deriver, KeyPolicy::measurement());
        let salted = seal_key(&deriver, KeyPolicy::signer().with_key_id([9; KEY_ID_SIZE]));

        assert_ne!(signer, measurement);
        assert_ne!(signer, salted);
    }

    #[test]
    fn test_platform_secret_separates_keys() {
        let default = SimulatedKeyDeriver::new(identity(1, 2));
        let other = SimulatedKeyDeriver::with_platform_secret(identity(1, 2), [7; 32]);

        assert_ne!(
            seal_key(&default, KeyPolicy::signer()),
            seal_key(&other, KeyPolicy::signer())
        );
    }

    #[test]
    fn test_svn_above_platform_rejected() {
        let deriver = SimulatedKeyDeriver::new(identity(1, 2));
        let request = KeyRequest::new(KeyName::Seal, KeyPolicy::signer(), 6, [0; 16]);

        assert_eq!(
            deriver.derive_key(&request).unwrap_err(),
            KeyDerivationError::SvnTooHigh
        );
    }

    #[test]
    fn test_older_svn_still_derivable() {
        let deriver = SimulatedKeyDeriver::new(identity(1, 2));
        let request = KeyRequest::new(KeyName::Seal, KeyPolicy::signer(), 4, [0; 16]);

        assert!(deriver.derive_key(&request).is_ok());
    }

    #[test]
    fn test_report_key_matches_target_view() {
        let issuer = SimulatedKeyDeriver::new(identity(1, 2));
        let target = SimulatedKeyDeriver::new(identity(3, 4));

        let issued = issuer
            .report_key_for(&target.identity().mr_enclave)
            .unwrap();
        let own = target
            .derive_key(&KeyRequest::report(&target.identity()))
            .unwrap();

        assert_eq!(issued.as_bytes(), own.as_bytes());
    }
}
