use calimero_enclave_primitives::identity::EnclaveIdentity;
#[cfg(feature = "sgx-hw")]
use hkdf::Hkdf;
#[cfg(feature = "sgx-hw")]
use sha2::Sha256;
use tracing::warn;
#[cfg(feature = "sgx-hw")]
use zeroize::Zeroizing;

use crate::error::KeyDerivationError;
use crate::key::DerivedKey;
#[cfg(feature = "sgx-hw")]
use crate::key::KEY_SIZE;
use crate::request::KeyRequest;
use crate::KeyDeriver;

#[cfg(feature = "sgx-hw")]
const HARDWARE_KEY_LABEL: &[u8] = b"calimero-enclave-hw-key-v1";

/// Key derivation backed by the CPU's key hierarchy.
///
/// The 128-bit `EGETKEY` output is stretched to 256 bits with HKDF-SHA256,
/// salted with the request's key id.
///
/// Without the `sgx-hw` feature every request fails with
/// [`KeyDerivationError::Unavailable`].
#[derive(Clone, Copy, Debug)]
pub struct HardwareKeyDeriver {
    identity: EnclaveIdentity,
}

impl HardwareKeyDeriver {
    /// Reads the running enclave's identity from a self-report.
    #[cfg(feature = "sgx-hw")]
    #[must_use]
    pub fn new() -> Self {
        use calimero_enclave_primitives::identity::Measurement;

        let report = sgx_isa::Report::for_self();

        let identity = EnclaveIdentity::new(
            Measurement::new(report.mrenclave),
            Measurement::new(report.mrsigner),
            report.isvprodid,
            report.isvsvn,
        )
        .with_cpu_svn(report.cpusvn)
        .with_attributes(attributes_bytes(&report.attributes), report.miscselect.bits());

        Self { identity }
    }

    #[cfg(not(feature = "sgx-hw"))]
    #[must_use]
    pub fn new() -> Self {
        warn!("Built without `sgx-hw`: hardware key derivation is unavailable");

        Self {
            identity: EnclaveIdentity::default(),
        }
    }

    /// Whether hardware key derivation can succeed in this build.
    #[must_use]
    pub const fn is_available() -> bool {
        cfg!(feature = "sgx-hw")
    }
}

impl Default for HardwareKeyDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDeriver for HardwareKeyDeriver {
    fn identity(&self) -> EnclaveIdentity {
        self.identity
    }

    #[cfg(feature = "sgx-hw")]
    fn derive_key(&self, request: &KeyRequest) -> Result<DerivedKey, KeyDerivationError> {
        if request.isv_svn() > self.identity.isv_svn {
            return Err(KeyDerivationError::SvnTooHigh);
        }

        let hardware_key = Zeroizing::new(egetkey(request)?);

        let hkdf = Hkdf::<Sha256>::new(Some(&request.policy().key_id()[..]), &hardware_key[..]);

        let mut key = Zeroizing::new([0_u8; KEY_SIZE]);
        hkdf.expand(HARDWARE_KEY_LABEL, &mut key[..])
            .map_err(|_| KeyDerivationError::Platform("HKDF expansion failed".to_owned()))?;

        Ok(DerivedKey::new(*key))
    }

    #[cfg(not(feature = "sgx-hw"))]
    fn derive_key(&self, request: &KeyRequest) -> Result<DerivedKey, KeyDerivationError> {
        warn!(name=?request.name(), "Hardware key requested outside of an enclave");

        Err(KeyDerivationError::Unavailable)
    }

    fn is_simulation(&self) -> bool {
        false
    }
}

#[cfg(feature = "sgx-hw")]
fn egetkey(request: &KeyRequest) -> Result<[u8; 16], KeyDerivationError> {
    use sgx_isa::{Keyname, Keypolicy, Keyrequest};

    use crate::policy::KeyBinding;
    use crate::request::KeyName;

    let keyname = match request.name() {
        KeyName::Seal => Keyname::Seal,
        KeyName::Report => Keyname::Report,
    };

    let keypolicy = match request.policy().binding() {
        KeyBinding::Signer => Keypolicy::MRSIGNER,
        KeyBinding::Measurement => Keypolicy::MRENCLAVE,
    };

    let keyrequest = Keyrequest {
        keyname: keyname as u16,
        keypolicy,
        isvsvn: request.isv_svn(),
        cpusvn: *request.cpu_svn(),
        keyid: *request.policy().key_id(),
        attributemask: [!0; 2],
        ..Default::default()
    };

    keyrequest
        .egetkey()
        .map_err(|code| KeyDerivationError::Platform(format!("EGETKEY failed: {code:?}")))
}

#[cfg(feature = "sgx-hw")]
fn attributes_bytes(attributes: &sgx_isa::Attributes) -> [u8; 16] {
    let mut bytes = [0; 16];
    bytes[..8].copy_from_slice(&attributes.flags.bits().to_le_bytes());
    bytes[8..].copy_from_slice(&attributes.xfrm.to_le_bytes());
    bytes
}
