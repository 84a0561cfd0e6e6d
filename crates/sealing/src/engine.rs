use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use calimero_enclave_keys::{
    DerivedKey, HardwareKeyDeriver, KeyDerivationError, KeyDeriver, KeyName, KeyPolicy, KeyRequest,
    SimulatedKeyDeriver,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::blob::{SealedBlob, SealedHeader, KEY_CHECK_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{SealError, UnsealError};
use crate::size::calc_sealed_blob_size;

const KEY_CHECK_LABEL: &[u8] = b"calimero-sealing-key-check";

pub trait Sealer: Send + Sync {
    fn seal(
        &self,
        plaintext: &[u8],
        authenticated_data: &[u8],
        policy: &KeyPolicy,
    ) -> Result<SealedBlob, SealError>;

    fn unseal(&self, blob: &[u8], policy: &KeyPolicy) -> Result<Unsealed, UnsealError>;

    fn is_simulation(&self) -> bool;
}

/// The recovered contents of a sealed blob.
#[derive(Clone, PartialEq, Eq)]
pub struct Unsealed {
    plaintext: Vec<u8>,
    authenticated_data: Vec<u8>,
}

impl Unsealed {
    #[must_use]
    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }

    #[must_use]
    pub fn authenticated_data(&self) -> &[u8] {
        &self.authenticated_data
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.plaintext, self.authenticated_data)
    }
}

impl core::fmt::Debug for Unsealed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Unsealed")
            .field("plaintext_len", &self.plaintext.len())
            .field("authenticated_data_len", &self.authenticated_data.len())
            .finish()
    }
}

/// AES-256-GCM sealing under keys from a [`KeyDeriver`].
///
/// Holds no state besides the deriver: every call derives its own key and
/// drops it (zeroized) before returning.
#[derive(Debug)]
pub struct SealingEngine<K> {
    deriver: K,
}

pub type SimulatedSealer = SealingEngine<SimulatedKeyDeriver>;

pub type HardwareSealer = SealingEngine<HardwareKeyDeriver>;

impl<K: KeyDeriver> SealingEngine<K> {
    pub const fn new(deriver: K) -> Self {
        Self { deriver }
    }

    pub const fn deriver(&self) -> &K {
        &self.deriver
    }

    fn unseal_with_header(
        &self,
        blob: &[u8],
        header: &SealedHeader,
        policy: &KeyPolicy,
    ) -> Result<Unsealed, UnsealError> {
        if header.policy() != policy {
            return Err(UnsealError::KeyMismatch);
        }

        let request = KeyRequest::new(KeyName::Seal, *policy, header.isv_svn, header.cpu_svn);

        let key = self.deriver.derive_key(&request).map_err(|err| match err {
            KeyDerivationError::SvnTooHigh => UnsealError::KeyMismatch,
            err => UnsealError::KeyUnavailable(err),
        })?;

        let key_check = key_check(&key).map_err(UnsealError::KeyUnavailable)?;

        if !bool::from(key_check[..].ct_eq(&header.key_check[..])) {
            debug!("Key check value differs, blob belongs to another enclave identity");
            return Err(UnsealError::KeyMismatch);
        }

        let cipher = cipher(&key);

        let authenticated_data = &blob[header.aad_range()];
        let nonce = Nonce::from_slice(&blob[header.nonce_range()]);
        let tag = Tag::from_slice(&blob[header.tag_range()]);

        let mut associated = Vec::with_capacity(header.aad_range().end);
        associated.extend_from_slice(&blob[..header.aad_range().end]);

        let mut scratch = Zeroizing::new(blob[header.ciphertext_range()].to_vec());

        if cipher
            .decrypt_in_place_detached(nonce, &associated, &mut scratch[..], tag)
            .is_err()
        {
            warn!(
                len = blob.len(),
                "Sealed blob failed authentication, refusing to unseal"
            );
            return Err(UnsealError::TagMismatch);
        }

        Ok(Unsealed {
            plaintext: core::mem::take(&mut *scratch),
            authenticated_data: authenticated_data.to_vec(),
        })
    }
}

impl<K: KeyDeriver> Sealer for SealingEngine<K> {
    fn seal(
        &self,
        plaintext: &[u8],
        authenticated_data: &[u8],
        policy: &KeyPolicy,
    ) -> Result<SealedBlob, SealError> {
        let plaintext_len = u32::try_from(plaintext.len()).map_err(|_| SealError::PayloadTooLarge)?;
        let aad_len =
            u32::try_from(authenticated_data.len()).map_err(|_| SealError::PayloadTooLarge)?;

        let total = usize::try_from(calc_sealed_blob_size(plaintext_len, aad_len))
            .map_err(|_| SealError::PayloadTooLarge)?;

        let identity = self.deriver.identity();
        let request = KeyRequest::seal(*policy, &identity);

        let key = self.deriver.derive_key(&request)?;

        let header = SealedHeader {
            policy: *policy,
            isv_svn: request.isv_svn(),
            cpu_svn: *request.cpu_svn(),
            key_check: key_check(&key)?,
            aad_len,
            ciphertext_len: plaintext_len,
        };

        let mut nonce = [0_u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut blob = Vec::with_capacity(total);
        blob.extend_from_slice(&header.to_bytes());
        blob.extend_from_slice(authenticated_data);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&[0; TAG_SIZE]);
        blob.extend_from_slice(plaintext);

        let (associated, rest) = blob.split_at_mut(header.aad_range().end);
        let (_nonce_and_tag, ciphertext) = rest.split_at_mut(NONCE_SIZE + TAG_SIZE);

        let cipher = cipher(&key);

        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), associated, ciphertext)
            .map_err(|_| SealError::Encryption)?;

        blob[header.tag_range()].copy_from_slice(&tag);

        debug!(
            plaintext_len,
            aad_len,
            binding=?policy.binding(),
            "Sealed data"
        );

        Ok(SealedBlob::from_parts(header, blob))
    }

    fn unseal(&self, blob: &[u8], policy: &KeyPolicy) -> Result<Unsealed, UnsealError> {
        let header = SealedHeader::parse(blob)?;

        self.unseal_with_header(blob, &header, policy)
    }

    fn is_simulation(&self) -> bool {
        self.deriver.is_simulation()
    }
}

fn cipher(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(key.as_bytes().into())
}

/// A short fingerprint of the sealing key, derived under its own label so it
/// reveals nothing about the key itself.
fn key_check(key: &DerivedKey) -> Result<[u8; KEY_CHECK_SIZE], KeyDerivationError> {
    let hkdf = Hkdf::<Sha256>::new(None, key.as_bytes());

    let mut check = [0; KEY_CHECK_SIZE];
    hkdf.expand(KEY_CHECK_LABEL, &mut check)
        .map_err(|_| KeyDerivationError::Platform("HKDF expansion failed".to_owned()))?;

    Ok(check)
}
