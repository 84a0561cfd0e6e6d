//! Sealed blob wire format.
//!
//! ```text
//! [magic: 4][version: 1][algorithm: 1][key policy: 2][isv svn: 2][reserved: 2]
//! [cpu svn: 16][key id: 32][key check: 8][aad len: 4][ciphertext len: 4]
//! [aad: aad len][nonce: 12][tag: 16][ciphertext: ciphertext len]
//! ```
//!
//! Integers are little-endian. The header alone determines the layout, and
//! the whole header is bound into the authentication tag.

use calimero_enclave_keys::{KeyBinding, KeyId, KeyPolicy, KEY_ID_SIZE};

use crate::error::MalformedBlobError;

pub const MAGIC: [u8; 4] = *b"CSB1";
pub const VERSION: u8 = 1;
pub const ALGORITHM_AES_256_GCM: u8 = 1;

pub const CPU_SVN_SIZE: usize = 16;
pub const KEY_CHECK_SIZE: usize = 8;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

pub const HEADER_SIZE: usize = 76;

/// Bytes a sealed blob adds on top of its plaintext and authenticated data.
pub const SEALED_BLOB_OVERHEAD: usize = HEADER_SIZE + NONCE_SIZE + TAG_SIZE;

const VERSION_OFFSET: usize = 4;
const ALGORITHM_OFFSET: usize = 5;
const POLICY_OFFSET: usize = 6;
const ISV_SVN_OFFSET: usize = 8;
const CPU_SVN_OFFSET: usize = 12;
const KEY_ID_OFFSET: usize = 28;
const KEY_CHECK_OFFSET: usize = 60;
const AAD_LEN_OFFSET: usize = 68;
const CIPHERTEXT_LEN_OFFSET: usize = 72;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SealedHeader {
    pub(crate) policy: KeyPolicy,
    pub(crate) isv_svn: u16,
    pub(crate) cpu_svn: [u8; CPU_SVN_SIZE],
    pub(crate) key_check: [u8; KEY_CHECK_SIZE],
    pub(crate) aad_len: u32,
    pub(crate) ciphertext_len: u32,
}

impl SealedHeader {
    /// Parses and validates the header of `blob`.
    ///
    /// Only the unauthenticated header is inspected, so a successful parse
    /// says nothing about the integrity of the payload.
    pub fn parse(blob: &[u8]) -> Result<Self, MalformedBlobError> {
        let header: &[u8; HEADER_SIZE] = blob
            .get(..HEADER_SIZE)
            .and_then(|header| header.try_into().ok())
            .ok_or(MalformedBlobError::Truncated { len: blob.len() })?;

        if header[..MAGIC.len()] != MAGIC {
            return Err(MalformedBlobError::BadMagic);
        }

        if header[VERSION_OFFSET] != VERSION {
            return Err(MalformedBlobError::UnsupportedVersion(header[VERSION_OFFSET]));
        }

        if header[ALGORITHM_OFFSET] != ALGORITHM_AES_256_GCM {
            return Err(MalformedBlobError::UnsupportedAlgorithm(
                header[ALGORITHM_OFFSET],
            ));
        }

        let policy_bits = read_u16(header, POLICY_OFFSET);
        let binding = KeyBinding::from_bits(policy_bits)
            .ok_or(MalformedBlobError::UnknownKeyPolicy(policy_bits))?;

        let mut key_id: KeyId = [0; KEY_ID_SIZE];
        key_id.copy_from_slice(&header[KEY_ID_OFFSET..KEY_ID_OFFSET + KEY_ID_SIZE]);

        let mut cpu_svn = [0; CPU_SVN_SIZE];
        cpu_svn.copy_from_slice(&header[CPU_SVN_OFFSET..CPU_SVN_OFFSET + CPU_SVN_SIZE]);

        let mut key_check = [0; KEY_CHECK_SIZE];
        key_check.copy_from_slice(&header[KEY_CHECK_OFFSET..KEY_CHECK_OFFSET + KEY_CHECK_SIZE]);

        let parsed = Self {
            policy: KeyPolicy::new(binding, key_id),
            isv_svn: read_u16(header, ISV_SVN_OFFSET),
            cpu_svn,
            key_check,
            aad_len: read_u32(header, AAD_LEN_OFFSET),
            ciphertext_len: read_u32(header, CIPHERTEXT_LEN_OFFSET),
        };

        let expected = parsed.blob_len();

        if u64::try_from(blob.len()).map_or(true, |actual| actual != expected) {
            return Err(MalformedBlobError::LengthMismatch {
                expected,
                actual: blob.len(),
            });
        }

        Ok(parsed)
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut header = [0; HEADER_SIZE];

        header[..MAGIC.len()].copy_from_slice(&MAGIC);
        header[VERSION_OFFSET] = VERSION;
        header[ALGORITHM_OFFSET] = ALGORITHM_AES_256_GCM;
        write_u16(&mut header, POLICY_OFFSET, self.policy.binding().to_bits());
        write_u16(&mut header, ISV_SVN_OFFSET, self.isv_svn);
        header[CPU_SVN_OFFSET..CPU_SVN_OFFSET + CPU_SVN_SIZE].copy_from_slice(&self.cpu_svn);
        header[KEY_ID_OFFSET..KEY_ID_OFFSET + KEY_ID_SIZE].copy_from_slice(self.policy.key_id());
        header[KEY_CHECK_OFFSET..KEY_CHECK_OFFSET + KEY_CHECK_SIZE]
            .copy_from_slice(&self.key_check);
        header[AAD_LEN_OFFSET..AAD_LEN_OFFSET + 4].copy_from_slice(&self.aad_len.to_le_bytes());
        header[CIPHERTEXT_LEN_OFFSET..CIPHERTEXT_LEN_OFFSET + 4]
            .copy_from_slice(&self.ciphertext_len.to_le_bytes());

        header
    }

    #[must_use]
    pub const fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn isv_svn(&self) -> u16 {
        self.isv_svn
    }

    #[must_use]
    pub const fn aad_len(&self) -> u32 {
        self.aad_len
    }

    /// AES-GCM ciphertext is as long as its plaintext.
    #[must_use]
    pub const fn plaintext_len(&self) -> u32 {
        self.ciphertext_len
    }

    #[must_use]
    pub const fn blob_len(&self) -> u64 {
        crate::size::calc_sealed_blob_size(self.ciphertext_len, self.aad_len)
    }

    pub(crate) const fn aad_range(&self) -> core::ops::Range<usize> {
        HEADER_SIZE..HEADER_SIZE + self.aad_len as usize
    }

    pub(crate) const fn nonce_range(&self) -> core::ops::Range<usize> {
        let start = self.aad_range().end;
        start..start + NONCE_SIZE
    }

    pub(crate) const fn tag_range(&self) -> core::ops::Range<usize> {
        let start = self.nonce_range().end;
        start..start + TAG_SIZE
    }

    pub(crate) const fn ciphertext_range(&self) -> core::ops::Range<usize> {
        let start = self.tag_range().end;
        start..start + self.ciphertext_len as usize
    }
}

/// A sealed blob whose header has been validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedBlob {
    header: SealedHeader,
    bytes: Vec<u8>,
}

impl SealedBlob {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, MalformedBlobError> {
        let header = SealedHeader::parse(&bytes)?;

        Ok(Self { header, bytes })
    }

    pub(crate) const fn from_parts(header: SealedHeader, bytes: Vec<u8>) -> Self {
        Self { header, bytes }
    }

    #[must_use]
    pub const fn header(&self) -> &SealedHeader {
        &self.header
    }

    /// The authenticated data travels in the clear.
    #[must_use]
    pub fn authenticated_data(&self) -> &[u8] {
        &self.bytes[self.header.aad_range()]
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for SealedBlob {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

fn read_u16(header: &[u8; HEADER_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([header[offset], header[offset + 1]])
}

fn read_u32(header: &[u8; HEADER_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes([
        header[offset],
        header[offset + 1],
        header[offset + 2],
        header[offset + 3],
    ])
}

fn write_u16(header: &mut [u8; HEADER_SIZE], offset: usize, value: u16) {
    header[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}
