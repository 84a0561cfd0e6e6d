//! Size queries for pre-allocating buffers.
//!
//! None of these touch key material or the protected payload.

use crate::blob::{SealedHeader, SEALED_BLOB_OVERHEAD};
use crate::error::MalformedBlobError;

/// Exact length of the blob produced by sealing `plaintext_len` bytes with
/// `aad_len` bytes of authenticated data.
#[must_use]
pub const fn calc_sealed_blob_size(plaintext_len: u32, aad_len: u32) -> u64 {
    SEALED_BLOB_OVERHEAD as u64 + plaintext_len as u64 + aad_len as u64
}

pub fn authenticated_data_size(blob: &[u8]) -> Result<u32, MalformedBlobError> {
    SealedHeader::parse(blob).map(|header| header.aad_len())
}

pub fn plaintext_size_from_sealed_data(blob: &[u8]) -> Result<u32, MalformedBlobError> {
    SealedHeader::parse(blob).map(|header| header.plaintext_len())
}
