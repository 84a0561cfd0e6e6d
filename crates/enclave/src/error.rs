use calimero_enclave_fs::MountError;
use calimero_enclave_keys::KeyDerivationError;
use calimero_enclave_primitives::buffer::BufferError;
use calimero_sealing::{MalformedBlobError, SealError, UnsealError};
use calimero_tee_attestation::ReportCreationError;
use thiserror::Error;

/// Failure of a boundary operation.
///
/// Nothing here carries plaintext or key material.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NativeError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    KeyDerivation(#[from] KeyDerivationError),

    #[error(transparent)]
    Seal(#[from] SealError),

    #[error(transparent)]
    Unseal(#[from] UnsealError),

    #[error(transparent)]
    MalformedBlob(#[from] MalformedBlobError),

    #[error(transparent)]
    ReportCreation(#[from] ReportCreationError),

    #[error(transparent)]
    Mount(#[from] MountError),
}
