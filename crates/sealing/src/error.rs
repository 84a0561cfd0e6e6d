use calimero_enclave_keys::KeyDerivationError;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MalformedBlobError {
    #[error("sealed blob is truncated: {len} bytes is shorter than the header")]
    Truncated { len: usize },

    #[error("sealed blob has an unknown magic")]
    BadMagic,

    #[error("unsupported sealed blob version {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported sealing algorithm {0}")]
    UnsupportedAlgorithm(u8),

    #[error("unknown key policy bits {0:#06x}")]
    UnknownKeyPolicy(u16),

    #[error("sealed blob length {actual} does not match the {expected} bytes declared by its header")]
    LengthMismatch { expected: u64, actual: usize },
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SealError {
    #[error("failed to derive the sealing key")]
    KeyDerivation(#[from] KeyDerivationError),

    #[error("payload exceeds the maximum sealable size")]
    PayloadTooLarge,

    #[error("authenticated encryption failed")]
    Encryption,
}

/// Why an unseal failed, as reported across the native boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnsealReason {
    MalformedBlob,
    KeyMismatch,
    TagMismatch,
}

/// Unseal failures never carry plaintext or key material.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UnsealError {
    #[error("malformed sealed blob")]
    MalformedBlob(#[from] MalformedBlobError),

    #[error("sealed blob was sealed under a different key")]
    KeyMismatch,

    #[error("sealing key could not be derived")]
    KeyUnavailable(#[source] KeyDerivationError),

    #[error("sealed blob failed authentication")]
    TagMismatch,
}

impl UnsealError {
    #[must_use]
    pub const fn reason(&self) -> UnsealReason {
        match self {
            Self::MalformedBlob(_) => UnsealReason::MalformedBlob,
            Self::KeyMismatch | Self::KeyUnavailable(_) => UnsealReason::KeyMismatch,
            Self::TagMismatch => UnsealReason::TagMismatch,
        }
    }
}
