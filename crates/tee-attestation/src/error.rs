use calimero_enclave_keys::KeyDerivationError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReportCreationError {
    #[error("user data is {len} bytes, at most {max} fit in a report")]
    UserDataTooLarge { len: usize, max: usize },

    #[error("invalid target info: {0}")]
    InvalidTargetInfo(&'static str),

    #[error("platform rejected the report request: {0}")]
    Platform(String),

    #[error("hardware attestation is not available on this platform")]
    Unavailable,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReportVerificationError {
    #[error("report is {len} bytes, expected {expected}")]
    Malformed { len: usize, expected: usize },

    #[error("report is addressed to another enclave or was tampered with")]
    MacMismatch,

    #[error("failed to derive the report key")]
    KeyDerivation(#[from] KeyDerivationError),
}
