use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyDerivationError {
    #[error("hardware key derivation is not available on this platform")]
    Unavailable,

    #[error("requested security version is newer than the platform's")]
    SvnTooHigh,

    #[error("invalid key request: {0}")]
    InvalidRequest(&'static str),

    #[error("platform key derivation failed: {0}")]
    Platform(String),
}
