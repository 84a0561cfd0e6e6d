use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Why mounting failed. Any of these leaves the filesystem unusable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MountError {
    #[error("file systems are already set up")]
    AlreadySetUp,

    #[error("invalid mount path `{path}`: {reason}")]
    InvalidPath {
        path: Utf8PathBuf,
        reason: &'static str,
    },

    #[error("mount path `{0}` is used more than once")]
    DuplicatePath(Utf8PathBuf),

    #[error("persistent mount `{0}` requires a non-empty key")]
    MissingKey(Utf8PathBuf),

    #[error("failed to derive the volume key")]
    KeyDerivation,

    #[error("failed to prepare the backing directory `{path}`")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FsError {
    #[error("file systems are not mounted yet")]
    NotMounted,

    #[error("file systems failed to mount and are unusable")]
    Unusable,

    #[error("invalid path `{path}`: {reason}")]
    InvalidPath {
        path: Utf8PathBuf,
        reason: &'static str,
    },

    #[error("no file system is mounted at `{0}`")]
    NoMount(Utf8PathBuf),

    #[error("file `{0}` does not exist")]
    NotFound(Utf8PathBuf),

    #[error("not enough space for `{path}`: {required} bytes required, {available} available")]
    NoSpace {
        path: Utf8PathBuf,
        required: u64,
        available: u64,
    },

    #[error("file `{0}` is corrupted or was written under another key")]
    Corrupted(Utf8PathBuf),

    #[error("i/o error on `{path}`")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}
