use core::fmt::Debug;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::FsError;

mod memory;
mod persistent;

pub use memory::MemoryVolume;
pub use persistent::PersistentVolume;

/// Storage behind one mount point.
///
/// Paths handed to a volume are full logical paths, already validated and
/// resolved to this volume's mount.
pub trait Volume: Debug + Send + Sync {
    fn read(&self, path: &Utf8Path) -> Result<Vec<u8>, FsError>;

    /// Creates or replaces the file at `path`.
    fn write(&self, path: &Utf8Path, data: &[u8]) -> Result<(), FsError>;

    fn remove(&self, path: &Utf8Path) -> Result<(), FsError>;

    fn exists(&self, path: &Utf8Path) -> Result<bool, FsError>;

    /// Logical paths of every file, sorted.
    fn files(&self) -> Result<Vec<Utf8PathBuf>, FsError>;

    fn capacity(&self) -> u64;

    /// Bytes of file contents currently stored.
    fn used(&self) -> u64;
}

/// Fails with [`FsError::NoSpace`] if replacing `previous` bytes with
/// `required` bytes would exceed `capacity`.
pub(crate) fn ensure_space(
    path: &Utf8Path,
    capacity: u64,
    used: u64,
    previous: u64,
    required: u64,
) -> Result<(), FsError> {
    let available = capacity.saturating_sub(used.saturating_sub(previous));

    if required > available {
        return Err(FsError::NoSpace {
            path: path.to_owned(),
            required,
            available,
        });
    }

    Ok(())
}

pub(crate) fn len_u64(data: &[u8]) -> u64 {
    u64::try_from(data.len()).unwrap_or(u64::MAX)
}
