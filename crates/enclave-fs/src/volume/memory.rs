use core::fmt;
use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use zeroize::Zeroizing;

use super::{ensure_space, len_u64, Volume};
use crate::error::FsError;

/// A volume held entirely in enclave memory.
///
/// File contents are wiped when replaced, removed or dropped.
pub struct MemoryVolume {
    capacity: u64,
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    files: BTreeMap<Utf8PathBuf, Zeroizing<Vec<u8>>>,
    used: u64,
}

impl MemoryVolume {
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            inner: Mutex::default(),
        }
    }
}

impl fmt::Debug for MemoryVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();

        f.debug_struct("MemoryVolume")
            .field("capacity", &self.capacity)
            .field("files", &inner.files.len())
            .field("used", &inner.used)
            .finish()
    }
}

impl Volume for MemoryVolume {
    fn read(&self, path: &Utf8Path) -> Result<Vec<u8>, FsError> {
        let inner = self.inner.lock();

        inner
            .files
            .get(path)
            .map(|data| data.to_vec())
            .ok_or_else(|| FsError::NotFound(path.to_owned()))
    }

    fn write(&self, path: &Utf8Path, data: &[u8]) -> Result<(), FsError> {
        let mut inner = self.inner.lock();

        let previous = inner.files.get(path).map_or(0, |old| len_u64(old));
        let required = len_u64(data);

        ensure_space(path, self.capacity, inner.used, previous, required)?;

        inner.used = inner.used.saturating_sub(previous).saturating_add(required);
        let _previous = inner
            .files
            .insert(path.to_owned(), Zeroizing::new(data.to_vec()));

        Ok(())
    }

    fn remove(&self, path: &Utf8Path) -> Result<(), FsError> {
        let mut inner = self.inner.lock();

        let removed = inner
            .files
            .remove(path)
            .ok_or_else(|| FsError::NotFound(path.to_owned()))?;

        inner.used = inner.used.saturating_sub(len_u64(&removed));

        Ok(())
    }

    fn exists(&self, path: &Utf8Path) -> Result<bool, FsError> {
        Ok(self.inner.lock().files.contains_key(path))
    }

    fn files(&self) -> Result<Vec<Utf8PathBuf>, FsError> {
        Ok(self.inner.lock().files.keys().cloned().collect())
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn used(&self) -> u64 {
        self.inner.lock().used
    }
}
