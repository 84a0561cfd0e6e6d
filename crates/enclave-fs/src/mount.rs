use core::fmt;
use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::descriptor::{check_normalized, MountDescriptor};
use crate::error::{FsError, MountError};
use crate::mounter::{FileSystemMounter, HostMounter};
use crate::volume::Volume;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Mounting,
    Mounted,
    /// Terminal: a mount failed and no file I/O will succeed.
    Failed,
}

struct Mount {
    path: Utf8PathBuf,
    volume: Box<dyn Volume>,
}

struct Inner {
    state: MountState,
    /// Longest mount path first, so the first prefix match is the best one.
    mounts: Vec<Mount>,
}

/// The enclave's file system mounts.
///
/// Mounts are set up once; the path to volume mapping never changes after
/// that. File I/O is only served once every mount succeeded.
pub struct FilesystemMount {
    mounter: Box<dyn FileSystemMounter>,
    inner: RwLock<Inner>,
}

impl fmt::Debug for FilesystemMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();

        f.debug_struct("FilesystemMount")
            .field("state", &inner.state)
            .field(
                "mounts",
                &inner.mounts.iter().map(|m| &m.path).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Default for FilesystemMount {
    fn default() -> Self {
        Self::new(HostMounter)
    }
}

impl FilesystemMount {
    #[must_use]
    pub fn new(mounter: impl FileSystemMounter + 'static) -> Self {
        Self {
            mounter: Box::new(mounter),
            inner: RwLock::new(Inner {
                state: MountState::Unmounted,
                mounts: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> MountState {
        self.inner.read().state
    }

    /// Mounts every enabled descriptor.
    ///
    /// Only the first call does anything; later calls fail with
    /// [`MountError::AlreadySetUp`] and leave the state untouched. Any mount
    /// failure is terminal.
    pub fn setup(&self, descriptors: Vec<MountDescriptor>) -> Result<(), MountError> {
        let mut inner = self.inner.write();

        if inner.state != MountState::Unmounted {
            warn!(state=?inner.state, "Ignoring repeated file system setup");
            return Err(MountError::AlreadySetUp);
        }

        inner.state = MountState::Mounting;

        match self.mount_all(descriptors) {
            Ok(mounts) => {
                info!(
                    mounts=?mounts.iter().map(|m| m.path.as_str()).collect::<Vec<_>>(),
                    "File systems mounted"
                );
                inner.mounts = mounts;
                inner.state = MountState::Mounted;
                Ok(())
            }
            Err(err) => {
                error!(%err, "File system setup failed, file systems are unusable");
                inner.state = MountState::Failed;
                Err(err)
            }
        }
    }

    fn mount_all(&self, descriptors: Vec<MountDescriptor>) -> Result<Vec<Mount>, MountError> {
        let mut seen = BTreeSet::new();
        let mut mounts = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if !descriptor.is_enabled() {
                debug!(mount_path=%descriptor.mount_path, "Skipping mount with zero capacity");
                continue;
            }

            check_normalized(&descriptor.mount_path).map_err(|reason| MountError::InvalidPath {
                path: descriptor.mount_path.clone(),
                reason,
            })?;

            if !seen.insert(descriptor.mount_path.clone()) {
                return Err(MountError::DuplicatePath(descriptor.mount_path));
            }

            let volume = self.mounter.mount(&descriptor)?;

            mounts.push(Mount {
                path: descriptor.mount_path,
                volume,
            });
        }

        mounts.sort_by(|a, b| b.path.as_str().len().cmp(&a.path.as_str().len()));

        Ok(mounts)
    }

    fn with_volume<T>(
        &self,
        path: &Utf8Path,
        op: impl FnOnce(&Utf8Path, &dyn Volume) -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        let inner = self.inner.read();

        match inner.state {
            MountState::Unmounted | MountState::Mounting => return Err(FsError::NotMounted),
            MountState::Failed => return Err(FsError::Unusable),
            MountState::Mounted => {}
        }

        check_normalized(path).map_err(|reason| FsError::InvalidPath {
            path: path.to_owned(),
            reason,
        })?;

        let mount = inner
            .mounts
            .iter()
            .find(|mount| path.starts_with(&mount.path))
            .ok_or_else(|| FsError::NoMount(path.to_owned()))?;

        op(&mount.path, mount.volume.as_ref())
    }

    fn with_file<T>(
        &self,
        path: &Utf8Path,
        op: impl FnOnce(&dyn Volume) -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        self.with_volume(path, |mount_path, volume| {
            if path == mount_path {
                return Err(FsError::InvalidPath {
                    path: path.to_owned(),
                    reason: "path names a mount point",
                });
            }

            op(volume)
        })
    }

    pub fn read(&self, path: impl AsRef<Utf8Path>) -> Result<Vec<u8>, FsError> {
        let path = path.as_ref();

        self.with_file(path, |volume| volume.read(path))
    }

    pub fn write(&self, path: impl AsRef<Utf8Path>, data: &[u8]) -> Result<(), FsError> {
        let path = path.as_ref();

        self.with_file(path, |volume| volume.write(path, data))
    }

    pub fn remove(&self, path: impl AsRef<Utf8Path>) -> Result<(), FsError> {
        let path = path.as_ref();

        self.with_file(path, |volume| volume.remove(path))
    }

    pub fn exists(&self, path: impl AsRef<Utf8Path>) -> Result<bool, FsError> {
        let path = path.as_ref();

        self.with_volume(path, |mount_path, volume| {
            if path == mount_path {
                return Ok(true);
            }

            volume.exists(path)
        })
    }

    /// Files below `dir`, sorted.
    pub fn list(&self, dir: impl AsRef<Utf8Path>) -> Result<Vec<Utf8PathBuf>, FsError> {
        let dir = dir.as_ref();

        self.with_volume(dir, |_, volume| {
            Ok(volume
                .files()?
                .into_iter()
                .filter(|file| file.starts_with(dir) && file.as_path() != dir)
                .collect())
        })
    }

    /// `(capacity, used)` of the volume serving `path`.
    pub fn usage(&self, path: impl AsRef<Utf8Path>) -> Result<(u64, u64), FsError> {
        self.with_volume(path.as_ref(), |_, volume| {
            Ok((volume.capacity(), volume.used()))
        })
    }
}
