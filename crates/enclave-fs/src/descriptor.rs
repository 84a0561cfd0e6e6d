use core::fmt;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use zeroize::Zeroizing;

/// Key material a persistent volume encrypts its files under.
#[derive(Clone, Default)]
pub struct MountKey(Zeroizing<Vec<u8>>);

impl MountKey {
    #[must_use]
    pub fn new(key: Vec<u8>) -> Self {
        Self(Zeroizing::new(key))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for MountKey {
    fn from(key: &[u8]) -> Self {
        Self::new(key.to_vec())
    }
}

impl fmt::Debug for MountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MountKey(<redacted>)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum MountKind {
    /// Contents live in enclave memory and vanish with the process.
    InMemory,
    /// Contents are encrypted into files under a host directory.
    Persistent { backing_dir: Utf8PathBuf },
}

/// One mount requested at startup.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct MountDescriptor {
    pub kind: MountKind,
    pub mount_path: Utf8PathBuf,
    /// Byte budget of the volume. Zero means the mount is not wanted.
    pub capacity: u64,
    pub key: MountKey,
}

impl MountDescriptor {
    #[must_use]
    pub fn in_memory(mount_path: impl Into<Utf8PathBuf>, capacity: u64) -> Self {
        Self {
            kind: MountKind::InMemory,
            mount_path: mount_path.into(),
            capacity,
            key: MountKey::default(),
        }
    }

    #[must_use]
    pub fn persistent(
        backing_dir: impl Into<Utf8PathBuf>,
        mount_path: impl Into<Utf8PathBuf>,
        capacity: u64,
        key: MountKey,
    ) -> Self {
        Self {
            kind: MountKind::Persistent {
                backing_dir: backing_dir.into(),
            },
            mount_path: mount_path.into(),
            capacity,
            key,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.capacity > 0
    }
}

/// Checks that `path` is absolute and already in normal form: no `.` or `..`
/// components, no repeated or trailing separators.
pub(crate) fn check_normalized(path: &Utf8Path) -> Result<(), &'static str> {
    if !path.is_absolute() {
        return Err("path must be absolute");
    }

    let mut rebuilt = String::with_capacity(path.as_str().len());

    for component in path.components() {
        match component {
            Utf8Component::RootDir => {}
            Utf8Component::Normal(name) => {
                rebuilt.push('/');
                rebuilt.push_str(name);
            }
            Utf8Component::CurDir | Utf8Component::ParentDir | Utf8Component::Prefix(_) => {
                return Err("path must not contain `.` or `..` components");
            }
        }
    }

    if rebuilt.is_empty() {
        rebuilt.push('/');
    }

    if rebuilt != path.as_str() {
        return Err("path must not contain repeated or trailing separators");
    }

    Ok(())
}
