//! Enclave-backed file system mounts.
//!
//! A [`FilesystemMount`] is set up once at startup from a list of
//! [`MountDescriptor`]s and then serves path-based file I/O. Each mount is
//! backed by a [`Volume`]: either enclave memory or a host directory holding
//! encrypted files.

mod descriptor;
mod error;
mod mount;
mod mounter;
pub mod volume;

pub use descriptor::{MountDescriptor, MountKey, MountKind};
pub use error::{FsError, MountError};
pub use mount::{FilesystemMount, MountState};
pub use mounter::{FileSystemMounter, HostMounter};
pub use volume::Volume;
