use std::sync::Arc;

use tracing::debug;

use crate::descriptor::{MountDescriptor, MountKind};
use crate::error::MountError;
use crate::volume::{MemoryVolume, PersistentVolume, Volume};

/// Turns a mount descriptor into the volume that serves it.
pub trait FileSystemMounter: Send + Sync {
    fn mount(&self, descriptor: &MountDescriptor) -> Result<Box<dyn Volume>, MountError>;
}

impl<T: FileSystemMounter + ?Sized> FileSystemMounter for Arc<T> {
    fn mount(&self, descriptor: &MountDescriptor) -> Result<Box<dyn Volume>, MountError> {
        (**self).mount(descriptor)
    }
}

/// Serves in-memory mounts from enclave memory and persistent mounts from
/// encrypted files in a host directory.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostMounter;

impl FileSystemMounter for HostMounter {
    fn mount(&self, descriptor: &MountDescriptor) -> Result<Box<dyn Volume>, MountError> {
        debug!(
            mount_path=%descriptor.mount_path,
            kind=?descriptor.kind,
            capacity=descriptor.capacity,
            "Mounting volume"
        );

        match &descriptor.kind {
            MountKind::InMemory => Ok(Box::new(MemoryVolume::new(descriptor.capacity))),
            MountKind::Persistent { backing_dir } => Ok(Box::new(PersistentVolume::open(
                backing_dir,
                descriptor.capacity,
                &descriptor.key,
            )?)),
        }
    }
}
