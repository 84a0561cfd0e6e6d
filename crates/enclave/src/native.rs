use calimero_enclave_fs::{FilesystemMount, MountDescriptor, MountKey};
use calimero_enclave_keys::{KeyRequest, KEY_SIZE};
use calimero_enclave_primitives::buffer::{BufferView, BufferViewMut};
use calimero_sealing::{
    authenticated_data_size, calc_sealed_blob_size, plaintext_size_from_sealed_data, SealError,
    SealedHeader, UnsealError,
};
use calimero_tee_attestation::{TargetInfo, REPORT_SIZE};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::FilesystemConfig;
use crate::error::NativeError;
use crate::platform::Platform;

/// The boundary operations of the enclave.
///
/// Every buffer argument is a view over a caller-owned buffer. Outputs are
/// size-checked before anything is written, so an undersized out-buffer is
/// left untouched.
#[derive(Debug)]
pub struct Native {
    platform: Platform,
    filesystem: FilesystemMount,
}

impl Native {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self::with_filesystem(platform, FilesystemMount::default())
    }

    #[must_use]
    pub const fn with_filesystem(platform: Platform, filesystem: FilesystemMount) -> Self {
        Self {
            platform,
            filesystem,
        }
    }

    #[must_use]
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    #[must_use]
    pub const fn filesystem(&self) -> &FilesystemMount {
        &self.filesystem
    }

    /// Writes a report binding `user_data` addressed to `target_info`.
    pub fn create_report(
        &self,
        target_info: BufferView<'_>,
        user_data: BufferView<'_>,
        mut out: BufferViewMut<'_>,
    ) -> Result<usize, NativeError> {
        out.ensure_capacity(REPORT_SIZE)?;

        let target = TargetInfo::from_bytes(target_info.as_slice())?;

        let report = self
            .platform
            .reports()
            .create_report(&target, user_data.as_slice())?;

        Ok(out.write(&report.to_bytes())?)
    }

    #[must_use]
    pub fn is_enclave_simulation(&self) -> bool {
        self.platform.is_simulation()
    }

    /// Seals under the platform's configured policy, returning the blob
    /// length.
    pub fn seal_data(
        &self,
        mut out: BufferViewMut<'_>,
        plaintext: BufferView<'_>,
        authenticated_data: BufferView<'_>,
    ) -> Result<usize, NativeError> {
        let required = sealed_len(plaintext.len(), authenticated_data.len())?;

        out.ensure_capacity(required)?;

        let blob = self.platform.sealer().seal(
            plaintext.as_slice(),
            authenticated_data.as_slice(),
            self.platform.seal_policy(),
        )?;

        debug!(len = blob.len(), "Sealed data");

        Ok(out.write(blob.as_bytes())?)
    }

    /// Unseals under the policy recorded in the blob, returning the
    /// plaintext and authenticated data lengths.
    pub fn unseal_data(
        &self,
        blob: BufferView<'_>,
        mut plaintext_out: BufferViewMut<'_>,
        mut authenticated_data_out: BufferViewMut<'_>,
    ) -> Result<(usize, usize), NativeError> {
        let header = SealedHeader::parse(blob.as_slice()).map_err(UnsealError::from)?;

        plaintext_out.ensure_capacity(to_usize(header.plaintext_len()))?;
        authenticated_data_out.ensure_capacity(to_usize(header.aad_len()))?;

        let unsealed = self
            .platform
            .sealer()
            .unseal(blob.as_slice(), header.policy())?;

        let (plaintext, authenticated_data) = unsealed.into_parts();
        let plaintext = Zeroizing::new(plaintext);

        let plaintext_len = plaintext_out.write(&plaintext)?;
        let authenticated_data_len = authenticated_data_out.write(&authenticated_data)?;

        Ok((plaintext_len, authenticated_data_len))
    }

    #[must_use]
    pub const fn calc_sealed_blob_size(plaintext_len: u32, aad_len: u32) -> u64 {
        calc_sealed_blob_size(plaintext_len, aad_len)
    }

    pub fn authenticated_data_size(blob: BufferView<'_>) -> Result<u32, NativeError> {
        Ok(authenticated_data_size(blob.as_slice())?)
    }

    pub fn plaintext_size_from_sealed_data(blob: BufferView<'_>) -> Result<u32, NativeError> {
        Ok(plaintext_size_from_sealed_data(blob.as_slice())?)
    }

    /// Derives the key described by a wire-format key request.
    pub fn get_key(
        &self,
        request: BufferView<'_>,
        mut out: BufferViewMut<'_>,
    ) -> Result<usize, NativeError> {
        out.ensure_capacity(KEY_SIZE)?;

        let request = KeyRequest::from_bytes(request.as_slice())?;
        let key = self.platform.keys().derive_key(&request)?;

        Ok(out.write(key.as_bytes())?)
    }

    /// Mounts an in-memory volume and a persistent volume backed by the
    /// platform's backing directory. A zero size leaves that mount out.
    pub fn setup_file_systems(
        &self,
        in_memory_size: u64,
        persistent_size: u64,
        in_memory_path: &str,
        persistent_path: &str,
        key: BufferView<'_>,
    ) -> Result<(), NativeError> {
        info!(
            in_memory_path,
            in_memory_size,
            persistent_path,
            persistent_size,
            "Setting up enclave file systems"
        );

        self.filesystem.setup(vec![
            MountDescriptor::in_memory(in_memory_path, in_memory_size),
            MountDescriptor::persistent(
                self.platform.backing_dir(),
                persistent_path,
                persistent_size,
                MountKey::from(key.as_slice()),
            ),
        ])?;

        Ok(())
    }

    /// [`Native::setup_file_systems`] with the sizes and mount points of the
    /// `[filesystem]` configuration.
    pub fn setup_file_systems_from_config(
        &self,
        config: &FilesystemConfig,
        key: BufferView<'_>,
    ) -> Result<(), NativeError> {
        self.setup_file_systems(
            config.in_memory_size,
            config.persistent_size,
            config.in_memory_path.as_str(),
            config.persistent_path.as_str(),
            key,
        )
    }
}

fn sealed_len(plaintext_len: usize, aad_len: usize) -> Result<usize, SealError> {
    let plaintext_len = u32::try_from(plaintext_len).map_err(|_| SealError::PayloadTooLarge)?;
    let aad_len = u32::try_from(aad_len).map_err(|_| SealError::PayloadTooLarge)?;

    usize::try_from(calc_sealed_blob_size(plaintext_len, aad_len))
        .map_err(|_| SealError::PayloadTooLarge)
}

fn to_usize(len: u32) -> usize {
    usize::try_from(len).unwrap_or(usize::MAX)
}
