use calimero_enclave_primitives::identity::{CpuSvn, EnclaveIdentity, CPU_SVN_SIZE};

use crate::error::KeyDerivationError;
use crate::policy::{KeyBinding, KeyPolicy, KEY_ID_SIZE};

/// Size of the wire form of a [`KeyRequest`].
pub const KEY_REQUEST_SIZE: usize = 512;

const NAME_OFFSET: usize = 0;
const POLICY_OFFSET: usize = 2;
const ISV_SVN_OFFSET: usize = 4;
const CPU_SVN_OFFSET: usize = 8;
const KEY_ID_OFFSET: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyName {
    Report,
    Seal,
}

impl KeyName {
    const REPORT: u16 = 3;
    const SEAL: u16 = 4;

    #[must_use]
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Report => Self::REPORT,
            Self::Seal => Self::SEAL,
        }
    }

    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            Self::REPORT => Some(Self::Report),
            Self::SEAL => Some(Self::Seal),
            _ => None,
        }
    }
}

/// Describes the key to derive.
///
/// The wire form is a fixed 512-byte little-endian record laid out like the
/// platform's `KEYREQUEST`: name at 0, policy bits at 2, isv svn at 4, cpu svn
/// at 8, key id at 40. Fields this subsystem does not use are zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyRequest {
    name: KeyName,
    policy: KeyPolicy,
    isv_svn: u16,
    cpu_svn: CpuSvn,
}

impl KeyRequest {
    #[must_use]
    pub const fn new(name: KeyName, policy: KeyPolicy, isv_svn: u16, cpu_svn: CpuSvn) -> Self {
        Self {
            name,
            policy,
            isv_svn,
            cpu_svn,
        }
    }

    /// A sealing key request at the identity's current security versions.
    #[must_use]
    pub const fn seal(policy: KeyPolicy, identity: &EnclaveIdentity) -> Self {
        Self::new(KeyName::Seal, policy, identity.isv_svn, identity.cpu_svn)
    }

    #[must_use]
    pub const fn report(identity: &EnclaveIdentity) -> Self {
        Self::new(
            KeyName::Report,
            KeyPolicy::measurement(),
            identity.isv_svn,
            identity.cpu_svn,
        )
    }

    #[must_use]
    pub const fn name(&self) -> KeyName {
        self.name
    }

    #[must_use]
    pub const fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn isv_svn(&self) -> u16 {
        self.isv_svn
    }

    #[must_use]
    pub const fn cpu_svn(&self) -> &CpuSvn {
        &self.cpu_svn
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; KEY_REQUEST_SIZE] {
        let mut bytes = [0; KEY_REQUEST_SIZE];

        write_u16(&mut bytes, NAME_OFFSET, self.name.to_u16());
        write_u16(&mut bytes, POLICY_OFFSET, self.policy.binding().to_bits());
        write_u16(&mut bytes, ISV_SVN_OFFSET, self.isv_svn);
        bytes[CPU_SVN_OFFSET..CPU_SVN_OFFSET + CPU_SVN_SIZE].copy_from_slice(&self.cpu_svn);
        bytes[KEY_ID_OFFSET..KEY_ID_OFFSET + KEY_ID_SIZE].copy_from_slice(self.policy.key_id());

        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyDerivationError> {
        let bytes: &[u8; KEY_REQUEST_SIZE] = bytes
            .try_into()
            .map_err(|_| KeyDerivationError::InvalidRequest("key request must be 512 bytes"))?;

        let name = KeyName::from_u16(read_u16(bytes, NAME_OFFSET))
            .ok_or(KeyDerivationError::InvalidRequest("unsupported key name"))?;

        let binding = KeyBinding::from_bits(read_u16(bytes, POLICY_OFFSET))
            .ok_or(KeyDerivationError::InvalidRequest("unsupported key policy"))?;

        let mut cpu_svn = [0; CPU_SVN_SIZE];
        cpu_svn.copy_from_slice(&bytes[CPU_SVN_OFFSET..CPU_SVN_OFFSET + CPU_SVN_SIZE]);

        let mut key_id = [0; KEY_ID_SIZE];
        key_id.copy_from_slice(&bytes[KEY_ID_OFFSET..KEY_ID_OFFSET + KEY_ID_SIZE]);

        Ok(Self {
            name,
            policy: KeyPolicy::new(binding, key_id),
            isv_svn: read_u16(bytes, ISV_SVN_OFFSET),
            cpu_svn,
        })
    }
}

fn write_u16(bytes: &mut [u8; KEY_REQUEST_SIZE], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn read_u16(bytes: &[u8; KEY_REQUEST_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}
