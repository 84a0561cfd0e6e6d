//! Target info: identifies the enclave a report is addressed to.

use calimero_enclave_primitives::identity::{
    Attributes, EnclaveIdentity, Measurement, ATTRIBUTES_SIZE, MEASUREMENT_SIZE,
};

use crate::error::ReportCreationError;

pub const TARGET_INFO_SIZE: usize = 512;

const MR_ENCLAVE_OFFSET: usize = 0;
const ATTRIBUTES_OFFSET: usize = 32;
const CONFIG_SVN_OFFSET: usize = 50;
const MISC_SELECT_OFFSET: usize = 52;
const RESERVED_TAIL_OFFSET: usize = 56;

/// The verifying enclave's identity as seen by the issuer.
///
/// Wire form is the platform's 512-byte `TARGETINFO`: measurement at 0,
/// attributes at 32, config svn at 50, misc select at 52. Every other byte is
/// reserved and must be zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetInfo {
    pub mr_enclave: Measurement,
    pub attributes: Attributes,
    pub config_svn: u16,
    pub misc_select: u32,
}

impl TargetInfo {
    /// Target info addressing the enclave running as `identity`.
    #[must_use]
    pub const fn for_identity(identity: &EnclaveIdentity) -> Self {
        Self {
            mr_enclave: identity.mr_enclave,
            attributes: identity.attributes,
            config_svn: 0,
            misc_select: identity.misc_select,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReportCreationError> {
        let bytes: &[u8; TARGET_INFO_SIZE] = bytes
            .try_into()
            .map_err(|_| ReportCreationError::InvalidTargetInfo("target info must be 512 bytes"))?;

        let reserved_head = &bytes[ATTRIBUTES_OFFSET + ATTRIBUTES_SIZE..CONFIG_SVN_OFFSET];
        let reserved_tail = &bytes[RESERVED_TAIL_OFFSET..];

        if reserved_head.iter().chain(reserved_tail).any(|b| *b != 0) {
            return Err(ReportCreationError::InvalidTargetInfo(
                "reserved target info bytes are set",
            ));
        }

        let mut mr_enclave = [0; MEASUREMENT_SIZE];
        mr_enclave.copy_from_slice(&bytes[MR_ENCLAVE_OFFSET..MR_ENCLAVE_OFFSET + MEASUREMENT_SIZE]);

        let mut attributes = [0; ATTRIBUTES_SIZE];
        attributes.copy_from_slice(&bytes[ATTRIBUTES_OFFSET..ATTRIBUTES_OFFSET + ATTRIBUTES_SIZE]);

        Ok(Self {
            mr_enclave: Measurement::new(mr_enclave),
            attributes,
            config_svn: u16::from_le_bytes([bytes[CONFIG_SVN_OFFSET], bytes[CONFIG_SVN_OFFSET + 1]]),
            misc_select: u32::from_le_bytes([
                bytes[MISC_SELECT_OFFSET],
                bytes[MISC_SELECT_OFFSET + 1],
                bytes[MISC_SELECT_OFFSET + 2],
                bytes[MISC_SELECT_OFFSET + 3],
            ]),
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; TARGET_INFO_SIZE] {
        let mut bytes = [0; TARGET_INFO_SIZE];

        bytes[MR_ENCLAVE_OFFSET..MR_ENCLAVE_OFFSET + MEASUREMENT_SIZE]
            .copy_from_slice(self.mr_enclave.as_bytes());
        bytes[ATTRIBUTES_OFFSET..ATTRIBUTES_OFFSET + ATTRIBUTES_SIZE]
            .copy_from_slice(&self.attributes);
        bytes[CONFIG_SVN_OFFSET..CONFIG_SVN_OFFSET + 2]
            .copy_from_slice(&self.config_svn.to_le_bytes());
        bytes[MISC_SELECT_OFFSET..MISC_SELECT_OFFSET + 4]
            .copy_from_slice(&self.misc_select.to_le_bytes());

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetInfo {
        TargetInfo {
            mr_enclave: Measurement::new([7; MEASUREMENT_SIZE]),
            attributes: [3; ATTRIBUTES_SIZE],
            config_svn: 0x0201,
            misc_select: 0x0403_0201,
        }
    }

    #[test]
    fn test_wire_layout() {
        let bytes = target().to_bytes();

        assert_eq!(&bytes[..32], &[7; 32]);
        assert_eq!(&bytes[32..48], &[3; 16]);
        assert_eq!(&bytes[48..50], &[0, 0]);
        assert_eq!(&bytes[50..52], &[1, 2]);
        assert_eq!(&bytes[52..56], &[1, 2, 3, 4]);
        assert!(bytes[56..].iter().all(|b| *b == 0));

        assert_eq!(TargetInfo::from_bytes(&bytes).unwrap(), target());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let bytes = target().to_bytes();

        assert!(matches!(
            TargetInfo::from_bytes(&bytes[..TARGET_INFO_SIZE - 1]),
            Err(ReportCreationError::InvalidTargetInfo(_))
        ));
    }

    #[test]
    fn test_reserved_bytes_rejected() {
        for index in [48, 100, TARGET_INFO_SIZE - 1] {
            let mut bytes = target().to_bytes();
            bytes[index] = 1;

            assert!(
                matches!(
                    TargetInfo::from_bytes(&bytes),
                    Err(ReportCreationError::InvalidTargetInfo(_))
                ),
                "reserved byte {index}"
            );
        }
    }
}
