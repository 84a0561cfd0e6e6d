//! The 432-byte attestation report record.

use core::fmt;

use calimero_enclave_primitives::identity::{
    Attributes, CpuSvn, EnclaveIdentity, Measurement, ATTRIBUTES_SIZE, CPU_SVN_SIZE,
    MEASUREMENT_SIZE,
};

use crate::error::{ReportCreationError, ReportVerificationError};

pub const REPORT_SIZE: usize = 432;
pub const REPORT_DATA_SIZE: usize = 64;
pub const MAC_SIZE: usize = 16;

/// Bytes covered by the report MAC.
pub const REPORT_BODY_SIZE: usize = KEY_ID_OFFSET;

const KEY_ID_SIZE: usize = 32;

const CPU_SVN_OFFSET: usize = 0;
const MISC_SELECT_OFFSET: usize = 16;
const ATTRIBUTES_OFFSET: usize = 48;
const MR_ENCLAVE_OFFSET: usize = 64;
const MR_SIGNER_OFFSET: usize = 128;
const ISV_PROD_ID_OFFSET: usize = 256;
const ISV_SVN_OFFSET: usize = 258;
const REPORT_DATA_OFFSET: usize = 320;
const KEY_ID_OFFSET: usize = 384;
const MAC_OFFSET: usize = 416;

pub type ReportData = [u8; REPORT_DATA_SIZE];

/// Zero-pads `user_data` into report data.
pub fn build_report_data(user_data: &[u8]) -> Result<ReportData, ReportCreationError> {
    if user_data.len() > REPORT_DATA_SIZE {
        return Err(ReportCreationError::UserDataTooLarge {
            len: user_data.len(),
            max: REPORT_DATA_SIZE,
        });
    }

    let mut report_data = [0; REPORT_DATA_SIZE];
    report_data[..user_data.len()].copy_from_slice(user_data);

    Ok(report_data)
}

/// A report binding caller data to the identity of the issuing enclave.
///
/// Laid out like the platform's `REPORT`; reserved regions are zero.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AttestationReport {
    pub cpu_svn: CpuSvn,
    pub misc_select: u32,
    pub attributes: Attributes,
    pub mr_enclave: Measurement,
    pub mr_signer: Measurement,
    pub isv_prod_id: u16,
    pub isv_svn: u16,
    pub report_data: ReportData,
    pub key_id: [u8; KEY_ID_SIZE],
    pub mac: [u8; MAC_SIZE],
}

impl AttestationReport {
    pub(crate) fn unsigned(
        identity: &EnclaveIdentity,
        report_data: ReportData,
        key_id: [u8; KEY_ID_SIZE],
    ) -> Self {
        Self {
            cpu_svn: identity.cpu_svn,
            misc_select: identity.misc_select,
            attributes: identity.attributes,
            mr_enclave: identity.mr_enclave,
            mr_signer: identity.mr_signer,
            isv_prod_id: identity.isv_prod_id,
            isv_svn: identity.isv_svn,
            report_data,
            key_id,
            mac: [0; MAC_SIZE],
        }
    }

    /// The identity of the enclave that issued this report.
    #[must_use]
    pub const fn issuer(&self) -> EnclaveIdentity {
        EnclaveIdentity::new(
            self.mr_enclave,
            self.mr_signer,
            self.isv_prod_id,
            self.isv_svn,
        )
        .with_cpu_svn(self.cpu_svn)
        .with_attributes(self.attributes, self.misc_select)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReportVerificationError> {
        let bytes: &[u8; REPORT_SIZE] =
            bytes
                .try_into()
                .map_err(|_| ReportVerificationError::Malformed {
                    len: bytes.len(),
                    expected: REPORT_SIZE,
                })?;

        Ok(Self {
            cpu_svn: array(bytes, CPU_SVN_OFFSET),
            misc_select: u32::from_le_bytes(array(bytes, MISC_SELECT_OFFSET)),
            attributes: array(bytes, ATTRIBUTES_OFFSET),
            mr_enclave: Measurement::new(array(bytes, MR_ENCLAVE_OFFSET)),
            mr_signer: Measurement::new(array(bytes, MR_SIGNER_OFFSET)),
            isv_prod_id: u16::from_le_bytes(array(bytes, ISV_PROD_ID_OFFSET)),
            isv_svn: u16::from_le_bytes(array(bytes, ISV_SVN_OFFSET)),
            report_data: array(bytes, REPORT_DATA_OFFSET),
            key_id: array(bytes, KEY_ID_OFFSET),
            mac: array(bytes, MAC_OFFSET),
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; REPORT_SIZE] {
        let mut bytes = [0; REPORT_SIZE];

        put(&mut bytes, CPU_SVN_OFFSET, &self.cpu_svn);
        put(&mut bytes, MISC_SELECT_OFFSET, &self.misc_select.to_le_bytes());
        put(&mut bytes, ATTRIBUTES_OFFSET, &self.attributes);
        put(&mut bytes, MR_ENCLAVE_OFFSET, self.mr_enclave.as_bytes());
        put(&mut bytes, MR_SIGNER_OFFSET, self.mr_signer.as_bytes());
        put(&mut bytes, ISV_PROD_ID_OFFSET, &self.isv_prod_id.to_le_bytes());
        put(&mut bytes, ISV_SVN_OFFSET, &self.isv_svn.to_le_bytes());
        put(&mut bytes, REPORT_DATA_OFFSET, &self.report_data);
        put(&mut bytes, KEY_ID_OFFSET, &self.key_id);
        put(&mut bytes, MAC_OFFSET, &self.mac);

        bytes
    }

    /// The part of the wire form the MAC is computed over.
    #[must_use]
    pub fn body(&self) -> [u8; REPORT_BODY_SIZE] {
        let mut body = [0; REPORT_BODY_SIZE];
        body.copy_from_slice(&self.to_bytes()[..REPORT_BODY_SIZE]);
        body
    }
}

impl fmt::Debug for AttestationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttestationReport")
            .field("mr_enclave", &self.mr_enclave)
            .field("mr_signer", &self.mr_signer)
            .field("isv_prod_id", &self.isv_prod_id)
            .field("isv_svn", &self.isv_svn)
            .field("report_data", &hex::encode(self.report_data))
            .finish_non_exhaustive()
    }
}

fn array<const N: usize>(bytes: &[u8; REPORT_SIZE], offset: usize) -> [u8; N] {
    let mut out = [0; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

fn put(bytes: &mut [u8; REPORT_SIZE], offset: usize, value: &[u8]) {
    bytes[offset..offset + value.len()].copy_from_slice(value);
}

const _: () = {
    assert!(CPU_SVN_OFFSET + CPU_SVN_SIZE <= MISC_SELECT_OFFSET);
    assert!(ATTRIBUTES_OFFSET + ATTRIBUTES_SIZE == MR_ENCLAVE_OFFSET);
    assert!(MR_SIGNER_OFFSET + MEASUREMENT_SIZE <= ISV_PROD_ID_OFFSET);
    assert!(REPORT_DATA_OFFSET + REPORT_DATA_SIZE == KEY_ID_OFFSET);
    assert!(MAC_OFFSET + MAC_SIZE == REPORT_SIZE);
};

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> AttestationReport {
        let identity = EnclaveIdentity::new(
            Measurement::new([1; 32]),
            Measurement::new([2; 32]),
            0x0a0b,
            0x0c0d,
        )
        .with_cpu_svn([3; CPU_SVN_SIZE])
        .with_attributes([4; ATTRIBUTES_SIZE], 0x0102_0304);

        let mut report = AttestationReport::unsigned(&identity, [5; REPORT_DATA_SIZE], [6; 32]);
        report.mac = [7; MAC_SIZE];
        report
    }

    #[test]
    fn test_wire_layout() {
        let bytes = report().to_bytes();

        assert_eq!(&bytes[0..16], &[3; 16]);
        assert_eq!(&bytes[16..20], &[4, 3, 2, 1]);
        assert!(bytes[20..48].iter().all(|b| *b == 0));
        assert_eq!(&bytes[48..64], &[4; 16]);
        assert_eq!(&bytes[64..96], &[1; 32]);
        assert_eq!(&bytes[128..160], &[2; 32]);
        assert_eq!(&bytes[256..258], &[0x0b, 0x0a]);
        assert_eq!(&bytes[258..260], &[0x0d, 0x0c]);
        assert_eq!(&bytes[320..384], &[5; 64]);
        assert_eq!(&bytes[384..416], &[6; 32]);
        assert_eq!(&bytes[416..432], &[7; 16]);

        assert_eq!(AttestationReport::from_bytes(&bytes).unwrap(), report());
    }

    #[test]
    fn test_issuer_identity() {
        let issuer = report().issuer();

        assert_eq!(issuer.mr_enclave, Measurement::new([1; 32]));
        assert_eq!(issuer.isv_svn, 0x0c0d);
        assert_eq!(issuer.misc_select, 0x0102_0304);
    }

    #[test]
    fn test_body_excludes_key_id_and_mac() {
        let report = report();

        assert_eq!(&report.body()[..], &report.to_bytes()[..REPORT_BODY_SIZE]);
        assert_eq!(REPORT_BODY_SIZE, 384);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            AttestationReport::from_bytes(&[0; 431]),
            Err(ReportVerificationError::Malformed {
                len: 431,
                expected: REPORT_SIZE
            })
        );
    }

    #[test]
    fn test_report_data_padding() {
        let data = build_report_data(b"abc").unwrap();

        assert_eq!(&data[..3], b"abc");
        assert!(data[3..].iter().all(|b| *b == 0));

        assert_eq!(build_report_data(&[1; 64]).unwrap(), [1; 64]);
        assert_eq!(
            build_report_data(&[1; 65]),
            Err(ReportCreationError::UserDataTooLarge { len: 65, max: 64 })
        );
    }
}
