//! Local verification of simulated reports.

use calimero_enclave_keys::{DerivedKey, KeyDerivationError, KeyDeriver, KeyRequest};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ReportVerificationError;
use crate::generate::SimulatedReportIssuer;
use crate::report::{AttestationReport, MAC_SIZE, REPORT_BODY_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the report body, truncated to the report's MAC size.
pub(crate) fn report_mac(
    key: &DerivedKey,
    body: &[u8; REPORT_BODY_SIZE],
) -> Result<[u8; MAC_SIZE], KeyDerivationError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|_| KeyDerivationError::Platform("invalid report key length".to_owned()))?;
    mac.update(body);

    let digest = mac.finalize().into_bytes();

    let mut truncated = [0; MAC_SIZE];
    truncated.copy_from_slice(&digest[..MAC_SIZE]);

    Ok(truncated)
}

impl SimulatedReportIssuer {
    /// Checks a report addressed to the running enclave.
    ///
    /// Succeeds only if the report was created for this enclave's measurement
    /// on the same simulated platform and has not been modified since.
    pub fn verify_report(&self, report: &AttestationReport) -> Result<(), ReportVerificationError> {
        let deriver = self.deriver();

        let key = deriver.derive_key(&KeyRequest::report(&deriver.identity()))?;

        let expected = report_mac(&key, &report.body())?;

        if !bool::from(expected[..].ct_eq(&report.mac[..])) {
            warn!(issuer=%report.mr_enclave, "Report MAC does not verify");
            return Err(ReportVerificationError::MacMismatch);
        }

        Ok(())
    }
}
