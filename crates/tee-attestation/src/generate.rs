//! Report issuers: `EREPORT` on SGX hardware and a keyed simulation elsewhere.

use std::sync::Arc;

use calimero_enclave_keys::{KeyDeriver, SimulatedKeyDeriver};
use rand::RngCore;
#[cfg(not(feature = "sgx-hw"))]
use tracing::warn;
use tracing::debug;

use crate::error::ReportCreationError;
use crate::info::TargetInfo;
use crate::report::{build_report_data, AttestationReport};
use crate::verify::report_mac;

pub trait ReportIssuer: Send + Sync {
    /// Binds `user_data` into a fresh report addressed to `target`.
    ///
    /// Reports are never cached: every call produces a new one.
    fn create_report(
        &self,
        target: &TargetInfo,
        user_data: &[u8],
    ) -> Result<AttestationReport, ReportCreationError>;

    /// Target info addressing the running enclave itself.
    fn self_target_info(&self) -> Result<TargetInfo, ReportCreationError>;

    fn is_simulation(&self) -> bool;
}

/// Issues reports MACed under the simulated report key of the target.
///
/// The target derives the same key from the shared platform secret, so it
/// can check reports with [`SimulatedReportIssuer::verify_report`].
#[derive(Debug, Clone)]
pub struct SimulatedReportIssuer {
    deriver: Arc<SimulatedKeyDeriver>,
}

impl SimulatedReportIssuer {
    #[must_use]
    pub const fn new(deriver: Arc<SimulatedKeyDeriver>) -> Self {
        Self { deriver }
    }

    pub(crate) fn deriver(&self) -> &SimulatedKeyDeriver {
        &self.deriver
    }
}

impl ReportIssuer for SimulatedReportIssuer {
    fn create_report(
        &self,
        target: &TargetInfo,
        user_data: &[u8],
    ) -> Result<AttestationReport, ReportCreationError> {
        let report_data = build_report_data(user_data)?;

        let mut key_id = [0; 32];
        rand::thread_rng().fill_bytes(&mut key_id);

        let identity = self.deriver.identity();
        let mut report = AttestationReport::unsigned(&identity, report_data, key_id);

        let key = self
            .deriver
            .report_key_for(&target.mr_enclave)
            .map_err(|err| ReportCreationError::Platform(err.to_string()))?;

        report.mac = report_mac(&key, &report.body())
            .map_err(|err| ReportCreationError::Platform(err.to_string()))?;

        debug!(
            target=%target.mr_enclave,
            user_data_len=user_data.len(),
            "Created simulated report"
        );

        Ok(report)
    }

    fn self_target_info(&self) -> Result<TargetInfo, ReportCreationError> {
        Ok(TargetInfo::for_identity(&self.deriver.identity()))
    }

    fn is_simulation(&self) -> bool {
        true
    }
}

/// Issues reports with `EREPORT`.
///
/// Without the `sgx-hw` feature every request fails with
/// [`ReportCreationError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HardwareReportIssuer;

impl HardwareReportIssuer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Whether hardware reports can be created in this build.
    #[must_use]
    pub const fn is_available() -> bool {
        cfg!(feature = "sgx-hw")
    }
}

impl ReportIssuer for HardwareReportIssuer {
    #[cfg(feature = "sgx-hw")]
    fn create_report(
        &self,
        target: &TargetInfo,
        user_data: &[u8],
    ) -> Result<AttestationReport, ReportCreationError> {
        use crate::error::ReportVerificationError;

        let report_data = build_report_data(user_data)?;

        let targetinfo = sgx_isa::Targetinfo::try_copy_from(&target.to_bytes()).ok_or(
            ReportCreationError::InvalidTargetInfo("platform rejected target info layout"),
        )?;

        let report = sgx_isa::Report::for_target(&targetinfo, &report_data);

        AttestationReport::from_bytes(report.as_ref()).map_err(
            |err: ReportVerificationError| ReportCreationError::Platform(err.to_string()),
        )
    }

    #[cfg(not(feature = "sgx-hw"))]
    fn create_report(
        &self,
        target: &TargetInfo,
        _user_data: &[u8],
    ) -> Result<AttestationReport, ReportCreationError> {
        warn!(target=%target.mr_enclave, "Hardware report requested outside of an enclave");

        Err(ReportCreationError::Unavailable)
    }

    #[cfg(feature = "sgx-hw")]
    fn self_target_info(&self) -> Result<TargetInfo, ReportCreationError> {
        let targetinfo = sgx_isa::Targetinfo::from(sgx_isa::Report::for_self());

        TargetInfo::from_bytes(targetinfo.as_ref())
    }

    #[cfg(not(feature = "sgx-hw"))]
    fn self_target_info(&self) -> Result<TargetInfo, ReportCreationError> {
        Err(ReportCreationError::Unavailable)
    }

    fn is_simulation(&self) -> bool {
        false
    }
}
