//! Local attestation reports for Calimero enclaves.
//!
//! This crate provides platform-agnostic interfaces for:
//! - Creating reports that bind caller data to the running enclave's identity
//!   and are addressed to a target enclave (`EREPORT` with the `sgx-hw`
//!   feature)
//! - Simulated report creation for development on machines without SGX
//! - Verifying simulated reports from the point of view of the target
//!
//! # Example
//!
//! ```ignore
//! use calimero_tee_attestation::{ReportIssuer, SimulatedReportIssuer};
//!
//! let issuer = SimulatedReportIssuer::new(deriver);
//!
//! // Address a report to ourselves and check it
//! let target = issuer.self_target_info()?;
//! let report = issuer.create_report(&target, b"channel binding")?;
//!
//! issuer.verify_report(&report)?;
//! assert!(issuer.is_simulation());
//! ```
//!
//! **Warning**: Simulated reports are keyed with a platform secret that is not
//! protected by hardware and must never be trusted in production.

mod error;
mod generate;
mod info;
mod report;
mod verify;

pub use error::{ReportCreationError, ReportVerificationError};
pub use generate::{HardwareReportIssuer, ReportIssuer, SimulatedReportIssuer};
pub use info::{TargetInfo, TARGET_INFO_SIZE};
pub use report::{
    build_report_data, AttestationReport, ReportData, MAC_SIZE, REPORT_BODY_SIZE,
    REPORT_DATA_SIZE, REPORT_SIZE,
};
