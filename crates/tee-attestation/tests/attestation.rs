use std::sync::Arc;

use calimero_enclave_keys::SimulatedKeyDeriver;
use calimero_enclave_primitives::identity::{EnclaveIdentity, Measurement};
use calimero_tee_attestation::{
    AttestationReport, ReportIssuer, ReportVerificationError, SimulatedReportIssuer, TargetInfo,
    REPORT_SIZE,
};
use eyre::Result as EyreResult;

fn enclave(mr_enclave: u8) -> SimulatedReportIssuer {
    SimulatedReportIssuer::new(Arc::new(SimulatedKeyDeriver::new(EnclaveIdentity::new(
        Measurement::new([mr_enclave; 32]),
        Measurement::new([0xaa; 32]),
        1,
        1,
    ))))
}

#[test]
fn test_report_verifies_for_addressed_target_only() -> EyreResult<()> {
    let app = enclave(1);
    let verifier = enclave(2);
    let bystander = enclave(3);

    let report = app.create_report(&verifier.self_target_info()?, b"nonce")?;

    verifier.verify_report(&report)?;

    assert_eq!(
        bystander.verify_report(&report),
        Err(ReportVerificationError::MacMismatch)
    );
    assert_eq!(
        app.verify_report(&report),
        Err(ReportVerificationError::MacMismatch)
    );

    Ok(())
}

#[test]
fn test_self_report_verifies_locally() -> EyreResult<()> {
    let app = enclave(1);

    let report = app.create_report(&app.self_target_info()?, &[])?;

    app.verify_report(&report)?;
    assert_eq!(report.issuer().mr_enclave, Measurement::new([1; 32]));

    Ok(())
}

#[test]
fn test_tampered_report_fails_verification() -> EyreResult<()> {
    let app = enclave(1);
    let verifier = enclave(2);

    let report = app.create_report(&verifier.self_target_info()?, b"bound data")?;

    let mut forged = report;
    forged.report_data[0] ^= 1;
    assert_eq!(
        verifier.verify_report(&forged),
        Err(ReportVerificationError::MacMismatch)
    );

    let mut forged = report;
    forged.isv_svn = 2;
    assert_eq!(
        verifier.verify_report(&forged),
        Err(ReportVerificationError::MacMismatch)
    );

    Ok(())
}

#[test]
fn test_report_survives_wire_form() -> EyreResult<()> {
    let app = enclave(1);
    let verifier = enclave(2);

    let target = TargetInfo::from_bytes(&verifier.self_target_info()?.to_bytes())?;
    let report = app.create_report(&target, b"wire")?;

    let bytes = report.to_bytes();
    assert_eq!(bytes.len(), REPORT_SIZE);

    let parsed = AttestationReport::from_bytes(&bytes)?;
    verifier.verify_report(&parsed)?;

    Ok(())
}

#[test]
fn test_other_platform_secret_cannot_verify() -> EyreResult<()> {
    let app = enclave(1);
    let verifier_identity = EnclaveIdentity::new(
        Measurement::new([2; 32]),
        Measurement::new([0xaa; 32]),
        1,
        1,
    );
    let foreign = SimulatedReportIssuer::new(Arc::new(SimulatedKeyDeriver::with_platform_secret(
        verifier_identity,
        [9; 32],
    )));

    let report = app.create_report(&foreign.self_target_info()?, b"")?;

    assert_eq!(
        foreign.verify_report(&report),
        Err(ReportVerificationError::MacMismatch)
    );

    Ok(())
}
