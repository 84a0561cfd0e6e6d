use calimero_enclave::config::FilesystemConfig;
use calimero_enclave::{Native, NativeError, Platform};
use calimero_enclave_fs::{FsError, MountError, MountState};
use calimero_enclave_keys::{
    KeyPolicy, KeyRequest, SimulatedKeyDeriver, KEY_REQUEST_SIZE, KEY_SIZE,
};
use calimero_enclave_primitives::buffer::{BufferError, BufferView, BufferViewMut};
use calimero_enclave_primitives::identity::{EnclaveIdentity, Measurement};
use calimero_sealing::{UnsealReason, SEALED_BLOB_OVERHEAD};
use calimero_tee_attestation::{AttestationReport, TargetInfo, REPORT_SIZE, TARGET_INFO_SIZE};
use camino::Utf8PathBuf;
use eyre::Result as EyreResult;
use tempdir::TempDir;

fn identity(mr_enclave: u8) -> EnclaveIdentity {
    EnclaveIdentity::new(
        Measurement::new([mr_enclave; 32]),
        Measurement::new([0x5e; 32]),
        1,
        3,
    )
}

fn native(mr_enclave: u8) -> Native {
    let deriver = SimulatedKeyDeriver::new(identity(mr_enclave));

    Native::new(Platform::simulated(deriver))
}

fn view(bytes: &[u8]) -> BufferView<'_> {
    BufferView::whole(bytes)
}

fn seal(native: &Native, plaintext: &[u8], aad: &[u8]) -> EyreResult<Vec<u8>> {
    let mut out = vec![0; SEALED_BLOB_OVERHEAD + plaintext.len() + aad.len()];

    let written = native.seal_data(BufferViewMut::whole(&mut out), view(plaintext), view(aad))?;
    out.truncate(written);

    Ok(out)
}

#[test]
fn test_sealed_data_roundtrips_through_sub_ranges() -> EyreResult<()> {
    let native = native(1);

    let shared = b"....secret payload....header....".to_vec();
    let plaintext = BufferView::new(&shared, 4, 14)?;
    let aad = BufferView::new(&shared, 22, 6)?;

    let mut arena = vec![0xee; 512];
    let blob_len = {
        let out = BufferViewMut::new(&mut arena, 100, 200)?;
        native.seal_data(out, plaintext, aad)?
    };

    assert_eq!(
        u64::try_from(blob_len)?,
        Native::calc_sealed_blob_size(14, 6)
    );
    assert!(arena[..100].iter().all(|b| *b == 0xee));
    assert!(arena[100 + blob_len..].iter().all(|b| *b == 0xee));

    let blob = BufferView::new(&arena, 100, blob_len)?;

    assert_eq!(Native::plaintext_size_from_sealed_data(blob)?, 14);
    assert_eq!(Native::authenticated_data_size(blob)?, 6);

    let mut plaintext_out = [0; 14];
    let mut aad_out = [0; 6];

    let lengths = native.unseal_data(
        blob,
        BufferViewMut::whole(&mut plaintext_out),
        BufferViewMut::whole(&mut aad_out),
    )?;

    assert_eq!(lengths, (14, 6));
    assert_eq!(&plaintext_out, b"secret payload");
    assert_eq!(&aad_out, b"header");

    Ok(())
}

#[test]
fn test_empty_payload_roundtrips() -> EyreResult<()> {
    let native = native(1);

    let blob = seal(&native, b"", b"")?;

    assert_eq!(
        u64::try_from(blob.len())?,
        Native::calc_sealed_blob_size(0, 0)
    );

    let lengths = native.unseal_data(
        view(&blob),
        BufferViewMut::whole(&mut []),
        BufferViewMut::whole(&mut []),
    )?;

    assert_eq!(lengths, (0, 0));

    Ok(())
}

#[test]
fn test_undersized_seal_output_is_never_written() -> EyreResult<()> {
    let native = native(1);

    let mut out = [0xaa; SEALED_BLOB_OVERHEAD + 3];

    let err = native
        .seal_data(BufferViewMut::whole(&mut out), view(b"four"), view(b""))
        .expect_err("output is one byte short");

    assert!(matches!(
        err,
        NativeError::Buffer(BufferError::TooSmall {
            required,
            available,
        }) if required == SEALED_BLOB_OVERHEAD + 4 && available == SEALED_BLOB_OVERHEAD + 3
    ));
    assert!(out.iter().all(|b| *b == 0xaa));

    Ok(())
}

#[test]
fn test_undersized_unseal_outputs_are_never_written() -> EyreResult<()> {
    let native = native(1);
    let blob = seal(&native, b"plaintext", b"aad")?;

    let mut plaintext_out = [0xaa; 8];
    let mut aad_out = [0xbb; 3];

    assert!(matches!(
        native.unseal_data(
            view(&blob),
            BufferViewMut::whole(&mut plaintext_out),
            BufferViewMut::whole(&mut aad_out),
        ),
        Err(NativeError::Buffer(BufferError::TooSmall { required: 9, .. }))
    ));
    assert!(plaintext_out.iter().all(|b| *b == 0xaa));
    assert!(aad_out.iter().all(|b| *b == 0xbb));

    let mut plaintext_out = [0xaa; 9];
    let mut aad_out = [0xbb; 2];

    assert!(matches!(
        native.unseal_data(
            view(&blob),
            BufferViewMut::whole(&mut plaintext_out),
            BufferViewMut::whole(&mut aad_out),
        ),
        Err(NativeError::Buffer(BufferError::TooSmall { required: 3, .. }))
    ));
    assert!(plaintext_out.iter().all(|b| *b == 0xaa));

    Ok(())
}

#[test]
fn test_out_of_bounds_views_are_rejected() {
    let bytes = [0; 16];

    assert!(matches!(
        BufferView::new(&bytes, 10, 7),
        Err(BufferError::OutOfBounds { .. })
    ));
    assert!(matches!(
        BufferView::new(&bytes, usize::MAX, 2),
        Err(BufferError::OutOfBounds { .. })
    ));
}

#[test]
fn test_unseal_failures_report_their_reason() -> EyreResult<()> {
    let sealer = native(1);
    let mut blob = seal(&sealer, b"plaintext", b"aad")?;

    let mut plaintext_out = [0; 9];
    let mut aad_out = [0; 3];

    let mut unseal = |blob: &[u8]| {
        sealer.unseal_data(
            view(blob),
            BufferViewMut::whole(&mut plaintext_out),
            BufferViewMut::whole(&mut aad_out),
        )
    };

    let reason = |result: Result<(usize, usize), NativeError>| match result {
        Err(NativeError::Unseal(err)) => Some(err.reason()),
        _ => None,
    };

    assert_eq!(reason(unseal(&blob[..40])), Some(UnsealReason::MalformedBlob));

    let last = blob.len() - 1;
    blob[last] ^= 0x01;
    assert_eq!(reason(unseal(&blob)), Some(UnsealReason::TagMismatch));
    blob[last] ^= 0x01;

    let other = native(2);
    let measurement_bound = Native::new(
        Platform::simulated(SimulatedKeyDeriver::new(identity(1)))
            .with_seal_policy(KeyPolicy::measurement()),
    );
    let bound_blob = seal(&measurement_bound, b"plaintext", b"aad")?;

    assert!(matches!(
        other.unseal_data(
            view(&bound_blob),
            BufferViewMut::whole(&mut [0; 9]),
            BufferViewMut::whole(&mut [0; 3]),
        ),
        Err(NativeError::Unseal(err)) if err.reason() == UnsealReason::KeyMismatch
    ));

    Ok(())
}

#[test]
fn test_signer_bound_data_survives_an_upgrade() -> EyreResult<()> {
    let blob = seal(&native(1), b"carried over", b"")?;

    let mut plaintext_out = [0; 12];

    let _lengths = native(2).unseal_data(
        view(&blob),
        BufferViewMut::whole(&mut plaintext_out),
        BufferViewMut::whole(&mut []),
    )?;

    assert_eq!(&plaintext_out, b"carried over");

    Ok(())
}

#[test]
fn test_size_queries_reject_garbage() {
    assert!(matches!(
        Native::authenticated_data_size(view(&[0; 8])),
        Err(NativeError::MalformedBlob(_))
    ));
    assert!(matches!(
        Native::plaintext_size_from_sealed_data(view(&[0; 200])),
        Err(NativeError::MalformedBlob(_))
    ));
}

#[test]
fn test_report_for_target_verifies_there() -> EyreResult<()> {
    let issuer = native(1);
    let target = native(2);

    let target_info = target.platform().reports().self_target_info()?.to_bytes();

    let mut out = [0; REPORT_SIZE];
    let written = issuer.create_report(
        view(&target_info),
        view(b"nonce"),
        BufferViewMut::whole(&mut out),
    )?;

    assert_eq!(written, REPORT_SIZE);
    assert!(issuer.is_enclave_simulation());

    let report = AttestationReport::from_bytes(&out)?;

    assert_eq!(&report.report_data[..5], b"nonce");
    assert_eq!(report.mr_enclave, Measurement::new([1; 32]));

    let verifier = target
        .platform()
        .verifier()
        .expect("simulated platforms verify locally");
    verifier.verify_report(&report)?;

    let own = issuer
        .platform()
        .verifier()
        .expect("simulated platforms verify locally");
    assert!(own.verify_report(&report).is_err());

    Ok(())
}

#[test]
fn test_report_rejects_bad_inputs() {
    let native = native(1);
    let target_info = TargetInfo::for_identity(&identity(2)).to_bytes();

    let mut out = [0; REPORT_SIZE];
    assert!(matches!(
        native.create_report(
            view(&target_info),
            view(&[0; 65]),
            BufferViewMut::whole(&mut out),
        ),
        Err(NativeError::ReportCreation(_))
    ));

    assert!(matches!(
        native.create_report(
            view(&target_info[..TARGET_INFO_SIZE - 1]),
            view(b""),
            BufferViewMut::whole(&mut out),
        ),
        Err(NativeError::ReportCreation(_))
    ));

    let mut short = [0; REPORT_SIZE - 1];
    assert!(matches!(
        native.create_report(
            view(&target_info),
            view(b""),
            BufferViewMut::whole(&mut short),
        ),
        Err(NativeError::Buffer(BufferError::TooSmall { .. }))
    ));
}

#[test]
fn test_get_key_follows_the_request() -> EyreResult<()> {
    let native = native(1);
    let identity = native.platform().keys().identity();

    let signer = KeyRequest::seal(KeyPolicy::signer(), &identity).to_bytes();
    let measurement = KeyRequest::seal(KeyPolicy::measurement(), &identity).to_bytes();

    let mut first = [0; KEY_SIZE];
    let mut second = [0; KEY_SIZE];
    let mut third = [0; KEY_SIZE];

    assert_eq!(
        native.get_key(view(&signer), BufferViewMut::whole(&mut first))?,
        KEY_SIZE
    );
    let _written = native.get_key(view(&signer), BufferViewMut::whole(&mut second))?;
    let _written = native.get_key(view(&measurement), BufferViewMut::whole(&mut third))?;

    assert_eq!(first, second);
    assert_ne!(first, third);

    assert!(matches!(
        native.get_key(
            view(&signer[..KEY_REQUEST_SIZE - 1]),
            BufferViewMut::whole(&mut first)
        ),
        Err(NativeError::KeyDerivation(_))
    ));

    let mut short = [0; KEY_SIZE - 1];
    assert!(matches!(
        native.get_key(view(&signer), BufferViewMut::whole(&mut short)),
        Err(NativeError::Buffer(BufferError::TooSmall { .. }))
    ));

    Ok(())
}

#[test]
fn test_file_systems_are_set_up_once() -> EyreResult<()> {
    let dir = TempDir::new("_calimero_enclave_native")?;
    let backing_dir = Utf8PathBuf::try_from(dir.path().to_owned())?;

    let native = Native::new(
        Platform::simulated(SimulatedKeyDeriver::new(identity(1))).with_backing_dir(backing_dir),
    );

    assert!(matches!(
        native.filesystem().read("/tmp/a"),
        Err(FsError::NotMounted)
    ));

    native.setup_file_systems(1024, 1024, "/tmp", "/data", view(&[9; 32]))?;

    assert_eq!(native.filesystem().state(), MountState::Mounted);

    native.filesystem().write("/tmp/scratch", b"gone on exit")?;
    native.filesystem().write("/data/kept", b"sealed to disk")?;

    assert_eq!(native.filesystem().read("/data/kept")?, b"sealed to disk");
    assert_eq!(native.filesystem().usage("/tmp")?, (1024, 12));

    assert!(matches!(
        native.setup_file_systems(1024, 0, "/other", "/data", view(&[])),
        Err(NativeError::Mount(MountError::AlreadySetUp))
    ));

    Ok(())
}

#[test]
fn test_file_systems_follow_the_configuration() -> EyreResult<()> {
    let dir = TempDir::new("_calimero_enclave_native")?;
    let backing_dir = Utf8PathBuf::try_from(dir.path().to_owned())?;

    let config = FilesystemConfig::new("sealed".into(), "/tmp".into(), 0, "/vault".into(), 256);

    let mounted = || -> EyreResult<Native> {
        let native = Native::new(
            Platform::simulated(SimulatedKeyDeriver::new(identity(1)))
                .with_backing_dir(backing_dir.clone()),
        );
        native.setup_file_systems_from_config(&config, view(&[5; 32]))?;
        Ok(native)
    };

    let first = mounted()?;
    first.filesystem().write("/vault/token", b"kept across mounts")?;

    assert!(matches!(
        first.filesystem().write("/tmp/scratch", b"no in-memory volume"),
        Err(FsError::NoMount(_))
    ));
    assert_eq!(first.filesystem().usage("/vault")?, (256, 18));
    drop(first);

    let second = mounted()?;

    assert_eq!(second.filesystem().read("/vault/token")?, b"kept across mounts");
    assert_eq!(
        second.filesystem().list("/vault")?,
        [Utf8PathBuf::from("/vault/token")]
    );

    Ok(())
}

#[test]
fn test_persistent_mount_without_key_is_fatal() -> EyreResult<()> {
    let dir = TempDir::new("_calimero_enclave_native")?;
    let backing_dir = Utf8PathBuf::try_from(dir.path().to_owned())?;

    let native = Native::new(
        Platform::simulated(SimulatedKeyDeriver::new(identity(1))).with_backing_dir(backing_dir),
    );

    assert!(matches!(
        native.setup_file_systems(1024, 1024, "/tmp", "/data", view(&[])),
        Err(NativeError::Mount(MountError::MissingKey(_)))
    ));
    assert_eq!(native.filesystem().state(), MountState::Failed);
    assert!(matches!(
        native.filesystem().read("/tmp/a"),
        Err(FsError::Unusable)
    ));

    Ok(())
}
