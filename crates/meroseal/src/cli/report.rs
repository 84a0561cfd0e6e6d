use std::fs::{read, write};

use calimero_enclave_primitives::buffer::{BufferView, BufferViewMut};
use calimero_tee_attestation::{AttestationReport, REPORT_SIZE};
use camino::Utf8PathBuf;
use clap::Parser;
use eyre::{Result as EyreResult, WrapErr};
use tracing::{info, warn};

use crate::cli::RootArgs;

/// Create an attestation report binding caller data
#[derive(Debug, Parser)]
pub struct ReportCommand {
    /// Data bound into the report, at most 64 bytes
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub user_data: String,

    /// Target info of the verifying enclave (512 bytes), this enclave if omitted
    #[arg(long, value_name = "PATH")]
    pub target: Option<Utf8PathBuf>,

    /// Write the raw report here instead of printing it as hex
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,
}

impl ReportCommand {
    pub fn run(self, root_args: &RootArgs) -> EyreResult<()> {
        let native = root_args.native()?;

        let target_info = match &self.target {
            Some(path) => read(path).wrap_err_with(|| format!("failed to read {path:?}"))?,
            None => native
                .platform()
                .reports()
                .self_target_info()?
                .to_bytes()
                .to_vec(),
        };

        let mut report = [0; REPORT_SIZE];

        let _written = native.create_report(
            BufferView::whole(&target_info),
            BufferView::whole(self.user_data.as_bytes()),
            BufferViewMut::whole(&mut report),
        )?;

        if self.target.is_none() {
            if let Some(verifier) = native.platform().verifier() {
                verifier.verify_report(&AttestationReport::from_bytes(&report)?)?;
                info!("Report verified by its target");
            }
        }

        if native.is_enclave_simulation() {
            warn!("Report was created in simulation mode and proves nothing");
        }

        match &self.output {
            Some(path) => {
                write(path, report).wrap_err_with(|| format!("failed to write {path:?}"))?;
            }
            None => println!("{}", hex::encode(report)),
        }

        Ok(())
    }
}
