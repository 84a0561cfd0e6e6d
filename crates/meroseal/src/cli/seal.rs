use std::fs::{read, write};

use calimero_enclave::Native;
use calimero_enclave_primitives::buffer::{BufferView, BufferViewMut};
use camino::Utf8PathBuf;
use clap::Parser;
use eyre::{Result as EyreResult, WrapErr};
use tracing::info;

use crate::cli::RootArgs;

/// Seal a file under the configured key policy
#[derive(Debug, Parser)]
pub struct SealCommand {
    /// File to seal
    #[arg(long, short, value_name = "PATH")]
    pub input: Utf8PathBuf,

    /// Authenticated data bound to the blob, readable without unsealing
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub aad: String,

    /// Where to write the sealed blob
    #[arg(long, short, value_name = "PATH")]
    pub output: Utf8PathBuf,
}

impl SealCommand {
    pub fn run(self, root_args: &RootArgs) -> EyreResult<()> {
        let native = root_args.native()?;

        let plaintext =
            read(&self.input).wrap_err_with(|| format!("failed to read {:?}", self.input))?;

        let size = Native::calc_sealed_blob_size(
            u32::try_from(plaintext.len())?,
            u32::try_from(self.aad.len())?,
        );

        let mut blob = vec![0; usize::try_from(size)?];

        let written = native.seal_data(
            BufferViewMut::whole(&mut blob),
            BufferView::whole(&plaintext),
            BufferView::whole(self.aad.as_bytes()),
        )?;
        blob.truncate(written);

        write(&self.output, &blob)
            .wrap_err_with(|| format!("failed to write {:?}", self.output))?;

        info!(
            input=%self.input,
            output=%self.output,
            len = written,
            simulation = native.is_enclave_simulation(),
            "Sealed file"
        );

        Ok(())
    }
}
