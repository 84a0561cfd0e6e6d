use std::fs::{read, write};

use calimero_enclave::Native;
use calimero_enclave_primitives::buffer::{BufferView, BufferViewMut};
use camino::Utf8PathBuf;
use clap::Parser;
use eyre::{Result as EyreResult, WrapErr};
use tracing::info;

use crate::cli::RootArgs;

/// Unseal a blob written by `seal`
#[derive(Debug, Parser)]
pub struct UnsealCommand {
    /// Sealed blob
    #[arg(long, short, value_name = "PATH")]
    pub input: Utf8PathBuf,

    /// Where to write the recovered plaintext
    #[arg(long, short, value_name = "PATH")]
    pub output: Utf8PathBuf,
}

impl UnsealCommand {
    pub fn run(self, root_args: &RootArgs) -> EyreResult<()> {
        let native = root_args.native()?;

        let blob =
            read(&self.input).wrap_err_with(|| format!("failed to read {:?}", self.input))?;
        let blob = BufferView::whole(&blob);

        let plaintext_size = Native::plaintext_size_from_sealed_data(blob)?;
        let aad_size = Native::authenticated_data_size(blob)?;

        let mut plaintext = vec![0; usize::try_from(plaintext_size)?];
        let mut aad = vec![0; usize::try_from(aad_size)?];

        let (plaintext_len, aad_len) = native
            .unseal_data(
                blob,
                BufferViewMut::whole(&mut plaintext),
                BufferViewMut::whole(&mut aad),
            )
            .wrap_err_with(|| format!("failed to unseal {:?}", self.input))?;

        write(&self.output, &plaintext[..plaintext_len])
            .wrap_err_with(|| format!("failed to write {:?}", self.output))?;

        info!(
            input=%self.input,
            output=%self.output,
            len = plaintext_len,
            aad=%String::from_utf8_lossy(&aad[..aad_len]),
            "Unsealed file"
        );

        Ok(())
    }
}
