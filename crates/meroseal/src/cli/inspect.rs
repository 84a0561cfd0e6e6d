use std::fs::read;

use calimero_sealing::SealedBlob;
use camino::Utf8PathBuf;
use clap::Parser;
use eyre::{Result as EyreResult, WrapErr};

/// Show the header and authenticated data of a sealed blob
///
/// Needs no configuration: nothing here touches key material.
#[derive(Debug, Parser)]
pub struct InspectCommand {
    /// Sealed blob
    #[arg(value_name = "PATH")]
    pub blob: Utf8PathBuf,
}

impl InspectCommand {
    pub fn run(self) -> EyreResult<()> {
        let bytes = read(&self.blob).wrap_err_with(|| format!("failed to read {:?}", self.blob))?;

        let blob = SealedBlob::from_bytes(bytes)
            .wrap_err_with(|| format!("{:?} is not a sealed blob", self.blob))?;

        let header = blob.header();

        println!("binding:            {:?}", header.policy().binding());
        println!("key id:             {}", hex::encode(header.policy().key_id()));
        println!("isv svn:            {}", header.isv_svn());
        println!("plaintext size:     {}", header.plaintext_len());
        println!("authenticated size: {}", header.aad_len());
        println!("blob size:          {}", header.blob_len());
        println!(
            "authenticated data: {}",
            String::from_utf8_lossy(blob.authenticated_data())
        );

        Ok(())
    }
}
