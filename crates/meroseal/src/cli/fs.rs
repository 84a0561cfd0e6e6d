use std::fs::{read, write};

use calimero_enclave::{Native, Platform};
use calimero_enclave_keys::{KeyName, KeyPolicy, KeyRequest, KEY_ID_SIZE, KEY_SIZE};
use calimero_enclave_primitives::buffer::{BufferView, BufferViewMut};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use eyre::{Result as EyreResult, WrapErr};
use tracing::info;
use zeroize::Zeroizing;

use crate::cli::RootArgs;

/// Key id of the seal key the volumes are encrypted under.
const FILESYSTEM_KEY_ID: [u8; KEY_ID_SIZE] = *b"calimero-enclave-filesystem-key\0";

/// Work with the volumes described in `[filesystem]`
#[derive(Debug, Parser)]
pub struct FsCommand {
    #[command(subcommand)]
    pub subcommand: FsSubCommands,
}

#[derive(Debug, Subcommand)]
pub enum FsSubCommands {
    /// Store a host file in a volume
    Write {
        /// Path inside the enclave file system
        path: Utf8PathBuf,

        /// Host file to store
        #[arg(long, short, value_name = "PATH")]
        input: Utf8PathBuf,
    },
    /// Copy a file out of a volume
    Read {
        /// Path inside the enclave file system
        path: Utf8PathBuf,

        /// Where to write the contents
        #[arg(long, short, value_name = "PATH")]
        output: Utf8PathBuf,
    },
    /// Delete a file from a volume
    Remove {
        /// Path inside the enclave file system
        path: Utf8PathBuf,
    },
    /// List the files below a directory
    Ls {
        /// Directory inside the enclave file system
        path: Utf8PathBuf,
    },
    /// Show capacity and usage of the volume serving a path
    Usage {
        /// Path inside the enclave file system
        path: Utf8PathBuf,
    },
}

impl FsCommand {
    pub fn run(self, root_args: &RootArgs) -> EyreResult<()> {
        let native = mount(root_args)?;
        let fs = native.filesystem();

        match self.subcommand {
            FsSubCommands::Write { path, input } => {
                let data = read(&input).wrap_err_with(|| format!("failed to read {input:?}"))?;
                fs.write(&path, &data)?;
                info!(path=%path, len = data.len(), "Stored file");
            }
            FsSubCommands::Read { path, output } => {
                let data = Zeroizing::new(fs.read(&path)?);
                write(&output, &*data).wrap_err_with(|| format!("failed to write {output:?}"))?;
                info!(path=%path, output=%output, len = data.len(), "Copied file out");
            }
            FsSubCommands::Remove { path } => {
                fs.remove(&path)?;
                info!(path=%path, "Removed file");
            }
            FsSubCommands::Ls { path } => {
                for file in fs.list(&path)? {
                    println!("{file}");
                }
            }
            FsSubCommands::Usage { path } => {
                let (capacity, used) = fs.usage(&path)?;
                println!("{used}/{capacity} bytes");
            }
        }

        Ok(())
    }
}

/// Mounts the configured volumes under a key derived from the enclave's
/// seal key, so only the same enclave (or signer) can read them back.
fn mount(root_args: &RootArgs) -> EyreResult<Native> {
    let config = root_args.load_config()?;
    let native = Native::new(Platform::from_config(&config, &root_args.home)?);

    let identity = native.platform().keys().identity();
    let request = KeyRequest::new(
        KeyName::Seal,
        KeyPolicy::new(config.sealing.binding, FILESYSTEM_KEY_ID),
        identity.isv_svn,
        identity.cpu_svn,
    );

    let mut key = Zeroizing::new([0; KEY_SIZE]);

    let _written = native.get_key(
        BufferView::whole(&request.to_bytes()),
        BufferViewMut::whole(&mut *key),
    )?;

    native
        .setup_file_systems_from_config(&config.filesystem, BufferView::whole(&*key))
        .wrap_err("failed to mount the configured file systems")?;

    Ok(native)
}
