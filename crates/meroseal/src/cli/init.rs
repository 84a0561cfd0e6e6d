use std::fs::create_dir_all;

use calimero_enclave::config::{PlatformMode, SealingConfig};
use calimero_enclave::ConfigFile;
use calimero_enclave_primitives::identity::{EnclaveIdentity, Measurement};
use clap::{Parser, ValueEnum};
use eyre::{bail, Result as EyreResult, WrapErr};
use rand::{thread_rng, Rng};
use tracing::{info, warn};

use crate::cli::{BindingArg, RootArgs};

/// Initialize the enclave configuration
#[derive(Debug, Parser)]
pub struct InitCommand {
    /// Platform the enclave runs on
    #[arg(long, value_enum, default_value_t = ModeArg::Simulation)]
    pub mode: ModeArg,

    /// Fall back to simulation when hardware support is unavailable
    #[arg(long)]
    pub simulation_fallback: bool,

    /// Code measurement of the simulated enclave, random if omitted
    #[arg(long, value_name = "HEX")]
    pub mr_enclave: Option<Measurement>,

    /// Signer measurement of the simulated enclave, random if omitted
    #[arg(long, value_name = "HEX")]
    pub mr_signer: Option<Measurement>,

    /// Product id of the simulated enclave
    #[arg(long, value_name = "ID", default_value_t = 0)]
    pub isv_prod_id: u16,

    /// Security version of the simulated enclave
    #[arg(long, value_name = "SVN", default_value_t = 0)]
    pub isv_svn: u16,

    /// Key binding used when sealing
    #[arg(long, value_enum, default_value_t = BindingArg::Signer)]
    pub binding: BindingArg,

    /// Size of the in-memory volume in bytes, 0 disables it
    #[arg(long, value_name = "BYTES", default_value_t = 0)]
    pub in_memory_size: u64,

    /// Size of the persistent volume in bytes, 0 disables it
    #[arg(long, value_name = "BYTES", default_value_t = 0)]
    pub persistent_size: u64,

    /// Force initialization even if a configuration already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    Simulation,
    Hardware,
}

impl From<ModeArg> for PlatformMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Simulation => Self::Simulation,
            ModeArg::Hardware => Self::Hardware,
        }
    }
}

impl InitCommand {
    pub fn run(self, root_args: &RootArgs) -> EyreResult<()> {
        let path = &root_args.home;

        if !path.exists() {
            create_dir_all(path)
                .wrap_err_with(|| format!("failed to create directory {path:?}"))?;
        }

        if ConfigFile::exists(path) {
            if let Err(err) = ConfigFile::load(path) {
                if self.force {
                    warn!(%err, "Failed to load existing configuration, overwriting");
                } else {
                    bail!("Failed to load existing configuration: {err}");
                }
            }
            if !self.force {
                bail!("Enclave is already initialized in {path:?}");
            }
        }

        let mut rng = thread_rng();

        let mr_enclave = self
            .mr_enclave
            .unwrap_or_else(|| Measurement::new(rng.gen()));
        let mr_signer = self
            .mr_signer
            .unwrap_or_else(|| Measurement::new(rng.gen()));

        let identity =
            EnclaveIdentity::new(mr_enclave, mr_signer, self.isv_prod_id, self.isv_svn);

        let mut config = ConfigFile::new(self.mode.into(), identity);
        config.simulation_fallback = self.simulation_fallback;
        config.sealing = SealingConfig::new(self.binding.into());
        config.filesystem.in_memory_size = self.in_memory_size;
        config.filesystem.persistent_size = self.persistent_size;

        let backing_dir = config.backing_dir(path);
        create_dir_all(&backing_dir)
            .wrap_err_with(|| format!("failed to create directory {backing_dir:?}"))?;

        config.save(path)?;

        info!(
            home=%path,
            %mr_enclave,
            %mr_signer,
            mode=?config.mode,
            "Initialized enclave configuration"
        );

        Ok(())
    }
}
