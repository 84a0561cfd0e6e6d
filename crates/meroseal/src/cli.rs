use calimero_enclave::{ConfigFile, Native, Platform};
use calimero_enclave_keys::KeyBinding;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use const_format::concatcp;
use eyre::{bail, Result as EyreResult};

use crate::defaults;

mod fs;
mod init;
mod inspect;
mod key;
mod report;
mod seal;
mod unseal;

use fs::FsCommand;
use init::InitCommand;
use inspect::InspectCommand;
use key::KeyCommand;
use report::ReportCommand;
use seal::SealCommand;
use unseal::UnsealCommand;

pub const EXAMPLES: &str = r"
  # Initialize a simulated enclave
  $ meroseal --home data/ init

  # Seal a file, binding a label as authenticated data
  $ meroseal --home data/ seal --input secret.txt --aad v1 --output secret.sealed

  # Show the header of a sealed blob
  $ meroseal inspect secret.sealed

  # Recover the file
  $ meroseal --home data/ unseal --input secret.sealed --output secret.txt

  # Create a report addressed to ourselves
  $ meroseal --home data/ report --user-data hello

  # Keep a file in the persistent volume
  $ meroseal --home data/ fs write /data/token --input token.txt
";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(after_help = concatcp!(
    "Environment variables:\n",
    "  CALIMERO_ENCLAVE_HOME    Directory for the enclave configuration\n\n",
    "Examples:",
    EXAMPLES
))]
pub struct RootCommand {
    #[command(flatten)]
    pub args: RootArgs,

    #[command(subcommand)]
    pub action: SubCommands,
}

#[derive(Debug, Subcommand)]
pub enum SubCommands {
    Init(InitCommand),
    Seal(SealCommand),
    Unseal(UnsealCommand),
    Inspect(InspectCommand),
    Report(ReportCommand),
    Key(KeyCommand),
    Fs(FsCommand),
}

#[derive(Debug, Parser)]
pub struct RootArgs {
    /// Directory for the enclave configuration and sealed volumes
    #[arg(long, value_name = "PATH", default_value_t = defaults::default_home_dir())]
    #[arg(env = "CALIMERO_ENCLAVE_HOME", hide_env_values = true)]
    pub home: Utf8PathBuf,
}

impl RootArgs {
    pub fn load_config(&self) -> EyreResult<ConfigFile> {
        if !ConfigFile::exists(&self.home) {
            bail!("Enclave is not initialized in {:?}", self.home);
        }

        ConfigFile::load(&self.home)
    }

    /// Boundary operations on the platform the configuration selects.
    pub fn native(&self) -> EyreResult<Native> {
        let config = self.load_config()?;
        let platform = Platform::from_config(&config, &self.home)?;

        Ok(Native::new(platform))
    }
}

impl RootCommand {
    pub fn run(self) -> EyreResult<()> {
        match self.action {
            SubCommands::Init(init) => init.run(&self.args),
            SubCommands::Seal(seal) => seal.run(&self.args),
            SubCommands::Unseal(unseal) => unseal.run(&self.args),
            SubCommands::Inspect(inspect) => inspect.run(),
            SubCommands::Report(report) => report.run(&self.args),
            SubCommands::Key(key) => key.run(&self.args),
            SubCommands::Fs(fs) => fs.run(&self.args),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BindingArg {
    /// Survives enclave upgrades signed by the same key
    Signer,
    /// Only the exact same enclave build
    Measurement,
}

impl From<BindingArg> for KeyBinding {
    fn from(binding: BindingArg) -> Self {
        match binding {
            BindingArg::Signer => Self::Signer,
            BindingArg::Measurement => Self::Measurement,
        }
    }
}
