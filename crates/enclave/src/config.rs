use std::fs::{read_to_string, write};

use calimero_enclave_keys::KeyBinding;
use calimero_enclave_primitives::identity::EnclaveIdentity;
use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result as EyreResult, WrapErr};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "enclave.toml";

/// Which backends the enclave runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformMode {
    #[default]
    Simulation,
    Hardware,
}

#[derive(Debug, Deserialize, Serialize)]
#[non_exhaustive]
pub struct ConfigFile {
    #[serde(default)]
    pub mode: PlatformMode,

    /// Fall back to the simulated backends when hardware mode is requested
    /// but unavailable.
    #[serde(default)]
    pub simulation_fallback: bool,

    pub identity: EnclaveIdentity,

    #[serde(default)]
    pub sealing: SealingConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub filesystem: FilesystemConfig,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[non_exhaustive]
pub struct SealingConfig {
    /// Binding of the key used by `seal_data`.
    #[serde(default)]
    pub binding: KeyBinding,
}

impl SealingConfig {
    #[must_use]
    pub const fn new(binding: KeyBinding) -> Self {
        Self { binding }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[non_exhaustive]
pub struct SimulationConfig {
    /// Hex encoded 32-byte platform secret. Without it the well-known
    /// default secret is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_secret: Option<String>,
}

impl SimulationConfig {
    #[must_use]
    pub const fn new(platform_secret: Option<String>) -> Self {
        Self { platform_secret }
    }

    pub fn platform_secret(&self) -> EyreResult<Option<[u8; 32]>> {
        let Some(encoded) = &self.platform_secret else {
            return Ok(None);
        };

        let mut secret = [0; 32];

        hex::decode_to_slice(encoded, &mut secret)
            .wrap_err("simulation.platform_secret must be 32 hex encoded bytes")?;

        Ok(Some(secret))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct FilesystemConfig {
    /// Host directory of the persistent volume, relative to the home
    /// directory unless absolute.
    pub backing_dir: Utf8PathBuf,
    pub in_memory_path: Utf8PathBuf,
    pub in_memory_size: u64,
    pub persistent_path: Utf8PathBuf,
    pub persistent_size: u64,
}

impl FilesystemConfig {
    #[must_use]
    pub const fn new(
        backing_dir: Utf8PathBuf,
        in_memory_path: Utf8PathBuf,
        in_memory_size: u64,
        persistent_path: Utf8PathBuf,
        persistent_size: u64,
    ) -> Self {
        Self {
            backing_dir,
            in_memory_path,
            in_memory_size,
            persistent_path,
            persistent_size,
        }
    }
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self::new("sealed".into(), "/tmp".into(), 0, "/data".into(), 0)
    }
}

impl ConfigFile {
    #[must_use]
    pub fn new(mode: PlatformMode, identity: EnclaveIdentity) -> Self {
        Self {
            mode,
            simulation_fallback: false,
            identity,
            sealing: SealingConfig::default(),
            simulation: SimulationConfig::default(),
            filesystem: FilesystemConfig::default(),
        }
    }

    #[must_use]
    pub fn exists(dir: &Utf8Path) -> bool {
        dir.join(CONFIG_FILE).is_file()
    }

    pub fn load(dir: &Utf8Path) -> EyreResult<Self> {
        let path = dir.join(CONFIG_FILE);
        let content = read_to_string(&path)
            .wrap_err_with(|| format!("failed to read configuration from {path:?}"))?;

        toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse configuration from {path:?}"))
    }

    pub fn save(&self, dir: &Utf8Path) -> EyreResult<()> {
        let path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)?;

        write(&path, content)
            .wrap_err_with(|| format!("failed to write configuration to {path:?}"))?;

        Ok(())
    }

    /// The persistent volume's backing directory, resolved against `home`.
    #[must_use]
    pub fn backing_dir(&self, home: &Utf8Path) -> Utf8PathBuf {
        home.join(&self.filesystem.backing_dir)
    }
}

#[cfg(test)]
mod tests {
    use calimero_enclave_primitives::identity::Measurement;
    use tempdir::TempDir;

    use super::*;

    fn identity() -> EnclaveIdentity {
        EnclaveIdentity::new(
            Measurement::new([0x11; 32]),
            Measurement::new([0x22; 32]),
            3,
            7,
        )
    }

    fn home(dir: &TempDir) -> Utf8PathBuf {
        dir.path()
            .to_owned()
            .try_into()
            .expect("path conversion should succeed")
    }

    #[test]
    fn test_save_then_load() -> EyreResult<()> {
        let dir = TempDir::new("_calimero_enclave_config")?;
        let home = home(&dir);

        let mut config = ConfigFile::new(PlatformMode::Hardware, identity());
        config.simulation_fallback = true;
        config.sealing = SealingConfig::new(KeyBinding::Measurement);
        config.filesystem.persistent_size = 1 << 20;

        assert!(!ConfigFile::exists(&home));
        config.save(&home)?;
        assert!(ConfigFile::exists(&home));

        let loaded = ConfigFile::load(&home)?;

        assert_eq!(loaded.mode, PlatformMode::Hardware);
        assert!(loaded.simulation_fallback);
        assert_eq!(loaded.identity, identity());
        assert_eq!(loaded.sealing.binding, KeyBinding::Measurement);
        assert_eq!(loaded.filesystem.persistent_size, 1 << 20);
        assert_eq!(loaded.simulation.platform_secret, None);

        Ok(())
    }

    #[test]
    fn test_minimal_file_uses_defaults() -> EyreResult<()> {
        let config: ConfigFile = toml::from_str(&format!(
            "[identity]\nmr_enclave = \"{}\"\nmr_signer = \"{}\"\nisv_prod_id = 1\nisv_svn = 2\n",
            "aa".repeat(32),
            "bb".repeat(32),
        ))?;

        assert_eq!(config.mode, PlatformMode::Simulation);
        assert!(!config.simulation_fallback);
        assert_eq!(config.sealing.binding, KeyBinding::Signer);
        assert_eq!(config.identity.cpu_svn, [0; 16]);
        assert_eq!(config.filesystem.in_memory_size, 0);
        assert_eq!(
            config.backing_dir(Utf8Path::new("/home/node")),
            Utf8PathBuf::from("/home/node/sealed")
        );

        Ok(())
    }

    #[test]
    fn test_platform_secret_decoding() -> EyreResult<()> {
        assert_eq!(SimulationConfig::default().platform_secret()?, None);

        let config = SimulationConfig::new(Some("07".repeat(32)));
        assert_eq!(config.platform_secret()?, Some([7; 32]));

        let short = SimulationConfig::new(Some("07".repeat(31)));
        assert!(short.platform_secret().is_err());

        Ok(())
    }

    #[test]
    fn test_missing_file_has_context() -> EyreResult<()> {
        let dir = TempDir::new("_calimero_enclave_config")?;

        let err = ConfigFile::load(&home(&dir)).expect_err("no config was written");

        assert!(
            err.to_string().contains("failed to read configuration"),
            "{err}"
        );

        Ok(())
    }
}
