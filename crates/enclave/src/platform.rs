use core::fmt;
use std::sync::Arc;

use calimero_enclave_keys::{
    HardwareKeyDeriver, KeyDeriver, KeyPolicy, SimulatedKeyDeriver, KEY_ID_SIZE,
};
use calimero_sealing::{HardwareSealer, Sealer, SealingEngine};
use calimero_tee_attestation::{HardwareReportIssuer, ReportIssuer, SimulatedReportIssuer};
use camino::{Utf8Path, Utf8PathBuf};
use eyre::{bail, Result as EyreResult};
use tracing::{info, warn};

use crate::config::{ConfigFile, PlatformMode};

/// The backends the enclave runs on, selected once at startup.
pub struct Platform {
    keys: Arc<dyn KeyDeriver>,
    sealer: Box<dyn Sealer>,
    reports: Box<dyn ReportIssuer>,
    verifier: Option<SimulatedReportIssuer>,
    seal_policy: KeyPolicy,
    backing_dir: Utf8PathBuf,
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("simulation", &self.is_simulation())
            .field("identity", &self.keys.identity())
            .field("seal_policy", &self.seal_policy)
            .field("backing_dir", &self.backing_dir)
            .finish_non_exhaustive()
    }
}

impl Platform {
    pub fn from_config(config: &ConfigFile, home: &Utf8Path) -> EyreResult<Self> {
        let seal_policy = KeyPolicy::new(config.sealing.binding, [0; KEY_ID_SIZE]);
        let backing_dir = config.backing_dir(home);

        let hardware_available =
            HardwareKeyDeriver::is_available() && HardwareReportIssuer::is_available();

        let platform = match config.mode {
            PlatformMode::Simulation => Self::simulated_from_config(config)?,
            PlatformMode::Hardware if hardware_available => Self::hardware(),
            PlatformMode::Hardware if config.simulation_fallback => {
                warn!("Hardware enclave support is unavailable, falling back to simulation");
                Self::simulated_from_config(config)?
            }
            PlatformMode::Hardware => bail!(
                "hardware mode requested but this build has no hardware enclave support \
                 (build with `sgx-hw` or set `simulation_fallback = true`)"
            ),
        };

        let platform = platform
            .with_seal_policy(seal_policy)
            .with_backing_dir(backing_dir);

        info!(
            simulation = platform.is_simulation(),
            mr_enclave=%platform.keys.identity().mr_enclave,
            "Enclave platform ready"
        );

        Ok(platform)
    }

    fn simulated_from_config(config: &ConfigFile) -> EyreResult<Self> {
        let deriver = match config.simulation.platform_secret()? {
            Some(secret) => SimulatedKeyDeriver::with_platform_secret(config.identity, secret),
            None => SimulatedKeyDeriver::new(config.identity),
        };

        Ok(Self::simulated(deriver))
    }

    /// Software backends sharing one simulated key hierarchy.
    #[must_use]
    pub fn simulated(deriver: SimulatedKeyDeriver) -> Self {
        let deriver = Arc::new(deriver);
        let issuer = SimulatedReportIssuer::new(Arc::clone(&deriver));

        let keys: Arc<dyn KeyDeriver> = Arc::<SimulatedKeyDeriver>::clone(&deriver);

        Self {
            keys,
            sealer: Box::new(SealingEngine::new(deriver)),
            reports: Box::new(issuer.clone()),
            verifier: Some(issuer),
            seal_policy: KeyPolicy::signer(),
            backing_dir: Utf8PathBuf::new(),
        }
    }

    #[must_use]
    pub fn hardware() -> Self {
        Self {
            keys: Arc::new(HardwareKeyDeriver::new()),
            sealer: Box::new(HardwareSealer::new(HardwareKeyDeriver::new())),
            reports: Box::new(HardwareReportIssuer::new()),
            verifier: None,
            seal_policy: KeyPolicy::signer(),
            backing_dir: Utf8PathBuf::new(),
        }
    }

    /// Policy `seal_data` seals under.
    #[must_use]
    pub fn with_seal_policy(mut self, seal_policy: KeyPolicy) -> Self {
        self.seal_policy = seal_policy;
        self
    }

    #[must_use]
    pub fn with_backing_dir(mut self, backing_dir: impl Into<Utf8PathBuf>) -> Self {
        self.backing_dir = backing_dir.into();
        self
    }

    #[must_use]
    pub fn keys(&self) -> &dyn KeyDeriver {
        &*self.keys
    }

    #[must_use]
    pub fn sealer(&self) -> &dyn Sealer {
        &*self.sealer
    }

    #[must_use]
    pub fn reports(&self) -> &dyn ReportIssuer {
        &*self.reports
    }

    /// Checks reports addressed to this enclave. Only the simulated platform
    /// can verify reports locally.
    #[must_use]
    pub const fn verifier(&self) -> Option<&SimulatedReportIssuer> {
        self.verifier.as_ref()
    }

    #[must_use]
    pub const fn seal_policy(&self) -> &KeyPolicy {
        &self.seal_policy
    }

    #[must_use]
    pub fn backing_dir(&self) -> &Utf8Path {
        &self.backing_dir
    }

    #[must_use]
    pub fn is_simulation(&self) -> bool {
        self.sealer.is_simulation()
    }
}
