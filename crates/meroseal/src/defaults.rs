use camino::{Utf8Path, Utf8PathBuf};
use dirs::home_dir;

pub const DEFAULT_ENCLAVE_HOME: &str = ".calimero-enclave";

pub fn default_home_dir() -> Utf8PathBuf {
    if let Some(home) = home_dir() {
        if let Some(home) = Utf8Path::from_path(&home) {
            return home.join(DEFAULT_ENCLAVE_HOME);
        }
    }

    Utf8PathBuf::default()
}
