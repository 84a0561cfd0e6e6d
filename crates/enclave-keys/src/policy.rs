use serde::{Deserialize, Serialize};

pub const KEY_ID_SIZE: usize = 32;

pub type KeyId = [u8; KEY_ID_SIZE];

/// Which part of the enclave identity a key is bound to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyBinding {
    /// Any enclave signed by the same key (and product id) derives the same
    /// key, so sealed data survives enclave upgrades.
    #[default]
    Signer,
    /// Only the exact same enclave build derives the same key.
    Measurement,
}

impl KeyBinding {
    const MEASUREMENT_BITS: u16 = 0x0001;
    const SIGNER_BITS: u16 = 0x0002;

    #[must_use]
    pub const fn to_bits(self) -> u16 {
        match self {
            Self::Signer => Self::SIGNER_BITS,
            Self::Measurement => Self::MEASUREMENT_BITS,
        }
    }

    #[must_use]
    pub const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            Self::SIGNER_BITS => Some(Self::Signer),
            Self::MEASUREMENT_BITS => Some(Self::Measurement),
            _ => None,
        }
    }
}

/// Selects the key a blob is sealed under.
///
/// The key id acts as a salt: two policies with the same binding but
/// different key ids produce unrelated keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyPolicy {
    binding: KeyBinding,
    key_id: KeyId,
}

impl KeyPolicy {
    #[must_use]
    pub const fn new(binding: KeyBinding, key_id: KeyId) -> Self {
        Self { binding, key_id }
    }

    #[must_use]
    pub const fn signer() -> Self {
        Self::new(KeyBinding::Signer, [0; KEY_ID_SIZE])
    }

    #[must_use]
    pub const fn measurement() -> Self {
        Self::new(KeyBinding::Measurement, [0; KEY_ID_SIZE])
    }

    #[must_use]
    pub const fn with_key_id(mut self, key_id: KeyId) -> Self {
        self.key_id = key_id;
        self
    }

    #[must_use]
    pub const fn binding(&self) -> KeyBinding {
        self.binding
    }

    #[must_use]
    pub const fn key_id(&self) -> &KeyId {
        &self.key_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_bits_roundtrip() {
        for binding in [KeyBinding::Signer, KeyBinding::Measurement] {
            assert_eq!(KeyBinding::from_bits(binding.to_bits()), Some(binding));
        }
    }

    #[test]
    fn test_combined_bits_rejected() {
        assert_eq!(KeyBinding::from_bits(0x0003), None);
        assert_eq!(KeyBinding::from_bits(0), None);
    }

    #[test]
    fn test_key_id_distinguishes_policies() {
        let plain = KeyPolicy::signer();
        let salted = KeyPolicy::signer().with_key_id([7; KEY_ID_SIZE]);

        assert_ne!(plain, salted);
        assert_eq!(salted.key_id(), &[7; KEY_ID_SIZE]);
        assert_eq!(KeyPolicy::default(), plain);
    }
}
