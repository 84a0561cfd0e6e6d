use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a derived key in bytes.
pub const KEY_SIZE: usize = 32;

/// A derived symmetric key.
///
/// Wiped from memory on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_SIZE],
}

impl DerivedKey {
    #[must_use]
    pub const fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_key() {
        let key = DerivedKey::new([0x41; KEY_SIZE]);

        let printed = format!("{key:?}");

        assert!(!printed.contains("41"), "key bytes leaked: {printed}");
        assert!(!printed.contains("65"), "key bytes leaked: {printed}");
    }
}
