#[cfg(test)]
#[path = "tests/identity.rs"]
mod tests;

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const MEASUREMENT_SIZE: usize = 32;
pub const CPU_SVN_SIZE: usize = 16;
pub const ATTRIBUTES_SIZE: usize = 16;

pub type CpuSvn = [u8; CPU_SVN_SIZE];
pub type Attributes = [u8; ATTRIBUTES_SIZE];

/// A 256-bit enclave measurement (code measurement or signer key hash).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Measurement([u8; MEASUREMENT_SIZE]);

impl Measurement {
    #[must_use]
    pub const fn new(bytes: [u8; MEASUREMENT_SIZE]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; MEASUREMENT_SIZE] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; MEASUREMENT_SIZE]> for Measurement {
    fn from(bytes: [u8; MEASUREMENT_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Measurement> for [u8; MEASUREMENT_SIZE] {
    fn from(measurement: Measurement) -> Self {
        measurement.0
    }
}

impl Deref for Measurement {
    type Target = [u8; MEASUREMENT_SIZE];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_hex())
    }
}

impl fmt::Debug for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Measurement").field(&self.to_hex()).finish()
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum InvalidMeasurement {
    #[error("invalid measurement length, expected {MEASUREMENT_SIZE} bytes")]
    InvalidLength,

    #[error("invalid hex")]
    DecodeError(#[from] hex::FromHexError),
}

impl FromStr for Measurement {
    type Err = InvalidMeasurement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; MEASUREMENT_SIZE];

        match hex::decode_to_slice(s, &mut bytes) {
            Ok(()) => Ok(Self(bytes)),
            Err(hex::FromHexError::InvalidStringLength) => Err(InvalidMeasurement::InvalidLength),
            Err(err) => Err(InvalidMeasurement::DecodeError(err)),
        }
    }
}

impl Serialize for Measurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Measurement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MeasurementVisitor;

        impl serde::de::Visitor<'_> for MeasurementVisitor {
            type Value = Measurement;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a hex encoded 32-byte measurement")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                match v.parse() {
                    Ok(measurement) => Ok(measurement),
                    Err(InvalidMeasurement::InvalidLength) => {
                        Err(E::invalid_length(v.len(), &self))
                    }
                    Err(err) => Err(E::custom(err)),
                }
            }
        }

        deserializer.deserialize_str(MeasurementVisitor)
    }
}

/// The identity an enclave runs under, as reported by the platform.
///
/// `mr_enclave` identifies the exact code that was loaded, `mr_signer` the
/// key that signed it. Sealing keys bind to one or the other, reports carry
/// both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct EnclaveIdentity {
    pub mr_enclave: Measurement,
    pub mr_signer: Measurement,
    pub isv_prod_id: u16,
    pub isv_svn: u16,
    #[serde(default, with = "hex_array")]
    pub cpu_svn: CpuSvn,
    #[serde(default, with = "hex_array")]
    pub attributes: Attributes,
    #[serde(default)]
    pub misc_select: u32,
}

impl EnclaveIdentity {
    #[must_use]
    pub const fn new(
        mr_enclave: Measurement,
        mr_signer: Measurement,
        isv_prod_id: u16,
        isv_svn: u16,
    ) -> Self {
        Self {
            mr_enclave,
            mr_signer,
            isv_prod_id,
            isv_svn,
            cpu_svn: [0; CPU_SVN_SIZE],
            attributes: [0; ATTRIBUTES_SIZE],
            misc_select: 0,
        }
    }

    #[must_use]
    pub const fn with_cpu_svn(mut self, cpu_svn: CpuSvn) -> Self {
        self.cpu_svn = cpu_svn;
        self
    }

    #[must_use]
    pub const fn with_attributes(mut self, attributes: Attributes, misc_select: u32) -> Self {
        self.attributes = attributes;
        self.misc_select = misc_select;
        self
    }
}

mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let mut bytes = [0; N];

        hex::decode_to_slice(&encoded, &mut bytes).map_err(serde::de::Error::custom)?;

        Ok(bytes)
    }
}
