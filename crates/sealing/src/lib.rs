//! Sealing: authenticated encryption under keys bound to the enclave
//! identity.
//!
//! The [`SealingEngine`] turns plaintext plus authenticated data into a
//! self-describing [`SealedBlob`] (see [`blob`] for the layout) and back.
//! [`size`] answers buffer sizing questions from the header alone.

pub mod blob;
mod engine;
mod error;
pub mod size;

pub use blob::{SealedBlob, SealedHeader, SEALED_BLOB_OVERHEAD};
pub use engine::{HardwareSealer, Sealer, SealingEngine, SimulatedSealer, Unsealed};
pub use error::{MalformedBlobError, SealError, UnsealError, UnsealReason};
pub use size::{authenticated_data_size, calc_sealed_blob_size, plaintext_size_from_sealed_data};
