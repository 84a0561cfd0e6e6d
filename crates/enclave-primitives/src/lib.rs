//! Shared types for the Calimero enclave subsystem.
//!
//! - [`buffer`]: bounds-checked views over `(bytes, offset, len)` triples as
//!   handed across the native boundary.
//! - [`identity`]: enclave measurements and the identity an enclave runs
//!   under.

pub mod buffer;
pub mod identity;
