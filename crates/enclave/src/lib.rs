//! The enclave facade.
//!
//! [`ConfigFile`] describes how the enclave should run, [`Platform`] turns it
//! into a set of backends (simulated or hardware, picked once at startup) and
//! [`Native`] exposes the flat boundary operations on top of them, taking
//! caller-owned buffers as `(bytes, offset, len)` views.

pub mod config;
mod error;
mod native;
mod platform;

pub use config::ConfigFile;
pub use error::NativeError;
pub use native::Native;
pub use platform::Platform;
