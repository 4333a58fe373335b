// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod canonical;
mod errors;

pub use errors::{ExitCode, MachineError};

pub const CRATE_NAME: &str = "tervyx-index-core";

pub const ENV_TERVYX_LOG_LEVEL: &str = "TERVYX_LOG_LEVEL";
pub const ENV_TERVYX_LOG_JSON: &str = "TERVYX_LOG_JSON";

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    canonical::stable_hash_hex(bytes)
}
