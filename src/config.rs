//! The global, per-deployment test configuration.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Global parameters shared by every test in the corpus.
///
/// The generator issues every certificate against the same pair of real
/// identities (`ip`, `hostname`) and the same pair of decoys (`invalid_ip`,
/// `invalid_hostname`); name constraints reference the four corresponding
/// subtrees. Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalTestConfig {
    /// The IP address the test server is actually reachable at.
    pub ip: String,
    /// An IP address that appears on certificates but is never the origin.
    pub invalid_ip: String,
    /// The DNS hostname the test server is actually reachable at.
    pub hostname: String,
    /// A DNS hostname that appears on certificates but is never the origin.
    pub invalid_hostname: String,
    /// IP prefix covering `ip`, used in name-constraint extensions.
    pub ip_subtree: String,
    /// IP prefix covering `invalid_ip`.
    pub invalid_ip_subtree: String,
    /// DNS subtree covering `hostname`.
    pub host_subtree: String,
    /// DNS subtree covering `invalid_hostname`.
    pub invalid_host_subtree: String,
    /// Test `id` is served on port `base_port + id`.
    pub base_port: u16,
    /// Version stamp recorded into every run record.
    pub test_version: u32,
}

impl GlobalTestConfig {
    /// Parses a config from its JSON representation.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Loads a config from a JSON file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let bytes = std::fs::read(path.as_ref())?;
        let config = Self::from_json(&bytes)?;
        log::debug!(
            "loaded test config: version {}, origin {}/{}",
            config.test_version,
            config.hostname,
            config.ip
        );
        Ok(config)
    }
}
