//! The certificate corpus manifest and the [`Suite`] aggregate binding it
//! to its config.

use crate::config::GlobalTestConfig;
use crate::error::Error;
use crate::expect::{derive_expectation, ExpectationSet, TestExpectation};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Permitted and excluded name subtrees carried by the intermediate CA a
/// test certificate was issued under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameConstraints {
    /// Permitted subtrees (hostnames or IP prefixes).
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Excluded subtrees.
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl NameConstraints {
    /// Whether `subtree` appears in the permitted set.
    pub fn whitelists(&self, subtree: &str) -> bool {
        self.whitelist.iter().any(|s| s == subtree)
    }

    /// Whether `subtree` appears in the excluded set.
    pub fn blacklists(&self, subtree: &str) -> bool {
        self.blacklist.iter().any(|s| s == subtree)
    }
}

/// One generated test certificate, as described by the corpus manifest.
///
/// Ids are contiguous starting at 1; test `id` is served on
/// `base_port + id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDefinition {
    /// Unique, contiguous test id.
    pub id: u32,
    /// Legacy subject common name, if the certificate carries one.
    #[serde(default)]
    pub common_name: Option<String>,
    /// Subject alternative names, in certificate order.
    #[serde(default)]
    pub sans: Vec<String>,
    /// Name constraints on the issuing intermediate.
    #[serde(default)]
    pub name_constraints: NameConstraints,
}

impl CertificateDefinition {
    /// Whether the common name equals `value`.
    pub fn cn_is(&self, value: &str) -> bool {
        self.common_name.as_deref() == Some(value)
    }

    /// Whether `value` appears in the SAN extension.
    pub fn has_san(&self, value: &str) -> bool {
        self.sans.iter().any(|s| s == value)
    }

    /// Whether `value` appears in either the common name or a SAN.
    pub fn names(&self, value: &str) -> bool {
        self.cn_is(value) || self.has_san(value)
    }
}

/// The full certificate corpus for one generated test suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    cert_manifest: Vec<CertificateDefinition>,
}

impl Manifest {
    /// Builds a manifest from certificate definitions, enforcing the
    /// structural requirements the rest of the suite relies on: a non-empty
    /// corpus with unique ids forming the contiguous range `1..=max`.
    pub fn new(certificates: Vec<CertificateDefinition>) -> Result<Self, Error> {
        if certificates.is_empty() {
            return Err(Error::InvalidManifest("empty certificate manifest".into()));
        }
        let mut seen = HashSet::new();
        let mut max_id = 0;
        for cert in &certificates {
            if cert.id == 0 {
                return Err(Error::InvalidManifest("certificate id 0 is reserved".into()));
            }
            if !seen.insert(cert.id) {
                return Err(Error::InvalidManifest(format!(
                    "duplicate certificate id {}",
                    cert.id
                )));
            }
            max_id = max_id.max(cert.id);
        }
        if max_id as usize != certificates.len() {
            return Err(Error::InvalidManifest(format!(
                "certificate ids are not contiguous: {} certificates, max id {}",
                certificates.len(),
                max_id
            )));
        }
        Ok(Self {
            cert_manifest: certificates,
        })
    }

    /// Parses and validates a manifest from its JSON representation.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        let raw: Manifest = serde_json::from_slice(bytes)?;
        Self::new(raw.cert_manifest)
    }

    /// Loads a manifest from a JSON file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let bytes = std::fs::read(path.as_ref())?;
        let manifest = Self::from_json(&bytes)?;
        log::debug!("loaded manifest with {} certificates", manifest.len());
        Ok(manifest)
    }

    /// The certificate definitions, in manifest order.
    pub fn certificates(&self) -> &[CertificateDefinition] {
        &self.cert_manifest
    }

    /// Looks up a certificate by test id.
    pub fn certificate(&self, id: u32) -> Option<&CertificateDefinition> {
        self.cert_manifest.iter().find(|c| c.id == id)
    }

    /// The largest (and, since ids are contiguous, the last) test id.
    pub fn max_id(&self) -> u32 {
        self.cert_manifest.iter().map(|c| c.id).max().unwrap_or(0)
    }

    /// Number of certificates in the corpus.
    pub fn len(&self) -> usize {
        self.cert_manifest.len()
    }

    /// Whether the corpus is empty. Always false for a validated manifest.
    pub fn is_empty(&self) -> bool {
        self.cert_manifest.is_empty()
    }
}

/// A manifest bound to its global config, with expectation derivation
/// cached after the first request.
///
/// Derivation is deterministic, so the cache only avoids repeating work;
/// recomputing would yield an identical result.
pub struct Suite {
    config: GlobalTestConfig,
    manifest: Manifest,
    expects: OnceCell<Vec<TestExpectation>>,
}

impl Suite {
    /// Binds a validated manifest to its config.
    pub fn new(config: GlobalTestConfig, manifest: Manifest) -> Self {
        Self {
            config,
            manifest,
            expects: OnceCell::new(),
        }
    }

    /// The global test config.
    pub fn config(&self) -> &GlobalTestConfig {
        &self.config
    }

    /// The certificate corpus.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The largest test id in the corpus.
    pub fn max_id(&self) -> u32 {
        self.manifest.max_id()
    }

    /// Expected outcomes for every certificate, in manifest order. Derived
    /// once and cached for the lifetime of the suite.
    pub fn expectations(&self) -> &[TestExpectation] {
        self.expects.get_or_init(|| {
            self.manifest
                .certificates()
                .iter()
                .map(|cert| derive_expectation(cert, &self.config))
                .collect()
        })
    }

    /// Looks up the cached expectation for one test id.
    pub fn expectation(&self, id: u32) -> Option<&TestExpectation> {
        self.expectations().iter().find(|e| e.id == id)
    }

    /// The full derived expectation set in the JSON envelope form consumed
    /// by offline result viewers.
    pub fn expectation_set(&self) -> ExpectationSet {
        ExpectationSet {
            expects: self.expectations().to_vec(),
        }
    }
}
