//! Shared fixtures for the suite's tests.
//!
//! The config values mirror the corpus generator's defaults: the suite is
//! reachable at one real hostname and one real IP, every certificate can
//! additionally carry the decoy identities, and the four subtrees cover
//! the two identity pairs.

mod classification;
mod corpus;
mod probe;

use crate::config::GlobalTestConfig;
use crate::manifest::{CertificateDefinition, Manifest, NameConstraints, Suite};

pub(crate) const VALID_DNS: &str = "test.localhost";
pub(crate) const INVALID_DNS: &str = "bad.example.com";
pub(crate) const VALID_IP: &str = "127.0.0.1";
pub(crate) const INVALID_IP: &str = "1.1.1.1";
pub(crate) const VALID_DNS_TREE: &str = "localhost";
pub(crate) const INVALID_DNS_TREE: &str = "example.com";
pub(crate) const VALID_IP_RANGE: &str = "127.0.0.0/24";
pub(crate) const INVALID_IP_RANGE: &str = "1.1.1.0/24";

pub(crate) fn test_config() -> GlobalTestConfig {
    GlobalTestConfig {
        ip: VALID_IP.into(),
        invalid_ip: INVALID_IP.into(),
        hostname: VALID_DNS.into(),
        invalid_hostname: INVALID_DNS.into(),
        ip_subtree: VALID_IP_RANGE.into(),
        invalid_ip_subtree: INVALID_IP_RANGE.into(),
        host_subtree: VALID_DNS_TREE.into(),
        invalid_host_subtree: INVALID_DNS_TREE.into(),
        base_port: 9400,
        test_version: 3,
    }
}

pub(crate) fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn cert(id: u32, common_name: Option<&str>, sans: &[&str]) -> CertificateDefinition {
    CertificateDefinition {
        id,
        common_name: common_name.map(str::to_string),
        sans: names(sans),
        name_constraints: NameConstraints::default(),
    }
}

pub(crate) fn constrained_cert(
    id: u32,
    common_name: Option<&str>,
    sans: &[&str],
    whitelist: &[&str],
    blacklist: &[&str],
) -> CertificateDefinition {
    CertificateDefinition {
        id,
        common_name: common_name.map(str::to_string),
        sans: names(sans),
        name_constraints: NameConstraints {
            whitelist: names(whitelist),
            blacklist: names(blacklist),
        },
    }
}

/// A small three-certificate suite: one unconstrained certificate naming
/// both identities, one whose IP SAN is blacklisted, and one naming only
/// the decoy hostname.
pub(crate) fn small_suite() -> Suite {
    let manifest = Manifest::new(vec![
        cert(1, Some(VALID_DNS), &[VALID_DNS, VALID_IP]),
        constrained_cert(
            2,
            Some(VALID_DNS),
            &[VALID_DNS, VALID_IP],
            &[],
            &[VALID_IP_RANGE],
        ),
        cert(3, Some(INVALID_DNS), &[INVALID_DNS]),
    ])
    .expect("fixture manifest is valid");
    Suite::new(test_config(), manifest)
}
