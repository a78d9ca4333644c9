//! Engine for a TLS name-constraint test suite.
//!
//! A generated corpus of certificates exercises the corners of X.509
//! name-constraint validation: identities in the common name vs. the SAN
//! extension, permitted and excluded subtrees, and constraints with no
//! matching subject name. For each certificate this crate derives the
//! RFC-grounded *expected* outcome of a DNS-hostname check and an
//! IP-address check ([`derive_expectation`]), drives an implementation
//! under test through the corpus ([`executor::TestRunner`]), and classifies
//! each observed accept/reject against the expectation as a pass, false
//! positive, or false negative ([`classify::classify`]).
//!
//! Results from independent clients in other languages arrive in a compact
//! binary format and are folded into per-suite summaries by [`report`].
//!
//! Certificate/key generation, server configuration, and result rendering
//! are external collaborators; this crate only consumes their certificate
//! descriptors and raw accept/reject outcomes.
#![warn(missing_docs)]

pub mod checker;
pub mod classify;
pub mod config;
mod error;
pub mod executor;
pub mod expect;
pub mod manifest;
pub mod report;

pub use config::GlobalTestConfig;
pub use error::Error;
pub use expect::{derive_expectation, ExpectationSet, TestExpectation};
pub use manifest::{CertificateDefinition, Manifest, Suite};

#[cfg(test)]
mod tests;
