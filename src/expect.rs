//! Derives the RFC-grounded expected validation outcome for each test
//! certificate: one expectation for the DNS-hostname check and one for the
//! IP-address check.
//!
//! The rules here encode behaviors real TLS stacks disagree on (common name
//! vs. SAN precedence, IP-valued common names tested against DNS
//! constraints, constraints with no matching subject name). Where the RFC
//! permits acceptance but widely deployed stacks reject anyway, the
//! expectation is weakened to `WEAK-OK` rather than forced either way.
//!
//! Derivation is a pure function of one [`CertificateDefinition`] and the
//! [`GlobalTestConfig`]; deriving twice yields identical output.

use crate::config::GlobalTestConfig;
use crate::manifest::CertificateDefinition;
use serde::{Deserialize, Serialize};

/// Expected outcome of one subject check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectStatus {
    /// Validation should succeed.
    #[serde(rename = "OK")]
    Ok,
    /// A strict reading permits rejection, but many real implementations
    /// accept. Both outcomes count as passing.
    #[serde(rename = "WEAK-OK")]
    WeakOk,
    /// Validation must fail.
    #[serde(rename = "ERROR")]
    Error,
}

/// Name-constraint standing of one subject type after step 1 of
/// derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintStatus {
    /// No constraint violation involving this subject type.
    Pass,
    /// A violation exists only on the common name while a SAN extension is
    /// present; many validators ignore the common name in that case.
    WeakPass,
    /// A hard violation; validation must fail for this subject type.
    Fail,
}

/// Step-1 output: per-subject-type constraint standing plus the
/// certificate-level notes recorded while computing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintStatuses {
    /// Standing of the IP-address subject type.
    pub ip: ConstraintStatus,
    /// Standing of the DNS-hostname subject type.
    pub dns: ConstraintStatus,
}

/// Expected outcome for a single subject check, with the ordered rationale
/// recorded while deriving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectExpectation {
    /// The derived status.
    #[serde(rename = "expect")]
    pub expect: ExpectStatus,
    /// Subject-level rationale strings, in derivation order.
    pub descriptions: Vec<String>,
}

/// The dual expectation for one test certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestExpectation {
    /// The certificate's test id.
    pub id: u32,
    /// Expectation for the IP-address check.
    pub ip: SubjectExpectation,
    /// Expectation for the DNS-hostname check.
    pub dns: SubjectExpectation,
    /// Certificate-level notes from the constraint-status computation,
    /// distinct from the per-subject rationale. Consumers display these
    /// first, followed by the subject-level descriptions.
    pub descriptions: Vec<String>,
}

/// JSON envelope for a full set of derived expectations, as consumed by
/// offline result viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationSet {
    /// One entry per certificate, in manifest order.
    pub expects: Vec<TestExpectation>,
}

const CN_IP_VIOLATION: &str = "The IP in the common name violates a name constraint.";
const CN_DNS_VIOLATION: &str = "The DNS name in the common name violates a name constraint.";
const CN_IP_VIOLATION_WITH_SAN: &str = "The IP in the common name violates a name constraint. \
    Because there is a SAN extension, this might be ignored.";
const CN_DNS_VIOLATION_WITH_SAN: &str = "The DNS name in the common name violates a name constraint. \
    Because there is a SAN extension, this might be ignored.";
const CN_IP_AS_DNS: &str = "Although the common name is an IP, some implementations may apply \
    DNS name constraints against it and thus fail validation.";
const SAN_IP_VIOLATION: &str = "The IP in the SAN extension violates a name constraint.";
const SAN_DNS_VIOLATION: &str = "The DNS name in the SAN extension violates a name constraint.";

const IP_NOT_LISTED: &str = "The IP used as an origin is not listed in the CN or SAN extension.";
const DNS_NOT_LISTED: &str =
    "The DNS hostname used as an origin is not listed in the CN or SAN extension.";
const DNS_VIOLATION_TAINTS_IP: &str = "Although the DNS name is not the subject name in question, \
    its name constraint violation may still cause this certificate to be rejected.";
const IP_VIOLATION_TAINTS_DNS: &str = "Although the IP address is not the subject name in \
    question, its name constraint violation may still cause this certificate to be rejected.";
const IP_ONLY_IN_CN: &str = "The IP is only contained in the CN of this certificate, which isn't \
    permitted by RFC but which many implementations support.";
const DNS_CONSTRAINT_NO_DNS_NAME: &str = "There is a DNS name constraint but no DNS name in the \
    certificate. This is allowed by the RFC, but some implementations will fail to validate the \
    certificate.";
const IP_CONSTRAINT_NO_IP: &str = "There is an IP name constraint but no IP in the certificate. \
    This isn't an explicit violation, but some implementations will fail to validate the \
    certificate.";
const DNS_ONLY_IN_CN: &str = "The DNS name for this certificate only exists in the common name. \
    Some browsers (such as Chrome) have deprecated using the CN entirely and only use names from \
    SAN extensions.";
const DNS_IN_CN_NOT_SAN: &str = "The DNS name for this certificate exists in the common name but \
    not in the Subject Alternative Names extension even though the extension is specified. Most \
    implementations will fail DNS-hostname validation on this certificate.";

/// A constraint "hit" for one subject type against the common name: the CN
/// carries the real identity while its subtree is blacklisted or only the
/// decoy subtree is whitelisted, or the CN carries the decoy identity while
/// either subtree is whitelisted.
fn cn_hit(
    cert: &CertificateDefinition,
    real: &str,
    invalid: &str,
    real_subtree: &str,
    invalid_subtree: &str,
) -> bool {
    let nc = &cert.name_constraints;
    (cert.cn_is(real) && nc.whitelists(invalid_subtree))
        || (cert.cn_is(real) && nc.blacklists(real_subtree))
        || (cert.cn_is(invalid) && nc.whitelists(real_subtree))
        || (cert.cn_is(invalid) && nc.whitelists(invalid_subtree))
}

/// The same hit pattern evaluated against the SAN extension instead of the
/// common name. A SAN hit is always a hard failure.
fn san_hit(
    cert: &CertificateDefinition,
    real: &str,
    invalid: &str,
    real_subtree: &str,
    invalid_subtree: &str,
) -> bool {
    let nc = &cert.name_constraints;
    (cert.has_san(real) && nc.whitelists(invalid_subtree))
        || (cert.has_san(real) && nc.blacklists(real_subtree))
        || (cert.has_san(invalid) && nc.whitelists(real_subtree))
        || (cert.has_san(invalid) && nc.whitelists(invalid_subtree))
}

/// Step 1: compute the per-subject-type constraint standing.
///
/// Evaluation order is fixed and load-bearing: the CN checks run first (IP
/// before DNS), then the IP-as-DNS cross-type check, then the SAN checks.
/// The cross-type weakening depends on the DNS status not yet being a SAN
/// failure, so the order must not be rearranged.
pub fn constraint_statuses(
    cert: &CertificateDefinition,
    config: &GlobalTestConfig,
) -> (ConstraintStatuses, Vec<String>) {
    let mut statuses = ConstraintStatuses {
        ip: ConstraintStatus::Pass,
        dns: ConstraintStatus::Pass,
    };
    let mut notes = Vec::new();

    let ip_cn_hit = cn_hit(
        cert,
        &config.ip,
        &config.invalid_ip,
        &config.ip_subtree,
        &config.invalid_ip_subtree,
    );
    let dns_cn_hit = cn_hit(
        cert,
        &config.hostname,
        &config.invalid_hostname,
        &config.host_subtree,
        &config.invalid_host_subtree,
    );

    if cert.sans.is_empty() {
        // The common name is the only subject identity present, so a
        // constraint hit against it binds strictly.
        if ip_cn_hit {
            notes.push(CN_IP_VIOLATION.to_string());
            statuses.ip = ConstraintStatus::Fail;
        }
        if dns_cn_hit {
            notes.push(CN_DNS_VIOLATION.to_string());
            statuses.dns = ConstraintStatus::Fail;
        }
        return (statuses, notes);
    }

    // A SAN extension is present: many implementations ignore the common
    // name in its favor, so a hit on the CN is only a weak pass.
    if ip_cn_hit {
        notes.push(CN_IP_VIOLATION_WITH_SAN.to_string());
        statuses.ip = ConstraintStatus::WeakPass;
    }
    if dns_cn_hit {
        notes.push(CN_DNS_VIOLATION_WITH_SAN.to_string());
        statuses.dns = ConstraintStatus::WeakPass;
    }

    // An IP-valued common name may be tested against DNS constraints.
    if (cert.cn_is(&config.ip) || cert.cn_is(&config.invalid_ip))
        && (cert.name_constraints.whitelists(&config.host_subtree)
            || cert.name_constraints.whitelists(&config.invalid_host_subtree))
    {
        notes.push(CN_IP_AS_DNS.to_string());
        statuses.dns = ConstraintStatus::WeakPass;
    }

    // A hit on a SAN value is a hard failure regardless of anything above.
    if san_hit(
        cert,
        &config.ip,
        &config.invalid_ip,
        &config.ip_subtree,
        &config.invalid_ip_subtree,
    ) {
        notes.push(SAN_IP_VIOLATION.to_string());
        statuses.ip = ConstraintStatus::Fail;
    }
    if san_hit(
        cert,
        &config.hostname,
        &config.invalid_hostname,
        &config.host_subtree,
        &config.invalid_host_subtree,
    ) {
        notes.push(SAN_DNS_VIOLATION.to_string());
        statuses.dns = ConstraintStatus::Fail;
    }

    (statuses, notes)
}

type RulePredicate = fn(&CertificateDefinition, &GlobalTestConfig, &ConstraintStatuses) -> bool;

/// One weakening rule: if the predicate matches, the subject expectation
/// drops from `OK` to `WEAK-OK` and the rationale (if any) is appended.
/// Rules only ever weaken; they never escalate back to `ERROR` or restore
/// `OK`.
struct WeakenRule {
    when: RulePredicate,
    rationale: Option<&'static str>,
}

fn ip_constraint_weak(_: &CertificateDefinition, _: &GlobalTestConfig, st: &ConstraintStatuses) -> bool {
    st.ip == ConstraintStatus::WeakPass
}

fn dns_constraint_not_clean(
    _: &CertificateDefinition,
    _: &GlobalTestConfig,
    st: &ConstraintStatuses,
) -> bool {
    st.dns != ConstraintStatus::Pass
}

fn ip_only_in_cn(cert: &CertificateDefinition, cfg: &GlobalTestConfig, _: &ConstraintStatuses) -> bool {
    cert.cn_is(&cfg.ip) && !cert.has_san(&cfg.ip)
}

fn dns_constraint_without_dns_name(
    cert: &CertificateDefinition,
    cfg: &GlobalTestConfig,
    _: &ConstraintStatuses,
) -> bool {
    (cert.name_constraints.whitelists(&cfg.host_subtree)
        || cert.name_constraints.whitelists(&cfg.invalid_host_subtree))
        && !cert.cn_is(&cfg.hostname)
        && !cert.cn_is(&cfg.invalid_hostname)
        && !cert.has_san(&cfg.hostname)
        && !cert.has_san(&cfg.invalid_hostname)
}

fn dns_constraint_weak(_: &CertificateDefinition, _: &GlobalTestConfig, st: &ConstraintStatuses) -> bool {
    st.dns == ConstraintStatus::WeakPass
}

fn ip_constraint_not_clean(
    _: &CertificateDefinition,
    _: &GlobalTestConfig,
    st: &ConstraintStatuses,
) -> bool {
    st.ip != ConstraintStatus::Pass
}

fn dns_only_in_cn(cert: &CertificateDefinition, cfg: &GlobalTestConfig, _: &ConstraintStatuses) -> bool {
    cert.cn_is(&cfg.hostname) && !cert.has_san(&cfg.hostname)
}

fn dns_in_cn_not_in_san(
    cert: &CertificateDefinition,
    cfg: &GlobalTestConfig,
    _: &ConstraintStatuses,
) -> bool {
    cert.cn_is(&cfg.hostname) && !cert.sans.is_empty() && !cert.has_san(&cfg.hostname)
}

fn ip_constraint_without_ip(
    cert: &CertificateDefinition,
    cfg: &GlobalTestConfig,
    _: &ConstraintStatuses,
) -> bool {
    (cert.name_constraints.whitelists(&cfg.ip_subtree)
        || cert.name_constraints.whitelists(&cfg.invalid_ip_subtree))
        && !cert.cn_is(&cfg.ip)
        && !cert.cn_is(&cfg.invalid_ip)
        && !cert.has_san(&cfg.ip)
        && !cert.has_san(&cfg.invalid_ip)
}

// The weakening cascades for steps 2 and 3, in their fixed evaluation
// order. The cross-subject rules reflect stacks that reject a certificate
// wholesale when any name on it violates a constraint, not just the name
// being checked.
const IP_WEAKEN_RULES: &[WeakenRule] = &[
    WeakenRule {
        when: ip_constraint_weak,
        rationale: None,
    },
    WeakenRule {
        when: dns_constraint_not_clean,
        rationale: Some(DNS_VIOLATION_TAINTS_IP),
    },
    WeakenRule {
        when: ip_only_in_cn,
        rationale: Some(IP_ONLY_IN_CN),
    },
    WeakenRule {
        when: dns_constraint_without_dns_name,
        rationale: Some(DNS_CONSTRAINT_NO_DNS_NAME),
    },
];

const DNS_WEAKEN_RULES: &[WeakenRule] = &[
    WeakenRule {
        when: dns_constraint_weak,
        rationale: None,
    },
    WeakenRule {
        when: ip_constraint_not_clean,
        rationale: Some(IP_VIOLATION_TAINTS_DNS),
    },
    WeakenRule {
        when: dns_only_in_cn,
        rationale: Some(DNS_ONLY_IN_CN),
    },
    WeakenRule {
        when: dns_in_cn_not_in_san,
        rationale: Some(DNS_IN_CN_NOT_SAN),
    },
    WeakenRule {
        when: ip_constraint_without_ip,
        rationale: Some(IP_CONSTRAINT_NO_IP),
    },
];

/// Builds one subject expectation: absent identity and hard constraint
/// failures are terminal `ERROR` baselines; otherwise the expectation
/// starts at `OK` and each matching rule weakens it to `WEAK-OK`.
fn subject_expectation(
    cert: &CertificateDefinition,
    config: &GlobalTestConfig,
    statuses: &ConstraintStatuses,
    identity_present: bool,
    missing_identity: &'static str,
    constraint_failed: bool,
    rules: &[WeakenRule],
) -> SubjectExpectation {
    if !identity_present {
        return SubjectExpectation {
            expect: ExpectStatus::Error,
            descriptions: vec![missing_identity.to_string()],
        };
    }
    if constraint_failed {
        return SubjectExpectation {
            expect: ExpectStatus::Error,
            descriptions: Vec::new(),
        };
    }

    let mut expect = ExpectStatus::Ok;
    let mut descriptions = Vec::new();
    for rule in rules {
        if (rule.when)(cert, config, statuses) {
            expect = ExpectStatus::WeakOk;
            if let Some(rationale) = rule.rationale {
                descriptions.push(rationale.to_string());
            }
        }
    }
    SubjectExpectation {
        expect,
        descriptions,
    }
}

/// Derives the dual (IP, DNS) expectation for one certificate.
pub fn derive_expectation(
    cert: &CertificateDefinition,
    config: &GlobalTestConfig,
) -> TestExpectation {
    let (statuses, notes) = constraint_statuses(cert, config);

    let ip = subject_expectation(
        cert,
        config,
        &statuses,
        cert.names(&config.ip),
        IP_NOT_LISTED,
        statuses.ip == ConstraintStatus::Fail,
        IP_WEAKEN_RULES,
    );
    let dns = subject_expectation(
        cert,
        config,
        &statuses,
        cert.names(&config.hostname),
        DNS_NOT_LISTED,
        statuses.dns == ConstraintStatus::Fail,
        DNS_WEAKEN_RULES,
    );

    TestExpectation {
        id: cert.id,
        ip,
        dns,
        descriptions: notes,
    }
}
