//! Compares an actual accept/reject outcome against the derived
//! expectation for the same subject check.

use crate::executor::TestRunRecord;
use crate::expect::{ExpectStatus, SubjectExpectation};
use crate::manifest::Suite;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which subject identity a check targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubjectKind {
    /// The DNS-hostname check.
    Dns,
    /// The IP-address check.
    Ip,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubjectKind::Dns => "DNS",
            SubjectKind::Ip => "IP",
        })
    }
}

/// Outcome label for one scored subject check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictLabel {
    /// The implementation behaved as expected.
    Ok,
    /// The implementation rejected an identity that should have validated.
    FalsePositive,
    /// The implementation rejected a weakly-held expectation; counted as a
    /// pass, but surfaced separately for comparison across stacks.
    FalsePositiveOk,
    /// The implementation accepted an identity that should have failed
    /// constraint validation. Security-relevant.
    FalseNegative,
}

impl fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VerdictLabel::Ok => "OK",
            VerdictLabel::FalsePositive => "False Positive",
            VerdictLabel::FalsePositiveOk => "False Positive (OK)",
            VerdictLabel::FalseNegative => "False Negative",
        })
    }
}

/// The comparison result for one subject check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the implementation accepted the connection.
    pub accepted: bool,
    /// The comparison label.
    pub label: VerdictLabel,
    /// Whether this check counts as a pass.
    pub passed: bool,
}

impl Verdict {
    /// The actual outcome rendered the way result tables display it.
    pub fn status_str(&self) -> &'static str {
        if self.accepted {
            "OK"
        } else {
            "ERROR"
        }
    }
}

/// Running pass/fail counters across a set of scored checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Total number of subject checks in the suite (two per certificate).
    pub num_tests: usize,
    /// Checks scored so far.
    pub num_run: usize,
    /// Checks that passed.
    pub num_passed: usize,
    /// Checks that failed.
    pub num_failed: usize,
}

impl Stats {
    /// Counters for a suite of `num_tests` subject checks.
    pub fn new(num_tests: usize) -> Self {
        Stats {
            num_tests,
            ..Stats::default()
        }
    }

    /// Counters sized for every check in `suite`.
    pub fn for_suite(suite: &Suite) -> Self {
        Self::new(suite.manifest().len() * 2)
    }
}

/// Scores one actual outcome against its expectation and updates the
/// running counters.
///
/// An accepted connection passes unless the expectation was `ERROR` (a
/// false negative). A rejected connection fails only when the expectation
/// was a hard `OK`; rejecting a `WEAK-OK` is tolerated and labelled
/// distinctly.
pub fn classify(accepted: bool, expect: &SubjectExpectation, stats: &mut Stats) -> Verdict {
    let (passed, label) = if accepted {
        match expect.expect {
            ExpectStatus::Ok | ExpectStatus::WeakOk => (true, VerdictLabel::Ok),
            ExpectStatus::Error => (false, VerdictLabel::FalseNegative),
        }
    } else {
        match expect.expect {
            ExpectStatus::Ok => (false, VerdictLabel::FalsePositive),
            ExpectStatus::WeakOk => (true, VerdictLabel::FalsePositiveOk),
            ExpectStatus::Error => (true, VerdictLabel::Ok),
        }
    };

    stats.num_run += 1;
    if passed {
        stats.num_passed += 1;
    } else {
        stats.num_failed += 1;
    }

    Verdict {
        accepted,
        label,
        passed,
    }
}

/// One scored check from a replayed run record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCheck {
    /// The certificate's test id.
    pub id: u32,
    /// Which subject identity was checked.
    pub subject: SubjectKind,
    /// The comparison result.
    pub verdict: Verdict,
}

/// Replays a persisted run record against the suite's cached expectations.
///
/// Checks are scored in id order, DNS before IP, matching the order a live
/// run produces them in. Ids present in the manifest but missing from the
/// record are logged and skipped, so partially-complete records can still
/// be viewed.
pub fn score_record(suite: &Suite, record: &TestRunRecord) -> (Vec<ScoredCheck>, Stats) {
    let results: HashMap<u32, _> = record.results.iter().map(|r| (r.id, r)).collect();

    let mut stats = Stats::for_suite(suite);
    let mut scored = Vec::with_capacity(results.len() * 2);
    for expect in suite.expectations() {
        let result = match results.get(&expect.id) {
            Some(result) => result,
            None => {
                log::warn!("missing saved result for test {}", expect.id);
                continue;
            }
        };
        scored.push(ScoredCheck {
            id: expect.id,
            subject: SubjectKind::Dns,
            verdict: classify(result.dns_result, &expect.dns, &mut stats),
        });
        scored.push(ScoredCheck {
            id: expect.id,
            subject: SubjectKind::Ip,
            verdict: classify(result.ip_result, &expect.ip, &mut stats),
        });
    }
    (scored, stats)
}
