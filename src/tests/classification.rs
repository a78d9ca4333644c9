use super::*;
use crate::classify::{classify, score_record, Stats, SubjectKind, VerdictLabel};
use crate::executor::{TestResult, TestRunRecord};
use crate::expect::{ExpectStatus, SubjectExpectation};

fn expectation(expect: ExpectStatus) -> SubjectExpectation {
    SubjectExpectation {
        expect,
        descriptions: Vec::new(),
    }
}

// The six (actual x expected) combinations, exactly as result tables
// display them.
#[test]
fn classification_table_is_complete() {
    struct Case {
        accepted: bool,
        expect: ExpectStatus,
        passed: bool,
        label: VerdictLabel,
        rendered: &'static str,
    }

    let cases = [
        Case {
            accepted: true,
            expect: ExpectStatus::Ok,
            passed: true,
            label: VerdictLabel::Ok,
            rendered: "OK",
        },
        Case {
            accepted: true,
            expect: ExpectStatus::WeakOk,
            passed: true,
            label: VerdictLabel::Ok,
            rendered: "OK",
        },
        Case {
            accepted: true,
            expect: ExpectStatus::Error,
            passed: false,
            label: VerdictLabel::FalseNegative,
            rendered: "False Negative",
        },
        Case {
            accepted: false,
            expect: ExpectStatus::Ok,
            passed: false,
            label: VerdictLabel::FalsePositive,
            rendered: "False Positive",
        },
        Case {
            accepted: false,
            expect: ExpectStatus::WeakOk,
            passed: true,
            label: VerdictLabel::FalsePositiveOk,
            rendered: "False Positive (OK)",
        },
        Case {
            accepted: false,
            expect: ExpectStatus::Error,
            passed: true,
            label: VerdictLabel::Ok,
            rendered: "OK",
        },
    ];

    for case in &cases {
        let mut stats = Stats::new(6);
        let verdict = classify(case.accepted, &expectation(case.expect), &mut stats);
        assert_eq!(verdict.passed, case.passed, "accepted={} expect={:?}", case.accepted, case.expect);
        assert_eq!(verdict.label, case.label);
        assert_eq!(verdict.label.to_string(), case.rendered);
        assert_eq!(verdict.accepted, case.accepted);
        assert_eq!(stats.num_run, 1);
        assert_eq!(stats.num_passed, usize::from(case.passed));
        assert_eq!(stats.num_failed, usize::from(!case.passed));
    }
}

#[test]
fn false_negative_increments_failed() {
    let mut stats = Stats::new(2);
    let verdict = classify(true, &expectation(ExpectStatus::Error), &mut stats);
    assert!(!verdict.passed);
    assert_eq!(verdict.label, VerdictLabel::FalseNegative);
    assert_eq!(stats.num_failed, 1);
    assert_eq!(stats.num_passed, 0);
}

#[test]
fn stats_accumulate_across_checks() {
    let mut stats = Stats::new(4);
    classify(true, &expectation(ExpectStatus::Ok), &mut stats);
    classify(false, &expectation(ExpectStatus::Ok), &mut stats);
    classify(false, &expectation(ExpectStatus::WeakOk), &mut stats);
    classify(true, &expectation(ExpectStatus::Error), &mut stats);

    assert_eq!(stats.num_run, 4);
    assert_eq!(stats.num_passed, 2);
    assert_eq!(stats.num_failed, 2);
    assert_eq!(stats.num_tests, 4);
}

#[test]
fn verdict_status_renders_like_result_tables() {
    let mut stats = Stats::new(2);
    assert_eq!(
        classify(true, &expectation(ExpectStatus::Ok), &mut stats).status_str(),
        "OK"
    );
    assert_eq!(
        classify(false, &expectation(ExpectStatus::Error), &mut stats).status_str(),
        "ERROR"
    );
}

#[test]
fn score_record_replays_in_manifest_order() {
    let suite = small_suite();
    let record = TestRunRecord {
        test_version: 3,
        date: 0,
        user_agent: "scripted".into(),
        os_version: None,
        results: vec![
            TestResult {
                id: 1,
                dns_result: true,
                ip_result: true,
            },
            TestResult {
                id: 2,
                dns_result: true,
                ip_result: false,
            },
            TestResult {
                id: 3,
                dns_result: false,
                ip_result: false,
            },
        ],
    };

    let (scored, stats) = score_record(&suite, &record);
    assert_eq!(scored.len(), 6);
    assert_eq!(stats.num_tests, 6);
    assert_eq!(stats.num_run, 6);
    assert_eq!(stats.num_failed, 0);

    // Cert 1 is clean on both checks; cert 2's blacklisted IP SAN makes
    // rejection the expected IP outcome; cert 3 names no real identity.
    assert_eq!(scored[0].id, 1);
    assert_eq!(scored[0].subject, SubjectKind::Dns);
    assert_eq!(scored[1].subject, SubjectKind::Ip);
    assert!(scored.iter().all(|check| check.verdict.passed));
}

#[test]
fn score_record_skips_missing_ids() {
    let suite = small_suite();
    let record = TestRunRecord {
        test_version: 3,
        date: 0,
        user_agent: "scripted".into(),
        os_version: None,
        results: vec![TestResult {
            id: 2,
            dns_result: true,
            ip_result: false,
        }],
    };

    let (scored, stats) = score_record(&suite, &record);
    assert_eq!(scored.len(), 2);
    assert_eq!(stats.num_run, 2);
    assert!(scored.iter().all(|check| check.id == 2));
}
