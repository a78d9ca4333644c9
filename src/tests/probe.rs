use crate::checker::RustlsChecker;
use crate::error::Error;
use crate::executor::Checker;
use std::time::Duration;

#[test]
fn garbage_root_certificate_is_rejected_at_construction() {
    assert!(matches!(
        RustlsChecker::new(b"not a certificate"),
        Err(Error::Probe(_))
    ));
}

#[tokio::test]
async fn unreachable_endpoint_is_an_infrastructure_error() {
    // Nothing listens on the target port; a connection failure must abort
    // the run rather than being recorded as a validation rejection.
    let mut checker = RustlsChecker::with_trust_anchors(std::iter::empty())
        .with_timeout(Duration::from_secs(2));

    let result = checker.check("127.0.0.1", 1).await;
    assert!(matches!(result, Err(Error::Probe(_))));
}

#[tokio::test]
async fn invalid_probe_host_is_an_infrastructure_error() {
    let mut checker = RustlsChecker::with_trust_anchors(std::iter::empty());
    let result = checker.check("not a hostname", 443).await;
    assert!(matches!(result, Err(Error::Probe(_))));
}
