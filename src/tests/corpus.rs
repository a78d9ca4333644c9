use super::*;
use crate::config::GlobalTestConfig;
use crate::error::Error;

const MANIFEST_JSON: &str = r#"{
  "certManifest": [
    {
      "id": 1,
      "commonName": "test.localhost",
      "sans": ["test.localhost", "127.0.0.1"],
      "nameConstraints": { "whitelist": [], "blacklist": [] }
    },
    {
      "id": 2,
      "sans": [],
      "nameConstraints": { "whitelist": ["localhost"], "blacklist": [] }
    }
  ]
}"#;

#[test]
fn parses_manifest_wire_format() {
    let manifest = Manifest::from_json(MANIFEST_JSON.as_bytes()).unwrap();
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.max_id(), 2);

    let first = manifest.certificate(1).unwrap();
    assert_eq!(first.common_name.as_deref(), Some("test.localhost"));
    assert!(first.has_san("127.0.0.1"));
    assert!(first.names("test.localhost"));

    // Absent commonName deserializes to None, not an empty string.
    let second = manifest.certificate(2).unwrap();
    assert_eq!(second.common_name, None);
    assert!(second.name_constraints.whitelists("localhost"));
    assert!(!second.name_constraints.blacklists("localhost"));
}

#[test]
fn rejects_empty_manifest() {
    assert!(matches!(
        Manifest::new(Vec::new()),
        Err(Error::InvalidManifest(_))
    ));
}

#[test]
fn rejects_duplicate_ids() {
    let result = Manifest::new(vec![
        cert(1, Some(VALID_DNS), &[]),
        cert(1, Some(VALID_IP), &[]),
    ]);
    assert!(matches!(result, Err(Error::InvalidManifest(_))));
}

#[test]
fn rejects_non_contiguous_ids() {
    let result = Manifest::new(vec![
        cert(1, Some(VALID_DNS), &[]),
        cert(3, Some(VALID_IP), &[]),
    ]);
    assert!(matches!(result, Err(Error::InvalidManifest(_))));
}

#[test]
fn rejects_id_zero() {
    let result = Manifest::new(vec![cert(0, Some(VALID_DNS), &[])]);
    assert!(matches!(result, Err(Error::InvalidManifest(_))));
}

#[test]
fn parses_config_wire_format() {
    let json = r#"{
      "ip": "127.0.0.1",
      "invalidIp": "1.1.1.1",
      "hostname": "test.localhost",
      "invalidHostname": "bad.example.com",
      "ipSubtree": "127.0.0.0/24",
      "invalidIpSubtree": "1.1.1.0/24",
      "hostSubtree": "localhost",
      "invalidHostSubtree": "example.com",
      "basePort": 9400,
      "testVersion": 3
    }"#;

    let config = GlobalTestConfig::from_json(json.as_bytes()).unwrap();
    assert_eq!(config, test_config());
}

#[test]
fn malformed_config_is_fatal() {
    assert!(matches!(
        GlobalTestConfig::from_json(b"{\"ip\": 42}"),
        Err(Error::Json(_))
    ));
}
