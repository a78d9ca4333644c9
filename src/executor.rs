//! Sequential, resumable execution of the test corpus against an injected
//! probe capability.
//!
//! The run is strictly single-flight: no two test ids probe concurrently,
//! and within one id the DNS check completes before the IP check starts.
//! The record is persisted after every completed id, so a crash loses at
//! most the one in-flight test and a restarted run picks up where the
//! stored record left off.

use crate::error::Error;
use crate::manifest::Suite;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// The actual accept/reject pair observed for one certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// The certificate's test id.
    pub id: u32,
    /// Whether the DNS-hostname connection validated.
    pub dns_result: bool,
    /// Whether the IP-address connection validated.
    pub ip_result: bool,
}

/// Environment metadata captured once when a run record is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEnvironment {
    /// Identifies the implementation under test.
    pub user_agent: String,
    /// Host OS description, when available.
    pub os_version: Option<String>,
}

/// A complete or in-progress test run, as persisted to durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunRecord {
    /// The suite version the run was recorded against.
    pub test_version: u32,
    /// Record creation time, in milliseconds since the Unix epoch.
    pub date: u64,
    /// Implementation identity, captured at record creation.
    pub user_agent: String,
    /// Host OS description, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    /// Completed results, in completion order.
    pub results: Vec<TestResult>,
}

impl TestRunRecord {
    /// Creates an empty record stamped with the current time and the given
    /// environment metadata.
    pub fn new(test_version: u32, env: RunEnvironment) -> Self {
        let date = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            test_version,
            date,
            user_agent: env.user_agent,
            os_version: env.os_version,
            results: Vec::new(),
        }
    }
}

/// The injected probe capability.
///
/// An implementation connects to `host:port`, performs TLS validation
/// against the suite's fixed root of trust, and resolves to `true` when
/// validation succeeded or `false` when the connection was rejected. An
/// expected validation rejection must never surface as an error; only
/// genuine infrastructure failures (unreachable host, harness
/// misconfiguration) do, and those abort the whole run.
#[async_trait]
pub trait Checker {
    /// Probes one endpoint.
    async fn check(&mut self, host: &str, port: u16) -> Result<bool, Error>;
}

/// Durable storage for the run record.
pub trait RecordStore {
    /// Loads a previously persisted record, if one exists.
    fn load(&mut self) -> Result<Option<TestRunRecord>, Error>;
    /// Persists the full record, replacing any previous copy.
    fn save(&mut self, record: &TestRunRecord) -> Result<(), Error>;
}

/// Stores the run record as a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// A store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordStore for JsonFileStore {
    fn load(&mut self) -> Result<Option<TestRunRecord>, Error> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, record: &TestRunRecord) -> Result<(), Error> {
        let json = serde_json::to_vec(record)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Drives the corpus from id 1 through the manifest's maximum id.
pub struct TestRunner<'a, C, S> {
    suite: &'a Suite,
    checker: C,
    store: S,
}

impl<'a, C: Checker, S: RecordStore> TestRunner<'a, C, S> {
    /// Binds a suite to a probe capability and a record store.
    pub fn new(suite: &'a Suite, checker: C, store: S) -> Self {
        Self {
            suite,
            checker,
            store,
        }
    }

    /// Runs every outstanding test id and returns the finished record.
    ///
    /// If the store already holds a record, completed ids are skipped
    /// without re-probing; otherwise a fresh record is created with `env`
    /// captured once. The record is persisted after every completed id.
    /// A checker infrastructure error aborts the run; everything persisted
    /// so far remains valid for a later resumed run.
    pub async fn run(mut self, env: RunEnvironment) -> Result<TestRunRecord, Error> {
        let config = self.suite.config();
        let mut record = match self.store.load()? {
            Some(record) => {
                log::info!(
                    "resuming test run with {} completed results",
                    record.results.len()
                );
                record
            }
            None => TestRunRecord::new(config.test_version, env),
        };

        let completed: HashSet<u32> = record.results.iter().map(|r| r.id).collect();
        let max_id = self.suite.max_id();

        for id in 1..=max_id {
            if completed.contains(&id) {
                log::debug!("test {id} already completed, skipping");
                continue;
            }
            let port = u16::try_from(id)
                .ok()
                .and_then(|id| config.base_port.checked_add(id))
                .ok_or_else(|| {
                    Error::InvalidManifest(format!("port overflow for test id {id}"))
                })?;
            log::info!("running test {id}/{max_id}");

            // DNS strictly before IP; the per-test TLS session state on the
            // server side depends on this ordering.
            let dns_result = self.checker.check(&config.hostname, port).await?;
            let ip_result = self.checker.check(&config.ip, port).await?;

            record.results.push(TestResult {
                id,
                dns_result,
                ip_result,
            });
            self.store.save(&record)?;
        }

        log::info!("test run complete: {} results", record.results.len());
        Ok(record)
    }
}
