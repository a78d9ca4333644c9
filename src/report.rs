//! Aggregation of compact cross-implementation result payloads.
//!
//! Independent test clients serialize their per-test outcomes in a compact
//! binary message (protobuf wire encoding: three repeated-varint fields)
//! and wrap it base64-encoded in a small JSON envelope. This module decodes
//! those payloads strictly and buckets them against manifest-derived
//! expectations for side-by-side comparison of TLS stacks.

use crate::error::Error;
use crate::expect::ExpectStatus;
use crate::manifest::Suite;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::TryFrom;

/// A compact payload failed to decode. The whole message is rejected;
/// nothing is partially accepted.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The message ended inside a varint or length-delimited field.
    #[error("truncated message")]
    Truncated,
    /// A varint exceeded 64 bits.
    #[error("varint overflow")]
    VarintOverflow,
    /// A field used a wire type the format does not define.
    #[error("unsupported wire type {0}")]
    WireType(u32),
    /// A test-case result was outside the defined enum range.
    #[error("unknown test case result {0}")]
    UnknownResult(u64),
    /// The payload reported more test cases than the manifest defines.
    #[error("payload carries {got} results but the manifest defines {expected}")]
    TooManyResults {
        /// Results present in the payload.
        got: usize,
        /// Checks defined by the manifest.
        expected: usize,
    },
}

/// Outcome of one test case as reported by an independent client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCaseResult {
    /// The client accepted the connection.
    Accepted,
    /// The client rejected the connection.
    Rejected,
    /// The client skipped the test (e.g. missing feature support).
    Skipped,
}

impl TryFrom<u64> for TestCaseResult {
    type Error = DecodeError;

    fn try_from(value: u64) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(TestCaseResult::Accepted),
            1 => Ok(TestCaseResult::Rejected),
            2 => Ok(TestCaseResult::Skipped),
            other => Err(DecodeError::UnknownResult(other)),
        }
    }
}

/// One suite's worth of results from an independent test client.
///
/// `test_case_results` carries one entry per manifest test index, in
/// manifest order (DNS check before IP check for each certificate).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteTestResults {
    /// Feature ids the client supports.
    pub supported_features: Vec<u64>,
    /// Feature ids the client does not support.
    pub unsupported_features: Vec<u64>,
    /// Per-test outcomes, in manifest order.
    pub test_case_results: Vec<TestCaseResult>,
}

struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        let b = *self.buf.get(self.pos).ok_or(DecodeError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn varint(&mut self) -> Result<u64, DecodeError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let b = self.byte()?;
            value |= u64::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::VarintOverflow)
    }

    fn skip(&mut self, wire_type: u32) -> Result<(), DecodeError> {
        match wire_type {
            0 => {
                self.varint()?;
            }
            1 => self.advance(8)?,
            2 => {
                let len = self.varint()?;
                let len = usize::try_from(len).map_err(|_| DecodeError::Truncated)?;
                self.advance(len)?;
            }
            5 => self.advance(4)?,
            other => return Err(DecodeError::WireType(other)),
        }
        Ok(())
    }

    fn advance(&mut self, n: usize) -> Result<(), DecodeError> {
        if self.buf.len() - self.pos < n {
            return Err(DecodeError::Truncated);
        }
        self.pos += n;
        Ok(())
    }

    /// Reads one repeated-varint field occurrence: either a single varint
    /// (wire type 0) or a packed run (wire type 2), appending decoded
    /// values through `push`.
    fn repeated_varint(
        &mut self,
        wire_type: u32,
        mut push: impl FnMut(u64) -> Result<(), DecodeError>,
    ) -> Result<(), DecodeError> {
        match wire_type {
            0 => push(self.varint()?),
            2 => {
                let len = self.varint()?;
                let len = usize::try_from(len).map_err(|_| DecodeError::Truncated)?;
                if self.buf.len() - self.pos < len {
                    return Err(DecodeError::Truncated);
                }
                let end = self.pos + len;
                while self.pos < end {
                    push(self.varint()?)?;
                }
                if self.pos != end {
                    return Err(DecodeError::Truncated);
                }
                Ok(())
            }
            other => Err(DecodeError::WireType(other)),
        }
    }
}

impl SuiteTestResults {
    /// Decodes a compact payload.
    ///
    /// Unknown fields are skipped by wire type; a truncated message or an
    /// out-of-range result enum rejects the payload wholesale.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let mut message = SuiteTestResults::default();

        while !reader.done() {
            let tag = reader.varint()?;
            let field = tag >> 3;
            let wire_type = (tag & 0x7) as u32;
            match field {
                1 => reader.repeated_varint(wire_type, |v| {
                    message.supported_features.push(v);
                    Ok(())
                })?,
                2 => reader.repeated_varint(wire_type, |v| {
                    message.unsupported_features.push(v);
                    Ok(())
                })?,
                3 => reader.repeated_varint(wire_type, |v| {
                    message.test_case_results.push(TestCaseResult::try_from(v)?);
                    Ok(())
                })?,
                _ => reader.skip(wire_type)?,
            }
        }
        Ok(message)
    }
}

/// JSON envelope an independent test client uploads: identifying metadata
/// plus one base64-encoded compact payload per suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationResults {
    /// The implementation under test (e.g. "openssl").
    pub implementation: String,
    /// The implementation's version string.
    pub version: String,
    /// Base64-encoded [`SuiteTestResults`], keyed by suite name.
    pub suites: BTreeMap<String, String>,
}

impl ImplementationResults {
    /// Parses an envelope from its JSON representation.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decodes the named suite's compact payload, if present.
    pub fn decode_suite(&self, name: &str) -> Result<Option<SuiteTestResults>, Error> {
        let payload = match self.suites.get(name) {
            Some(payload) => payload,
            None => return Ok(None),
        };
        let bytes = base64::decode(payload)?;
        Ok(Some(SuiteTestResults::decode(&bytes)?))
    }
}

/// Per-suite comparison summary: test indices bucketed by how the
/// reported outcome relates to the expected one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    /// Feature ids the client supports.
    pub supported_features: Vec<u64>,
    /// Feature ids the client does not support.
    pub unsupported_features: Vec<u64>,
    /// Outcome matched the expectation.
    pub passed_tests: Vec<usize>,
    /// Rejection of a weakly-held expectation; passing, surfaced apart.
    pub warning_tests: Vec<usize>,
    /// Skipped by the client.
    pub skipped_tests: Vec<usize>,
    /// Wrongly rejected a validly-permitted identity.
    pub false_positive_tests: Vec<usize>,
    /// Wrongly accepted an identity that should fail validation.
    pub false_negative_tests: Vec<usize>,
}

/// Flattens a suite's derived expectations into manifest test order: for
/// each certificate id ascending, the DNS check followed by the IP check.
pub fn expected_outcomes(suite: &Suite) -> Vec<ExpectStatus> {
    let mut expected = Vec::with_capacity(suite.expectations().len() * 2);
    for expect in suite.expectations() {
        expected.push(expect.dns.expect);
        expected.push(expect.ip.expect);
    }
    expected
}

/// Buckets a decoded payload against the expected outcome list.
///
/// A payload with more results than expectations violates the schema and
/// is rejected; a shorter payload (a client that stopped early) is
/// summarized as far as it goes.
pub fn summarize(
    results: &SuiteTestResults,
    expected: &[ExpectStatus],
) -> Result<SuiteSummary, Error> {
    if results.test_case_results.len() > expected.len() {
        return Err(Error::Decode(DecodeError::TooManyResults {
            got: results.test_case_results.len(),
            expected: expected.len(),
        }));
    }

    let mut summary = SuiteSummary {
        supported_features: results.supported_features.clone(),
        unsupported_features: results.unsupported_features.clone(),
        ..SuiteSummary::default()
    };

    for (index, (&result, &expect)) in results
        .test_case_results
        .iter()
        .zip(expected.iter())
        .enumerate()
    {
        match result {
            TestCaseResult::Accepted => match expect {
                ExpectStatus::Ok | ExpectStatus::WeakOk => summary.passed_tests.push(index),
                ExpectStatus::Error => summary.false_negative_tests.push(index),
            },
            TestCaseResult::Rejected => match expect {
                ExpectStatus::Error => summary.passed_tests.push(index),
                ExpectStatus::WeakOk => summary.warning_tests.push(index),
                ExpectStatus::Ok => summary.false_positive_tests.push(index),
            },
            TestCaseResult::Skipped => summary.skipped_tests.push(index),
        }
    }

    Ok(summary)
}
