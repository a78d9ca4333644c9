use crate::report::DecodeError;

/// Errors produced while loading suite inputs, probing an implementation
/// under test, or decoding foreign result payloads.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing a file on disk failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document (manifest, config, or run record) was malformed.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The certificate manifest violated a structural requirement.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// A probe failed for infrastructure reasons (unreachable host, harness
    /// misconfiguration). Validation rejections are not errors; they resolve
    /// to a `false` probe outcome instead.
    #[error("probe failure: {0}")]
    Probe(String),

    /// A compact results payload could not be decoded.
    #[error("malformed results payload: {0}")]
    Decode(#[from] DecodeError),

    /// A base64-wrapped results payload was not valid base64.
    #[error("malformed results payload: {0}")]
    Base64(#[from] base64::DecodeError),
}
