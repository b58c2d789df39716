use thiserror::Error;

/// Failures that can happen while assembling an [`crate::admission_response::AdmissionResponse`].
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("cannot serialize JSON Patch: {0}")]
    PatchSerialization(#[source] serde_json::Error),
}

/// Failures that can happen while decoding the object embedded in an
/// admission request. These are reported to the caller as an explicit
/// denial; the rule engine itself never fails.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no object attached to the request")]
    MissingObject,

    #[error("cannot decode object: {0}")]
    InvalidObject(#[source] serde_json::Error),
}
