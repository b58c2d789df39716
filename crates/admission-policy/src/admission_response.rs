use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::errors::ResponseError;

/// This models the admission/v1/AdmissionResponse object of Kubernetes
/// See https://pkg.go.dev/k8s.io/kubernetes/pkg/apis/admission#AdmissionResponse
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// UID is an identifier for the individual request/response.
    /// This must be copied over from the corresponding AdmissionRequest.
    pub uid: String,

    /// Allowed indicates whether or not the admission request was permitted.
    pub allowed: bool,

    /// The type of Patch. Currently we only allow "JSONPatch".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,

    /// The patch body. A base64-encoded "JSONPatch" document implementing
    /// RFC 6902, mirroring the `[]byte` wire encoding of Kubernetes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,

    /// Status contains extra details into why an admission request was denied.
    /// This field IS NOT consulted in any way if "Allowed" is "true".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionResponseStatus>,
}

/// PatchType is the type of patch being used to represent the mutated object
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub enum PatchType {
    #[serde(rename = "JSONPatch")]
    #[default]
    JSONPatch,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct AdmissionResponseStatus {
    /// A human-readable description of the status of this operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Suggested HTTP return code for this status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl AdmissionResponse {
    /// Lets the request through untouched. Used for pass-through verdicts
    /// and for sanitizations that found nothing to change.
    pub fn allow(uid: String) -> AdmissionResponse {
        AdmissionResponse {
            uid,
            allowed: true,
            ..Default::default()
        }
    }

    /// Denies the request. A denial never carries a patch.
    pub fn reject(uid: String, message: String, code: u16) -> AdmissionResponse {
        AdmissionResponse {
            uid,
            allowed: false,
            status: Some(AdmissionResponseStatus {
                message: Some(message),
                code: Some(code),
            }),
            ..Default::default()
        }
    }

    /// Allows the request, rewriting it with `patch`. An empty patch
    /// collapses to a plain allow: no empty patch document is ever put on
    /// the wire.
    pub fn with_patch(uid: String, patch: &json_patch::Patch) -> Result<AdmissionResponse, ResponseError> {
        if patch.0.is_empty() {
            return Ok(AdmissionResponse::allow(uid));
        }

        let patch = serde_json::to_string(patch)
            .map(|p| general_purpose::STANDARD.encode(p))
            .map_err(ResponseError::PatchSerialization)?;

        Ok(AdmissionResponse {
            uid,
            allowed: true,
            patch_type: Some(PatchType::JSONPatch),
            patch: Some(patch),
            status: None,
        })
    }
}
