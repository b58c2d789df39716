use serde_json::json;

use crate::api::admission_review::AdmissionReviewRequest;

pub(crate) fn build_admission_review_request(
    group: &str,
    resource: &str,
    operation: &str,
    object: Option<serde_json::Value>,
) -> AdmissionReviewRequest {
    let mut review = json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": { "group": group, "version": "v1beta1", "kind": "PodSecurityPolicy" },
            "resource": { "group": group, "version": "v1beta1", "resource": resource },
            "name": "restricted",
            "operation": operation,
            "userInfo": {
                "username": "admin",
                "uid": "014fbff9a07c",
                "groups": ["system:authenticated", "my-admin-group"],
            },
        },
    });
    if let Some(object) = object {
        review["request"]["object"] = object;
    }

    serde_json::from_value(review).expect("deserialization should work")
}
