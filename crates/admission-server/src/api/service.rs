use admission_policy::{
    admission_request::AdmissionRequest,
    admission_response::AdmissionResponse,
    classifier::{Classification, RequestFilter},
    psp,
};
use k8s_openapi::api::authorization::v1::{SubjectAccessReview, SubjectAccessReviewStatus};
use tracing::{debug, info, warn};

const DENY_REASON: &str = "denied by policy";
const DENY_CODE: u16 = 403;

/// The deny-list flavor: a request matching all three allow-lists is
/// rejected, everything else passes through untouched.
pub(crate) fn validate(filter: &RequestFilter, request: &AdmissionRequest) -> AdmissionResponse {
    match filter.classify_admission_request(request) {
        Classification::InScope => {
            info!(
                group = request.resource.group.as_str(),
                resource = request.resource.resource.as_str(),
                operation = request.operation.as_str(),
                "request denied by filter policy"
            );
            AdmissionResponse::reject(request.uid.clone(), DENY_REASON.to_owned(), DENY_CODE)
        }
        Classification::PassThrough => AdmissionResponse::allow(request.uid.clone()),
    }
}

/// The mutate flavor: PodSecurityPolicy writes get their specification
/// hardened in flight; anything outside the fixed scope passes through.
pub(crate) fn mutate_pod_security_policies(request: &AdmissionRequest) -> AdmissionResponse {
    let scope = RequestFilter::pod_security_policies();
    if scope.classify_admission_request(request) == Classification::PassThrough {
        warn!(
            group = request.resource.group.as_str(),
            resource = request.resource.resource.as_str(),
            operation = request.operation.as_str(),
            "request not in scope for PodSecurityPolicy mutation - request allowed"
        );
        return AdmissionResponse::allow(request.uid.clone());
    }

    let policy = match psp::PodSecurityPolicy::from_object(request.object.as_ref()) {
        Ok(policy) => policy,
        Err(e) => {
            return AdmissionResponse::reject(
                request.uid.clone(),
                format!("cannot decode PodSecurityPolicy: {e}"),
                500,
            )
        }
    };

    let patch = psp::sanitize(&policy.spec);
    debug!(operations = patch.0.len(), "PodSecurityPolicy sanitized");

    match AdmissionResponse::with_patch(request.uid.clone(), &patch) {
        Ok(response) => response,
        Err(e) => AdmissionResponse::reject(request.uid.clone(), e.to_string(), 500),
    }
}

/// The subject-access-review flavor: same conjunctive scope test, rendered
/// into an authorization verdict instead of an admission one.
pub(crate) fn authorize(
    filter: &RequestFilter,
    review: &SubjectAccessReview,
) -> SubjectAccessReview {
    let (group, resource, verb) = match review.spec.resource_attributes.as_ref() {
        Some(attributes) => (
            attributes.group.as_deref().unwrap_or_default(),
            attributes.resource.as_deref().unwrap_or_default(),
            attributes.verb.as_deref().unwrap_or_default(),
        ),
        None => ("", "", ""),
    };

    let status = match filter.classify(group, resource, verb) {
        Classification::InScope => {
            info!(group, resource, verb, "access denied by filter policy");
            SubjectAccessReviewStatus {
                allowed: false,
                denied: Some(true),
                reason: Some(DENY_REASON.to_owned()),
                evaluation_error: None,
            }
        }
        Classification::PassThrough => SubjectAccessReviewStatus {
            allowed: true,
            ..Default::default()
        },
    };

    let mut response = SubjectAccessReview::default();
    response.metadata.uid = review.metadata.uid.clone();
    response.status = Some(status);
    response
}
