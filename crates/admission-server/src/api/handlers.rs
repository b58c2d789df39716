use admission_policy::admission_response::AdmissionResponse;
use axum::{body::Bytes, extract, http::StatusCode, Json};
use k8s_openapi::api::authorization::v1::{SubjectAccessReview, SubjectAccessReviewStatus};
use std::sync::Arc;
use tracing::warn;

use crate::api::{
    admission_review::{AdmissionReviewRequest, AdmissionReviewResponse},
    populate_span_with_admission_request_data, populate_span_with_decision, service,
    state::ApiServerState,
};

/// Decodes the review envelope out of the raw body. A body that cannot be
/// decoded still gets a well-formed response: an explicit denial, with an
/// empty UID since the correlation identifier was never recovered.
fn parse_review(body: &Bytes) -> Result<AdmissionReviewRequest, AdmissionReviewResponse> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = e.to_string().as_str(), "cannot decode admission review");
        AdmissionReviewResponse::new(AdmissionResponse::reject(
            String::new(),
            format!("cannot decode admission review: {e}"),
            500,
        ))
    })
}

#[tracing::instrument(
    name = "validation",
    fields(
        request_uid = tracing::field::Empty,
        host = crate::config::HOSTNAME.as_str(),
        name = tracing::field::Empty,
        namespace = tracing::field::Empty,
        operation = tracing::field::Empty,
        resource_group = tracing::field::Empty,
        resource_version = tracing::field::Empty,
        resource = tracing::field::Empty,
        allowed = tracing::field::Empty,
        mutated = tracing::field::Empty,
        response_code = tracing::field::Empty,
        response_message = tracing::field::Empty,
    ),
    skip_all)]
/// Validate a request against the configured filter policy.
pub(crate) async fn validate_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    body: Bytes,
) -> Json<AdmissionReviewResponse> {
    let admission_review = match parse_review(&body) {
        Ok(admission_review) => admission_review,
        Err(rejection) => return Json(rejection),
    };

    populate_span_with_admission_request_data(&admission_review.request);

    let response = service::validate(&state.filter, &admission_review.request);

    populate_span_with_decision(&response);

    Json(AdmissionReviewResponse::new(response))
}

#[tracing::instrument(
    name = "psp_mutation",
    fields(
        request_uid = tracing::field::Empty,
        host = crate::config::HOSTNAME.as_str(),
        name = tracing::field::Empty,
        namespace = tracing::field::Empty,
        operation = tracing::field::Empty,
        resource_group = tracing::field::Empty,
        resource_version = tracing::field::Empty,
        resource = tracing::field::Empty,
        allowed = tracing::field::Empty,
        mutated = tracing::field::Empty,
        response_code = tracing::field::Empty,
        response_message = tracing::field::Empty,
    ),
    skip_all)]
/// Harden a PodSecurityPolicy write in flight.
pub(crate) async fn mutate_psp_handler(
    extract::State(_state): extract::State<Arc<ApiServerState>>,
    body: Bytes,
) -> Json<AdmissionReviewResponse> {
    let admission_review = match parse_review(&body) {
        Ok(admission_review) => admission_review,
        Err(rejection) => return Json(rejection),
    };

    populate_span_with_admission_request_data(&admission_review.request);

    let response = service::mutate_pod_security_policies(&admission_review.request);

    populate_span_with_decision(&response);

    Json(AdmissionReviewResponse::new(response))
}

#[tracing::instrument(
    name = "authorization",
    fields(
        host = crate::config::HOSTNAME.as_str(),
        allowed = tracing::field::Empty,
    ),
    skip_all)]
/// Evaluate a SubjectAccessReview against the configured filter policy.
pub(crate) async fn authorize_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    body: Bytes,
) -> Json<SubjectAccessReview> {
    let review: SubjectAccessReview = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(e) => {
            warn!(
                error = e.to_string().as_str(),
                "cannot decode subject access review"
            );
            let mut response = SubjectAccessReview::default();
            response.status = Some(SubjectAccessReviewStatus {
                allowed: false,
                denied: Some(true),
                reason: Some(format!("cannot decode subject access review: {e}")),
                ..Default::default()
            });
            return Json(response);
        }
    };

    let response = service::authorize(&state.filter, &review);

    if let Some(status) = &response.status {
        tracing::Span::current().record("allowed", status.allowed);
    }

    Json(response)
}

pub(crate) async fn readiness_handler() -> StatusCode {
    StatusCode::OK
}
