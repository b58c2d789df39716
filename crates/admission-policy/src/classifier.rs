use crate::{admission_request::AdmissionRequest, allow_list::AllowList};

/// Outcome of matching a request against a [`RequestFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// All three request fields matched: the request is subject to the
    /// policy backed by the filter.
    InScope,
    /// At least one field did not match: the request is not subject to
    /// this policy and must be let through untouched.
    PassThrough,
}

/// Scope filter shared by every policy flavor: a request is in scope only
/// when its API group, resource and operation all match their respective
/// allow-list. Callers differ only in how they extract the three fields
/// from their wire envelope.
#[derive(Clone, Debug)]
pub struct RequestFilter {
    groups: AllowList,
    resources: AllowList,
    operations: AllowList,
}

impl RequestFilter {
    pub fn new(groups: AllowList, resources: AllowList, operations: AllowList) -> Self {
        RequestFilter {
            groups,
            resources,
            operations,
        }
    }

    /// The fixed scope of the PodSecurityPolicy mutation policy.
    pub fn pod_security_policies() -> Self {
        RequestFilter::new(
            AllowList::new(["policy"]),
            AllowList::new(["podsecuritypolicies"]),
            AllowList::new(["CREATE", "UPDATE"]),
        )
    }

    pub fn classify(&self, group: &str, resource: &str, operation: &str) -> Classification {
        if self.groups.matches(group)
            && self.resources.matches(resource)
            && self.operations.matches(operation)
        {
            Classification::InScope
        } else {
            Classification::PassThrough
        }
    }

    /// Field-extraction step for the admission-review flavors.
    pub fn classify_admission_request(&self, request: &AdmissionRequest) -> Classification {
        self.classify(
            &request.resource.group,
            &request.resource.resource,
            &request.operation,
        )
    }
}
