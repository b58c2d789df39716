use admission_policy::classifier::RequestFilter;

/// Read-only state shared by every handler. There is no mutable state to
/// coordinate on: each request is evaluated independently.
pub(crate) struct ApiServerState {
    pub(crate) filter: RequestFilter,
}
