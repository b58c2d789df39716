use admission_policy::{allow_list::AllowList, classifier::RequestFilter};
use admission_server::config::Config;
use axum::Router;
use std::net::SocketAddr;

pub(crate) fn default_test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        tls_config: None,
        filter: RequestFilter::new(
            AllowList::new(["apps"]),
            AllowList::new(["deployments"]),
            AllowList::new(["CREATE"]),
        ),
        watch_webhook_configurations: false,
        log_level: "info".to_owned(),
        log_fmt: "text".to_owned(),
        log_no_color: false,
    }
}

pub(crate) fn app() -> Router {
    admission_server::router(&default_test_config())
}
