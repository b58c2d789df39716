pub mod api;
pub mod cli;
pub mod config;
mod webhook_config;

#[cfg(test)]
mod test_utils;

use anyhow::{anyhow, Result};
use axum::{
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{api::state::ApiServerState, config::Config};

/// Builds the axum application exposing the webhook endpoints.
pub fn router(config: &Config) -> Router {
    let state = Arc::new(ApiServerState {
        filter: config.filter.clone(),
    });

    Router::new()
        .route("/validate", post(api::handlers::validate_handler))
        .route("/mutate-psp", post(api::handlers::mutate_psp_handler))
        .route("/authorize", post(api::handlers::authorize_handler))
        .route("/readiness", get(api::handlers::readiness_handler))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    setup_tracing(&config.log_level, &config.log_fmt, config.log_no_color)?;

    // The watcher is best-effort diagnostics. It must never delay or block
    // the serving path, so it lives in its own task and a cluster connection
    // failure degrades to a warning.
    if config.watch_webhook_configurations {
        match kube::Client::try_default().await {
            Ok(client) => {
                tokio::spawn(webhook_config::watch_webhook_configurations(client));
            }
            Err(e) => warn!(
                error = e.to_string().as_str(),
                "cannot connect to Kubernetes, webhook configuration watcher disabled"
            ),
        }
    }

    let app = router(&config);

    match &config.tls_config {
        Some(tls_config) => {
            let rustls_config =
                RustlsConfig::from_pem_file(&tls_config.cert_file, &tls_config.key_file)
                    .await
                    .map_err(|e| anyhow!("cannot load TLS certificate and key: {e}"))?;
            info!(
                address = config.addr.to_string().as_str(),
                "started HTTPS server"
            );
            axum_server::bind_rustls(config.addr, rustls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(
                address = config.addr.to_string().as_str(),
                "started HTTP server"
            );
            axum_server::bind(config.addr)
                .serve(app.into_make_service())
                .await?;
        }
    }

    Ok(())
}

pub fn setup_tracing(log_level: &str, log_fmt: &str, log_no_color: bool) -> Result<()> {
    // some of our dependencies generate trace events too, but we don't care
    // about them -> let's filter them
    let filter_layer = EnvFilter::new(log_level)
        .add_directive("h2=off".parse().unwrap())
        .add_directive("hyper=off".parse().unwrap())
        .add_directive("tower=off".parse().unwrap());

    match log_fmt {
        "json" => tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().json())
            .init(),
        "text" => {
            let layer = fmt::layer().with_ansi(!log_no_color);

            tracing_subscriber::registry()
                .with(filter_layer)
                .with(layer)
                .init()
        }
        _ => return Err(anyhow!("unknown log message format")),
    };

    Ok(())
}
