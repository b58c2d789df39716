use futures::TryStreamExt;
use k8s_openapi::api::admissionregistration::v1::ValidatingWebhookConfiguration;
use kube::{
    api::Api,
    runtime::{watcher, WatchStreamExt},
    ResourceExt,
};
use tracing::{debug, info, warn};

/// Background observer of ValidatingWebhookConfiguration objects.
///
/// It only logs what it sees: nothing here feeds into any admission
/// decision, and a watch failure never affects the serving path.
pub(crate) async fn watch_webhook_configurations(client: kube::Client) {
    let api = Api::<ValidatingWebhookConfiguration>::all(client);
    let stream = watcher(api, watcher::Config::default()).default_backoff();
    futures::pin_mut!(stream);

    info!("watching validating webhook configurations");
    loop {
        match stream.try_next().await {
            Ok(Some(watcher::Event::Apply(config))) => {
                info!(
                    name = config.name_any().as_str(),
                    "validating webhook configuration applied"
                );
            }
            Ok(Some(watcher::Event::Delete(config))) => {
                info!(
                    name = config.name_any().as_str(),
                    "validating webhook configuration deleted"
                );
            }
            Ok(Some(watcher::Event::InitApply(config))) => {
                debug!(
                    name = config.name_any().as_str(),
                    "validating webhook configuration seen"
                );
            }
            Ok(Some(watcher::Event::Init | watcher::Event::InitDone)) => {}
            Ok(None) => break,
            Err(e) => {
                warn!(
                    error = e.to_string().as_str(),
                    "validating webhook configuration watch error"
                );
            }
        }
    }
}
