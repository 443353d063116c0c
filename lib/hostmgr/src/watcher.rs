//! Change watcher: keyspace-notification subscription over the registry.
//!
//! Redis publishes keyspace events on channels named after the modified
//! key, so a pattern subscription covering the host-record namespace
//! sees every set and delete without the publisher doing anything
//! special. The watcher enables the notification feature itself
//! (`CONFIG SET notify-keyspace-events KEA`) before subscribing.

use std::future::Future;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::HostmgrError;

/// Watches the registry namespace and invokes a callback on every
/// keyspace event under it.
pub struct RegistryWatcher {
    url: String,
    namespace: String,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl RegistryWatcher {
    pub fn new(url: &str, namespace: &str) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            url: url.to_string(),
            namespace: namespace.to_string(),
            stop_tx,
            stop_rx,
        }
    }

    /// Subscribe and dispatch until the stream ends or [`stop`] is
    /// called.
    ///
    /// `on_change` runs once per keyspace event; its errors are logged
    /// and do not tear down the subscription, since the next event (or
    /// the next full resync) will retry the same work. Setup failures
    /// and a broken subscription are returned to the caller, which is
    /// expected to rerun the whole watch under retry supervision.
    ///
    /// [`stop`]: RegistryWatcher::stop
    pub async fn start<F, Fut>(&self, on_change: F) -> Result<(), HostmgrError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), HostmgrError>>,
    {
        let client = redis::Client::open(self.url.as_str())?;

        // Keyspace notifications are off by default.
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg("KEA")
            .query_async(&mut conn)
            .await?;

        let mut pubsub = client.get_async_pubsub().await?;
        let pattern = keyspace_pattern(&self.namespace);
        pubsub.psubscribe(&pattern).await?;
        info!("Watching registry changes on pattern: {}", pattern);

        let mut stop_rx = self.stop_rx.clone();
        if *stop_rx.borrow() {
            return Ok(());
        }
        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        warn!("Registry notification stream ended");
                        return Ok(());
                    };
                    debug!("Keyspace event on channel: {}", msg.get_channel_name());
                    if let Err(e) = on_change().await {
                        warn!("Change handler failed, waiting for next event: {}", e);
                    }
                }
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        info!("Registry watcher stopped");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Signal the watch loop to exit. Safe to call more than once or
    /// before `start`.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Channel pattern matching both keyspace and keyevent notifications
/// for keys under `namespace`.
fn keyspace_pattern(namespace: &str) -> String {
    format!("__key*__:{}*", namespace)
}
