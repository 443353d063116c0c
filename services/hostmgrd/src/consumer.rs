//! Consumer role: keep the local SSH trust files in sync with the
//! registry.
//!
//! One full resync runs at startup to catch changes missed while the
//! host was offline, then the change watcher triggers the same resync
//! on every keyspace notification. Resyncs execute inside the watcher's
//! delivery path, so state changes are applied strictly in order.

use hostmgr::{supervise, HostmgrError, RegistryClient, RegistryWatcher, TrustFiles};
use tracing::{info, warn};

use crate::{Config, ServiceError, RESYNC_RETRY_INTERVAL, RETRY_TIMEOUT};

pub async fn run(config: Config) -> Result<(), ServiceError> {
    let registry = RegistryClient::new(&config.registry_url, &config.namespace);
    let trust_files = config.trust_files.clone();

    info!("Performing initial trust synchronization");
    let initial = supervise(
        || resync(&registry, &trust_files),
        RESYNC_RETRY_INTERVAL,
        RETRY_TIMEOUT,
    )
    .await;
    if let Err(e) = initial {
        // Not fatal: the watcher below retries the same work on the
        // next registry change.
        warn!("Initial synchronization failed: {}", e);
    }

    info!("Listening for registry updates from {}", config.registry_url);
    supervise(
        || async {
            let watcher = RegistryWatcher::new(&config.registry_url, &config.namespace);
            watcher.start(|| resync(&registry, &trust_files)).await
        },
        RESYNC_RETRY_INTERVAL,
        RETRY_TIMEOUT,
    )
    .await?;

    info!("Stopped listening for registry updates");
    Ok(())
}

/// List every host record and rewrite the trust files from it.
async fn resync(registry: &RegistryClient, trust_files: &TrustFiles) -> Result<(), HostmgrError> {
    let outcome = registry.list().await?;
    if let Some(e) = outcome.last_error {
        warn!(
            "Partial registry listing, continuing with {} record(s): {}",
            outcome.records.len(),
            e
        );
    }
    trust_files.update(&outcome.records)
}
