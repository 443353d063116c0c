//! Announcer role: publish this host's trust record and withdraw it on
//! shutdown.
//!
//! The announcement is retried until it lands or the retry deadline
//! expires; a host that cannot announce itself has nothing further to
//! do, so exhaustion is fatal to the role. Revocation on shutdown is
//! best effort: a failed delete leaves a stale record behind, which
//! the registry cannot distinguish from a live host (there is no TTL).

use hostmgr::{supervise, RegistryClient};
use tracing::{error, info, warn};

use crate::{Config, ServiceError, ANNOUNCE_RETRY_INTERVAL, RETRY_TIMEOUT};

pub async fn run(config: Config) -> Result<(), ServiceError> {
    let registry = RegistryClient::new(&config.registry_url, &config.namespace);

    let mut record = crate::facts::gather(&config.host_key_path).await;
    if let Some(ref user) = config.client_user {
        record.client_user = user.clone();
    }

    info!(
        "Announcing host {} ({}) to {}",
        record.hostname, record.address, config.registry_url
    );
    let key = supervise(
        || registry.announce(&record),
        ANNOUNCE_RETRY_INTERVAL,
        RETRY_TIMEOUT,
    )
    .await?;

    shutdown_signal().await;

    info!("Revoking host announcement");
    if let Err(e) = registry.revoke(&key).await {
        warn!("Could not revoke {} before exit: {}", key, e);
    }

    Ok(())
}

/// Wait for the first termination signal.
///
/// SIGKILL cannot be caught; a host killed that way leaves its record
/// in the registry.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::SignalKind;

        tokio::select! {
            _ = ctrl_c => {}
            _ = unix_signal(SignalKind::terminate(), "SIGTERM") => {}
            _ = unix_signal(SignalKind::hangup(), "SIGHUP") => {}
            _ = unix_signal(SignalKind::quit(), "SIGQUIT") => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}

#[cfg(unix)]
async fn unix_signal(kind: tokio::signal::unix::SignalKind, name: &str) {
    match tokio::signal::unix::signal(kind) {
        Ok(mut sig) => {
            sig.recv().await;
            info!("Received {} signal", name);
        }
        Err(e) => {
            error!("Failed to install {} handler: {}", name, e);
            std::future::pending::<()>().await;
        }
    }
}
