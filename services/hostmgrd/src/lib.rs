//! hostmgrd - SSH host trust synchronization daemon
//!
//! Keeps SSH host-based trust consistent across a fleet by treating a
//! shared Redis registry as the source of truth for which hosts exist,
//! their public keys and their allowed client identities.
//!
//! # Architecture
//!
//! The daemon runs one task per enabled role:
//! - **Consumer** (`--server`): full resync on startup, then watches
//!   registry keyspace notifications and rewrites the local SSH trust
//!   files on every change
//! - **Announcer** (`--client`): publishes this host's record, blocks
//!   until a termination signal, then revokes the record
//!
//! # Data Flow
//!
//! ## Consumer (registry → local files)
//! 1. Keyspace notification arrives for a key under the namespace
//! 2. All records are listed from the registry
//! 3. The managed sections of `ssh_known_hosts` and `shosts.equiv` are
//!    rewritten from the record set
//!
//! ## Announcer (local host → registry)
//! 1. Hostname, outbound address, host key and client user are gathered
//! 2. The record is stored under its derived key
//! 3. On SIGTERM/SIGHUP/SIGQUIT/Ctrl+C the key is deleted

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

pub mod announcer;
pub mod consumer;
pub mod facts;

use std::path::PathBuf;
use std::time::Duration;

use hostmgr::{HostmgrError, TrustFiles};
use thiserror::Error;
use tracing::info;

/// Fixed retry interval for resync and watch operations.
pub const RESYNC_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Fixed retry interval for the initial announcement.
pub const ANNOUNCE_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Overall deadline after which a retried operation is abandoned.
pub const RETRY_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_HOST_KEY_PATH: &str = "/etc/ssh/ssh_host_rsa_key";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Host manager error: {0}")]
    Hostmgr(#[from] HostmgrError),
    #[error("Task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Service configuration
#[derive(Clone)]
pub struct Config {
    /// Redis connection URL
    pub registry_url: String,
    /// Key prefix under which host records live (e.g. "/hostmgr")
    pub namespace: String,
    /// Run the consumer role
    pub consumer: bool,
    /// Run the announcer role
    pub announcer: bool,
    /// Override for the announced client user
    pub client_user: Option<String>,
    /// Trust files rewritten by the consumer
    pub trust_files: TrustFiles,
    /// Private host key announced by the announcer; the public half is
    /// read from the `.pub` sibling
    pub host_key_path: PathBuf,
}

impl Config {
    /// Build a configuration from CLI-level inputs.
    ///
    /// `host` accepts either a bare `host:port` or a full URL. The
    /// consumer role is the default when neither role is selected.
    pub fn new(host: &str, namespace: &str, server: bool, client: bool, user: Option<String>) -> Self {
        Self {
            registry_url: registry_url(host),
            namespace: namespace.to_string(),
            consumer: server || !client,
            announcer: client,
            client_user: user,
            trust_files: TrustFiles::default(),
            host_key_path: PathBuf::from(DEFAULT_HOST_KEY_PATH),
        }
    }
}

/// Normalize a registry address into a Redis URL.
fn registry_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("redis://{}", host)
    }
}

/// Run the daemon: one task per enabled role, joined to completion.
///
/// The first role to fail takes the whole process down with it, so an
/// operator sees a crash instead of a silently degraded daemon.
pub async fn run(config: Config) -> Result<(), ServiceError> {
    info!("Starting host trust synchronization");
    info!("Registry URL: {}", config.registry_url);
    info!("Namespace: {}", config.namespace);

    let mut tasks = Vec::new();

    if config.consumer {
        let consumer_config = config.clone();
        tasks.push(tokio::spawn(consumer::run(consumer_config)));
    }

    if config.announcer {
        let announcer_config = config.clone();
        tasks.push(tokio::spawn(announcer::run(announcer_config)));
    }

    if tasks.is_empty() {
        return Err(ServiceError::Config("no role selected".to_string()));
    }

    for task in tasks {
        task.await??;
    }

    info!("All roles completed, exiting");
    Ok(())
}
