//! hostmgr - SSH host-based trust synchronization
//!
//! Keeps a fleet's SSH trust files in sync with a Redis registry that
//! acts as the source of truth for which hosts exist and what their
//! public keys / allowed client identities are.
//!
//! # Architecture
//!
//! - **Registry Client**: typed CRUD over the registry: list host
//!   records under a namespace, announce a record, revoke a key
//! - **Trust-File Renderer**: merges a record set into the OS trust
//!   files, replacing only a tagged section
//! - **Change Watcher**: subscribes to Redis keyspace notifications for
//!   the namespace and triggers a full resync on every change
//! - **Retry Supervisor**: fixed-interval retry with an overall
//!   deadline, wrapped around every registry operation
//!
//! # Data Flow
//!
//! ## Consumer (local files follow the registry)
//! 1. Initial resync: list all records, rewrite both trust files
//! 2. Watcher receives a keyspace notification for the namespace
//! 3. The same resync runs again (full record set, no diffing)
//!
//! ## Announcer (this host joins the registry)
//! 1. Build a record from local host facts
//! 2. SET it under its derived key, keep the key
//! 3. On a termination signal, DEL the key

pub mod error;
pub mod record;
pub mod registry;
pub mod retry;
pub mod trust;
pub mod watcher;

pub use error::HostmgrError;
pub use record::HostRecord;
pub use registry::{ListOutcome, RegistryClient};
pub use retry::supervise;
pub use trust::{TrustFiles, SECTION_TAG};
pub use watcher::RegistryWatcher;
