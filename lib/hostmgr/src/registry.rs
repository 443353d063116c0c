//! Registry client: typed CRUD over the Redis key-value store.
//!
//! Every operation opens its own connection and drops it when done.
//! Call frequency is low (host topology changes are rare), so the
//! simplicity of connectionless calls wins over pooling.

use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::error::HostmgrError;
use crate::record::HostRecord;

/// Result of a `list` call under the partial-success policy.
///
/// A decode or fetch failure on one entry does not abort the listing:
/// all successfully parsed records are returned, and `last_error`
/// carries the most recent failure. Callers must not assume an error
/// means an empty result.
#[derive(Debug, Default)]
pub struct ListOutcome {
    pub records: Vec<HostRecord>,
    pub last_error: Option<HostmgrError>,
}

/// Client for the host-record namespace of the registry.
#[derive(Clone)]
pub struct RegistryClient {
    url: String,
    namespace: String,
}

impl RegistryClient {
    pub fn new(url: &str, namespace: &str) -> Self {
        Self {
            url: url.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn connect(&self) -> Result<redis::aio::MultiplexedConnection, HostmgrError> {
        let client = redis::Client::open(self.url.as_str())?;
        Ok(client.get_multiplexed_async_connection().await?)
    }

    /// Fetch every host record stored under the namespace.
    ///
    /// Keys are matched with `KEYS {namespace}*`; each value is fetched
    /// and decoded independently so one malformed entry cannot poison
    /// the rest.
    pub async fn list(&self) -> Result<ListOutcome, HostmgrError> {
        let mut conn = self.connect().await?;

        let pattern = format!("{}*", self.namespace);
        let keys: Vec<String> = conn.keys(&pattern).await?;
        debug!("Received {} host record keys", keys.len());

        let mut entries: Vec<(String, String)> = Vec::with_capacity(keys.len());
        let mut fetch_error: Option<HostmgrError> = None;

        for key in keys {
            let value: Result<Option<String>, redis::RedisError> = conn.get(&key).await;
            match value {
                Ok(Some(value)) => entries.push((key, value)),
                Ok(None) => {
                    // Deleted between KEYS and GET; nothing to decode.
                    debug!("Key {} vanished during listing", key);
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", key, e);
                    fetch_error = Some(e.into());
                }
            }
        }

        let mut outcome = decode_entries(&entries);
        if outcome.last_error.is_none() {
            outcome.last_error = fetch_error;
        }
        debug!("Decoded {} host records from query", outcome.records.len());

        Ok(outcome)
    }

    /// Create or update the record in the registry.
    ///
    /// Returns the derived key so the caller can revoke it later.
    pub async fn announce(&self, record: &HostRecord) -> Result<String, HostmgrError> {
        let key = record.registry_key(&self.namespace);
        let json = serde_json::to_string(record)?;

        let mut conn = self.connect().await?;
        let _: () = conn.set(&key, &json).await?;

        debug!("Announced host record under {}", key);
        Ok(key)
    }

    /// Remove a record by key. Deleting an absent key is not an error.
    pub async fn revoke(&self, key: &str) -> Result<(), HostmgrError> {
        let mut conn = self.connect().await?;
        let _: () = conn.del(key).await?;

        debug!("Revoked host record {}", key);
        Ok(())
    }
}

/// Decode raw `(key, value)` entries into records, isolating failures.
fn decode_entries(entries: &[(String, String)]) -> ListOutcome {
    let mut outcome = ListOutcome::default();

    for (key, value) in entries {
        match serde_json::from_str::<HostRecord>(value) {
            Ok(record) => outcome.records.push(record),
            Err(e) => {
                warn!("Skipping malformed host record at {}: {}", key, e);
                outcome.last_error = Some(e.into());
            }
        }
    }

    outcome
}
