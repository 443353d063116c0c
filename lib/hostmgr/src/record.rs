//! Host trust records and their derived registry keys

use serde::{Deserialize, Serialize};

/// A host's announced trust identity.
///
/// Stored in the registry as JSON under a key derived from the
/// identifying fields, so re-announcing an unchanged host overwrites
/// the same entry instead of creating a duplicate. There is no TTL:
/// a host that dies without revoking leaves a stale record until it is
/// cleaned up manually or re-announced under a changed identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// DNS hostname; empty when it cannot be determined.
    pub hostname: String,

    /// Best-effort outbound IP address literal.
    #[serde(rename = "IP")]
    pub address: String,

    /// Raw SSH public-key line; empty when unavailable.
    #[serde(rename = "public_key")]
    pub public_key: String,

    /// The OS account the ssh client process runs under, not the
    /// login identity.
    #[serde(rename = "client_user")]
    pub client_user: String,
}

impl HostRecord {
    /// Derive the registry key for this record under `namespace`.
    ///
    /// The key is a pure function of the identifying fields, so it
    /// doubles as the idempotence key for announce/revoke.
    pub fn registry_key(&self, namespace: &str) -> String {
        format!(
            "{}/hosts/{}-{}-{}",
            namespace, self.hostname, self.address, self.client_user
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HostRecord {
        HostRecord {
            hostname: "h1".to_string(),
            address: "10.0.0.1".to_string(),
            public_key: "ssh-rsa AAAA keyA".to_string(),
            client_user: "alice".to_string(),
        }
    }

    #[test]
    fn test_registry_key_layout() {
        let key = sample().registry_key("/hostmgr");
        assert_eq!(key, "/hostmgr/hosts/h1-10.0.0.1-alice");
    }

    #[test]
    fn test_registry_key_stable() {
        // Announcing twice with identical fields must hit the same key.
        let a = sample().registry_key("/hostmgr");
        let b = sample().registry_key("/hostmgr");
        assert_eq!(a, b);
    }

    #[test]
    fn test_registry_key_ignores_public_key() {
        let mut record = sample();
        record.public_key = "ssh-rsa BBBB rotated".to_string();
        assert_eq!(
            record.registry_key("/hostmgr"),
            sample().registry_key("/hostmgr")
        );
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"hostname\""));
        assert!(json.contains("\"IP\""));
        assert!(json.contains("\"public_key\""));
        assert!(json.contains("\"client_user\""));
    }

    #[test]
    fn test_roundtrip() {
        let json = serde_json::to_string(&sample()).unwrap();
        let parsed: HostRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_decodes_legacy_record() {
        let json = r#"{"hostname":"node-1","IP":"192.168.0.7","public_key":"ssh-rsa AAAA","client_user":"root"}"#;
        let parsed: HostRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.hostname, "node-1");
        assert_eq!(parsed.address, "192.168.0.7");
        assert_eq!(parsed.client_user, "root");
    }
}
