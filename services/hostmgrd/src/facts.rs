//! Best-effort discovery of this host's announceable identity.
//!
//! Every probe degrades instead of failing: an announcement with an
//! empty field is still more useful to the fleet than no announcement
//! at all.

use std::net::UdpSocket;
use std::path::Path;

use hostmgr::HostRecord;
use tokio::process::Command;
use tracing::{info, warn};

/// Assemble this host's record. The public key is read from the `.pub`
/// sibling of `host_key_path`, generating the pair first if the private
/// key is missing.
pub async fn gather(host_key_path: &Path) -> HostRecord {
    HostRecord {
        hostname: hostname(),
        address: outbound_address(),
        public_key: load_or_generate_public_key(host_key_path).await,
        client_user: process_user(),
    }
}

fn hostname() -> String {
    match std::fs::read_to_string("/proc/sys/kernel/hostname") {
        Ok(name) => name.trim().to_string(),
        Err(e) => {
            warn!("Cannot determine hostname: {}", e);
            String::new()
        }
    }
}

/// The address other hosts would see this one connect from.
///
/// A connected UDP socket picks the route without sending any packets;
/// the local address of that socket is the outbound IP.
fn outbound_address() -> String {
    let probe = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| socket.connect("8.8.8.8:80").map(|_| socket))
        .and_then(|socket| socket.local_addr());

    match probe {
        Ok(addr) => addr.ip().to_string(),
        Err(e) => {
            warn!("Cannot determine outbound address, using loopback: {}", e);
            "127.0.0.1".to_string()
        }
    }
}

async fn load_or_generate_public_key(private_key: &Path) -> String {
    if !private_key.exists() {
        info!("Generating SSH host key at {}", private_key.display());
        let result = Command::new("ssh-keygen")
            .arg("-t")
            .arg("rsa")
            .arg("-f")
            .arg(private_key)
            .arg("-N")
            .arg("")
            .arg("-C")
            .arg("hostmgr")
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {}
            Ok(output) => warn!(
                "ssh-keygen failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Cannot run ssh-keygen: {}", e),
        }
    }

    let public_key = private_key.with_extension("pub");
    match std::fs::read_to_string(&public_key) {
        Ok(key) => key.trim().to_string(),
        Err(e) => {
            warn!("Cannot read public key {}: {}", public_key.display(), e);
            String::new()
        }
    }
}

/// The account this process runs under, not the login identity.
fn process_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| {
            warn!("Cannot determine process user, announcing as \"unknown\"");
            "unknown".to_string()
        })
}
