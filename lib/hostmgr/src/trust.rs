//! Trust-file renderer: section-tagged rewrite of the OS SSH trust files.
//!
//! Two files are managed, each with its own projection of the record set:
//!
//! - **known-hosts**: `"{hostname},{address} {public_key}"`, one line
//!   per record
//! - **trust-equivalence** (`shosts.equiv`): `"{hostname} {client_user}"`
//!   and `"{address} {client_user}"`, two lines per record
//!
//! Only the region between two occurrences of the literal tag line
//! `# hostmgr` is owned by this module; everything outside it is
//! preserved verbatim. The rewrite is idempotent: running it twice with
//! the same record set produces byte-identical output.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::HostmgrError;
use crate::record::HostRecord;

/// Literal line delimiting the managed section, appearing exactly
/// twice in a well-formed trust file.
pub const SECTION_TAG: &str = "# hostmgr";

const SSH_KNOWN_HOSTS_PATH: &str = "/etc/ssh/ssh_known_hosts";
const SSH_HOSTS_EQUIV_PATH: &str = "/etc/ssh/shosts.equiv";

/// The pair of trust files kept in sync with the registry.
#[derive(Debug, Clone)]
pub struct TrustFiles {
    known_hosts: PathBuf,
    hosts_equiv: PathBuf,
}

impl Default for TrustFiles {
    /// The system locations consumed by sshd for host-based
    /// authentication.
    fn default() -> Self {
        Self::new(SSH_KNOWN_HOSTS_PATH, SSH_HOSTS_EQUIV_PATH)
    }
}

impl TrustFiles {
    pub fn new(known_hosts: impl Into<PathBuf>, hosts_equiv: impl Into<PathBuf>) -> Self {
        Self {
            known_hosts: known_hosts.into(),
            hosts_equiv: hosts_equiv.into(),
        }
    }

    /// Rewrite both trust files so their managed sections reflect
    /// `records`.
    ///
    /// Both files are always attempted; the first error (if any) is
    /// returned after both rewrites have run, so a failure on one file
    /// never leaves the other stale.
    pub fn update(&self, records: &[HostRecord]) -> Result<(), HostmgrError> {
        info!("Updating SSH trust files for {} host(s)", records.len());

        let known = rewrite_section(&self.known_hosts, &known_hosts_lines(records));
        let equiv = rewrite_section(&self.hosts_equiv, &hosts_equiv_lines(records));

        known.and(equiv)
    }
}

/// known-hosts projection: one line per record.
pub fn known_hosts_lines(records: &[HostRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| format!("{},{} {}", r.hostname, r.address, r.public_key))
        .collect()
}

/// trust-equivalence projection: hostname and address lines per record.
pub fn hosts_equiv_lines(records: &[HostRecord]) -> Vec<String> {
    let mut lines = Vec::with_capacity(records.len() * 2);
    for r in records {
        lines.push(format!("{} {}", r.hostname, r.client_user));
        lines.push(format!("{} {}", r.address, r.client_user));
    }
    lines
}

/// Rewrite the managed section of one file.
///
/// An unreadable file degrades to empty input (writing possibly
/// incomplete output is preferred over leaving stale trust data), but
/// the read error is still surfaced to the caller once the write has
/// been attempted. The output is fully assembled in memory before the
/// target path is touched.
fn rewrite_section(path: &Path, section: &[String]) -> Result<(), HostmgrError> {
    let (existing, read_error) = match std::fs::read_to_string(path) {
        Ok(contents) => (contents, None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} does not exist, creating it", path.display());
            (String::new(), None)
        }
        Err(e) => {
            warn!(
                "Cannot read {}, rewriting from empty (entries outside the managed section may be lost): {}",
                path.display(),
                e
            );
            (String::new(), Some(e))
        }
    };

    let output = replace_section(&existing, SECTION_TAG, section);

    std::fs::write(path, &output).map_err(|e| HostmgrError::TrustFile {
        path: path.display().to_string(),
        source: e,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).map_err(|e| {
            HostmgrError::TrustFile {
                path: path.display().to_string(),
                source: e,
            }
        })?;
    }

    match read_error {
        Some(e) => Err(HostmgrError::TrustFile {
            path: path.display().to_string(),
            source: e,
        }),
        None => Ok(()),
    }
}

/// Replace the tagged section of `existing` with `section`.
///
/// The input is partitioned on tag lines into alternating
/// outside/inside segments. All outside content is kept: the segment
/// before the first tag becomes the prefix, and any outside segments
/// after a closing tag are concatenated as the suffix. Inside segments
/// and the original tag lines are dropped. The output is
/// `prefix + tag + section + tag + suffix`, so the tag always appears
/// exactly twice regardless of how many times it occurred before.
fn replace_section(existing: &str, tag: &str, section: &[String]) -> String {
    let mut prefix: Vec<&str> = Vec::new();
    let mut suffix: Vec<&str> = Vec::new();
    let mut tags_seen: usize = 0;

    for line in existing.lines() {
        if line.trim() == tag {
            tags_seen += 1;
            continue;
        }
        let inside = tags_seen % 2 == 1;
        if inside {
            // Old managed content (or a duplicated section), replaced.
            continue;
        }
        if tags_seen == 0 {
            prefix.push(line);
        } else {
            suffix.push(line);
        }
    }

    let mut out = String::new();
    for line in &prefix {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(tag);
    out.push('\n');
    for line in section {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(tag);
    out.push('\n');
    for line in &suffix {
        out.push_str(line);
        out.push('\n');
    }
    out
}
