//! Input validation for record fields
//!
//! Pure functions, invoked by [`RecordStore`](crate::RecordStore) before it
//! takes its lock so malformed input never touches shared state.

use crate::error::{Error, Result};
use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;
use uuid::Uuid;

/// Maximum length of a whole record name
pub const MAX_NAME_LEN: usize = 63;

static LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("label pattern compiles")
});

/// Parse a record identifier
///
/// Any UUID text form accepted by [`Uuid::parse_str`] is valid.
pub fn validate_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|e| Error::invalid_id(format!("{id:?}: {e}")))
}

/// Check a record name
///
/// Every dot-separated label must match the hostname label pattern and the
/// whole name is bounded by [`MAX_NAME_LEN`].
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("name cannot be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_name(format!(
            "name too long: {} chars (max {MAX_NAME_LEN})",
            name.len()
        )));
    }

    for label in name.split('.') {
        if !LABEL_PATTERN.is_match(label) {
            return Err(Error::invalid_name(format!("{name:?}: bad label {label:?}")));
        }
    }

    Ok(())
}

/// Parse a record target
///
/// Only bare IPv4 and IPv6 literals are accepted; hostnames, ports,
/// prefixes and IPv6 zone suffixes (`fe80::1%eth0`) are rejected. A zone
/// names an interface of this host and has no meaning in a hosts file.
pub fn validate_target(target: &str) -> Result<IpAddr> {
    target
        .parse::<IpAddr>()
        .map_err(|e| Error::invalid_target(format!("{target:?}: {e}")))
}
