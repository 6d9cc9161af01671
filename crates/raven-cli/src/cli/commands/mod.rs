//! `raven` subcommands.

pub mod dispatch;
pub mod keygen;
pub mod request;
pub mod sign;
pub mod verify;

pub use dispatch::dispatch;

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Parse a time given on the command line: RFC 3339 or the protocol's
/// `YYYYMMDDThhmmssZ`.
pub(crate) fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    raven_core::codec::parse_timestamp(s).map_err(|e| {
        anyhow::anyhow!(
            "invalid time {s:?}: expected RFC 3339 or YYYYMMDDThhmmssZ ({})",
            e.detail
        )
    })
}
