//! Timeline time helpers
//!
//! Programme boundaries are stored at whole-second precision. Every instant that
//! is compared against or written as a boundary goes through [`truncate_to_second`].

use chrono::{DateTime, Utc};

/// Drop sub-second precision
pub fn truncate_to_second(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

/// Same instant once sub-second precision is ignored
pub fn same_second(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.timestamp() == b.timestamp()
}

/// XMLTV timestamp, e.g. `20260301100000 +0000`
pub fn format_xmltv_time(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S %z").to_string()
}
