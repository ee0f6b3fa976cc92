//! Ingest stamps.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// "Indexed no earlier than this instant."
///
/// Compared against the engine's stored ingest time with an inclusive lower
/// bound (`gte`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IngestStamp(DateTime<Utc>);

impl IngestStamp {
    /// A stamp for the current instant.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// ISO-8601 form used in range filters, e.g. `2024-03-01T10:00:00+00:00`.
    pub fn to_range_bound(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

impl From<DateTime<Utc>> for IngestStamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}
