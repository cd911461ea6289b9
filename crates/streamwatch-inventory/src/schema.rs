//! Stream record definition
//!
//! A stream row comes from the `cameras` table with the columns
//! `(id, name, source_url)`. The same shape is used by the JSON file
//! inventory and by every downstream component.

use serde::{Deserialize, Serialize};

/// One network video stream to probe.
///
/// Immutable once read from the inventory. `id` is unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stream {
    /// Inventory identity
    pub id: i64,
    /// Display label
    pub name: String,
    /// Connection string handed to the probe (usually `rtsp://...`)
    #[serde(alias = "rtsp_url")]
    pub source_url: String,
}

impl Stream {
    /// Create a new stream record
    pub fn new(id: i64, name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            source_url: source_url.into(),
        }
    }
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.id, self.name)
    }
}
