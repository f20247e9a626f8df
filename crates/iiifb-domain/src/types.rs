use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Activity stream events ────────────────────────────────────────────────────

/// One change event read from the preservation activity stream.
///
/// Activities carry no internal id; `end_time` is the identity and the sort
/// key, and the watermark advances past it once the event has been consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub end_time: DateTime<Utc>,
    pub activity_type: String,
    pub archival_group_uri: String,
}

// ── Archival groups ───────────────────────────────────────────────────────────

/// The preservation repository's JSON view of one archival group.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchivalGroup {
    /// Storage root URI, e.g. an S3 prefix. Asset origins are built by
    /// appending the storage map's per-file suffix to this.
    pub origin: String,
    #[serde(rename = "storageMap", default)]
    pub storage_map: StorageMap,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageMap {
    /// Local relative path → per-file storage suffix.
    #[serde(default)]
    pub files: HashMap<String, StorageEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageEntry {
    #[serde(rename = "fullPath")]
    pub full_path: String,
}

// ── Identity ──────────────────────────────────────────────────────────────────

/// What the identity service knows about one archival group.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    /// Stable slug used as the stem of every downstream URI.
    pub pid: String,
    /// The rewritten public manifest URI as seeded in the identity service.
    pub manifest_uri: String,
    pub catalogue_api_uri: Option<String>,
    pub catirn: Option<String>,
}

/// Downstream IIIF cloud service URIs synthesised from a resolved identity.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalUris {
    pub public_manifest_uri: String,
    pub api_manifest_uri: String,
    pub canvas_id_prefix: String,
    pub asset_prefix: String,
}
