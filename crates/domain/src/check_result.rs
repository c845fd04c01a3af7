use serde::{Deserialize, Serialize};

/// One requirement's verdict, in the order `missing[]` is always emitted:
/// CNAME, MX, SPF, DMARC, (optionally) DKIM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingEntry {
    pub key: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub expected: String,
    pub found: Vec<String>,
    pub ok: bool,
    #[serde(default)]
    pub found_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_reason: Option<String>,
}

/// Raw resolved values plus truncation/hash metadata for one DNS key, kept
/// for forensic inspection. See [`crate::sanitize`] (application crate) for
/// the cap/truncate/hash rules that populate this.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SnapshotEntry {
    pub values: Vec<String>,
    pub total: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cname: Option<SnapshotEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dkim_cname: Option<SnapshotEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mx: Option<SnapshotEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spf: Option<SnapshotEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dmarc: Option<SnapshotEntry>,
    /// Set instead of the per-key entries once the serialized payload has
    /// been summarized down for size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub ok: bool,
    pub missing: Vec<MissingEntry>,
    pub snapshot: Snapshot,
}

pub const MISSING_KEY_CNAME: &str = "CNAME";
pub const MISSING_KEY_MX: &str = "MX";
pub const MISSING_KEY_SPF: &str = "SPF";
pub const MISSING_KEY_DMARC: &str = "DMARC";
pub const MISSING_KEY_DKIM: &str = "DKIM";
