use sha2::{Digest, Sha256};

use dnswatch_domain::{CheckResult, Snapshot, SnapshotEntry};

/// Strips `U+0000..U+001F` and `U+007F` control characters.
pub fn strip_control_chars(s: &str) -> String {
    s.chars()
        .filter(|c| !(*c <= '\u{1f}' || *c == '\u{7f}'))
        .collect()
}

/// Collapses runs of whitespace to a single space; used for log/email text.
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Drops all whitespace; used for DNS hostnames/rdata before comparison.
pub fn drop_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Strip, collapse, trim, lowercase — the exact-match-after-normalization
/// rule shared by SPF and DMARC comparisons.
pub fn normalize_for_compare(s: &str) -> String {
    collapse_whitespace(&strip_control_chars(s))
        .trim()
        .to_ascii_lowercase()
}

/// Truncates to `max_len` bytes with a trailing `"..."`, returning whether
/// truncation occurred. Idempotent: re-applying to an already-truncated
/// value (length `<= max_len`) is a no-op.
pub fn truncate_with_ellipsis(s: &str, max_len: usize) -> (String, bool) {
    if s.len() <= max_len {
        return (s.to_string(), false);
    }
    const ELLIPSIS: &str = "...";
    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut boundary = keep.min(s.len());
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    (format!("{}{}", &s[..boundary], ELLIPSIS), true)
}

/// Sanitizes a single external string end to end: strip control chars,
/// collapse whitespace, truncate. Idempotent per `sanitize(sanitize(x)) ==
/// sanitize(x)`.
pub fn sanitize_value(s: &str, max_len: usize) -> (String, bool) {
    let cleaned = collapse_whitespace(&strip_control_chars(s));
    truncate_with_ellipsis(&cleaned, max_len)
}

#[derive(Debug, Clone)]
pub struct CappedList {
    pub values: Vec<String>,
    pub total: usize,
    pub truncated: bool,
}

/// `capArray`: caps `values` to `max` entries, reporting the pre-cap total.
pub fn cap_array(values: &[String], max: usize) -> CappedList {
    let total = values.len();
    let truncated = total > max;
    let values = values.iter().take(max).cloned().collect();
    CappedList {
        values,
        total,
        truncated,
    }
}

/// SHA-256 of the pre-truncation originals joined with `\n`, for forensic
/// comparison once the persisted payload has been summarized away.
pub fn hash_originals(values: &[String]) -> String {
    let joined = values.join("\n");
    let digest = Sha256::digest(joined.as_bytes());
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Builds a [`SnapshotEntry`] from raw resolved values: caps the list to
/// `max_records`, truncates each value to `max_len`, and attaches a hash of
/// the originals whenever any truncation happened.
pub fn build_snapshot_entry(raw_values: &[String], max_records: usize, max_len: usize) -> SnapshotEntry {
    let capped = cap_array(raw_values, max_records);
    let mut any_value_truncated = capped.truncated;
    let values: Vec<String> = capped
        .values
        .iter()
        .map(|v| {
            let (truncated_value, was_truncated) = sanitize_value(v, max_len);
            any_value_truncated = any_value_truncated || was_truncated;
            truncated_value
        })
        .collect();

    let values_hash = if any_value_truncated {
        Some(hash_originals(raw_values))
    } else {
        None
    };

    SnapshotEntry {
        values,
        total: capped.total,
        truncated: any_value_truncated,
        values_hash,
    }
}

/// Enforces the serialized-JSON byte budget by progressively summarizing:
/// full payload, then counts-only snapshot with first-3 `found` entries,
/// then a note-only snapshot with every `found` cleared.
pub fn build_result_payload(result: &CheckResult, max_bytes: usize) -> String {
    if let Ok(full) = serde_json::to_string(result) {
        if full.len() <= max_bytes {
            return full;
        }
    }

    let mut summarized = result.clone();
    summarized.snapshot = summarize_snapshot_counts_only(&result.snapshot);
    for entry in &mut summarized.missing {
        entry.found.truncate(3);
    }
    if let Ok(text) = serde_json::to_string(&summarized) {
        if text.len() <= max_bytes {
            return text;
        }
    }

    let mut minimal = summarized;
    minimal.snapshot = Snapshot {
        note: Some("omitted: result exceeded size budget".to_string()),
        ..Default::default()
    };
    for entry in &mut minimal.missing {
        entry.found.clear();
    }
    serde_json::to_string(&minimal).unwrap_or_else(|_| {
        "{\"ok\":false,\"missing\":[],\"snapshot\":{\"note\":\"serialization failed\"}}".to_string()
    })
}

fn summarize_snapshot_counts_only(snapshot: &Snapshot) -> Snapshot {
    let counts_only = |entry: &Option<SnapshotEntry>| {
        entry.as_ref().map(|e| SnapshotEntry {
            values: Vec::new(),
            total: e.total,
            truncated: e.truncated,
            values_hash: e.values_hash.clone(),
        })
    };
    Snapshot {
        cname: counts_only(&snapshot.cname),
        dkim_cname: counts_only(&snapshot.dkim_cname),
        mx: counts_only(&snapshot.mx),
        spf: counts_only(&snapshot.spf),
        dmarc: counts_only(&snapshot.dmarc),
        note: None,
    }
}
