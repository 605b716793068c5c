//! Split descriptors handed from the planner to scan workers.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Advisory worker location for a split.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostAddress {
    pub host: String,
    pub port: u16,
}

impl HostAddress {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Half-open row-key interval `[start, end)`; `None` means unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeyRange {
    pub start: Option<Bytes>,
    pub end: Option<Bytes>,
}

impl KeyRange {
    #[must_use]
    pub fn new(start: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    /// The whole key space.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Every key that starts with `prefix`.
    #[must_use]
    pub fn prefixed(prefix: &[u8]) -> Self {
        Self {
            start: Some(Bytes::copy_from_slice(prefix)),
            end: prefix_successor(prefix),
        }
    }

    pub const fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let above_start = self.start.as_ref().map_or(true, |start| key >= start.as_ref());
        let below_end = self.end.as_ref().map_or(true, |end| key < end.as_ref());
        above_start && below_end
    }

    /// Overlap of two ranges, or `None` when they are disjoint.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let start = match (&self.start, &other.start) {
            (Some(a), Some(b)) => Some(a.max(b).clone()),
            (Some(a), None) | (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        };
        let end = match (&self.end, &other.end) {
            (Some(a), Some(b)) => Some(a.min(b).clone()),
            (Some(a), None) | (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        };

        if let (Some(start), Some(end)) = (&start, &end) {
            if start >= end {
                return None;
            }
        }

        Some(Self { start, end })
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |bound: &Option<Bytes>, open: &str| -> String {
            bound.as_ref().map_or_else(
                || open.to_string(),
                |key| String::from_utf8_lossy(key).escape_debug().to_string(),
            )
        };
        write!(f, "[{}, {})", render(&self.start, "-inf"), render(&self.end, "+inf"))
    }
}

/// Smallest key strictly greater than `key`.
pub fn key_successor(key: &[u8]) -> Bytes {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0);
    Bytes::from(next)
}

/// Smallest key greater than every key starting with `prefix`, or `None`
/// when no such key exists (empty or all-`0xFF` prefix).
pub fn prefix_successor(prefix: &[u8]) -> Option<Bytes> {
    let mut next = prefix.to_vec();
    while let Some(last) = next.pop() {
        if last < u8::MAX {
            next.push(last + 1);
            return Some(Bytes::from(next));
        }
    }
    None
}

/// A physical region recorded in a snapshot manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    pub region_id: String,
    /// Empty means the start of the table.
    pub start_key: Bytes,
    /// Empty means the end of the table.
    pub end_key: Bytes,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub split: bool,
    #[serde(default)]
    pub split_parent: bool,
}

impl RegionDescriptor {
    #[must_use]
    pub fn new(region_id: impl Into<String>, start_key: Bytes, end_key: Bytes) -> Self {
        Self {
            region_id: region_id.into(),
            start_key,
            end_key,
            offline: false,
            split: false,
            split_parent: false,
        }
    }

    /// Offline parent superseded by its daughters.
    pub const fn is_stale_split(&self) -> bool {
        self.offline && (self.split || self.split_parent)
    }

    pub fn key_range(&self) -> KeyRange {
        let bound = |key: &Bytes| (!key.is_empty()).then(|| key.clone());
        KeyRange {
            start: bound(&self.start_key),
            end: bound(&self.end_key),
        }
    }
}

/// How a split reads its rows. Exactly one shape per split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanUnit {
    /// Point lookups of the listed row keys.
    BatchGet { keys: Vec<Bytes> },
    /// Scan of one row-key interval.
    KeyRange { range: KeyRange },
    /// Scan of one snapshot region; the region boundary is the range.
    RegionLocal {
        region_index: usize,
        region: RegionDescriptor,
        snapshot_name: String,
    },
}

/// Independently executable unit of a distributed read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub schema: String,
    pub table: String,
    pub row_key_column: String,
    #[serde(default)]
    pub host_hints: Vec<HostAddress>,
    /// Conditions the split's reader applies; row-key conditions among them
    /// are already encoded in `unit`.
    pub conditions: Vec<Condition>,
    pub unit: ScanUnit,
}

impl Split {
    /// `schema:table`.
    pub fn qualified_table(&self) -> String {
        format!("{}:{}", self.schema, self.table)
    }

    pub fn key_range(&self) -> Option<&KeyRange> {
        match &self.unit {
            ScanUnit::KeyRange { range } => Some(range),
            _ => None,
        }
    }

    pub fn batch_keys(&self) -> Option<&[Bytes]> {
        match &self.unit {
            ScanUnit::BatchGet { keys } => Some(keys),
            _ => None,
        }
    }

    /// One-line summary for logs.
    pub fn describe(&self) -> String {
        let hosts: Vec<String> = self.host_hints.iter().map(ToString::to_string).collect();
        let unit = match &self.unit {
            ScanUnit::BatchGet { keys } => format!("batch_get keys={}", keys.len()),
            ScanUnit::KeyRange { range } => format!("key_range {range}"),
            ScanUnit::RegionLocal {
                region_index,
                region,
                snapshot_name,
            } => format!(
                "region_local #{region_index} region={} snapshot={snapshot_name}",
                region.region_id
            ),
        };
        format!(
            "{} {} conditions={} hosts=[{}]",
            self.qualified_table(),
            unit,
            self.conditions.len(),
            hosts.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_successor() {
        assert_eq!(prefix_successor(b"ab").unwrap().as_ref(), b"ac");
        assert_eq!(prefix_successor(&[b'a', 0xFF]).unwrap().as_ref(), b"b");
        assert!(prefix_successor(&[0xFF, 0xFF]).is_none());
        assert!(prefix_successor(b"").is_none());
    }

    #[test]
    fn test_prefixed_range_contains() {
        let range = KeyRange::prefixed(b"0-US-");
        assert!(range.contains(b"0-US-"));
        assert!(range.contains(b"0-US-42"));
        assert!(!range.contains(b"0-US"));
        assert!(!range.contains(b"0-USA-1"));
        assert!(!range.contains(b"1-US-42"));
    }

    #[test]
    fn test_inclusive_upper_bound_range() {
        let range = KeyRange::new(&b"US-42"[..], key_successor(b"US-42"));
        assert!(range.contains(b"US-42"));
        assert!(!range.contains(b"US-420"));
        assert!(!range.contains(b"US-41"));
    }

    #[test]
    fn test_intersect() {
        let a = KeyRange::new(&b"b"[..], &b"m"[..]);
        let b = KeyRange {
            start: Some(Bytes::from_static(b"f")),
            end: None,
        };
        assert_eq!(a.intersect(&b), Some(KeyRange::new(&b"f"[..], &b"m"[..])));
        assert_eq!(a.intersect(&KeyRange::unbounded()), Some(a.clone()));
        let disjoint = KeyRange::new(&b"m"[..], &b"z"[..]);
        assert_eq!(a.intersect(&disjoint), None);
    }

    #[test]
    fn test_stale_region() {
        let mut region = RegionDescriptor::new("r1", Bytes::new(), Bytes::new());
        assert!(!region.is_stale_split());
        assert!(region.key_range().is_unbounded());
        region.offline = true;
        assert!(!region.is_stale_split());
        region.split_parent = true;
        assert!(region.is_stale_split());
    }
}
