use std::fmt;

use serde::Deserialize;

use crate::config::RotationStrategy;

// ------------------------------------------------------------
// Identifiers
// ------------------------------------------------------------
//
// Both identifiers are opaque tokens handed out by the catalog.
// Equality is plain byte-wise string equality; nothing in the
// rotator parses or normalizes them.
//

/// A playable item in the catalog (e.g. `spotify:track:4uLU6hMCjMI75M1A2tKUQC`).
///
/// IMPORTANT:
/// - Collections may contain the same ItemId more than once.
/// - Order is whatever the catalog returned during one read pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remotely owned, ordered and mutable list of items (a playlist).
///
/// The default is the empty id, which `Config::validate` rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub String);

impl CollectionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ------------------------------------------------------------
// Catalog responses
// ------------------------------------------------------------

/// One page of a collection listing.
///
/// `None` entries are tombstones: the catalog still lists the slot
/// but the underlying item is gone or unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Option<ItemId>>,

    /// Total number of entries in the collection as reported
    /// by the catalog for this request.
    pub total: usize,
}

/// The account the access token belongs to. Only ever logged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub display_name: Option<String>,
    pub id: String,
}

/// Bearer credential obtained once per run.
///
/// `Debug` is redacted so the token never lands in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

// ------------------------------------------------------------
// Rotation plan
// ------------------------------------------------------------
//
// Built once per run from fresh snapshots and handed to the
// mutator. Nothing here survives the run.
//

/// Random selection taken from one configured source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledSegment {
    /// Human readable source label from configuration
    pub name: String,

    pub source: CollectionId,

    /// Count requested in configuration
    pub requested: usize,

    /// Selected items, at most `requested` and never more than
    /// the source snapshot held
    pub items: Vec<ItemId>,

    /// True when the source could not be read and an empty
    /// snapshot was substituted
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPlan {
    pub strategy: RotationStrategy,

    /// Clear the destination before anything is appended
    pub reset: bool,

    /// Deterministic segment appended first (full reset only)
    pub carry_over: Vec<ItemId>,

    /// Destination entries to strip (differential only)
    pub removals: Vec<ItemId>,

    /// Sampled segments in append priority order
    pub segments: Vec<SampledSegment>,

    /// Non-sampled collections (carry-over, destination) whose read
    /// failed and were replaced by an empty snapshot
    pub unreadable: Vec<String>,
}

impl RotationPlan {
    /// Every sampled item, concatenated in priority order.
    pub fn sampled_items(&self) -> Vec<ItemId> {
        self.segments
            .iter()
            .flat_map(|s| s.items.iter().cloned())
            .collect()
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    pub carried_over: usize,
    pub removed: usize,
    pub added: usize,

    /// Labels of collections that were unreadable and contributed
    /// nothing: "carry-over" / "destination" first, then source names
    pub degraded_sources: Vec<String>,
}
