//! Reconciliation counters

use serde::{Deserialize, Serialize};

/// Rows inserted during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCounts {
    pub rtos: usize,
    pub qualifications: usize,
    pub units: usize,
    pub offers: usize,
    pub streams: usize,
    pub unit_links: usize,
    pub stream_links: usize,
}

/// Existing rows rewritten during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedCounts {
    pub qualifications: usize,
    pub units: usize,
    pub unit_links: usize,
    pub stream_links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedCounts {
    pub unit_links: usize,
    pub stream_links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCounts {
    /// Records whose owner or unit could not be resolved
    pub unresolved_records: usize,
    /// Stream targets with no matching stream
    pub unresolved_stream_targets: usize,
}

/// Outcome of one reconcile run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub records: usize,
    pub created: CreatedCounts,
    pub updated: UpdatedCounts,
    pub removed: RemovedCounts,
    pub skipped: SkippedCounts,
}

impl ReconcileSummary {
    pub fn new(records: usize) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// New catalog rows (RTOs, qualifications, units, offers, streams)
    pub fn entities_created(&self) -> usize {
        let c = &self.created;
        c.rtos + c.qualifications + c.units + c.offers + c.streams
    }

    /// Whether the run inserted or removed anything
    pub fn changed_structure(&self) -> bool {
        self.entities_created() > 0
            || self.created.unit_links > 0
            || self.created.stream_links > 0
            || self.removed.unit_links > 0
            || self.removed.stream_links > 0
    }
}
