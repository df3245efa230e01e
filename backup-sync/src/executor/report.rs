//! Per-item outcomes and the run summary.

use crate::sync::fingerprint::Fingerprint;
use serde::Serialize;

/// What happened to a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Remote marker matched; nothing written
    Unchanged,
    /// Archive and marker written
    Uploaded { archive_bytes: u64 },
    /// Only the marker was written
    MarkerUpdated,
    /// Changed, but the run is a dry run
    WouldUpload,
    /// Processing stopped; remote state for this item is unchanged or
    /// still describes the previous upload
    Failed { error: String },
}

impl ItemOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Unchanged => "unchanged",
            ItemOutcome::Uploaded { .. } => "uploaded",
            ItemOutcome::MarkerUpdated => "marker updated",
            ItemOutcome::WouldUpload => "would upload",
            ItemOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }
}

/// Report for one item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub name: String,
    /// Local fingerprint, when it could be computed
    pub fingerprint: Option<Fingerprint>,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn failed(
        name: impl Into<String>,
        fingerprint: Option<Fingerprint>,
        error: impl ToString,
    ) -> Self {
        Self {
            name: name.into(),
            fingerprint,
            outcome: ItemOutcome::Failed {
                error: error.to_string(),
            },
        }
    }
}

/// Result of a whole run, items in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub items: Vec<ItemReport>,
    pub unchanged: usize,
    pub uploaded: usize,
    pub marker_updated: usize,
    pub would_upload: usize,
    pub failed: usize,
    pub uploaded_bytes: u64,
    pub duration_secs: f64,
}

impl RunSummary {
    pub fn from_reports(items: Vec<ItemReport>, duration_secs: f64) -> Self {
        let mut summary = RunSummary {
            duration_secs,
            ..RunSummary::default()
        };

        for report in &items {
            match &report.outcome {
                ItemOutcome::Unchanged => summary.unchanged += 1,
                ItemOutcome::Uploaded { archive_bytes } => {
                    summary.uploaded += 1;
                    summary.uploaded_bytes += archive_bytes;
                }
                ItemOutcome::MarkerUpdated => summary.marker_updated += 1,
                ItemOutcome::WouldUpload => summary.would_upload += 1,
                ItemOutcome::Failed { .. } => summary.failed += 1,
            }
        }

        summary.items = items;
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn item(&self, name: &str) -> Option<&ItemReport> {
        self.items.iter().find(|report| report.name == name)
    }
}
