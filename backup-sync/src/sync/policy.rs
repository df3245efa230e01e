//! Sync decision for a single item.
//!
//! [`decide`] is the whole comparison: an item is skipped only when the
//! remote marker holds exactly the local fingerprint. [`plan`] then applies
//! the run modifiers to turn the decision into the work to perform.

use super::fingerprint::Fingerprint;
use serde::Serialize;

/// Result of comparing local and remote fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Skip,
    Upload,
}

/// Run-wide modifiers applied to an `Upload` decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMode {
    /// Report uploads without building or writing anything
    pub dry_run: bool,
    /// Write only the marker, leaving the archive as it is
    pub marker_only: bool,
}

/// Work to perform for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Remote is up to date
    Skip,
    /// Would upload, but this is a dry run
    Report,
    /// Write the marker without an archive
    UploadMarker,
    /// Build and write the archive, then the marker
    UploadArchiveAndMarker,
}

/// Compare the local fingerprint with the remote marker text.
///
/// The comparison is exact string equality; a marker with extra whitespace
/// counts as different.
pub fn decide(local: &Fingerprint, remote: Option<&str>) -> Action {
    match remote {
        Some(remote) if remote == local.as_str() => Action::Skip,
        _ => Action::Upload,
    }
}

/// Map a decision onto the work for this run. Dry-run takes precedence
/// over marker-only.
pub fn plan(action: Action, mode: RunMode) -> Step {
    match action {
        Action::Skip => Step::Skip,
        Action::Upload if mode.dry_run => Step::Report,
        Action::Upload if mode.marker_only => Step::UploadMarker,
        Action::Upload => Step::UploadArchiveAndMarker,
    }
}
