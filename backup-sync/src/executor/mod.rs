//! Backup run executor - drives every item through the sync pipeline.
//!
//! For each top-level item under the backup root, in name order:
//! - walk the item and compute its fingerprint
//! - fetch the remote marker
//! - decide whether the item changed
//! - build the archive and upload archive and marker as the run mode allows
//!
//! A failing item is reported and the run moves on; remote state of other
//! items is never touched by that failure.

pub mod report;

use crate::config::RunOptions;
use crate::fs::walker::{list_items, walk_directory, FileInfo, Item, RejectedEntry};
use crate::store::ObjectStore;
use crate::sync::fingerprint::{fingerprint_files, Fingerprint};
use crate::sync::marker::{lookup_marker, marker_key, MarkerLookup};
use crate::sync::policy::{decide, plan, Step};
use crate::transfer::archive::build_archive;
use crate::transfer::upload::upload;
use crate::utils::errors::{BackupError, Result};
use futures_util::stream::{self, StreamExt};
use report::{ItemOutcome, ItemReport, RunSummary};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Receives progress notifications during a run.
pub trait RunObserver: Send + Sync {
    fn run_started(&self, _total_items: usize) {}
    fn item_started(&self, _name: &str) {}
    fn item_finished(&self, _report: &ItemReport) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// An entry of the root listing waiting to be processed.
enum Queued {
    Item(Item),
    Rejected(RejectedEntry),
}

impl Queued {
    fn name(&self) -> &str {
        match self {
            Queued::Item(item) => &item.name,
            Queued::Rejected(rejected) => &rejected.display_name,
        }
    }
}

/// Main backup executor
pub struct BackupExecutor {
    store: Arc<dyn ObjectStore>,
    options: RunOptions,
    observer: Arc<dyn RunObserver>,
}

impl BackupExecutor {
    /// Create an executor without progress reporting
    pub fn new(store: Arc<dyn ObjectStore>, options: RunOptions) -> Self {
        Self::with_observer(store, options, Arc::new(NoopObserver))
    }

    /// Create an executor that reports progress to `observer`
    pub fn with_observer(
        store: Arc<dyn ObjectStore>,
        options: RunOptions,
        observer: Arc<dyn RunObserver>,
    ) -> Self {
        Self {
            store,
            options,
            observer,
        }
    }

    /// Back up every item under `root`.
    ///
    /// Returns `Err` only when the run cannot start (the root is missing or
    /// unreadable). Per-item failures are part of the summary.
    pub async fn execute(&self, root: &Path) -> Result<RunSummary> {
        let start_time = std::time::Instant::now();

        if !root.is_dir() {
            return Err(BackupError::Config(format!(
                "backup root {} is not a directory",
                root.display()
            )));
        }

        info!(
            "Starting backup of {} to {} (content checksums: {}, dry run: {}, marker only: {})",
            root.display(),
            self.store.location(),
            self.options.include_content,
            self.options.mode.dry_run,
            self.options.mode.marker_only,
        );

        if self.options.mode.marker_only && !self.options.mode.dry_run {
            warn!(
                "Marker-only mode: changed items get a new marker but no archive; \
                 remote archives may be stale"
            );
        }

        let root_owned = root.to_path_buf();
        let walk_options = self.options.walk.clone();
        let listing =
            tokio::task::spawn_blocking(move || list_items(&root_owned, &walk_options)).await??;

        // Rejected entries are reported in the same name order as items
        let mut queue: Vec<Queued> = listing
            .items
            .into_iter()
            .map(Queued::Item)
            .chain(listing.rejected.into_iter().map(Queued::Rejected))
            .collect();
        queue.sort_by(|a, b| a.name().cmp(b.name()));

        self.observer.run_started(queue.len());

        let reports: Vec<ItemReport> = stream::iter(queue)
            .map(|entry| self.process_entry(entry))
            .buffered(self.options.max_concurrent_items)
            .collect()
            .await;

        let summary = RunSummary::from_reports(reports, start_time.elapsed().as_secs_f64());

        info!(
            "Backup finished: {} uploaded, {} unchanged, {} marker-only, {} would upload, \
             {} failed in {:.1}s",
            summary.uploaded,
            summary.unchanged,
            summary.marker_updated,
            summary.would_upload,
            summary.failed,
            summary.duration_secs
        );

        Ok(summary)
    }

    async fn process_entry(&self, entry: Queued) -> ItemReport {
        match entry {
            Queued::Item(item) => self.process_item(item).await,
            Queued::Rejected(rejected) => {
                self.observer.item_started(&rejected.display_name);
                let report = ItemReport::failed(
                    rejected.display_name,
                    None,
                    BackupError::InvalidItemName(rejected.path),
                );
                error!("{}: {}", report.name, report.outcome.label());
                self.observer.item_finished(&report);
                report
            }
        }
    }

    async fn process_item(&self, item: Item) -> ItemReport {
        self.observer.item_started(&item.name);
        let report = self.sync_item(item).await;
        self.observer.item_finished(&report);
        report
    }

    async fn sync_item(&self, item: Item) -> ItemReport {
        let name = item.name.clone();

        let (files, fingerprint) = match self.scan_item(item).await {
            Ok(scanned) => scanned,
            Err(e) => {
                error!("Failed to scan {}: {}", name, e);
                return ItemReport::failed(name, None, e);
            }
        };
        debug!("{} - {}", name, fingerprint);

        let remote = match lookup_marker(self.store.as_ref(), &name).await {
            MarkerLookup::Found(text) => Some(text),
            MarkerLookup::NotFound => None,
            MarkerLookup::Unavailable(reason) if self.options.strict_remote_reads => {
                let err = BackupError::MarkerUnavailable {
                    key: marker_key(&name),
                    reason,
                };
                error!("{}", err);
                return ItemReport::failed(name, Some(fingerprint), err);
            }
            MarkerLookup::Unavailable(reason) => {
                warn!("Marker for {} unavailable, treating as missing: {}", name, reason);
                None
            }
        };

        let step = plan(decide(&fingerprint, remote.as_deref()), self.options.mode);

        let outcome = match step {
            Step::Skip => {
                debug!("{} unchanged, skipping", name);
                Ok(ItemOutcome::Unchanged)
            }
            Step::Report => {
                info!("{} changed, would upload", name);
                Ok(ItemOutcome::WouldUpload)
            }
            Step::UploadMarker => {
                info!("{} changed, updating marker only", name);
                upload(
                    self.store.as_ref(),
                    &name,
                    None,
                    &fingerprint,
                    self.options.storage_class,
                )
                .await
                .map(|_| ItemOutcome::MarkerUpdated)
            }
            Step::UploadArchiveAndMarker => {
                info!("{} changed, uploading", name);
                self.upload_item(&name, files, &fingerprint).await
            }
        };

        match outcome {
            Ok(outcome) => ItemReport {
                name,
                fingerprint: Some(fingerprint),
                outcome,
            },
            Err(e) => {
                error!("Failed to back up {}: {}", name, e);
                ItemReport::failed(name, Some(fingerprint), e)
            }
        }
    }

    /// Walk the item and fingerprint it on the blocking pool.
    async fn scan_item(&self, item: Item) -> Result<(Vec<FileInfo>, Fingerprint)> {
        let walk_options = self.options.walk.clone();
        let include_content = self.options.include_content;

        tokio::task::spawn_blocking(move || -> Result<(Vec<FileInfo>, Fingerprint)> {
            let files = walk_directory(&item.root, &walk_options)?;
            let fingerprint = fingerprint_files(&item.name, &files, include_content)?;
            Ok((files, fingerprint))
        })
        .await?
    }

    async fn upload_item(
        &self,
        name: &str,
        files: Vec<FileInfo>,
        fingerprint: &Fingerprint,
    ) -> Result<ItemOutcome> {
        let item_name = name.to_string();
        let level = self.options.compression_level;
        let blob =
            tokio::task::spawn_blocking(move || build_archive(&item_name, &files, level)).await??;

        debug!(
            "Built archive for {}: {} files, {} bytes from {} bytes",
            name,
            blob.entries(),
            blob.len(),
            blob.input_bytes()
        );

        let receipt = upload(
            self.store.as_ref(),
            name,
            Some(&blob),
            fingerprint,
            self.options.storage_class,
        )
        .await?;

        Ok(ItemOutcome::Uploaded {
            archive_bytes: receipt.archive_bytes.unwrap_or_default(),
        })
    }
}
