//! backup-sync - Main entry point
//!
//! Backs up each top-level directory under PATH to a bucket, skipping
//! directories whose fingerprint matches the marker stored last time.

use anyhow::Result;
use backup_sync::transfer::progress::{summary_line, RunProgress};
use backup_sync::config::{Config, StoreKind};
use backup_sync::{open_store, utils, BackupExecutor};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to back up; each directory directly under it is one item
    path: PathBuf,

    /// Bucket name, or file:///path to use a local directory
    #[arg(long)]
    bucket: Option<String>,

    /// Custom S3 endpoint URL, or the gateway URL with --store-kind http
    #[arg(long)]
    endpoint: Option<String>,

    /// AWS profile to take credentials and region from
    #[arg(long)]
    profile: Option<String>,

    /// AWS region
    #[arg(long)]
    region: Option<String>,

    /// Remote backend: s3 or http
    #[arg(long, value_enum)]
    store_kind: Option<StoreKind>,

    /// Report what would be uploaded without writing anything
    #[arg(long)]
    dryrun: bool,

    /// Include file contents in the checksum, not just paths
    #[arg(long)]
    checksum_content: bool,

    /// Upload the checksum marker only (WARNING: leaves archives stale)
    #[arg(long)]
    upload_checksum_only: bool,

    /// Storage class for uploaded archives
    #[arg(long)]
    storage_class: Option<String>,

    /// Fail an item when its remote checksum cannot be read
    #[arg(long)]
    strict_remote: bool,

    /// Number of items to process at the same time
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Print per-item checksums and decisions
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command-line flags override file and environment settings.
    fn apply(&self, config: &mut Config) {
        if let Some(bucket) = &self.bucket {
            config.store.bucket = bucket.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.store.endpoint = Some(endpoint.clone());
        }
        if let Some(profile) = &self.profile {
            config.store.profile = Some(profile.clone());
        }
        if let Some(region) = &self.region {
            config.store.region = Some(region.clone());
        }
        if let Some(kind) = self.store_kind {
            config.store.kind = kind;
        }
        if let Some(storage_class) = &self.storage_class {
            config.sync.storage_class = storage_class.clone();
        }
        if let Some(jobs) = self.jobs {
            config.performance.max_concurrent_items = jobs;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        config.sync.dry_run |= self.dryrun;
        config.sync.checksum_content |= self.checksum_content;
        config.sync.marker_only |= self.upload_checksum_only;
        config.sync.strict_remote_reads |= self.strict_remote;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    let progress = Arc::new(if args.json {
        RunProgress::hidden(false)
    } else {
        RunProgress::new(args.verbose)
    });

    // Initialize logging; lines are printed around the progress bar
    let log_level = if args.verbose && args.log_level.is_none() {
        "debug"
    } else {
        config.log.level.as_str()
    };
    utils::logger::init(log_level, progress.log_writer())?;

    tracing::info!("Starting backup-sync v{}", env!("CARGO_PKG_VERSION"));

    // Everything below can fail on bad settings; nothing has been read or
    // written yet
    let options = config.run_options()?;
    let store = open_store(&config.store).await?;

    let executor = BackupExecutor::with_observer(store, options, progress.clone());
    let summary = executor.execute(&args.path).await?;
    progress.finish();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        eprintln!("{}", summary_line(&summary));
    }

    if summary.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
