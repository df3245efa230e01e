//! Run progress reporting.
//!
//! Shows a progress bar over items while a run is in flight. Verbose
//! per-item lines are printed through the bar so they never tear it.

use crate::executor::report::{ItemOutcome, ItemReport, RunSummary};
use crate::executor::RunObserver;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// Progress bar over the items of a run.
pub struct RunProgress {
    bar: ProgressBar,
    verbose: bool,
}

impl RunProgress {
    /// Create a progress reporter drawing to stderr.
    pub fn new(verbose: bool) -> Self {
        Self::with_target(ProgressDrawTarget::stderr(), verbose)
    }

    /// Create a progress reporter that draws nothing (JSON output, tests).
    pub fn hidden(verbose: bool) -> Self {
        Self::with_target(ProgressDrawTarget::hidden(), verbose)
    }

    fn with_target(target: ProgressDrawTarget, verbose: bool) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} {msg:>12} [{bar:25.cyan/dim}] {pos}/{len} {prefix:.dim}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message("Uploading");
        Self { bar, verbose }
    }

    /// Number of items finished so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Clear the bar once the run is over.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Writer for log output that hides the bar while a line is printed.
    pub fn log_writer(&self) -> LogWriter {
        LogWriter {
            bar: self.bar.clone(),
        }
    }
}

/// [`MakeWriter`] sending log lines to stderr around the progress bar.
#[derive(Clone)]
pub struct LogWriter {
    bar: ProgressBar,
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogLine;

    fn make_writer(&'a self) -> Self::Writer {
        LogLine {
            bar: self.bar.clone(),
            buf: Vec::new(),
        }
    }
}

/// One formatted log event, written out on flush or drop.
pub struct LogLine {
    bar: ProgressBar,
    buf: Vec<u8>,
}

impl Write for LogLine {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let line = std::mem::take(&mut self.buf);
        self.bar.suspend(|| {
            let mut stderr = io::stderr().lock();
            stderr.write_all(&line)?;
            stderr.flush()
        })
    }
}

impl Drop for LogLine {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl RunObserver for RunProgress {
    fn run_started(&self, total_items: usize) {
        self.bar.set_length(total_items as u64);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn item_started(&self, name: &str) {
        self.bar.set_prefix(name.to_string());
    }

    fn item_finished(&self, report: &ItemReport) {
        if self.verbose {
            if let Some(fingerprint) = &report.fingerprint {
                self.bar.println(format!("{} - {}", report.name, fingerprint));
            }
            self.bar.println(describe(report));
        }
        self.bar.inc(1);
    }
}

/// One-line, human-readable description of an item report.
pub fn describe(report: &ItemReport) -> String {
    match &report.outcome {
        ItemOutcome::Unchanged => format!("{} unchanged, skipping", report.name),
        ItemOutcome::Uploaded { archive_bytes } => {
            format!("{} changed, uploaded {}", report.name, format_bytes(*archive_bytes))
        }
        ItemOutcome::MarkerUpdated => {
            format!("{} changed, marker updated (archive not uploaded)", report.name)
        }
        ItemOutcome::WouldUpload => format!("{} changed, would upload", report.name),
        ItemOutcome::Failed { error } => format!("{} failed: {}", report.name, error),
    }
}

/// Final summary line for a run.
pub fn summary_line(summary: &RunSummary) -> String {
    let mut parts = vec![
        format!("{} uploaded ({})", summary.uploaded, format_bytes(summary.uploaded_bytes)),
        format!("{} unchanged", summary.unchanged),
    ];
    if summary.marker_updated > 0 {
        parts.push(format!("{} marker-only", summary.marker_updated));
    }
    if summary.would_upload > 0 {
        parts.push(format!("{} would upload", summary.would_upload));
    }
    if summary.failed > 0 {
        parts.push(format!("{} failed", summary.failed));
    }
    format!(
        "{} in {}",
        parts.join(", "),
        format_duration(summary.duration_secs as u64)
    )
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: ItemOutcome) -> ItemReport {
        ItemReport {
            name: "photos".to_string(),
            fingerprint: None,
            outcome,
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3665), "1h 1m");
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&report(ItemOutcome::Unchanged)), "photos unchanged, skipping");
        assert_eq!(
            describe(&report(ItemOutcome::Uploaded { archive_bytes: 2048 })),
            "photos changed, uploaded 2.00 KB"
        );
        assert_eq!(describe(&report(ItemOutcome::WouldUpload)), "photos changed, would upload");
        assert_eq!(
            describe(&ItemReport::failed("photos", None, "boom")),
            "photos failed: boom"
        );
    }

    #[test]
    fn test_summary_line() {
        let summary = RunSummary::from_reports(
            vec![
                report(ItemOutcome::Uploaded { archive_bytes: 1024 }),
                report(ItemOutcome::Unchanged),
                ItemReport::failed("videos", None, "boom"),
            ],
            2.0,
        );
        assert_eq!(summary_line(&summary), "1 uploaded (1.00 KB), 1 unchanged, 1 failed in 2s");
    }

    #[test]
    fn test_log_line_buffers_until_flush() -> io::Result<()> {
        let progress = RunProgress::hidden(false);
        let writer = progress.log_writer();

        let mut line = writer.make_writer();
        line.write_all(b"INFO photos changed\n")?;
        assert_eq!(line.buf, b"INFO photos changed\n");

        line.flush()?;
        assert!(line.buf.is_empty());
        Ok(())
    }

    #[test]
    fn test_progress_counts_items() {
        let progress = RunProgress::hidden(false);
        progress.run_started(2);
        progress.item_started("photos");
        progress.item_finished(&report(ItemOutcome::Unchanged));
        assert_eq!(progress.position(), 1);
        progress.finish();
    }
}
