//! Per-file outcomes and the end-of-job summary.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::style::{Color, Stylize};

use crate::storage::{Occupancy, StorageUnit};

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Succeeded,
    /// The copy did not complete; the original is untouched.
    CopyFailed(String),
    /// Copied to the device, but the desktop original could not be removed.
    SourceDeleteFailed(String),
    /// Pulled (or meant to be removed), but the device copy is still there.
    RemoteDeleteFailed(String),
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Succeeded)
    }

    fn describe(&self) -> Option<String> {
        match self {
            TransferOutcome::Succeeded => None,
            TransferOutcome::CopyFailed(r) => Some(format!("copy failed: {r}")),
            TransferOutcome::SourceDeleteFailed(r) => {
                Some(format!("copied, but local delete failed: {r}"))
            }
            TransferOutcome::RemoteDeleteFailed(r) => {
                Some(format!("device delete failed: {r}"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub name: String,
    pub outcome: TransferOutcome,
}

/// Occupancy at job end against the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageSummary {
    pub occupancy: Occupancy,
    pub ceiling: f64,
    pub unit: StorageUnit,
}

impl StorageSummary {
    /// Share of the ceiling above which the operator is nudged to free space.
    pub const WARN_RATIO: f64 = 0.8;

    pub fn near_full(&self) -> bool {
        self.occupancy
            .at_or_above(self.ceiling * Self::WARN_RATIO, self.unit)
    }
}

/// Aggregate result of one engine run.
#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    /// Files selected for processing.
    pub planned: usize,
    /// Outcomes in processing order.
    pub results: Vec<FileResult>,
    /// Delete-on-sight files removed before transfer.
    pub cleaned: usize,
    /// Delete-on-sight files that could not be removed (name, reason).
    pub clean_failures: Vec<(String, String)>,
    pub ignored: usize,
    pub batches: usize,
    /// Backoff sleeps taken at the storage gate.
    pub storage_waits: usize,
    pub storage: Option<StorageSummary>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl TransferReport {
    pub fn record(&mut self, name: impl Into<String>, outcome: TransferOutcome) {
        self.results.push(FileResult {
            name: name.into(),
            outcome,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> Vec<&FileResult> {
        self.results
            .iter()
            .filter(|r| !r.outcome.is_success())
            .collect()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed().into_iter().map(|r| r.name.as_str()).collect()
    }

    /// No per-file failures. Cancellation is reported separately.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_success())
    }

    pub fn not_processed(&self) -> usize {
        self.planned.saturating_sub(self.results.len())
    }

    /// Human summary. `verb` is e.g. "transferred" or "deleted".
    pub fn write_summary<W: Write>(&self, out: &mut W, verb: &str) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", "=".repeat(60))?;
        if self.cleaned > 0 || !self.clean_failures.is_empty() {
            writeln!(out, "Removed {} unwanted file(s) before transfer", self.cleaned)?;
            for (name, reason) in &self.clean_failures {
                writeln!(out, "  - could not remove {name}: {reason}")?;
            }
        }
        writeln!(
            out,
            "{} {}/{} files in {:.1}s",
            format!("Successfully {verb}:").with(Color::Green).bold(),
            self.succeeded(),
            self.planned,
            self.elapsed.as_secs_f64()
        )?;

        let failed = self.failed();
        if !failed.is_empty() {
            writeln!(
                out,
                "{} {} file(s):",
                "Failed".with(Color::Red).bold(),
                failed.len()
            )?;
            for r in failed {
                let why = r.outcome.describe().unwrap_or_default();
                writeln!(out, "  - {} ({why})", r.name)?;
            }
        }

        if self.cancelled {
            writeln!(
                out,
                "{} {} file(s) left untouched",
                "Cancelled.".with(Color::Yellow).bold(),
                self.not_processed()
            )?;
        }

        if let Some(storage) = &self.storage {
            match storage.occupancy.in_unit(storage.unit) {
                Some(v) => writeln!(
                    out,
                    "Device storage: {v:.2} {} / {} {}",
                    storage.unit, storage.ceiling, storage.unit
                )?,
                None => writeln!(out, "Device storage: unknown (query failed)")?,
            }
            if storage.near_full() {
                writeln!(
                    out,
                    "{} device folder is at {:.0}% of the ceiling; free up space in the backup app",
                    "Warning:".with(Color::Yellow).bold(),
                    storage
                        .occupancy
                        .in_unit(storage.unit)
                        .map(|v| v / storage.ceiling * 100.0)
                        .unwrap_or_default()
                )?;
            }
        }
        writeln!(out, "{}", "=".repeat(60))?;
        Ok(())
    }
}
