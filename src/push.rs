//! Batched desktop → device move with storage backpressure.
//!
//! One run walks a fixed sequence of phases:
//!
//! 1. classify a single snapshot of the source directory
//! 2. delete the delete-on-sight files
//! 3. for each batch: wait at the storage gate, upload, request a rescan
//! 4. request a final rescan and measure occupancy for the report
//!
//! A source file is removed only after its upload reported success. Per-file
//! problems are recorded in the [`TransferReport`]; nothing is retried within
//! a run.

use std::fs;
use std::time::{Duration, Instant};

use crate::adb::{ensure_device, remote_join, ReindexRequest};
use crate::cancel::WaitOutcome;
use crate::classify::{classify, list_regular_files, Classification, FileEntry};
use crate::error::SyncResult;
use crate::job::TransferJob;
use crate::progress::FileAction;
use crate::report::{StorageSummary, TransferOutcome, TransferReport};
use crate::session::Session;
use crate::storage::StorageMonitor;

/// What a run would do, computed without touching any file.
#[derive(Debug, Clone)]
pub struct PushPlan {
    pub classification: Classification,
    pub batch_size: usize,
}

impl PushPlan {
    pub fn batches(&self) -> std::slice::Chunks<'_, FileEntry> {
        self.classification.transfer.chunks(self.batch_size)
    }
}

/// Classify the source directory for a dry run. Needs no device.
pub fn plan(job: &TransferJob) -> SyncResult<PushPlan> {
    job.validate()?;
    let listing = list_regular_files(&job.source_dir)?;
    Ok(PushPlan {
        classification: classify(listing, &job.keep, &job.delete),
        batch_size: job.batch_size,
    })
}

/// Shortest sleep between occupancy checks while the device is full.
pub const MIN_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Open,
    Cancelled,
}

pub(crate) fn run(session: &Session<'_>, job: &TransferJob) -> SyncResult<TransferReport> {
    job.validate()?;
    let span = tracing::info_span!("push", source = %job.source_dir.display(), dest = %job.device_dir);
    let _enter = span.enter();

    let started = Instant::now();
    ensure_device(session.device)?;

    let PushPlan { classification, .. } = plan(job)?;
    let Classification {
        transfer,
        delete,
        ignored,
    } = classification;

    let mut report = TransferReport {
        planned: transfer.len(),
        ignored: ignored.len(),
        ..Default::default()
    };
    let source = job.source_dir.display().to_string();
    session.logger.start("push", &source, &job.device_dir);
    tracing::info!(
        transfer = transfer.len(),
        delete = delete.len(),
        ignored = ignored.len(),
        "classified source"
    );

    clean(session, &delete, &mut report);

    if transfer.is_empty() {
        session.progress.note("No files to transfer");
    } else if !report.cancelled {
        upload_batches(session, job, &transfer, &mut report);
        if report.batches > 0 {
            reindex(session, job, true);
        }
    }

    let occupancy = StorageMonitor::new(session.device).occupancy(&job.device_dir);
    report.storage = Some(StorageSummary {
        occupancy,
        ceiling: job.max_storage,
        unit: job.storage_unit,
    });
    report.elapsed = started.elapsed();
    session.logger.done(
        report.succeeded(),
        report.failed().len(),
        report.elapsed.as_secs_f64(),
    );
    Ok(report)
}

/// Remove delete-on-sight files. Failures stay on disk for the next run.
fn clean(session: &Session<'_>, files: &[FileEntry], report: &mut TransferReport) {
    if files.is_empty() {
        return;
    }
    session
        .progress
        .note(&format!("Deleting {} unwanted file(s)", files.len()));
    for entry in files {
        if session.cancel.is_cancelled() {
            report.cancelled = true;
            return;
        }
        let path = entry.path.display().to_string();
        match fs::remove_file(&entry.path) {
            Ok(()) => {
                tracing::info!(file = %entry.name, "deleted unwanted file");
                session.logger.delete(&path);
                report.cleaned += 1;
            }
            Err(e) => {
                tracing::warn!(file = %entry.name, error = %e, "could not delete unwanted file");
                session.logger.error("clean", &path, &e.to_string());
                report.clean_failures.push((entry.name.clone(), e.to_string()));
            }
        }
    }
}

fn upload_batches(
    session: &Session<'_>,
    job: &TransferJob,
    files: &[FileEntry],
    report: &mut TransferReport,
) {
    let total = files.len();
    let batch_count = total.div_ceil(job.batch_size);
    let mut position = 0usize;

    session.progress.begin(total);
    for (index, batch) in files.chunks(job.batch_size).enumerate() {
        if storage_gate(session, job, report) == Gate::Cancelled {
            report.cancelled = true;
            break;
        }

        report.batches += 1;
        session.progress.note(&format!(
            "Processing batch {}/{} ({} files)",
            index + 1,
            batch_count,
            batch.len()
        ));

        for entry in batch {
            if session.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            position += 1;
            let device_name = job.device_name(&entry.name);
            session
                .progress
                .file(position, total, FileAction::Uploading, &device_name);
            let outcome = upload(session, job, entry, &device_name);
            report.record(entry.name.clone(), outcome);
        }

        reindex(session, job, false);
        if report.cancelled {
            break;
        }

        let last = index + 1 == batch_count;
        if !last && !job.batch_pause.is_zero() {
            session.progress.note(&format!(
                "Pausing {} before the next batch",
                human_duration(job.batch_pause)
            ));
            if session.cancel.wait_for(job.batch_pause) == WaitOutcome::Cancelled {
                report.cancelled = true;
                break;
            }
        }
    }
    session.progress.finish();
}

/// Block while the destination holds at least the ceiling. An unreadable
/// occupancy opens the gate.
fn storage_gate(session: &Session<'_>, job: &TransferJob, report: &mut TransferReport) -> Gate {
    let monitor = StorageMonitor::new(session.device);
    let unit = job.storage_unit;
    let backoff = job.backoff.max(MIN_BACKOFF);
    loop {
        if session.cancel.is_cancelled() {
            return Gate::Cancelled;
        }
        let occupancy = monitor.occupancy(&job.device_dir);
        let Some(current) = occupancy.in_unit(unit) else {
            session
                .progress
                .note("Device storage unknown (query failed); continuing");
            return Gate::Open;
        };
        session.progress.note(&format!(
            "Device storage: {current:.2} {unit} / {} {unit}",
            job.max_storage
        ));
        if !occupancy.at_or_above(job.max_storage, unit) {
            return Gate::Open;
        }

        report.storage_waits += 1;
        tracing::info!(current, ceiling = job.max_storage, "storage full; backing off");
        session.progress.note(&format!(
            "Storage full ({current:.2} {unit} >= {} {unit}); waiting {}. Free up space in the backup app.",
            job.max_storage,
            human_duration(backoff)
        ));
        if session.cancel.wait_for(backoff) == WaitOutcome::Cancelled {
            return Gate::Cancelled;
        }
    }
}

fn human_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else if secs >= 1 {
        format!("{secs} s")
    } else {
        format!("{} ms", d.as_millis())
    }
}

fn upload(
    session: &Session<'_>,
    job: &TransferJob,
    entry: &FileEntry,
    device_name: &str,
) -> TransferOutcome {
    let local = entry.path.display().to_string();
    let remote = remote_join(&job.device_dir, device_name);

    if let Err(e) = session.device.push(&entry.path, &remote) {
        tracing::warn!(file = %entry.name, error = %e, "upload failed");
        session.logger.error("push", &local, &e.to_string());
        return TransferOutcome::CopyFailed(e.to_string());
    }
    session.logger.copy_done(&local, &remote);

    match fs::remove_file(&entry.path) {
        Ok(()) => {
            session.logger.delete(&local);
            TransferOutcome::Succeeded
        }
        Err(e) => {
            tracing::warn!(file = %entry.name, error = %e, "uploaded but could not delete local copy");
            session.logger.error("delete", &local, &e.to_string());
            TransferOutcome::SourceDeleteFailed(e.to_string())
        }
    }
}

/// Best-effort media rescan; failures are logged, never reported.
fn reindex(session: &Session<'_>, job: &TransferJob, final_pass: bool) {
    let pattern = job.reindex_pattern();
    let scan = ReindexRequest::ScanFiles {
        dir: &job.device_dir,
        name_pattern: pattern.as_deref(),
    };
    session.progress.note("Notifying media scanner");
    if let Err(e) = session.device.reindex(&scan) {
        tracing::warn!(dir = %job.device_dir, error = %e, "media rescan request failed");
    }
    if final_pass {
        let remount = ReindexRequest::Remount {
            root: &job.media_root,
        };
        if let Err(e) = session.device.reindex(&remount) {
            tracing::warn!(root = %job.media_root, error = %e, "media remount broadcast failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::sample_job;

    #[test]
    fn plan_batches_cover_every_file_once_in_order() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        for i in 0..7 {
            std::fs::write(tmp.path().join(format!("f{i}.jpg")), b"x")?;
        }
        std::fs::write(tmp.path().join("skip.txt"), b"x")?;

        let mut job = sample_job();
        job.source_dir = tmp.path().to_path_buf();
        job.batch_size = 3;
        let plan = plan(&job)?;

        let batches: Vec<_> = plan.batches().collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), [3, 3, 1]);
        let flattened: Vec<_> = batches.iter().flat_map(|b| b.iter()).collect();
        let original: Vec<_> = plan.classification.transfer.iter().collect();
        assert_eq!(flattened, original);
        assert_eq!(plan.classification.ignored.len(), 1);
        // dry runs leave everything in place
        assert_eq!(std::fs::read_dir(tmp.path())?.count(), 8);
        Ok(())
    }

    #[test]
    fn durations_read_naturally() {
        assert_eq!(human_duration(Duration::from_secs(15 * 60)), "15 min");
        assert_eq!(human_duration(Duration::from_secs(90)), "90 s");
        assert_eq!(human_duration(Duration::from_millis(5)), "5 ms");
    }
}
