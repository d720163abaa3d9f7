//! Device → desktop move.
//!
//! Every file below the device directory lands flat in the local
//! directory under its basename. A device copy is removed only after its
//! pull reported success, and only when the job asks for it.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::adb::{ensure_device, remote_basename};
use crate::error::{SyncError, SyncResult};
use crate::job::PullJob;
use crate::progress::FileAction;
use crate::report::{TransferOutcome, TransferReport};
use crate::session::Session;

pub(crate) fn run(session: &Session<'_>, job: &PullJob) -> SyncResult<TransferReport> {
    job.validate()?;
    let span = tracing::info_span!("pull", source = %job.device_dir, dest = %job.local_dir.display());
    let _enter = span.enter();

    let started = Instant::now();
    ensure_device(session.device)?;

    fs::create_dir_all(&job.local_dir).map_err(|source| SyncError::DestinationUnavailable {
        path: job.local_dir.clone(),
        source,
    })?;
    let files = session
        .device
        .list_files(&job.device_dir)
        .map_err(|source| SyncError::RemoteUnreadable {
            dir: job.device_dir.clone(),
            source,
        })?;

    let mut report = TransferReport {
        planned: files.len(),
        ..Default::default()
    };
    let dest = job.local_dir.display().to_string();
    session.logger.start("pull", &job.device_dir, &dest);

    if files.is_empty() {
        session.progress.note("No files to transfer");
    } else {
        download_all(session, job, &files, &mut report);
    }

    if job.delete_remote && !report.cancelled && report.succeeded() > 0 {
        if let Err(e) = session.device.remove_empty_dirs(&job.device_dir) {
            tracing::warn!(dir = %job.device_dir, error = %e, "could not prune empty device folders");
        }
    }

    report.elapsed = started.elapsed();
    session.logger.done(
        report.succeeded(),
        report.failed().len(),
        report.elapsed.as_secs_f64(),
    );
    Ok(report)
}

fn download_all(
    session: &Session<'_>,
    job: &PullJob,
    files: &[String],
    report: &mut TransferReport,
) {
    let total = files.len();
    let mut seen = HashSet::new();

    session.progress.begin(total);
    for (index, remote) in files.iter().enumerate() {
        if session.cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let name = remote_basename(remote);
        if !seen.insert(name) {
            tracing::warn!(file = %remote, "another device file with this name was already pulled; it will be overwritten");
        }
        session
            .progress
            .file(index + 1, total, FileAction::Downloading, name);
        let outcome = download(session, job, remote, &job.local_dir.join(name));
        report.record(remote.clone(), outcome);
    }
    session.progress.finish();
}

fn download(session: &Session<'_>, job: &PullJob, remote: &str, local: &Path) -> TransferOutcome {
    let local_display = local.display().to_string();
    if let Err(e) = session.device.pull(remote, local) {
        tracing::warn!(file = %remote, error = %e, "download failed");
        session.logger.error("pull", remote, &e.to_string());
        return TransferOutcome::CopyFailed(e.to_string());
    }
    session.logger.copy_done(remote, &local_display);

    if !job.delete_remote {
        return TransferOutcome::Succeeded;
    }
    match session.device.remove_file(remote) {
        Ok(()) => {
            session.logger.delete(remote);
            TransferOutcome::Succeeded
        }
        Err(e) => {
            tracing::warn!(file = %remote, error = %e, "downloaded but could not delete device copy");
            session.logger.error("delete", remote, &e.to_string());
            TransferOutcome::RemoteDeleteFailed(e.to_string())
        }
    }
}
