//! Removal of every file below a device directory.

use std::time::Instant;

use crate::adb::{ensure_device, remote_basename};
use crate::error::{SyncError, SyncResult};
use crate::job::PurgeJob;
use crate::progress::FileAction;
use crate::report::{TransferOutcome, TransferReport};
use crate::session::Session;

pub(crate) fn run(session: &Session<'_>, job: &PurgeJob) -> SyncResult<TransferReport> {
    job.validate()?;
    let span = tracing::info_span!("purge", dir = %job.device_dir);
    let _enter = span.enter();

    let started = Instant::now();
    ensure_device(session.device)?;

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
    session.logger.start("purge", &job.device_dir, "-");

    let total = files.len();
    if total == 0 {
        session.progress.note("No files to delete");
    }
    session.progress.begin(total);
    for (index, remote) in files.iter().enumerate() {
        if session.cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        session
            .progress
            .file(index + 1, total, FileAction::Deleting, remote_basename(remote));
        let outcome = match session.device.remove_file(remote) {
            Ok(()) => {
                session.logger.delete(remote);
                TransferOutcome::Succeeded
            }
            Err(e) => {
                tracing::warn!(file = %remote, error = %e, "could not delete device file");
                session.logger.error("delete", remote, &e.to_string());
                TransferOutcome::RemoteDeleteFailed(e.to_string())
            }
        };
        report.record(remote.clone(), outcome);
    }
    session.progress.finish();

    if !report.cancelled {
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
