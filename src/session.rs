//! Per-invocation execution context shared by the engines.
//!
//! A session owns no global state: it borrows one device handle and its
//! observers, so several sessions against different devices can run side by
//! side.

use crate::adb::RemoteDevice;
use crate::cancel::CancellationToken;
use crate::error::SyncResult;
use crate::job::{PullJob, PurgeJob, TransferJob};
use crate::logger::{Logger, NoopLogger};
use crate::progress::{NoProgress, TransferProgress};
use crate::report::TransferReport;
use crate::{pull, purge, push};

pub struct Session<'a> {
    pub(crate) device: &'a dyn RemoteDevice,
    pub(crate) progress: &'a dyn TransferProgress,
    pub(crate) logger: &'a dyn Logger,
    pub(crate) cancel: CancellationToken,
}

impl<'a> Session<'a> {
    pub fn new(device: &'a dyn RemoteDevice, cancel: CancellationToken) -> Self {
        Self {
            device,
            progress: &NoProgress,
            logger: &NoopLogger,
            cancel,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn TransferProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_logger(mut self, logger: &'a dyn Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Desktop → device batched move.
    pub fn push(&self, job: &TransferJob) -> SyncResult<TransferReport> {
        push::run(self, job)
    }

    /// Device → desktop move (or copy with `delete_remote = false`).
    pub fn pull(&self, job: &PullJob) -> SyncResult<TransferReport> {
        pull::run(self, job)
    }

    /// Remove every file under a device directory.
    pub fn purge(&self, job: &PurgeJob) -> SyncResult<TransferReport> {
        purge::run(self, job)
    }
}
