#![allow(dead_code)]

use parking_lot::Mutex;
use pixelsync::adb::{DeviceInfo, DeviceState, ReindexRequest, RemoteDevice};
use pixelsync::cancel::CancellationToken;
use pixelsync::error::TransportError;
use pixelsync::progress::{FileAction, TransferProgress};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const GB_IN_KB: u64 = 1024 * 1024;

/// Device operations in the order the engines issued them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Push { local: PathBuf, remote: String },
    Pull { remote: String, local: PathBuf },
    Remove(String),
    DiskUsage(String),
    Scan { dir: String, pattern: Option<String> },
    Remount(String),
    PruneDirs(String),
}

/// In-memory stand-in for an adb device. Device paths map onto a temp dir.
pub struct FakeDevice {
    root: TempDir,
    serial: Option<String>,
    attached: Vec<DeviceInfo>,
    devices_fail: bool,
    /// Scripted `du` answers; `None` is a failed query. Once drained,
    /// `du_default` answers.
    du: Mutex<VecDeque<Option<u64>>>,
    du_default: Mutex<Option<u64>>,
    fail_push: Mutex<HashSet<String>>,
    /// Local files that disappear while their upload succeeds.
    consume_on_push: Mutex<HashSet<String>>,
    fail_pull: Mutex<HashSet<String>>,
    fail_remove: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("tempdir"),
            serial: None,
            attached: vec![DeviceInfo {
                serial: "FAKE0001".into(),
                state: DeviceState::Device,
            }],
            devices_fail: false,
            du: Mutex::new(VecDeque::new()),
            du_default: Mutex::new(Some(0)),
            fail_push: Mutex::new(HashSet::new()),
            consume_on_push: Mutex::new(HashSet::new()),
            fail_pull: Mutex::new(HashSet::new()),
            fail_remove: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_devices(mut self, attached: Vec<DeviceInfo>) -> Self {
        self.attached = attached;
        self
    }

    pub fn with_serial(mut self, serial: &str) -> Self {
        self.serial = Some(serial.to_string());
        self
    }

    pub fn without_adb(mut self) -> Self {
        self.devices_fail = true;
        self
    }

    pub fn script_du(&self, answers: impl IntoIterator<Item = Option<u64>>) {
        self.du.lock().extend(answers);
    }

    pub fn set_du_default(&self, kb: Option<u64>) {
        *self.du_default.lock() = kb;
    }

    pub fn fail_push_of(&self, name: &str) {
        self.fail_push.lock().insert(name.to_string());
    }

    pub fn consume_source_of(&self, name: &str) {
        self.consume_on_push.lock().insert(name.to_string());
    }

    pub fn fail_pull_of(&self, name: &str) {
        self.fail_pull.lock().insert(name.to_string());
    }

    pub fn fail_remove_of(&self, name: &str) {
        self.fail_remove.lock().insert(name.to_string());
    }

    pub fn host_path(&self, remote: &str) -> PathBuf {
        self.root.path().join(remote.trim_start_matches('/'))
    }

    /// Place a file on the fake device.
    pub fn put(&self, remote: &str, contents: &[u8]) {
        let p = self.host_path(remote);
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(p, contents).expect("write");
    }

    pub fn exists(&self, remote: &str) -> bool {
        self.host_path(remote).exists()
    }

    pub fn read(&self, remote: &str) -> Vec<u8> {
        std::fs::read(self.host_path(remote)).expect("read")
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn failure(msg: &str) -> TransportError {
        TransportError::Failed {
            status: Some(1),
            stderr: msg.to_string(),
        }
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl RemoteDevice for FakeDevice {
    fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>, TransportError> {
        if self.devices_fail {
            return Err(TransportError::Unavailable {
                program: "adb".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        Ok(self.attached.clone())
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>, TransportError> {
        let base = self.host_path(dir);
        if !base.is_dir() {
            return Err(Self::failure("find: No such file or directory"));
        }
        let mut out = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry.map_err(|e| Self::failure(&e.to_string()))?;
            if entry.file_type().is_file() {
                let rel = entry
                    .path()
                    .strip_prefix(self.root.path())
                    .expect("under root");
                out.push(format!("/{}", rel.to_string_lossy()));
            }
        }
        Ok(out)
    }

    fn disk_usage_kb(&self, dir: &str) -> Result<u64, TransportError> {
        self.record(Call::DiskUsage(dir.to_string()));
        let answer = match self.du.lock().pop_front() {
            Some(a) => a,
            None => *self.du_default.lock(),
        };
        answer.ok_or_else(|| Self::failure("du: Permission denied"))
    }

    fn push(&self, local: &Path, remote: &str) -> Result<(), TransportError> {
        self.record(Call::Push {
            local: local.to_path_buf(),
            remote: remote.to_string(),
        });
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_push.lock().contains(&name) {
            return Err(Self::failure("adb: error: failed to copy"));
        }
        let data = std::fs::read(local).map_err(|e| Self::failure(&e.to_string()))?;
        self.put(remote, &data);
        if self.consume_on_push.lock().contains(&name) {
            std::fs::remove_file(local).expect("remove local");
        }
        Ok(())
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<(), TransportError> {
        self.record(Call::Pull {
            remote: remote.to_string(),
            local: local.to_path_buf(),
        });
        if self.fail_pull.lock().contains(basename(remote)) {
            return Err(Self::failure("adb: error: remote object does not exist"));
        }
        std::fs::copy(self.host_path(remote), local).map_err(|e| Self::failure(&e.to_string()))?;
        Ok(())
    }

    fn remove_file(&self, remote: &str) -> Result<(), TransportError> {
        self.record(Call::Remove(remote.to_string()));
        if self.fail_remove.lock().contains(basename(remote)) {
            return Err(Self::failure("rm: Read-only file system"));
        }
        std::fs::remove_file(self.host_path(remote)).map_err(|e| Self::failure(&e.to_string()))
    }

    fn remove_empty_dirs(&self, dir: &str) -> Result<(), TransportError> {
        self.record(Call::PruneDirs(dir.to_string()));
        let base = self.host_path(dir);
        for entry in WalkDir::new(&base).min_depth(1).contents_first(true) {
            let entry = entry.map_err(|e| Self::failure(&e.to_string()))?;
            if entry.file_type().is_dir() {
                // non-empty directories stay
                let _ = std::fs::remove_dir(entry.path());
            }
        }
        Ok(())
    }

    fn reindex(&self, request: &ReindexRequest<'_>) -> Result<(), TransportError> {
        self.record(match *request {
            ReindexRequest::ScanFiles { dir, name_pattern } => Call::Scan {
                dir: dir.to_string(),
                pattern: name_pattern.map(str::to_string),
            },
            ReindexRequest::Remount { root } => Call::Remount(root.to_string()),
        });
        Ok(())
    }
}

type NoteHook = Box<dyn Fn(&str) + Send + Sync>;

/// Captures progress lines. Can cancel once a given file position is
/// reached, or run a hook on every note.
#[derive(Default)]
pub struct RecordingProgress {
    pub files: Mutex<Vec<(usize, usize, FileAction, String)>>,
    pub notes: Mutex<Vec<String>>,
    cancel_at: Option<(usize, CancellationToken)>,
    on_note: Option<NoteHook>,
}

impl RecordingProgress {
    pub fn cancelling_at(position: usize, token: CancellationToken) -> Self {
        Self {
            cancel_at: Some((position, token)),
            ..Default::default()
        }
    }

    pub fn with_note_hook(hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            on_note: Some(Box::new(hook)),
            ..Default::default()
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.files.lock().iter().map(|f| f.3.clone()).collect()
    }
}

impl TransferProgress for RecordingProgress {
    fn file(&self, position: usize, total: usize, action: FileAction, name: &str) {
        self.files
            .lock()
            .push((position, total, action, name.to_string()));
        if let Some((at, token)) = &self.cancel_at {
            if *at == position {
                token.cancel();
            }
        }
    }

    fn note(&self, msg: &str) {
        self.notes.lock().push(msg.to_string());
        if let Some(hook) = &self.on_note {
            hook(msg);
        }
    }
}

/// Write `names` into `dir` with distinct contents.
pub fn populate(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), format!("contents of {name}")).expect("write");
    }
}

pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read_dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
