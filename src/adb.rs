//! Remote shell client for the attached Android device.
//!
//! Every operation is built as an argument vector and handed to a
//! [`Transport`]. Local paths and `push`/`pull` device paths are passed to
//! adb untouched; only commands that adb forwards to the device shell are
//! quoted, one argument at a time, with [`shell_quote`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{SyncError, SyncResult, TransportError};

/// Raw result of one transport invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs the adb binary with the given arguments.
pub trait Transport: Send + Sync {
    fn run(&self, args: &[OsString]) -> Result<CommandOutput, TransportError>;
}

/// Spawns one adb process per call and waits for it.
#[derive(Debug, Clone)]
pub struct ProcessTransport {
    program: PathBuf,
}

impl ProcessTransport {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Transport for ProcessTransport {
    fn run(&self, args: &[OsString]) -> Result<CommandOutput, TransportError> {
        tracing::debug!(program = %self.program.display(), ?args, "exec");
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| TransportError::Unavailable {
                program: self.program.display().to_string(),
                source,
            })?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Device,
    Unauthorized,
    Offline,
    Other(String),
}

impl DeviceState {
    fn parse(s: &str) -> Self {
        match s {
            "device" => DeviceState::Device,
            "unauthorized" => DeviceState::Unauthorized,
            "offline" => DeviceState::Offline,
            other => DeviceState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Device => "device",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Offline => "offline",
            DeviceState::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: String,
    pub state: DeviceState,
}

/// Media index refresh requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexRequest<'a> {
    /// Touch files under `dir` (all of them, or only names matching
    /// `name_pattern`) and ask the media scanner to look at `dir`.
    ScanFiles {
        dir: &'a str,
        name_pattern: Option<&'a str>,
    },
    /// Announce the whole storage root as freshly mounted.
    Remount { root: &'a str },
}

/// Operations the engines need from a device.
pub trait RemoteDevice {
    /// Serial this handle is bound to, if any.
    fn serial(&self) -> Option<&str>;
    fn devices(&self) -> Result<Vec<DeviceInfo>, TransportError>;
    /// Absolute paths of all regular files below `dir`, recursively.
    fn list_files(&self, dir: &str) -> Result<Vec<String>, TransportError>;
    fn disk_usage_kb(&self, dir: &str) -> Result<u64, TransportError>;
    fn push(&self, local: &Path, remote: &str) -> Result<(), TransportError>;
    fn pull(&self, remote: &str, local: &Path) -> Result<(), TransportError>;
    fn remove_file(&self, remote: &str) -> Result<(), TransportError>;
    fn remove_empty_dirs(&self, dir: &str) -> Result<(), TransportError>;
    fn reindex(&self, request: &ReindexRequest<'_>) -> Result<(), TransportError>;
}

/// adb-backed [`RemoteDevice`].
pub struct Adb<T = ProcessTransport> {
    transport: T,
    serial: Option<String>,
}

impl Adb<ProcessTransport> {
    pub fn new(program: impl Into<PathBuf>, serial: Option<String>) -> Self {
        Self::with_transport(ProcessTransport::new(program), serial)
    }
}

impl<T: Transport> Adb<T> {
    pub fn with_transport(transport: T, serial: Option<String>) -> Self {
        Self { transport, serial }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn device_args(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(8);
        if let Some(serial) = &self.serial {
            args.push(OsString::from("-s"));
            args.push(OsString::from(serial));
        }
        args
    }

    fn exec(&self, args: Vec<OsString>) -> Result<CommandOutput, TransportError> {
        let out = self.transport.run(&args)?;
        if out.success() {
            Ok(out)
        } else {
            Err(TransportError::Failed {
                status: out.status,
                stderr: if out.stderr.trim().is_empty() {
                    out.stdout
                } else {
                    out.stderr
                },
            })
        }
    }

    /// Run `argv` through the device shell.
    fn shell(&self, argv: &[&str]) -> Result<CommandOutput, TransportError> {
        let line = argv
            .iter()
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ");
        let mut args = self.device_args();
        args.push(OsString::from("shell"));
        args.push(OsString::from(line));
        self.exec(args)
    }
}

impl<T: Transport> RemoteDevice for Adb<T> {
    fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>, TransportError> {
        let out = self.exec(vec![OsString::from("devices")])?;
        Ok(parse_devices(&out.stdout))
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>, TransportError> {
        let out = self.shell(&["find", dir, "-type", "f"])?;
        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn disk_usage_kb(&self, dir: &str) -> Result<u64, TransportError> {
        let out = self.shell(&["du", "-sk", dir])?;
        parse_du_kb(&out.stdout)
    }

    fn push(&self, local: &Path, remote: &str) -> Result<(), TransportError> {
        let mut args = self.device_args();
        args.extend([
            OsString::from("push"),
            local.as_os_str().to_os_string(),
            OsString::from(remote),
        ]);
        self.exec(args).map(|_| ())
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<(), TransportError> {
        let mut args = self.device_args();
        args.extend([
            OsString::from("pull"),
            OsString::from(remote),
            local.as_os_str().to_os_string(),
        ]);
        self.exec(args).map(|_| ())
    }

    fn remove_file(&self, remote: &str) -> Result<(), TransportError> {
        self.shell(&["rm", "--", remote]).map(|_| ())
    }

    fn remove_empty_dirs(&self, dir: &str) -> Result<(), TransportError> {
        self.shell(&["find", dir, "-mindepth", "1", "-type", "d", "-empty", "-delete"])
            .map(|_| ())
    }

    fn reindex(&self, request: &ReindexRequest<'_>) -> Result<(), TransportError> {
        match *request {
            ReindexRequest::ScanFiles { dir, name_pattern } => {
                let touch = match name_pattern {
                    Some(pattern) => {
                        self.shell(&["find", dir, "-type", "f", "-name", pattern, "-exec", "touch", "{}", ";"])
                    }
                    None => self.shell(&["find", dir, "-type", "f", "-exec", "touch", "{}", ";"]),
                };
                let uri = file_uri(dir);
                let scan = self.shell(&[
                    "am",
                    "broadcast",
                    "-a",
                    "android.intent.action.MEDIA_SCANNER_SCAN_FILE",
                    "-d",
                    &uri,
                ]);
                touch.and(scan).map(|_| ())
            }
            ReindexRequest::Remount { root } => {
                let uri = file_uri(root);
                self.shell(&[
                    "am",
                    "broadcast",
                    "-a",
                    "android.intent.action.MEDIA_MOUNTED",
                    "-d",
                    &uri,
                ])
                .map(|_| ())
            }
        }
    }
}

/// Check that the device the job targets is present and authorized.
/// Fails before any file is touched.
pub fn ensure_device(device: &dyn RemoteDevice) -> SyncResult<DeviceInfo> {
    let devices = device.devices().map_err(SyncError::TransportUnavailable)?;
    match device.serial() {
        Some(serial) => devices
            .into_iter()
            .find(|d| d.serial == serial && d.state == DeviceState::Device)
            .ok_or_else(|| SyncError::DeviceNotConnected {
                serial: Some(serial.to_string()),
            }),
        None => {
            let attached = devices.len();
            let mut ready = devices.into_iter().filter(|d| d.state == DeviceState::Device);
            match ready.next() {
                None => Err(SyncError::DeviceNotConnected { serial: None }),
                Some(_) if attached > 1 => Err(SyncError::AmbiguousDevice { count: attached }),
                Some(d) => Ok(d),
            }
        }
    }
}

/// Parse `adb devices` output. The first line is a header.
pub fn parse_devices(stdout: &str) -> Vec<DeviceInfo> {
    stdout
        .lines()
        .skip_while(|l| !l.starts_with("List of devices"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(DeviceInfo {
                serial: serial.to_string(),
                state: DeviceState::parse(state),
            })
        })
        .collect()
}

/// First whitespace-delimited token of `du -sk` output, in kilobytes.
pub fn parse_du_kb(stdout: &str) -> Result<u64, TransportError> {
    let token = stdout
        .split_whitespace()
        .next()
        .ok_or_else(|| TransportError::Parse("empty du output".to_string()))?;
    token
        .parse::<u64>()
        .map_err(|_| TransportError::Parse(format!("du reported {token:?}")))
}

/// Quote one argument for a POSIX shell.
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn file_uri(dir: &str) -> String {
    format!("file://{}", dir.trim_end_matches('/'))
}

/// Join a device directory and a file name.
pub fn remote_join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Last path component of a device path.
pub fn remote_basename(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}
