//! Persistent settings in TOML.
//!
//! A missing file means defaults. Command-line flags override individual
//! fields for one invocation before a job is built.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::ExtensionSet;
use crate::job::{PullJob, PurgeJob, TransferJob};
use crate::storage::StorageUnit;

pub fn config_dir() -> PathBuf {
    #[cfg(windows)]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("PixelSync");
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join("pixelsync");
    }
    PathBuf::from(".pixelsync")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("pixelsync.toml")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Desktop folder drained by `push`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    pub device_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_serial: Option<String>,
    /// adb executable; looked up on PATH when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adb_path: Option<PathBuf>,

    pub batch_size: usize,
    pub max_storage: f64,
    pub storage_unit: StorageUnit,
    pub sleep_minutes: u64,
    pub batch_pause_secs: u64,

    pub keep_extensions: Vec<String>,
    pub delete_extensions: Vec<String>,

    pub add_suffix: bool,
    pub suffix: String,

    /// Default local folder for `pull`.
    pub recovery_dir: PathBuf,
    pub media_root: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: None,
            device_dir: "/sdcard/DCIM/Camera".to_string(),
            device_serial: None,
            adb_path: None,
            batch_size: 50,
            max_storage: 10.0,
            storage_unit: StorageUnit::Gb,
            sleep_minutes: 15,
            batch_pause_secs: 10,
            keep_extensions: [".heic", ".mov", ".jpg", ".jpeg", ".png", ".mp4", ".gif"]
                .map(String::from)
                .to_vec(),
            delete_extensions: [".aae", ".xmp", ".zip", ".ds_store", ".dng", ".nomedia"]
                .map(String::from)
                .to_vec(),
            add_suffix: false,
            suffix: "_pixel".to_string(),
            recovery_dir: PathBuf::from("02_files_to_doublecheck"),
            media_root: "/sdcard".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => toml::from_str(&data)
                .with_context(|| format!("parsing config {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading config {}", path.display())),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
        let data = toml::to_string_pretty(self)?;
        // atomic write
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        use std::io::Write as _;
        tmp.write_all(data.as_bytes())?;
        tmp.flush()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600));
        }
        tmp.persist(path)
            .with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    /// Write defaults. An existing file is kept unless `force`.
    pub fn init(path: &Path, force: bool) -> Result<Self> {
        if path.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        let cfg = Self::default();
        cfg.save(path)?;
        Ok(cfg)
    }

    /// Delete the file. Returns whether there was one.
    pub fn reset(path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
        }
    }

    pub fn transfer_job(&self) -> Result<TransferJob> {
        let Some(source_dir) = self.source_dir.clone() else {
            bail!("no source folder configured (set source_dir or pass --source)");
        };
        let job = TransferJob {
            source_dir,
            device_dir: self.device_dir.clone(),
            device_serial: self.device_serial.clone(),
            batch_size: self.batch_size,
            max_storage: self.max_storage,
            storage_unit: self.storage_unit,
            backoff: Duration::from_secs(self.sleep_minutes.saturating_mul(60)),
            batch_pause: Duration::from_secs(self.batch_pause_secs),
            keep: ExtensionSet::new(&self.keep_extensions),
            delete: ExtensionSet::new(&self.delete_extensions),
            suffix: self.add_suffix.then(|| self.suffix.clone()),
            media_root: self.media_root.clone(),
        };
        job.validate()?;
        Ok(job)
    }

    pub fn pull_job(&self, delete_remote: bool) -> Result<PullJob> {
        let job = PullJob {
            device_dir: self.device_dir.clone(),
            local_dir: self.recovery_dir.clone(),
            device_serial: self.device_serial.clone(),
            delete_remote,
        };
        job.validate()?;
        Ok(job)
    }

    pub fn purge_job(&self) -> Result<PurgeJob> {
        let job = PurgeJob {
            device_dir: self.device_dir.clone(),
            device_serial: self.device_serial.clone(),
        };
        job.validate()?;
        Ok(job)
    }

    pub fn adb_program(&self) -> PathBuf {
        self.adb_path.clone().unwrap_or_else(|| PathBuf::from("adb"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let cfg = Config::load(&tmp.path().join("nope.toml"))?;
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.device_dir, "/sdcard/DCIM/Camera");
        Ok(())
    }

    #[test]
    fn partial_file_fills_in_defaults() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("pixelsync.toml");
        std::fs::write(
            &path,
            "source_dir = \"/home/me/to_pixel\"\nbatch_size = 20\nstorage_unit = \"mb\"\n",
        )?;
        let cfg = Config::load(&path)?;
        assert_eq!(cfg.source_dir.as_deref(), Some(Path::new("/home/me/to_pixel")));
        assert_eq!(cfg.batch_size, 20);
        assert_eq!(cfg.storage_unit, StorageUnit::Mb);
        assert_eq!(cfg.sleep_minutes, 15);
        Ok(())
    }

    #[test]
    fn save_load_and_reset() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("nested").join("pixelsync.toml");
        let mut cfg = Config::init(&path, false)?;
        assert!(Config::init(&path, false).is_err());

        cfg.device_serial = Some("HT6940202447".into());
        cfg.add_suffix = true;
        cfg.save(&path)?;
        assert_eq!(Config::load(&path)?, cfg);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path)?.permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        assert!(Config::reset(&path)?);
        assert!(!Config::reset(&path)?);
        Ok(())
    }

    #[test]
    fn transfer_job_from_config() -> Result<()> {
        let mut cfg = Config::default();
        assert!(cfg.transfer_job().is_err());

        cfg.source_dir = Some(PathBuf::from("/home/me/to_pixel"));
        cfg.add_suffix = true;
        let job = cfg.transfer_job()?;
        assert_eq!(job.backoff, Duration::from_secs(15 * 60));
        assert_eq!(job.batch_pause, Duration::from_secs(10));
        assert_eq!(job.device_name("IMG_1.HEIC"), "IMG_1_pixel.HEIC");
        assert!(job.keep.contains(".HEIC"));
        assert!(job.delete.contains(".ds_store"));

        cfg.batch_size = 0;
        assert!(cfg.transfer_job().is_err());
        cfg.batch_size = 5;
        cfg.keep_extensions.push("jpg".into());
        assert!(cfg.transfer_job().is_err());
        Ok(())
    }

    #[test]
    fn pull_and_purge_jobs() -> Result<()> {
        let cfg = Config::default();
        let pull = cfg.pull_job(true)?;
        assert_eq!(pull.local_dir, PathBuf::from("02_files_to_doublecheck"));
        assert!(pull.delete_remote);

        let mut root = Config::default();
        root.device_dir = "/".into();
        assert!(root.purge_job().is_err());
        assert!(cfg.purge_job().is_ok());
        Ok(())
    }
}
