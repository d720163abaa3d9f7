//! Fully resolved job descriptions handed to the engines.

use std::path::PathBuf;
use std::time::Duration;

use crate::classify::ExtensionSet;
use crate::error::{SyncError, SyncResult};
use crate::storage::StorageUnit;

/// Desktop → device move.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub source_dir: PathBuf,
    pub device_dir: String,
    pub device_serial: Option<String>,
    pub batch_size: usize,
    pub max_storage: f64,
    pub storage_unit: StorageUnit,
    /// Sleep between occupancy re-checks while the device is full.
    pub backoff: Duration,
    /// Pause after each batch except the last.
    pub batch_pause: Duration,
    pub keep: ExtensionSet,
    pub delete: ExtensionSet,
    /// Inserted before the extension of every uploaded file name.
    pub suffix: Option<String>,
    /// Storage root announced to the media scanner at job end.
    pub media_root: String,
}

impl TransferJob {
    pub fn validate(&self) -> SyncResult<()> {
        if self.batch_size == 0 {
            return Err(SyncError::InvalidJob("batch size must be at least 1".into()));
        }
        if !self.max_storage.is_finite() || self.max_storage <= 0.0 {
            return Err(SyncError::InvalidJob(format!(
                "storage ceiling must be a positive number, got {}",
                self.max_storage
            )));
        }
        check_device_dir(&self.device_dir)?;
        for (label, set) in [("keep", &self.keep), ("delete", &self.delete)] {
            let bad = set.malformed();
            if !bad.is_empty() {
                return Err(SyncError::InvalidJob(format!(
                    "{label} extensions must look like \".jpg\": {}",
                    bad.join(", ")
                )));
            }
        }
        if let Some(suffix) = &self.suffix {
            if suffix.is_empty() || suffix.contains('/') {
                return Err(SyncError::InvalidJob(format!("bad file name suffix {suffix:?}")));
            }
        }
        Ok(())
    }

    /// Name a source file gets on the device.
    pub fn device_name(&self, name: &str) -> String {
        match &self.suffix {
            Some(suffix) => decorate(name, suffix),
            None => name.to_string(),
        }
    }

    /// `find -name` pattern limiting reindex touches to decorated files.
    pub fn reindex_pattern(&self) -> Option<String> {
        self.suffix.as_ref().map(|s| format!("*{s}*"))
    }
}

/// `IMG_1.HEIC` + `_pixel` → `IMG_1_pixel.HEIC`.
pub fn decorate(name: &str, suffix: &str) -> String {
    match name.rfind('.') {
        Some(i) if i > 0 => format!("{}{}{}", &name[..i], suffix, &name[i..]),
        _ => format!("{name}{suffix}"),
    }
}

/// Device → desktop move.
#[derive(Debug, Clone)]
pub struct PullJob {
    pub device_dir: String,
    pub local_dir: PathBuf,
    pub device_serial: Option<String>,
    /// When false, files are copied and the device copies are kept.
    pub delete_remote: bool,
}

impl PullJob {
    pub fn validate(&self) -> SyncResult<()> {
        check_device_dir(&self.device_dir)
    }
}

/// Bulk removal of every file below a device directory.
#[derive(Debug, Clone)]
pub struct PurgeJob {
    pub device_dir: String,
    pub device_serial: Option<String>,
}

impl PurgeJob {
    pub fn validate(&self) -> SyncResult<()> {
        check_device_dir(&self.device_dir)?;
        if self.device_dir.trim_end_matches('/').is_empty() {
            return Err(SyncError::InvalidJob("refusing to purge the device root".into()));
        }
        Ok(())
    }
}

fn check_device_dir(dir: &str) -> SyncResult<()> {
    if !dir.starts_with('/') {
        return Err(SyncError::InvalidJob(format!(
            "device directory must be absolute, got {dir:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_job() -> TransferJob {
        TransferJob {
            source_dir: PathBuf::from("/tmp/src"),
            device_dir: "/sdcard/DCIM/Camera/".into(),
            device_serial: None,
            batch_size: 10,
            max_storage: 10.0,
            storage_unit: StorageUnit::Gb,
            backoff: Duration::from_millis(1),
            batch_pause: Duration::ZERO,
            keep: ExtensionSet::new([".jpg", ".png"]),
            delete: ExtensionSet::new([".aae"]),
            suffix: None,
            media_root: "/sdcard".into(),
        }
    }

    #[test]
    fn decoration_goes_before_extension() {
        assert_eq!(decorate("IMG_1.HEIC", "_pixel"), "IMG_1_pixel.HEIC");
        assert_eq!(decorate("a.tar.gz", "_pixel"), "a.tar_pixel.gz");
        assert_eq!(decorate("README", "_pixel"), "README_pixel");
        assert_eq!(decorate(".nomedia", "_pixel"), ".nomedia_pixel");
    }

    #[test]
    fn device_name_respects_suffix_setting() {
        let mut job = sample_job();
        assert_eq!(job.device_name("a.jpg"), "a.jpg");
        assert_eq!(job.reindex_pattern(), None);
        job.suffix = Some("_pixel".into());
        assert_eq!(job.device_name("a.jpg"), "a_pixel.jpg");
        assert_eq!(job.reindex_pattern().as_deref(), Some("*_pixel*"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(sample_job().validate().is_ok());

        let mut job = sample_job();
        job.batch_size = 0;
        assert!(matches!(job.validate(), Err(SyncError::InvalidJob(_))));

        let mut job = sample_job();
        job.max_storage = f64::NAN;
        assert!(job.validate().is_err());

        let mut job = sample_job();
        job.device_dir = "sdcard/DCIM".into();
        assert!(job.validate().is_err());

        let mut job = sample_job();
        job.keep = ExtensionSet::new(["jpg"]);
        assert!(job.validate().is_err());
    }

    #[test]
    fn purge_refuses_root() {
        let job = PurgeJob {
            device_dir: "/".into(),
            device_serial: None,
        };
        assert!(job.validate().is_err());
    }
}
