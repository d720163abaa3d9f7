use anyhow::Result;
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Audit trail of file events. Locations are display strings because they
/// mix desktop paths and device paths.
pub trait Logger: Send + Sync {
    fn start(&self, _mode: &str, _src: &str, _dst: &str) {}
    fn copy_done(&self, _src: &str, _dst: &str) {}
    fn delete(&self, _path: &str) {}
    fn error(&self, _context: &str, _path: &str, _msg: &str) {}
    fn done(&self, _succeeded: usize, _failed: usize, _seconds: f64) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        let mut f = self.file.lock();
        let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
    }
}

impl Logger for TextLogger {
    fn start(&self, mode: &str, src: &str, dst: &str) {
        self.line(&format!("START mode={mode} src={src} dst={dst}"));
    }
    fn copy_done(&self, src: &str, dst: &str) {
        self.line(&format!("COPY src={src} dst={dst}"));
    }
    fn delete(&self, path: &str) {
        self.line(&format!("DELETE path={path}"));
    }
    fn error(&self, context: &str, path: &str, msg: &str) {
        self.line(&format!("ERROR ctx={context} path={path} msg={}", msg.trim()));
    }
    fn done(&self, succeeded: usize, failed: usize, seconds: f64) {
        self.line(&format!(
            "DONE succeeded={succeeded} failed={failed} seconds={seconds:.3}"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_timestamped_lines() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("logs").join("pixelsync.log");
        {
            let log = TextLogger::new(&path)?;
            log.start("push", "/home/me/photos", "/sdcard/DCIM/Camera");
            log.error("copy", "/home/me/photos/a.jpg", "device full\n");
        }
        TextLogger::new(&path)?.done(3, 1, 2.5);

        let text = std::fs::read_to_string(&path)?;
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("START mode=push src=/home/me/photos dst=/sdcard/DCIM/Camera"));
        assert!(lines[1].ends_with("msg=device full"));
        assert!(lines[2].ends_with("DONE succeeded=3 failed=1 seconds=2.500"));
        Ok(())
    }
}
