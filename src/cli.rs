//! Command-line surface and per-invocation config overrides

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::storage::StorageUnit;

#[derive(Debug, Parser)]
#[command(
    name = "pixelsync",
    author,
    version,
    about = "Move photos and videos to an Android phone over adb, in batches, without overfilling it"
)]
pub struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: ~/.config/pixelsync/pixelsync.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append an audit line per file event to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// adb executable to use
    #[arg(long, global = true, value_name = "PATH")]
    pub adb: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move files from the desktop folder to the device in batches
    Push(PushArgs),
    /// Move (or copy) every file from a device folder to the desktop
    Pull(PullArgs),
    /// Delete every file under a device folder
    Purge(PurgeArgs),
    /// List attached devices
    Devices,
    /// List files under a device folder
    Ls {
        /// Device folder (default: configured device_dir)
        dir: Option<String>,
        #[arg(long)]
        serial: Option<String>,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved config
    Show,
    /// Print the config file location
    Path,
    /// Delete the config file
    Reset,
}

#[derive(Debug, Clone, Default, Args)]
pub struct PushArgs {
    /// Desktop folder to drain
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Device folder to fill
    #[arg(long, value_name = "DIR")]
    pub dest: Option<String>,

    #[arg(long)]
    pub serial: Option<String>,

    /// Files per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Storage ceiling for the device folder
    #[arg(long)]
    pub max_storage: Option<f64>,

    /// Unit of --max-storage (kb, mb, gb)
    #[arg(long)]
    pub unit: Option<StorageUnit>,

    /// Minutes to wait while the device folder is full
    #[arg(long)]
    pub sleep_minutes: Option<u64>,

    /// Seconds to pause between batches
    #[arg(long, value_name = "SECS")]
    pub batch_pause: Option<u64>,

    /// Append the configured suffix to uploaded names
    #[arg(long, conflicts_with = "no_suffix")]
    pub suffix: bool,

    /// Upload under the original names
    #[arg(long)]
    pub no_suffix: bool,

    /// Exit with status 2 when any file failed
    #[arg(long)]
    pub strict: bool,

    /// Print the plan without touching anything
    #[arg(long)]
    pub dry_run: bool,
}

impl PushArgs {
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(s) = &self.source {
            cfg.source_dir = Some(s.clone());
        }
        if let Some(d) = &self.dest {
            cfg.device_dir = d.clone();
        }
        if let Some(s) = &self.serial {
            cfg.device_serial = Some(s.clone());
        }
        if let Some(n) = self.batch_size {
            cfg.batch_size = n;
        }
        if let Some(m) = self.max_storage {
            cfg.max_storage = m;
        }
        if let Some(u) = self.unit {
            cfg.storage_unit = u;
        }
        if let Some(m) = self.sleep_minutes {
            cfg.sleep_minutes = m;
        }
        if let Some(s) = self.batch_pause {
            cfg.batch_pause_secs = s;
        }
        if self.suffix {
            cfg.add_suffix = true;
        }
        if self.no_suffix {
            cfg.add_suffix = false;
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct PullArgs {
    /// Device folder to empty
    #[arg(long, value_name = "DIR")]
    pub from: Option<String>,

    /// Desktop folder to fill (default: configured recovery_dir)
    #[arg(long, value_name = "DIR")]
    pub to: Option<PathBuf>,

    #[arg(long)]
    pub serial: Option<String>,

    /// Copy only; leave the device files in place
    #[arg(long)]
    pub keep_remote: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Exit with status 2 when any file failed
    #[arg(long)]
    pub strict: bool,
}

impl PullArgs {
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(d) = &self.from {
            cfg.device_dir = d.clone();
        }
        if let Some(t) = &self.to {
            cfg.recovery_dir = t.clone();
        }
        if let Some(s) = &self.serial {
            cfg.device_serial = Some(s.clone());
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct PurgeArgs {
    /// Device folder to empty (default: configured device_dir)
    pub dir: Option<String>,

    #[arg(long)]
    pub serial: Option<String>,

    /// Skip typing DELETE to confirm
    #[arg(short, long)]
    pub yes: bool,

    /// Exit with status 2 when any file failed
    #[arg(long)]
    pub strict: bool,
}

impl PurgeArgs {
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(d) = &self.dir {
            cfg.device_dir = d.clone();
        }
        if let Some(s) = &self.serial {
            cfg.device_serial = Some(s.clone());
        }
    }
}
