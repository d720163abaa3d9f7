//! pixelsync - batched desktop → Android photo transfer over adb
//!
//! - Drains a desktop folder onto the phone in fixed-size batches
//! - Waits while the phone's camera folder is over its storage ceiling
//! - Pulls files back, or purges a device folder, when a backup went wrong

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::style::{Color, Stylize};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use pixelsync::adb::{ensure_device, Adb, RemoteDevice};
use pixelsync::cancel::CancellationToken;
use pixelsync::cli::{Cli, Command, ConfigAction, PullArgs, PurgeArgs, PushArgs};
use pixelsync::config::{default_config_path, Config};
use pixelsync::error::SyncError;
use pixelsync::logger::{Logger, NoopLogger, TextLogger};
use pixelsync::progress::ConsoleProgress;
use pixelsync::push::{plan, PushPlan};
use pixelsync::report::TransferReport;
use pixelsync::session::Session;

const EXIT_FATAL: i32 = 1;
const EXIT_PARTIAL: i32 = 2;
const EXIT_CANCELLED: i32 = 130;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".with(Color::Red).bold());
            if let Some(SyncError::TransportUnavailable(t)) = e.downcast_ref::<SyncError>() {
                if t.is_unavailable() {
                    eprintln!("Install Android platform-tools or point --adb at the adb binary.");
                }
            }
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    match &cli.command {
        Command::Config { action } => config_command(action, &config_path),
        Command::Push(args) => push(&cli, args, load_config(&cli, &config_path)?),
        Command::Pull(args) => pull(&cli, args, load_config(&cli, &config_path)?),
        Command::Purge(args) => purge(&cli, args, load_config(&cli, &config_path)?),
        Command::Devices => devices(&load_config(&cli, &config_path)?),
        Command::Ls { dir, serial } => {
            let mut cfg = load_config(&cli, &config_path)?;
            if let Some(s) = serial {
                cfg.device_serial = Some(s.clone());
            }
            let dir = dir.clone().unwrap_or_else(|| cfg.device_dir.clone());
            ls(&cfg, &dir)
        }
    }
}

fn load_config(cli: &Cli, path: &Path) -> Result<Config> {
    let mut cfg = Config::load(path)?;
    if let Some(adb) = &cli.adb {
        cfg.adb_path = Some(adb.clone());
    }
    Ok(cfg)
}

fn config_command(action: &ConfigAction, path: &Path) -> Result<i32> {
    match action {
        ConfigAction::Init { force } => {
            Config::init(path, *force)?;
            println!("Wrote defaults to {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = Config::load(path)?;
            print!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Reset => {
            if Config::reset(path)? {
                println!("Removed {}", path.display());
            } else {
                println!("No config at {}", path.display());
            }
        }
    }
    Ok(0)
}

fn make_logger(path: Option<&PathBuf>) -> Result<Box<dyn Logger>> {
    match path {
        Some(p) => Ok(Box::new(
            TextLogger::new(p).with_context(|| format!("opening log file {}", p.display()))?,
        )),
        None => Ok(Box::new(NoopLogger)),
    }
}

/// First Ctrl-C cancels the job at the next safe point; the second exits.
fn install_interrupt(token: CancellationToken) -> Result<()> {
    let mut hits = 0u32;
    ctrlc::set_handler(move || {
        hits += 1;
        if hits == 1 {
            eprintln!("\nInterrupted; finishing the current file. Press Ctrl-C again to abort.");
            token.cancel();
        } else {
            eprintln!("\nAborted.");
            std::process::exit(EXIT_CANCELLED);
        }
    })
    .context("installing Ctrl-C handler")
}

fn push(cli: &Cli, args: &PushArgs, mut cfg: Config) -> Result<i32> {
    args.apply(&mut cfg);
    let job = cfg.transfer_job()?;

    if args.dry_run {
        print_plan(&plan(&job)?, &job.device_dir);
        return Ok(0);
    }

    let adb = Adb::new(cfg.adb_program(), job.device_serial.clone());
    let logger = make_logger(cli.log_file.as_ref())?;
    let progress = ConsoleProgress::new(cli.verbose > 0);
    let cancel = CancellationToken::new();
    install_interrupt(cancel.clone())?;

    println!(
        "Moving {} → {} in batches of {} (ceiling {} {})",
        job.source_dir.display(),
        job.device_dir,
        job.batch_size,
        job.max_storage,
        job.storage_unit
    );
    let report = Session::new(&adb, cancel)
        .with_progress(&progress)
        .with_logger(logger.as_ref())
        .push(&job)?;
    drop(progress);
    finish(&report, "transferred", args.strict)
}

fn print_plan(plan: &PushPlan, device_dir: &str) {
    let c = &plan.classification;
    println!("Dry run: nothing will be touched");
    println!(
        "{} to transfer, {} to delete, {} ignored",
        c.transfer.len(),
        c.delete.len(),
        c.ignored.len()
    );
    for entry in &c.delete {
        println!("  delete {}", entry.name);
    }
    for (i, batch) in plan.batches().enumerate() {
        println!("Batch {} ({} files) → {device_dir}", i + 1, batch.len());
        for entry in batch {
            println!("  {}", entry.name);
        }
    }
}

fn pull(cli: &Cli, args: &PullArgs, mut cfg: Config) -> Result<i32> {
    args.apply(&mut cfg);
    let job = cfg.pull_job(!args.keep_remote)?;

    if job.delete_remote && !args.yes {
        println!(
            "This moves every file under {} to {} and DELETES it from the device.",
            job.device_dir,
            job.local_dir.display()
        );
        if !confirm("Are you sure you want to continue? (yes/no): ", |s| {
            s.eq_ignore_ascii_case("yes")
        })? {
            println!("Cancelled.");
            return Ok(0);
        }
    }

    let adb = Adb::new(cfg.adb_program(), job.device_serial.clone());
    let logger = make_logger(cli.log_file.as_ref())?;
    let progress = ConsoleProgress::new(cli.verbose > 0);
    let cancel = CancellationToken::new();
    install_interrupt(cancel.clone())?;

    let report = Session::new(&adb, cancel)
        .with_progress(&progress)
        .with_logger(logger.as_ref())
        .pull(&job)?;
    drop(progress);
    let verb = if job.delete_remote { "moved" } else { "copied" };
    let code = finish(&report, verb, args.strict)?;
    if report.succeeded() > 0 {
        println!("Files are in {}", job.local_dir.display());
    }
    Ok(code)
}

fn purge(cli: &Cli, args: &PurgeArgs, mut cfg: Config) -> Result<i32> {
    args.apply(&mut cfg);
    let job = cfg.purge_job()?;

    if !args.yes {
        println!(
            "This permanently deletes every file under {} on the device.",
            job.device_dir
        );
        if !confirm("Type DELETE to confirm: ", |s| s == "DELETE")? {
            println!("Cancelled.");
            return Ok(0);
        }
    }

    let adb = Adb::new(cfg.adb_program(), job.device_serial.clone());
    let logger = make_logger(cli.log_file.as_ref())?;
    let progress = ConsoleProgress::new(cli.verbose > 0);
    let cancel = CancellationToken::new();
    install_interrupt(cancel.clone())?;

    let report = Session::new(&adb, cancel)
        .with_progress(&progress)
        .with_logger(logger.as_ref())
        .purge(&job)?;
    drop(progress);
    finish(&report, "deleted", args.strict)
}

fn devices(cfg: &Config) -> Result<i32> {
    let adb = Adb::new(cfg.adb_program(), None);
    let list = adb.devices().context("listing devices")?;
    if list.is_empty() {
        println!("No devices attached");
    }
    for d in list {
        println!("{}\t{}", d.serial, d.state.as_str());
    }
    Ok(0)
}

fn ls(cfg: &Config, dir: &str) -> Result<i32> {
    let adb = Adb::new(cfg.adb_program(), cfg.device_serial.clone());
    ensure_device(&adb)?;
    let files = adb
        .list_files(dir)
        .with_context(|| format!("listing {dir}"))?;
    let mut out = io::stdout().lock();
    for f in &files {
        writeln!(out, "{f}")?;
    }
    writeln!(out, "{} file(s)", files.len())?;
    Ok(0)
}

fn confirm(prompt: &str, accept: impl Fn(&str) -> bool) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("no confirmation on stdin (use --yes)");
    }
    Ok(accept(line.trim()))
}

fn finish(report: &TransferReport, verb: &str, strict: bool) -> Result<i32> {
    report.write_summary(&mut io::stdout().lock(), verb)?;
    if report.cancelled {
        return Ok(EXIT_CANCELLED);
    }
    if !report.is_success() {
        if strict {
            return Ok(EXIT_PARTIAL);
        }
        eprintln!(
            "{} {} file(s) failed; rerun to retry them",
            "Warning:".with(Color::Yellow).bold(),
            report.failed().len()
        );
    }
    Ok(0)
}
