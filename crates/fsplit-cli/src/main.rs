//! fsplit: split a file into bounded-size chunks, or join them back
//!
//! Usage:
//!   fsplit --split <PATH> [--nitro] [--output <DIR>]
//!   fsplit --concatenate <DIR> [--output <DIR>]
//!
//! Exactly one of --split / --concatenate is required.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use fsplit_chunks::ProgressFn;
use fsplit_core::config::FsplitConfig;
use fsplit_core::{ChunkProfile, FsplitError};

/// Exit status for a join whose checksum did not match
const EXIT_CHECKSUM_MISMATCH: i32 = 3;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "fsplit",
    version,
    about = "Split files into chunks and join them back with MD5 verification"
)]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["split", "concatenate"])
))]
struct Cli {
    /// Split the file at PATH
    #[arg(long, short = 's', value_name = "PATH")]
    split: Option<PathBuf>,

    /// Directory containing header.json and chunk files
    #[arg(long, short = 'c', value_name = "DIRECTORY")]
    concatenate: Option<PathBuf>,

    /// Increase chunk size from 8MB to 50MB
    #[arg(long, short = 'n', conflicts_with = "concatenate")]
    nitro: bool,

    /// Output directory (default: current directory)
    #[arg(long, short = 'o', value_name = "DIRECTORY")]
    output: Option<PathBuf>,

    /// Path to config.toml (default: ~/.config/fsplit/config.toml)
    #[arg(long, env = "FSPLIT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, env = "FSPLIT_LOG")]
    log: Option<String>,

    /// Log format; overrides config
    #[arg(long, env = "FSPLIT_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        if let Some(FsplitError::ChecksumMismatch { expected, computed }) =
            e.downcast_ref::<FsplitError>()
        {
            eprintln!("Error while checking MD5 hashes.");
            eprintln!("  original hash: {expected}");
            eprintln!("  new hash:      {computed}");
            eprintln!("Chunk files and header were left in place.");
            std::process::exit(EXIT_CHECKSUM_MISMATCH);
        }
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let (config, config_path, config_found) = load_config(cli.config.as_deref())?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match cli.log_format {
        Some(f) => f,
        None => parse_log_format(&config.log.format)?,
    };
    init_logging(&level, &format);

    if !config_found && cli.config.is_some() {
        warn!("config file not found: {}  (using defaults)", config_path.display());
    }
    debug!(config = %config_path.display(), found = config_found, "configuration loaded");

    if let Some(input) = cli.split.as_deref() {
        let profile = if cli.nitro {
            ChunkProfile::HighThroughput
        } else {
            config.chunking.profile
        };
        cmd_split(&config, input, cli.output.as_deref(), profile)
    } else if let Some(dir) = cli.concatenate.as_deref() {
        cmd_join(&config, dir, cli.output.as_deref())
    } else {
        // unreachable while the "operation" group is required
        anyhow::bail!("either --split/-s or --concatenate/-c is required")
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Load the config file, falling back to defaults when it does not exist.
///
/// Returns the config, the path consulted, and whether that file existed.
fn load_config(path: Option<&Path>) -> Result<(FsplitConfig, PathBuf, bool)> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| expand_tilde(Path::new("~/.config/fsplit/config.toml")));

    if path.exists() {
        let config = FsplitConfig::from_file(&path)
            .with_context(|| format!("loading config: {}", path.display()))?;
        Ok((config, path, true))
    } else {
        Ok((FsplitConfig::default(), path, false))
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

fn parse_log_format(s: &str) -> Result<LogFormat> {
    LogFormat::from_str(s, true)
        .map_err(|_| anyhow::anyhow!("invalid log format in config: {s:?} (json, text)"))
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the command summary; logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn progress_callback(pb: &ProgressBar) -> ProgressFn {
    let pb = pb.clone();
    Box::new(move |done, total, msg| {
        pb.set_length(total);
        pb.set_position(done);
        pb.set_message(msg.to_string());
    })
}

// ── `fsplit --split` ──────────────────────────────────────────────────────────

fn cmd_split(
    config: &FsplitConfig,
    input: &Path,
    output: Option<&Path>,
    profile: ChunkProfile,
) -> Result<()> {
    let limits = config.limits(profile).context("resolving chunk limits")?;

    println!(
        "Splitting {} ({:?}, {} per chunk)",
        input.display(),
        profile,
        fmt_bytes(limits.chunk_ceiling),
    );

    let pb = make_progress_bar(0, "split");
    let progress = progress_callback(&pb);

    let result = fsplit_chunks::split_file(input, output, &limits, Some(&progress));
    pb.finish_and_clear();
    let result = result.with_context(|| format!("splitting {}", input.display()))?;

    println!("  md5:       {}", result.manifest.checksum);
    println!("  chunks:    {}", result.manifest.chunk_count);
    println!("  bytes:     {}", fmt_bytes(result.bytes));
    println!("  manifest:  {}", result.manifest_path.display());

    Ok(())
}

// ── `fsplit --concatenate` ────────────────────────────────────────────────────

fn cmd_join(config: &FsplitConfig, dir: &Path, output: Option<&Path>) -> Result<()> {
    // The joiner only uses the read block size; the ceiling is irrelevant.
    let limits = config
        .limits(ChunkProfile::Standard)
        .context("resolving read block size")?;

    println!("Joining {}", dir.display());

    let pb = make_progress_bar(0, "join");
    let progress = progress_callback(&pb);

    let result = fsplit_chunks::join_dir(dir, output, &limits, Some(&progress));
    pb.finish_and_clear();
    let result = result.with_context(|| format!("joining {}", dir.display()))?;

    println!("  output:    {}", result.output_path.display());
    println!("  md5:       {} (verified)", result.checksum);
    println!("  chunks:    {}", result.chunks);
    println!("  bytes:     {}", fmt_bytes(result.bytes));
    if !result.cleanup_failures.is_empty() {
        println!(
            "  warning:   {} source file(s) could not be deleted",
            result.cleanup_failures.len()
        );
    }

    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
