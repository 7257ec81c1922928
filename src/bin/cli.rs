//! fdelta CLI - Fossil-format delta tool
//!
//! Usage:
//!   fdelta create <origin> <target> -o <output> [OPTIONS]
//!   fdelta apply <origin> <delta> -o <output> [OPTIONS]
//!   fdelta info <delta> [OPTIONS]

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fdelta::DeltaError;
use owo_colors::OwoColorize;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};
use sysinfo::System;
use tracing_subscriber::EnvFilter;

/// Create and apply Fossil-format deltas
#[derive(Parser)]
#[command(name = "fdelta")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable diagnostic logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a delta that turns the origin file into the target file
    Create {
        /// Origin file (old version)
        origin: PathBuf,

        /// Target file (new version)
        target: PathBuf,

        /// Output delta file
        #[arg(short, long)]
        output: PathBuf,

        /// Wrap the delta file with a general-purpose compressor
        #[arg(short, long, value_enum, default_value = "none")]
        compress: Compression,

        /// Verify the delta after creation by applying it
        #[arg(long)]
        verify: bool,

        #[command(flatten)]
        opts: CommonOpts,
    },
    /// Apply a delta to the origin file to rebuild the target file
    Apply {
        /// Origin file (old version)
        origin: PathBuf,

        /// Delta file
        delta: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Compression of the delta file (auto-detected by default)
        #[arg(long, value_enum)]
        format: Option<Compression>,

        #[command(flatten)]
        opts: CommonOpts,
    },
    /// Show what a delta file contains
    Info {
        /// Delta file
        delta: PathBuf,

        /// Compression of the delta file (auto-detected by default)
        #[arg(long, value_enum)]
        format: Option<Compression>,
    },
}

#[derive(Args, Clone, Copy)]
struct CommonOpts {
    /// Skip memory warning prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Overwrite output file if it exists
    #[arg(short, long)]
    force: bool,

    /// Suppress output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Compression {
    /// No compression (raw delta)
    None,
    /// Zstd compression (good balance)
    Zstd,
    /// LZ4 compression (faster)
    Lz4,
}

/// Reasons to stop that are not failures of the delta itself.
#[derive(Debug)]
enum Abort {
    InsufficientMemory { required: u64, total: u64 },
    Cancelled,
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abort::InsufficientMemory { required, total } => write!(
                f,
                "Insufficient memory\n   Required: ~{}\n   Total RAM: {}\n\n   \
                 These files cannot be processed on this system.",
                format_bytes(*required),
                format_bytes(*total)
            ),
            Abort::Cancelled => write!(f, "Cancelled by user"),
        }
    }
}

impl std::error::Error for Abort {}

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_BAD_DELTA: i32 = 2;
const EXIT_OUT_OF_MEMORY: i32 = 4;
const EXIT_USER_CANCELLED: i32 = 5;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Create {
            origin,
            target,
            output,
            compress,
            verify,
            opts,
        } => handle_create(&origin, &target, &output, compress, verify, opts),
        Commands::Apply {
            origin,
            delta,
            output,
            format,
            opts,
        } => handle_apply(&origin, &delta, &output, format, opts),
        Commands::Info { delta, format } => handle_info(&delta, format),
    };

    match result {
        Ok(()) => process::exit(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
            process::exit(exit_code(&e));
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match std::env::var("FDELTA_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => match verbose {
            0 => return,
            1 => EnvFilter::new("fdelta=debug"),
            _ => EnvFilter::new("fdelta=trace"),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(abort) = cause.downcast_ref::<Abort>() {
            return match abort {
                Abort::InsufficientMemory { .. } => EXIT_OUT_OF_MEMORY,
                Abort::Cancelled => EXIT_USER_CANCELLED,
            };
        }
        if cause.downcast_ref::<DeltaError>().is_some() {
            return EXIT_BAD_DELTA;
        }
    }
    EXIT_ERROR
}

fn handle_create(
    origin_path: &Path,
    target_path: &Path,
    output_path: &Path,
    compress: Compression,
    verify: bool,
    opts: CommonOpts,
) -> Result<()> {
    require_file(origin_path)?;
    require_file(target_path)?;
    check_output(output_path, opts.force)?;

    let origin_size = fs::metadata(origin_path)
        .context("Failed to read origin file metadata")?
        .len();
    let target_size = fs::metadata(target_path)
        .context("Failed to read target file metadata")?
        .len();

    if !opts.quiet {
        println!(
            "{} Origin: {}, Target: {}",
            "File sizes:".bright_cyan(),
            format_bytes(origin_size),
            format_bytes(target_size)
        );
    }

    let required = estimate_create_memory(origin_size, target_size);
    check_memory(required, opts.yes, opts.quiet)?;

    let steps = if verify { 4 } else { 3 };
    let step = |n: &str| format!("Step {}/{}:", n, steps);

    if !opts.quiet {
        println!("{} Reading files...", step("1").bright_cyan());
    }

    let origin = fs::read(origin_path)
        .with_context(|| format!("Failed to read origin file: {}", origin_path.display()))?;
    let target = fs::read(target_path)
        .with_context(|| format!("Failed to read target file: {}", target_path.display()))?;

    if !opts.quiet {
        println!("{} Creating delta...", step("2").bright_cyan());
    }

    let start = Instant::now();
    let delta = fdelta::create(&origin, &target);
    let create_time = start.elapsed();

    let (final_delta, compression_time) = match compress {
        Compression::None => (delta, None),
        method => {
            if !opts.quiet {
                println!("{} Compressing with {:?}...", step("2.5").bright_cyan(), method);
            }
            let start = Instant::now();
            let compressed = match method {
                Compression::Zstd => compress_zstd(&delta)?,
                _ => compress_lz4(&delta)?,
            };
            (compressed, Some(start.elapsed()))
        }
    };

    if !opts.quiet {
        println!("{} Writing output...", step("3").bright_cyan());
    }

    fs::write(output_path, &final_delta)
        .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;

    let verify_time = if verify {
        if !opts.quiet {
            println!("{} Verifying delta...", step("4").bright_cyan());
        }

        let start = Instant::now();
        let (raw, _, _) = decompress_if_needed(&final_delta, Some(compress), true)?;
        let rebuilt = fdelta::apply(&origin, &raw).context("Verification apply failed")?;

        if rebuilt != target {
            bail!(
                "Verification failed: rebuilt output does not match the target file\n   \
                 Expected {} bytes, got {} bytes",
                target.len(),
                rebuilt.len()
            );
        }
        Some(start.elapsed())
    } else {
        None
    };

    if !opts.quiet {
        println!();
        println!(
            "{} Created {} ({}, {:.1}% of target file)",
            "Success:".bright_green().bold(),
            output_path.display(),
            format_bytes(final_delta.len() as u64),
            percent(final_delta.len() as u64, target_size)
        );
        print!("   Delta creation took {}", format_duration(create_time));
        if let Some(time) = compression_time {
            print!(", compression took {}", format_duration(time));
        }
        if let Some(time) = verify_time {
            print!(", verification took {}", format_duration(time));
        }
        println!();
    }

    Ok(())
}

fn handle_apply(
    origin_path: &Path,
    delta_path: &Path,
    output_path: &Path,
    format_override: Option<Compression>,
    opts: CommonOpts,
) -> Result<()> {
    require_file(origin_path)?;
    require_file(delta_path)?;
    check_output(output_path, opts.force)?;

    let origin_size = fs::metadata(origin_path)
        .context("Failed to read origin file metadata")?
        .len();

    if !opts.quiet {
        println!("{} Reading delta...", "Step 1/3:".bright_cyan());
    }

    let delta_file = fs::read(delta_path)
        .with_context(|| format!("Failed to read delta file: {}", delta_path.display()))?;
    let (delta, detected, decompression_time) =
        decompress_if_needed(&delta_file, format_override, opts.quiet)?;

    if !opts.quiet && detected != Compression::None {
        println!("{} Detected {:?} compression", "Info:".bright_cyan(), detected);
    }

    let target_size = fdelta::output_size(&delta).context("Failed to read delta header")?;

    if !opts.quiet {
        println!(
            "{} Origin: {}, Delta: {}, Target: {}",
            "File sizes:".bright_cyan(),
            format_bytes(origin_size),
            format_bytes(delta.len() as u64),
            format_bytes(target_size as u64)
        );
    }

    let required = estimate_apply_memory(origin_size, delta.len() as u64, target_size as u64);
    check_memory(required, opts.yes, opts.quiet)?;

    if !opts.quiet {
        println!("{} Applying delta...", "Step 2/3:".bright_cyan());
    }

    let origin = fs::read(origin_path)
        .with_context(|| format!("Failed to read origin file: {}", origin_path.display()))?;

    let start = Instant::now();
    let output = fdelta::apply(&origin, &delta).context("Apply failed")?;
    let apply_time = start.elapsed();

    if !opts.quiet {
        println!("{} Writing output...", "Step 3/3:".bright_cyan());
    }

    fs::write(output_path, &output)
        .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;

    if !opts.quiet {
        println!();
        println!(
            "{} Created {} ({})",
            "Success:".bright_green().bold(),
            output_path.display(),
            format_bytes(output.len() as u64)
        );
        print!("   Applying took {}", format_duration(apply_time));
        if let Some(time) = decompression_time {
            print!(", decompression took {}", format_duration(time));
        }
        println!();
    }

    Ok(())
}

fn handle_info(delta_path: &Path, format_override: Option<Compression>) -> Result<()> {
    require_file(delta_path)?;

    let delta_file = fs::read(delta_path)
        .with_context(|| format!("Failed to read delta file: {}", delta_path.display()))?;
    let (delta, detected, _) = decompress_if_needed(&delta_file, format_override, true)?;
    let stats = fdelta::analyze(&delta).context("Failed to parse delta")?;

    println!("{} {}", "Delta:".bright_cyan(), delta_path.display());
    if detected != Compression::None {
        println!(
            "   Compression: {:?} ({} -> {})",
            detected,
            format_bytes(delta_file.len() as u64),
            format_bytes(delta.len() as u64)
        );
    }
    println!("   Delta size:  {}", format_bytes(delta.len() as u64));
    println!("   Target size: {}", format_bytes(stats.target_len as u64));
    println!(
        "   Copied:      {} in {} ops ({:.1}%)",
        format_bytes(stats.copied as u64),
        stats.copy_ops,
        percent(stats.copied as u64, stats.target_len as u64)
    );
    println!(
        "   Inserted:    {} in {} ops ({:.1}%)",
        format_bytes(stats.inserted as u64),
        stats.insert_ops,
        percent(stats.inserted as u64, stats.target_len as u64)
    );

    Ok(())
}

fn require_file(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    Ok(())
}

fn check_output(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Output file already exists: {}\n   Use --force to overwrite",
            path.display()
        );
    }
    Ok(())
}

// ============================================================================
// Memory Management
// ============================================================================

fn estimate_create_memory(origin_size: u64, target_size: u64) -> u64 {
    // origin + target + delta (worst case = target) + index (~origin / 2)
    origin_size + target_size + target_size + (origin_size / 2)
}

fn estimate_apply_memory(origin_size: u64, delta_size: u64, target_size: u64) -> u64 {
    // origin + delta + output + 20% overhead
    origin_size + delta_size + target_size + (target_size / 5)
}

fn check_memory(required: u64, skip_prompt: bool, quiet: bool) -> Result<()> {
    let mut sys = System::new_all();
    sys.refresh_memory();

    let available = sys.available_memory();
    let total = sys.total_memory();

    if required > total {
        return Err(Abort::InsufficientMemory { required, total }.into());
    }

    let usage_pct = percent(required, available);

    if !quiet && usage_pct < 80.0 {
        println!(
            "{} ~{} required, {} available {}",
            "Memory:".bright_cyan(),
            format_bytes(required),
            format_bytes(available),
            "✓".bright_green()
        );
    }

    if usage_pct >= 80.0 {
        eprintln!();
        eprintln!(
            "{} This operation requires ~{}",
            "Memory warning:".bright_yellow().bold(),
            format_bytes(required)
        );
        eprintln!(
            "   Available: {} free ({} total)",
            format_bytes(available),
            format_bytes(total)
        );
        eprintln!();
        eprintln!("   Loading these files will use {:.0}% of available memory.", usage_pct);
        if usage_pct >= 100.0 {
            eprintln!("   {}", "Your system may freeze or crash.".bright_red().bold());
        } else {
            eprintln!("   System may slow down temporarily.");
        }
        eprintln!();

        if skip_prompt {
            eprintln!("   {} Continuing anyway (--yes flag)", "⚠".bright_yellow());
            eprintln!();
        } else {
            eprint!("   Continue? [y/N]: ");
            io::stderr().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                return Err(Abort::Cancelled.into());
            }
            eprintln!();
        }
    }

    Ok(())
}

// ============================================================================
// Compression/Decompression
// ============================================================================

const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];
const LZ4_MAGIC: &[u8] = &[0x04, 0x22, 0x4D, 0x18];

fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, 3).context("Zstd compression failed")
}

fn compress_lz4(data: &[u8]) -> Result<Vec<u8>> {
    // Frame format, so the magic bytes are there for detection
    let mut compressed = Vec::new();
    let mut encoder = lz4::EncoderBuilder::new()
        .level(1)
        .build(&mut compressed)
        .context("Failed to create LZ4 encoder")?;

    io::copy(&mut &data[..], &mut encoder).context("Failed to compress with LZ4")?;

    let (_output, result) = encoder.finish();
    result.context("Failed to finish LZ4 compression")?;

    Ok(compressed)
}

fn decompress_lz4(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = lz4::Decoder::new(data).context("Failed to create LZ4 decoder")?;

    let mut decompressed = Vec::new();
    io::copy(&mut decoder, &mut decompressed).context("Failed to decompress LZ4 data")?;

    Ok(decompressed)
}

/// Unwraps the delta file according to `format_override`, or by magic bytes
/// when no format is given.
fn decompress_if_needed(
    data: &[u8],
    format_override: Option<Compression>,
    quiet: bool,
) -> Result<(Vec<u8>, Compression, Option<Duration>)> {
    // A raw delta starts with a base-64 digit, which never collides with
    // either magic number.
    let format = format_override.unwrap_or(if data.starts_with(ZSTD_MAGIC) {
        Compression::Zstd
    } else if data.starts_with(LZ4_MAGIC) {
        Compression::Lz4
    } else {
        Compression::None
    });

    if format == Compression::None {
        return Ok((data.to_vec(), Compression::None, None));
    }

    if !quiet {
        println!("{} Decompressing with {:?}...", "Step 1.5/3:".bright_cyan(), format);
    }

    let start = Instant::now();
    let decompressed = match format {
        Compression::Zstd => zstd::decode_all(data).context("Zstd decompression failed")?,
        _ => decompress_lz4(data)?,
    };
    Ok((decompressed, format, Some(start.elapsed())))
}

// ============================================================================
// Utilities
// ============================================================================

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.1}μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
